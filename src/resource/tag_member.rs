//! Membership of a user in a tag

use super::{Api, deleted, known, required};
use anyhow::{Context, Result, bail};
use declarative::{Resource, Value};
use pamclient::models::{Tag, TagMembers, User};
use pamclient::{AllowNoContent, LockKey, NotFoundAsNone};
use resourceid::{ImportFormats, TagMemberId, formats};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagMemberState {
    /// `tags/{tagId}/users/{userId}`
    #[serde(default)]
    pub id: Value<String>,
    /// Tag name
    pub tag: String,
    pub username: String,
    #[serde(default)]
    pub tag_id: Value<String>,
    #[serde(default)]
    pub user_id: Value<String>,
}

impl TagMemberState {
    fn member_id(&self) -> Result<TagMemberId> {
        Ok(TagMemberId {
            tag_id: known("tag id", &self.tag_id)?.to_string(),
            user_id: known("user id", &self.user_id)?.to_string(),
        })
    }
}

pub struct TagMemberResource {
    api: Api,
}

impl TagMemberResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    /// Look up tag and user by name; external tags are managed by their identity provider.
    fn resolve(&self, tag: &str, username: &str) -> Result<(Tag, User)> {
        let client = self.api.client();
        let tag = client
            .tag_by_name(self.api.cancel(), required("tag", tag)?)
            .context("Failed to look up tag")?;
        if tag.external {
            bail!(
                "tag {} is synchronized from identity provider {} and is read-only",
                tag.name,
                tag.identity_provider_id
            );
        }
        let user = client
            .user_by_name(self.api.cancel(), required("username", username)?)
            .context("Failed to look up user")?;
        Ok((tag, user))
    }
}

impl Resource for TagMemberResource {
    type State = TagMemberState;

    fn type_name(&self) -> &'static str {
        "tag_member"
    }

    fn create(&self, plan: &TagMemberState) -> Result<TagMemberState> {
        let (tag, user) = self.resolve(&plan.tag, &plan.username)?;
        self.api
            .client()
            .post(
                self.api.cancel(),
                &format!("tags/{}/users", tag.id),
                &TagMembers {
                    user_ids: vec![user.id.clone()],
                },
                LockKey::Tag,
            )
            .allow_no_content()
            .with_context(|| format!("Failed to add {} to tag {}", user.name, tag.name))?;
        log::info!("Added {} to tag {}", user.name, tag.name);

        let id = TagMemberId {
            tag_id: tag.id,
            user_id: user.id,
        };
        Ok(TagMemberState {
            id: Value::Known(id.to_string()),
            tag_id: Value::Known(id.tag_id),
            user_id: Value::Known(id.user_id),
            ..plan.clone()
        })
    }

    fn read(&self, prior: &TagMemberState) -> Result<Option<TagMemberState>> {
        let id = prior.member_id()?;
        let user: Option<User> = self
            .api
            .client()
            .get_json(self.api.cancel(), &id.to_string(), LockKey::Tag)
            .not_found_as_none()?;
        Ok(user.map(|user| TagMemberState {
            id: Value::Known(id.to_string()),
            username: if user.name.is_empty() {
                prior.username.clone()
            } else {
                user.name
            },
            ..prior.clone()
        }))
    }

    fn update(&self, plan: &TagMemberState, _prior: &TagMemberState) -> Result<TagMemberState> {
        bail!("membership of {} in tag {} cannot be changed in place", plan.username, plan.tag)
    }

    fn delete(&self, prior: &TagMemberState) -> Result<()> {
        let id = prior.member_id()?;
        deleted(self.api.client().delete(self.api.cancel(), &id.to_string(), LockKey::Tag))
    }

    /// Both parts are names, resolved to ids.
    fn import(&self, id: &str) -> Result<TagMemberState> {
        let fields = ImportFormats::new(formats::TAG_MEMBER)?.parse(id)?;
        let (tag, user) = self.resolve(fields.get("tag")?, fields.get("user")?)?;
        let id = TagMemberId {
            tag_id: tag.id,
            user_id: user.id,
        };
        Ok(TagMemberState {
            id: Value::Known(id.to_string()),
            tag: tag.name,
            username: user.name,
            tag_id: Value::Known(id.tag_id),
            user_id: Value::Known(id.user_id),
        })
    }

    fn requires_replace(&self, _plan: &TagMemberState, _state: &TagMemberState) -> Result<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing;
    use pamclient::transport::Method;
    use serde_json::json;

    const TAG_QUERY: &str = "/tags?page=0&size=10&filter=name%20eq%20%22oncall%22";
    const USER_QUERY: &str = "/users?page=0&size=10&filter=name%20eq%20%22ada%22";

    fn plan() -> TagMemberState {
        TagMemberState {
            tag: "oncall".into(),
            username: "ada".into(),
            ..TagMemberState::default()
        }
    }

    fn directory(mock: &pamclient::transport::MockExecutor, external: bool) {
        mock.respond_json(
            Method::Get,
            TAG_QUERY,
            200,
            &testing::page(json!([{"id": "t1", "name": "oncall", "identityProviderId": "okta", "external": external}])),
        );
        mock.respond_json(
            Method::Get,
            USER_QUERY,
            200,
            &testing::page(json!([{"id": "u1", "name": "ada"}])),
        );
    }

    #[test]
    fn test_create_posts_user_id() {
        let (api, mock) = testing::api();
        directory(&mock, false);
        mock.respond(Method::Post, "/tags/t1/users", 204, "");

        let state = TagMemberResource::new(api).create(&plan()).unwrap();

        assert_eq!(state.id, Value::Known("tags/t1/users/u1".to_string()));
        let body = mock.requests_to(Method::Post, "/tags/t1/users")[0].json().unwrap();
        assert_eq!(body, json!({"userIds": ["u1"]}));
    }

    #[test]
    fn test_external_tag_rejected() {
        let (api, mock) = testing::api();
        directory(&mock, true);

        let err = TagMemberResource::new(api).create(&plan()).unwrap_err();

        assert!(err.to_string().contains("read-only"));
        assert!(mock.requests_to(Method::Post, "/tags").is_empty());
    }

    #[test]
    fn test_read_and_delete() {
        let (api, mock) = testing::api();
        mock.respond_json(Method::Get, "/tags/t1/users/u1", 200, &json!({"id": "u1", "name": "ada"}));
        mock.respond(Method::Delete, "/tags/t1/users/u1", 404, "");
        let resource = TagMemberResource::new(api);
        let prior = TagMemberState {
            tag_id: Value::Known("t1".into()),
            user_id: Value::Known("u1".into()),
            ..plan()
        };

        assert!(resource.read(&prior).unwrap().is_some());
        resource.delete(&prior).unwrap();
    }

    #[test]
    fn test_import_resolves_names() {
        let (api, mock) = testing::api();
        directory(&mock, false);

        let state = TagMemberResource::new(api).import("tags/oncall/users/ada").unwrap();
        assert_eq!(state.tag_id, Value::Known("t1".to_string()));
        assert_eq!(state.user_id, Value::Known("u1".to_string()));
    }
}
