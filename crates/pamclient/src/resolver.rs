//! Lookup of entities by name.
//!
//! Every helper issues a filtered list query and expects exactly one
//! match: none is [`Error::NotFound`], several is [`Error::Ambiguous`].
//! Names are compared by the server, case-sensitively.

use crate::cancel::CancelToken;
use crate::client::Client;
use crate::error::{Error, Result};
use crate::lock::LockKey;
use crate::models::{
    Application, Permission, Policy, Profile, Role, ServerResource, SessionAttribute,
    SessionAttributeType, Tag, User,
};
use crate::query::eq_filter;
use serde::de::DeserializeOwned;

impl Client {
    /// Run `filter` against `endpoint` and return the single match.
    pub fn find_one<T: DeserializeOwned>(
        &self,
        cancel: &CancelToken,
        key: LockKey,
        endpoint: &str,
        what: &str,
        filter: String,
        value: &str,
    ) -> Result<T> {
        let mut found: Vec<T> = self.query(key).with_filter(filter).fetch(cancel, endpoint)?;
        match found.len() {
            0 => Err(Error::NotFound(format!("{what} {value:?}"))),
            1 => Ok(found.remove(0)),
            count => Err(Error::Ambiguous {
                what: what.to_string(),
                value: value.to_string(),
                count,
            }),
        }
    }

    fn find_by_name<T: DeserializeOwned>(
        &self,
        cancel: &CancelToken,
        key: LockKey,
        endpoint: &str,
        what: &str,
        name: &str,
    ) -> Result<T> {
        self.find_one(cancel, key, endpoint, what, eq_filter("name", name), name)
    }

    pub fn application_by_name(&self, cancel: &CancelToken, name: &str) -> Result<Application> {
        self.find_by_name(cancel, LockKey::Application, "apps", "application", name)
    }

    pub fn profile_by_name(&self, cancel: &CancelToken, app_id: &str, name: &str) -> Result<Profile> {
        let endpoint = format!("apps/{app_id}/paps");
        self.find_by_name(cancel, LockKey::Profile, &endpoint, "profile", name)
    }

    pub fn tag_by_name(&self, cancel: &CancelToken, name: &str) -> Result<Tag> {
        self.find_by_name(cancel, LockKey::Tag, "tags", "tag", name)
    }

    pub fn user_by_name(&self, cancel: &CancelToken, name: &str) -> Result<User> {
        self.find_by_name(cancel, LockKey::Tag, "users", "user", name)
    }

    pub fn policy_by_name(&self, cancel: &CancelToken, profile_id: &str, name: &str) -> Result<Policy> {
        let endpoint = format!("paps/{profile_id}/policies");
        self.find_by_name(cancel, LockKey::Policy, &endpoint, "policy", name)
    }

    pub fn role_by_name(&self, cancel: &CancelToken, name: &str) -> Result<Role> {
        self.find_by_name(cancel, LockKey::Role, "roles", "role", name)
    }

    pub fn permission_by_name(&self, cancel: &CancelToken, name: &str) -> Result<Permission> {
        self.find_by_name(cancel, LockKey::Permission, "permissions", "permission", name)
    }

    pub fn resource_by_name(&self, cancel: &CancelToken, name: &str) -> Result<ServerResource> {
        self.find_by_name(cancel, LockKey::ServerAccess, "resources", "resource", name)
    }

    pub fn session_attribute_by_type_and_mapping_name(
        &self,
        cancel: &CancelToken,
        attribute_type: SessionAttributeType,
        mapping_name: &str,
    ) -> Result<SessionAttribute> {
        let filter = urlencoding::encode(&format!(
            "type eq \"{attribute_type}\" and mappingName eq \"{mapping_name}\""
        ))
        .into_owned();
        self.find_one(
            cancel,
            LockKey::ServerAccess,
            "session-attributes",
            "session attribute",
            filter,
            mapping_name,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Method, MockExecutor};
    use serde_json::json;

    fn envelope(data: serde_json::Value) -> serde_json::Value {
        let count = data.as_array().map_or(0, Vec::len);
        json!({"count": count, "page": 0, "size": 10, "data": data})
    }

    #[test]
    fn test_single_match() {
        let mock = MockExecutor::new();
        mock.respond_json(
            Method::Get,
            "/tags?page=0&size=10&filter=name%20eq%20%22prod%22",
            200,
            &envelope(json!([{"id": "t1", "name": "prod", "external": true}])),
        );
        let client = Client::with_executor("https://t.example", "tok", mock);

        let tag = client.tag_by_name(&CancelToken::new(), "prod").unwrap();
        assert_eq!(tag.id, "t1");
        assert!(tag.external);
    }

    #[test]
    fn test_no_match_is_not_found() {
        let mock = MockExecutor::new();
        mock.respond_json(
            Method::Get,
            "/apps/a1/paps?page=0&size=10&filter=name%20eq%20%22ops%22",
            200,
            &envelope(json!([])),
        );
        let client = Client::with_executor("https://t.example", "tok", mock);

        let err = client
            .profile_by_name(&CancelToken::new(), "a1", "ops")
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("\"ops\""));
    }

    #[test]
    fn test_several_matches_are_ambiguous() {
        let mock = MockExecutor::new();
        mock.respond_json(
            Method::Get,
            "/roles?page=0&size=10&filter=name%20eq%20%22admin%22",
            200,
            &envelope(json!([{"id": "r1", "name": "admin"}, {"id": "r2", "name": "admin"}])),
        );
        let client = Client::with_executor("https://t.example", "tok", mock);

        let err = client.role_by_name(&CancelToken::new(), "admin").unwrap_err();
        assert!(matches!(err, Error::Ambiguous { count: 2, .. }));
    }

    #[test]
    fn test_session_attribute_filter() {
        let mock = MockExecutor::new();
        mock.respond_json(
            Method::Get,
            "/session-attributes?page=0&size=10&filter=type%20eq%20%22IDENTITY%22%20and%20mappingName%20eq%20%22login%22",
            200,
            &envelope(json!([{"id": "s1", "type": "IDENTITY", "mappingName": "login", "attributeName": "email"}])),
        );
        let client = Client::with_executor("https://t.example", "tok", mock);

        let attribute = client
            .session_attribute_by_type_and_mapping_name(
                &CancelToken::new(),
                SessionAttributeType::Identity,
                "login",
            )
            .unwrap();
        assert_eq!(attribute.attribute_name.as_deref(), Some("email"));
        assert!(attribute.validate().is_ok());
    }
}
