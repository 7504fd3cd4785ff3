//! Access profiles of an application

use super::{Api, deleted, known, required};
use anyhow::{Context, Result, bail};
use declarative::{Resource, Value};
use drift::duration::{durations_equal, format_millis, parse_millis};
use drift::semantic::case_insensitive_one_of;
use pamclient::models::{Association, Profile, Status};
use pamclient::{AllowNoContent, LockKey, NotFoundAsNone};
use resourceid::{ImportFormats, formats};
use serde::{Deserialize, Serialize};
use serde_json::json;

const ASSOCIATION_TYPES: &[&str] = &["environment_group", "environment", "application_resource"];

#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileAssociation {
    /// `environment_group`, `environment` or `application_resource`
    #[serde(rename = "type")]
    pub association_type: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
}

impl ProfileAssociation {
    pub(crate) fn to_wire(&self) -> Result<Association> {
        let id = self.value.clone();
        Ok(match self.association_type.to_lowercase().as_str() {
            "environment_group" => Association::EnvironmentGroup { id },
            "environment" => Association::Environment { id },
            "application_resource" => {
                let Some(parent) = self.parent_name.as_deref().filter(|p| !p.trim().is_empty())
                else {
                    bail!("application_resource association {id} needs a parent_name");
                };
                Association::ApplicationResource {
                    id,
                    parent_resource_name: parent.to_string(),
                }
            }
            other => bail!(
                "association type {other:?} must be one of {}",
                ASSOCIATION_TYPES.join(", ")
            ),
        })
    }

    pub(crate) fn from_wire(association: &Association) -> Self {
        match association {
            Association::EnvironmentGroup { id } => Self {
                association_type: "environment_group".into(),
                value: id.clone(),
                parent_name: None,
            },
            Association::Environment { id } => Self {
                association_type: "environment".into(),
                value: id.clone(),
                parent_name: None,
            },
            Association::ApplicationResource {
                id,
                parent_resource_name,
            } => Self {
                association_type: "application_resource".into(),
                value: id.clone(),
                parent_name: Some(parent_resource_name.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileState {
    #[serde(default)]
    pub id: Value<String>,
    pub application_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Value<String>,
    /// `active` or `inactive`
    #[serde(default)]
    pub status: Value<String>,
    #[serde(default)]
    pub associations: Value<Vec<ProfileAssociation>>,
    /// Go-style duration, e.g. `2h30m`
    pub expiration_duration: String,
    #[serde(default)]
    pub extendable: Value<bool>,
    #[serde(default)]
    pub extension_policy_id: Value<String>,
    #[serde(default)]
    pub destination_url: Value<String>,
}

pub struct ProfileResource {
    api: Api,
}

fn parse_status(status: &Value<String>) -> Result<Status> {
    match status.non_empty() {
        None => Ok(Status::Active),
        Some(s) if s.eq_ignore_ascii_case("active") => Ok(Status::Active),
        Some(s) if s.eq_ignore_ascii_case("inactive") => Ok(Status::Inactive),
        Some(other) => bail!("status {other:?} must be active or inactive"),
    }
}

fn status_name(status: Status) -> &'static str {
    match status {
        Status::Active => "active",
        Status::Inactive => "inactive",
    }
}

fn sorted(associations: &[ProfileAssociation]) -> Vec<ProfileAssociation> {
    let mut out: Vec<ProfileAssociation> = associations
        .iter()
        .map(|a| ProfileAssociation {
            association_type: a.association_type.to_lowercase(),
            ..a.clone()
        })
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Profile body from configuration; fields the server owns are left default
fn profile_body(plan: &ProfileState) -> Result<Profile> {
    required("name", &plan.name)?;
    let associations = match plan.associations.known() {
        Some(associations) => {
            for a in associations {
                if !case_insensitive_one_of(&a.association_type, ASSOCIATION_TYPES) {
                    bail!(
                        "association type {:?} must be one of {}",
                        a.association_type,
                        ASSOCIATION_TYPES.join(", ")
                    );
                }
            }
            sorted(associations)
                .iter()
                .map(ProfileAssociation::to_wire)
                .collect::<Result<Vec<_>>>()?
        }
        None => Vec::new(),
    };
    Ok(Profile {
        name: plan.name.clone(),
        description: plan.description.known().cloned().unwrap_or_default(),
        application_id: plan.application_id.clone(),
        status: parse_status(&plan.status)?,
        associations,
        expiration_duration: parse_millis(&plan.expiration_duration)?,
        extendable: plan.extendable.known().copied().unwrap_or(false),
        extension_policy_id: plan.extension_policy_id.non_empty().map(str::to_string),
        destination_url: plan.destination_url.non_empty().map(str::to_string),
        ..Profile::default()
    })
}

fn from_server(profile: Profile, prior: &ProfileState) -> ProfileState {
    let description = if profile.description.is_empty() && !prior.description.is_known() {
        Value::Null
    } else {
        Value::Known(profile.description)
    };
    let associations = if profile.associations.is_empty() && !prior.associations.is_known() {
        Value::Null
    } else {
        Value::Known(
            profile
                .associations
                .iter()
                .map(ProfileAssociation::from_wire)
                .collect(),
        )
    };
    ProfileState {
        id: Value::Known(profile.id),
        application_id: prior.application_id.clone(),
        name: profile.name,
        description,
        status: Value::Known(status_name(profile.status).to_string()),
        associations,
        expiration_duration: format_millis(profile.expiration_duration),
        extendable: Value::Known(profile.extendable),
        extension_policy_id: profile.extension_policy_id.into(),
        destination_url: profile.destination_url.into(),
    }
}

impl ProfileResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn path(app_id: &str, profile_id: &str) -> String {
        format!("apps/{app_id}/paps/{profile_id}")
    }

    fn fetch(&self, app_id: &str, profile_id: &str) -> pamclient::Result<Profile> {
        self.api.client().get_json(
            self.api.cancel(),
            &Self::path(app_id, profile_id),
            LockKey::Profile,
        )
    }

    fn set_status(&self, app_id: &str, profile_id: &str, status: Status) -> Result<()> {
        let endpoint = format!(
            "{}/{}",
            Self::path(app_id, profile_id),
            status.endpoint_segment()
        );
        self.api
            .client()
            .post(self.api.cancel(), &endpoint, &json!({}), LockKey::Profile)
            .allow_no_content()
            .with_context(|| format!("Failed to set profile status to {}", status_name(status)))?;
        Ok(())
    }

    fn read_back(&self, state: &ProfileState) -> Result<ProfileState> {
        Resource::read(self, state)?
            .with_context(|| format!("profile {} disappeared while being written", state.name))
    }
}

impl Resource for ProfileResource {
    type State = ProfileState;

    fn type_name(&self) -> &'static str {
        "profile"
    }

    fn create(&self, plan: &ProfileState) -> Result<ProfileState> {
        let app_id = required("application_id", &plan.application_id)?;
        let body = profile_body(plan)?;
        let created: Profile = self.api.client().post_json(
            self.api.cancel(),
            &format!("apps/{app_id}/paps"),
            &body,
            LockKey::Profile,
        )?;
        log::info!("Created profile {} ({})", created.name, created.id);

        if created.status != body.status {
            self.set_status(app_id, &created.id, body.status)?;
        }
        let state = ProfileState {
            id: Value::Known(created.id),
            ..plan.clone()
        };
        self.read_back(&state)
    }

    fn read(&self, prior: &ProfileState) -> Result<Option<ProfileState>> {
        let id = known("profile id", &prior.id)?;
        let profile = self
            .fetch(&prior.application_id, id)
            .not_found_as_none()?;
        Ok(profile.map(|profile| from_server(profile, prior)))
    }

    fn update(&self, plan: &ProfileState, prior: &ProfileState) -> Result<ProfileState> {
        let id = known("profile id", &prior.id)?;
        let app_id = required("application_id", &plan.application_id)?;
        let mut body = profile_body(plan)?;

        // Prioritization is owned by the policy_prioritization resource.
        let current = self.fetch(app_id, id)?;
        body.policy_priority_enabled = current.policy_priority_enabled;

        self.api
            .client()
            .patch(self.api.cancel(), &Self::path(app_id, id), &body, LockKey::Profile)
            .allow_no_content()?;
        if current.status != body.status {
            self.set_status(app_id, id, body.status)?;
        }

        let state = ProfileState {
            id: prior.id.clone(),
            ..plan.clone()
        };
        self.read_back(&state)
    }

    fn delete(&self, prior: &ProfileState) -> Result<()> {
        let id = known("profile id", &prior.id)?;
        deleted(self.api.client().delete(
            self.api.cancel(),
            &Self::path(&prior.application_id, id),
            LockKey::Profile,
        ))
    }

    /// Accepts ids or names for both the application and the profile.
    fn import(&self, id: &str) -> Result<ProfileState> {
        let fields = ImportFormats::new(formats::PROFILE)?.parse(id)?;
        let app = fields.get("app")?;
        let profile = fields.get("profile")?;

        let (app_id, profile_id) = match self.fetch(app, profile).not_found_as_none()? {
            Some(found) => (app.to_string(), found.id),
            None => {
                let cancel = self.api.cancel();
                let app_id = self.api.client().application_by_name(cancel, app)?.id;
                let profile_id = self.api.client().profile_by_name(cancel, &app_id, profile)?.id;
                (app_id, profile_id)
            }
        };
        Ok(ProfileState {
            id: Value::Known(profile_id),
            application_id: app_id,
            ..ProfileState::default()
        })
    }

    fn needs_update(&self, plan: &ProfileState, state: &ProfileState) -> Result<bool> {
        if plan.name != state.name
            || !durations_equal(&plan.expiration_duration, &state.expiration_duration)
        {
            return Ok(true);
        }
        if let Some(status) = plan.status.non_empty()
            && !state.status.non_empty().is_some_and(|s| s.eq_ignore_ascii_case(status))
        {
            return Ok(true);
        }
        if let Some(associations) = plan.associations.known()
            && Some(sorted(associations)) != state.associations.known().map(|a| sorted(a))
        {
            return Ok(true);
        }
        let optional_changed = |plan: &Value<String>, state: &Value<String>| {
            plan.known().is_some_and(|p| Some(p) != state.known())
        };
        Ok(optional_changed(&plan.description, &state.description)
            || optional_changed(&plan.extension_policy_id, &state.extension_policy_id)
            || optional_changed(&plan.destination_url, &state.destination_url)
            || plan
                .extendable
                .known()
                .is_some_and(|e| Some(e) != state.extendable.known()))
    }

    fn requires_replace(&self, plan: &ProfileState, state: &ProfileState) -> Result<bool> {
        Ok(plan.application_id != state.application_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing;
    use pamclient::transport::Method;

    fn plan() -> ProfileState {
        ProfileState {
            application_id: "a".into(),
            name: "p".into(),
            expiration_duration: "2h30m".into(),
            extendable: Value::Known(false),
            associations: Value::Known(vec![ProfileAssociation {
                association_type: "Environment".into(),
                value: "e1".into(),
                parent_name: None,
            }]),
            ..ProfileState::default()
        }
    }

    fn served(status: &str) -> serde_json::Value {
        json!({
            "id": "p1",
            "name": "p",
            "status": status,
            "associations": [{"type": "ENVIRONMENT", "id": "e1"}],
            "expirationDuration": 9_000_000,
            "extendable": false,
            "policyPriorityEnabled": true
        })
    }

    #[test]
    fn test_create_sends_milliseconds_and_reads_canonical_duration() {
        let (api, mock) = testing::api();
        mock.respond_json(Method::Post, "/apps/a/paps", 201, &served("ACTIVE"));
        mock.respond_json(Method::Get, "/apps/a/paps/p1", 200, &served("ACTIVE"));
        let resource = ProfileResource::new(api);

        let state = resource.create(&plan()).unwrap();

        let body = mock.requests_to(Method::Post, "/apps/a/paps")[0].json().unwrap();
        assert_eq!(body["expirationDuration"], 9_000_000);
        assert_eq!(body["associations"][0]["type"], "ENVIRONMENT");
        assert_eq!(state.expiration_duration, "2h30m0s");
        assert_eq!(state.id, Value::Known("p1".to_string()));
        assert!(!resource.needs_update(&plan(), &state).unwrap());
        assert!(mock.requests_to(Method::Post, "statuses").is_empty());
    }

    #[test]
    fn test_inactive_profile_disabled_after_create() {
        let (api, mock) = testing::api();
        mock.respond_json(Method::Post, "/apps/a/paps", 201, &served("ACTIVE"));
        mock.respond(Method::Post, "/apps/a/paps/p1/disabled-statuses", 204, "");
        mock.respond_json(Method::Get, "/apps/a/paps/p1", 200, &served("INACTIVE"));
        let mut plan = plan();
        plan.status = Value::Known("Inactive".into());

        let state = ProfileResource::new(api).create(&plan).unwrap();

        assert_eq!(state.status, Value::Known("inactive".to_string()));
        assert_eq!(mock.requests_to(Method::Post, "/disabled-statuses").len(), 1);
    }

    #[test]
    fn test_update_keeps_server_priority_flag() {
        let (api, mock) = testing::api();
        mock.respond_json(Method::Get, "/apps/a/paps/p1", 200, &served("ACTIVE"));
        mock.respond(Method::Patch, "/apps/a/paps/p1", 204, "");
        let prior = ProfileState {
            id: Value::Known("p1".into()),
            expiration_duration: "1h".into(),
            ..plan()
        };

        ProfileResource::new(api).update(&plan(), &prior).unwrap();

        let body = mock.requests_to(Method::Patch, "/apps/a/paps/p1")[0].json().unwrap();
        assert_eq!(body["policyPriorityEnabled"], true);
        assert_eq!(body["expirationDuration"], 9_000_000);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let mut bad = plan();
        bad.expiration_duration = "soon".into();
        assert!(profile_body(&bad).is_err());

        let mut bad = plan();
        bad.associations = Value::Known(vec![ProfileAssociation {
            association_type: "application_resource".into(),
            value: "r1".into(),
            parent_name: None,
        }]);
        assert!(profile_body(&bad).is_err());

        let mut bad = plan();
        bad.status = Value::Known("paused".into());
        assert!(profile_body(&bad).is_err());
    }

    #[test]
    fn test_import_falls_back_to_names() {
        let (api, mock) = testing::api();
        mock.respond(Method::Get, "/apps/crm/paps/ops", 404, "");
        mock.respond_json(
            Method::Get,
            "/apps?page=0&size=10&filter=name%20eq%20%22crm%22",
            200,
            &testing::page(json!([{"id": "a1", "name": "crm", "type": "GENERIC", "version": "1"}])),
        );
        mock.respond_json(
            Method::Get,
            "/apps/a1/paps?page=0&size=10&filter=name%20eq%20%22ops%22",
            200,
            &testing::page(json!([{"id": "p9", "name": "ops"}])),
        );

        let state = ProfileResource::new(api).import("crm/ops").unwrap();
        assert_eq!(state.application_id, "a1");
        assert_eq!(state.id, Value::Known("p9".to_string()));
    }

    #[test]
    fn test_association_order_is_not_drift() {
        let (api, _) = testing::api();
        let resource = ProfileResource::new(api);
        let a = |v: &str| ProfileAssociation {
            association_type: "environment".into(),
            value: v.into(),
            parent_name: None,
        };
        let mut configured = plan();
        configured.associations = Value::Known(vec![a("e1"), a("e2")]);
        let mut state = plan();
        state.associations = Value::Known(vec![a("e2"), a("e1")]);
        state.expiration_duration = "2h30m0s".into();
        assert!(!resource.needs_update(&configured, &state).unwrap());
    }
}
