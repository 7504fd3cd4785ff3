//! Managed entity types
//!
//! Every entity kind of the tenant is a [`declarative::Resource`] with:
//! - A typed state whose attributes mirror the manifest `config` table
//! - Create/Read/Update/Delete/Import verbs mapped onto tenant endpoints
//! - Drift rules deciding when the server's spelling counts as a change

use anyhow::{Context, Result, anyhow};
use declarative::{Registry, Value};
use pamclient::{CancelToken, Client};
use std::sync::Arc;

pub mod advanced_settings;
pub mod application;
pub mod constraint;
pub mod environment;
pub mod policy_prioritization;
pub mod profile;
pub mod profile_permission;
pub mod profile_policy;
pub mod resource_manager_profile;
pub mod tag_member;

/// Tenant client and cancellation shared by every resource of one run
#[derive(Clone)]
pub struct Api {
    client: Arc<Client>,
    cancel: CancelToken,
}

impl Api {
    pub fn new(client: Client, cancel: CancelToken) -> Self {
        Self {
            client: Arc::new(client),
            cancel,
        }
    }

    /// Api for type metadata only; every request fails as cancelled.
    pub fn offline() -> Self {
        let cancel = CancelToken::new();
        cancel.cancel();
        Self::new(Client::new("http://offline.invalid", ""), cancel)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn cancel(&self) -> &CancelToken {
        &self.cancel
    }
}

/// Every managed resource type, bound to one tenant
pub fn registry(api: &Api) -> Registry {
    let mut registry = Registry::new();
    registry.register(application::ApplicationResource::new(api.clone()));
    registry.register(environment::EnvironmentResource::environment(api.clone()));
    registry.register(environment::EnvironmentResource::group(api.clone()));
    registry.register(profile::ProfileResource::new(api.clone()));
    registry.register(profile_permission::ProfilePermissionResource::new(api.clone()));
    registry.register(constraint::ConstraintResource::new(api.clone()));
    registry.register(profile_policy::ProfilePolicyResource::new(api.clone()));
    registry.register(policy_prioritization::PolicyPrioritizationResource::new(api.clone()));
    registry.register(advanced_settings::AdvancedSettingsResource::new(api.clone()));
    registry.register(resource_manager_profile::ResourceManagerProfileResource::new(api.clone()));
    registry.register(tag_member::TagMemberResource::new(api.clone()));
    registry
}

/// A user-visible field that must not be blank
pub(crate) fn required<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    Ok(resourceid::require_non_empty(field, value)?)
}

/// A computed attribute that must be known by now
pub(crate) fn known<'a>(field: &str, value: &'a Value<String>) -> Result<&'a str> {
    value
        .non_empty()
        .ok_or_else(|| anyhow!("{field} is not known; is the entity in state?"))
}

/// A delete succeeded if the entity is gone, whatever the status
pub(crate) fn deleted(result: pamclient::Result<Vec<u8>>) -> Result<()> {
    match result {
        Ok(_) | Err(pamclient::Error::NoContent) => Ok(()),
        Err(e) if e.is_not_found() => {
            log::debug!("already gone: {e}");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Like [`deleted`], for removals that went through `.context(..)`
pub(crate) fn removed(result: Result<()>) -> Result<()> {
    match result {
        Err(e)
            if e.downcast_ref::<pamclient::Error>()
                .is_some_and(pamclient::Error::is_not_found) =>
        {
            log::debug!("already gone: {e:#}");
            Ok(())
        }
        other => other,
    }
}

/// Parse a configured JSON-document attribute
pub(crate) fn json_attr(field: &str, value: &str) -> Result<serde_json::Value> {
    if value.trim().is_empty() {
        return Ok(serde_json::Value::Null);
    }
    serde_json::from_str(value).with_context(|| format!("{field} must be a JSON document"))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Api;
    use pamclient::transport::MockExecutor;
    use pamclient::{CancelToken, Client};
    use serde_json::json;

    pub fn api() -> (Api, MockExecutor) {
        let mock = MockExecutor::new();
        let client = Client::with_executor("https://t.example", "tok", mock.clone());
        (Api::new(client, CancelToken::new()), mock)
    }

    /// Paginated list envelope
    pub fn page(data: serde_json::Value) -> serde_json::Value {
        let count = data.as_array().map_or(0, Vec::len);
        json!({"count": count, "page": 0, "size": 100, "data": data})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_has_every_type() {
        let (api, _) = testing::api();
        let registry = registry(&api);
        let mut names: Vec<_> = registry.type_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "advanced_settings",
                "application",
                "constraint",
                "environment",
                "environment_group",
                "policy_prioritization",
                "profile",
                "profile_permission",
                "profile_policy",
                "resource_manager_profile",
                "tag_member",
            ]
        );
    }

    #[test]
    fn test_deleted_tolerates_missing() {
        assert!(deleted(Err(pamclient::Error::NotFound("x".into()))).is_ok());
        assert!(deleted(Err(pamclient::Error::NoContent)).is_ok());
        assert!(deleted(Err(pamclient::Error::Cancelled)).is_err());

        let wrapped = Err::<(), _>(anyhow::Error::new(pamclient::Error::NotFound("x".into())))
            .context("Failed to remove");
        assert!(removed(wrapped).is_ok());
        assert!(removed(Err(anyhow!("boom"))).is_err());
    }

    #[test]
    fn test_json_attr() {
        assert!(json_attr("members", "").unwrap().is_null());
        assert_eq!(json_attr("members", r#"{"a":1}"#).unwrap()["a"], 1);
        assert!(json_attr("members", "{").is_err());
    }
}
