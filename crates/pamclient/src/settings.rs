//! Advanced settings routing.
//!
//! Settings attach to five kinds of entity, each with its own endpoint and
//! verb. Policy-scoped settings are not a separate collection: they travel
//! inside a PATCH of the policy itself, addressed by the trailing
//! `{profileId}/policies/{policyId}` of the entity id.

use crate::cancel::CancelToken;
use crate::client::Client;
use crate::error::{AllowNoContent, Error, Result};
use crate::lock::LockKey;
use crate::models::{AdvancedSettings, Policy, SettingsEnvelope};
use resourceid::PolicyTail;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Application,
    Profile,
    ProfilePolicy,
    ResourceManagerProfile,
    ResourceManagerProfilePolicy,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Application,
        EntityKind::Profile,
        EntityKind::ProfilePolicy,
        EntityKind::ResourceManagerProfile,
        EntityKind::ResourceManagerProfilePolicy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Application => "application",
            EntityKind::Profile => "profile",
            EntityKind::ProfilePolicy => "profile_policy",
            EntityKind::ResourceManagerProfile => "resource_manager_profile",
            EntityKind::ResourceManagerProfilePolicy => "resource_manager_profile_policy",
        }
    }

    fn lock_key(self) -> LockKey {
        match self {
            EntityKind::ProfilePolicy => LockKey::Policy,
            EntityKind::ResourceManagerProfilePolicy => LockKey::ResourceManagerProfilePolicy,
            _ => LockKey::AdvancedSetting,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                let expected: Vec<&str> = EntityKind::ALL.iter().map(|k| k.as_str()).collect();
                Error::NotSupported(format!(
                    "advanced settings for resource type {s:?}; expected one of {}",
                    expected.join(", ")
                ))
            })
    }
}

/// Where a settings write goes and how.
enum Route {
    /// Dedicated settings collection.
    Collection { endpoint: String, always_put: bool },
    /// Embedded in the policy body.
    Policy { endpoint: String },
}

fn route(kind: EntityKind, entity_id: &str) -> Result<Route> {
    resourceid::require_non_empty("resource id", entity_id)?;
    Ok(match kind {
        EntityKind::Application => Route::Collection {
            endpoint: format!("apps/{entity_id}/advanced-settings"),
            always_put: false,
        },
        EntityKind::Profile => Route::Collection {
            endpoint: format!("paps/{entity_id}/advanced-settings"),
            always_put: true,
        },
        EntityKind::ResourceManagerProfile => Route::Collection {
            endpoint: format!("resource-manager/profile/{entity_id}/advanced-settings"),
            always_put: false,
        },
        EntityKind::ProfilePolicy => {
            let tail: PolicyTail = entity_id.parse()?;
            Route::Policy {
                endpoint: format!("paps/{}/policies/{}", tail.profile_id, tail.policy_id),
            }
        }
        EntityKind::ResourceManagerProfilePolicy => {
            let tail: PolicyTail = entity_id.parse()?;
            Route::Policy {
                endpoint: format!(
                    "resource-manager/profiles/{}/policies/{}",
                    tail.profile_id, tail.policy_id
                ),
            }
        }
    })
}

impl Client {
    /// Write the settings of one entity.
    ///
    /// `resource_type` must name one of the [`EntityKind`]s; anything else
    /// fails with [`Error::NotSupported`] before any request is made.
    pub fn write_advanced_settings(
        &self,
        cancel: &CancelToken,
        entity_id: &str,
        resource_type: &str,
        settings: &AdvancedSettings,
        is_update: bool,
    ) -> Result<()> {
        let kind: EntityKind = resource_type.parse()?;
        let body = SettingsEnvelope {
            settings: settings.to_settings(),
        };
        match route(kind, entity_id)? {
            Route::Collection {
                endpoint,
                always_put,
            } => {
                if always_put || is_update {
                    self.put(cancel, &endpoint, &body, kind.lock_key())
                } else {
                    self.post(cancel, &endpoint, &body, kind.lock_key())
                }
            }
            Route::Policy { endpoint } => self.patch(cancel, &endpoint, &body, kind.lock_key()),
        }
        .allow_no_content()?;
        Ok(())
    }

    /// Read the settings an entity owns, inherited records excluded.
    pub fn read_advanced_settings(
        &self,
        cancel: &CancelToken,
        entity_id: &str,
        resource_type: &str,
    ) -> Result<AdvancedSettings> {
        let kind: EntityKind = resource_type.parse()?;
        let settings = match route(kind, entity_id)? {
            Route::Collection { endpoint, .. } => {
                let envelope: SettingsEnvelope = self.get_json(cancel, &endpoint, kind.lock_key())?;
                envelope.settings
            }
            Route::Policy { endpoint } => {
                let policy: Policy = self.get_json(cancel, &endpoint, kind.lock_key())?;
                policy.settings
            }
        };
        Ok(AdvancedSettings::from_settings(settings))
    }

    /// Clear the settings of an entity.
    pub fn delete_advanced_settings(
        &self,
        cancel: &CancelToken,
        entity_id: &str,
        resource_type: &str,
    ) -> Result<()> {
        self.write_advanced_settings(
            cancel,
            entity_id,
            resource_type,
            &AdvancedSettings::default(),
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Justification;
    use crate::transport::{Method, MockExecutor};
    use serde_json::json;

    fn justification() -> AdvancedSettings {
        AdvancedSettings {
            justification: Some(Justification {
                required: true,
                regex: Some("^CHG[0-9]+$".to_string()),
                is_inherited: false,
            }),
            ..AdvancedSettings::default()
        }
    }

    fn client(mock: &MockExecutor) -> Client {
        Client::with_executor("https://t.example", "tok", mock.clone())
    }

    #[test]
    fn test_unknown_resource_type_not_supported() {
        let mock = MockExecutor::new();
        let client = client(&mock);
        for resource_type in ["tag", "", "Application", "resource_policy"] {
            let err = client
                .write_advanced_settings(&CancelToken::new(), "a1", resource_type, &justification(), false)
                .unwrap_err();
            assert_eq!(err.category(), crate::ErrorCategory::NotSupported);
            let err = client
                .read_advanced_settings(&CancelToken::new(), "a1", resource_type)
                .unwrap_err();
            assert_eq!(err.category(), crate::ErrorCategory::NotSupported);
        }
        assert!(mock.requests().is_empty());
    }

    #[test]
    fn test_dispatch_table() {
        let mock = MockExecutor::new();
        mock.respond(Method::Post, "/apps/a1/advanced-settings", 201, "{}");
        mock.respond(Method::Put, "/apps/a1/advanced-settings", 204, "");
        mock.respond(Method::Put, "/paps/p1/advanced-settings", 200, "{}");
        mock.respond(Method::Patch, "/paps/p1/policies/x1", 200, "{}");
        mock.respond(Method::Post, "/resource-manager/profile/r1/advanced-settings", 201, "{}");
        mock.respond(Method::Put, "/resource-manager/profile/r1/advanced-settings", 200, "{}");
        mock.respond(Method::Patch, "/resource-manager/profiles/r1/policies/y1", 200, "{}");
        let client = client(&mock);
        let cancel = CancelToken::new();
        let settings = justification();

        client.write_advanced_settings(&cancel, "a1", "application", &settings, false).unwrap();
        client.write_advanced_settings(&cancel, "a1", "application", &settings, true).unwrap();
        client.write_advanced_settings(&cancel, "p1", "profile", &settings, false).unwrap();
        client
            .write_advanced_settings(&cancel, "paps/p1/policies/x1", "profile_policy", &settings, false)
            .unwrap();
        client
            .write_advanced_settings(&cancel, "r1", "resource_manager_profile", &settings, false)
            .unwrap();
        client
            .write_advanced_settings(&cancel, "r1", "resource_manager_profile", &settings, true)
            .unwrap();
        client
            .write_advanced_settings(
                &cancel,
                "resource-manager/profiles/r1/policies/y1",
                "resource_manager_profile_policy",
                &settings,
                true,
            )
            .unwrap();

        let calls: Vec<(Method, String)> = mock
            .requests()
            .into_iter()
            .map(|r| (r.method, r.url.trim_start_matches("https://t.example/").to_string()))
            .collect();
        assert_eq!(
            calls,
            vec![
                (Method::Post, "apps/a1/advanced-settings".to_string()),
                (Method::Put, "apps/a1/advanced-settings".to_string()),
                (Method::Put, "paps/p1/advanced-settings".to_string()),
                (Method::Patch, "paps/p1/policies/x1".to_string()),
                (Method::Post, "resource-manager/profile/r1/advanced-settings".to_string()),
                (Method::Put, "resource-manager/profile/r1/advanced-settings".to_string()),
                (Method::Patch, "resource-manager/profiles/r1/policies/y1".to_string()),
            ]
        );
        assert_eq!(
            mock.requests()[0].json().unwrap(),
            json!({"settings": [{"type": "JUSTIFICATION", "required": true, "regex": "^CHG[0-9]+$"}]})
        );
    }

    #[test]
    fn test_policy_id_must_have_policy_tail() {
        let mock = MockExecutor::new();
        let client = client(&mock);
        let err = client
            .write_advanced_settings(&CancelToken::new(), "x1", "profile_policy", &justification(), false)
            .unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::InvalidId);
    }

    #[test]
    fn test_read_filters_inherited() {
        let mock = MockExecutor::new();
        mock.respond_json(
            Method::Get,
            "/paps/p1/policies/x1",
            200,
            &json!({
                "id": "x1",
                "name": "night",
                "settings": [
                    {"type": "JUSTIFICATION", "required": true, "isInherited": true},
                    {"type": "ITSM", "connectionId": "c1", "connectionType": "SERVICENOW",
                     "filterCriteria": [{"name": "priority", "filter": {"eq": 1}}]}
                ]
            }),
        );
        let client = client(&mock);

        let settings = client
            .read_advanced_settings(&CancelToken::new(), "paps/p1/policies/x1", "profile_policy")
            .unwrap();
        assert!(settings.justification.is_none());
        assert_eq!(settings.itsm.unwrap().filter_criteria[0].name, "priority");
    }

    #[test]
    fn test_delete_writes_empty_set() {
        let mock = MockExecutor::new();
        mock.respond(Method::Put, "/paps/p1/advanced-settings", 204, "");
        let client = client(&mock);

        client
            .delete_advanced_settings(&CancelToken::new(), "p1", "profile")
            .unwrap();
        assert_eq!(mock.requests()[0].json().unwrap(), json!({"settings": []}));
    }
}
