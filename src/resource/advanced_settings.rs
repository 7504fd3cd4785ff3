//! Justification, ITSM and instant-messaging settings of an entity

use super::{Api, json_attr, required};
use anyhow::{Context, Result};
use declarative::{Resource, Value};
use drift::semantic::{array_of_maps_equal, condition_equal, keep_configured};
use pamclient::models::{AdvancedSettings, FilterCriterion, InstantMessaging, Itsm, Justification};
use pamclient::{EntityKind, NotFoundAsNone};
use resourceid::{AdvancedSettingsId, ImportFormats, formats};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JustificationBlock {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterBlock {
    pub name: String,
    /// JSON document
    pub filter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItsmBlock {
    pub connection_id: String,
    pub connection_type: String,
    #[serde(default)]
    pub filters: Vec<FilterBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImBlock {
    pub connection_id: String,
    pub connection_type: String,
    #[serde(default)]
    pub auto_approval: bool,
    /// JSON array of escalation policies
    #[serde(default)]
    pub escalation_policies: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdvancedSettingsState {
    /// `{resourceType}/{resourceId}/advanced-settings`
    #[serde(default)]
    pub id: Value<String>,
    pub resource_id: String,
    /// `application`, `profile`, `profile_policy`, `resource_manager_profile`
    /// or `resource_manager_profile_policy`
    pub resource_type: String,
    #[serde(default)]
    pub justification: Value<JustificationBlock>,
    #[serde(default)]
    pub itsm: Value<ItsmBlock>,
    #[serde(default)]
    pub im: Value<ImBlock>,
}

pub struct AdvancedSettingsResource {
    api: Api,
}

fn to_settings(plan: &AdvancedSettingsState) -> Result<AdvancedSettings> {
    let justification = plan.justification.known().map(|j| Justification {
        required: j.required,
        regex: j.regex.clone().filter(|r| !r.is_empty()),
        ..Justification::default()
    });
    let itsm = match plan.itsm.known() {
        Some(itsm) => Some(Itsm {
            connection_id: required("itsm.connection_id", &itsm.connection_id)?.to_string(),
            connection_type: required("itsm.connection_type", &itsm.connection_type)?.to_string(),
            filter_criteria: itsm
                .filters
                .iter()
                .map(|f| {
                    Ok(FilterCriterion {
                        name: f.name.clone(),
                        filter: json_attr("itsm.filters.filter", &f.filter)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            ..Itsm::default()
        }),
        None => None,
    };
    let im = match plan.im.known() {
        Some(im) => Some(InstantMessaging {
            connection_id: required("im.connection_id", &im.connection_id)?.to_string(),
            connection_type: required("im.connection_type", &im.connection_type)?.to_string(),
            auto_approval: im.auto_approval,
            escalation_policies: json_attr("im.escalation_policies", &im.escalation_policies)?,
            ..InstantMessaging::default()
        }),
        None => None,
    };
    Ok(AdvancedSettings {
        justification,
        itsm,
        im,
    })
}

fn json_text(value: &serde_json::Value) -> String {
    if value.is_null() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Map server settings onto state, keeping configured JSON spellings
fn from_server(settings: AdvancedSettings, prior: &AdvancedSettingsState) -> AdvancedSettingsState {
    let justification = settings.justification.map(|j| JustificationBlock {
        required: j.required,
        regex: j.regex,
    });

    let itsm = settings.itsm.map(|itsm| {
        let configured = prior.itsm.known().map(|b| b.filters.as_slice()).unwrap_or_default();
        ItsmBlock {
            connection_id: itsm.connection_id,
            connection_type: itsm.connection_type,
            filters: itsm
                .filter_criteria
                .iter()
                .map(|f| {
                    let previous = configured.iter().find(|c| c.name == f.name);
                    FilterBlock {
                        name: f.name.clone(),
                        filter: keep_configured(
                            "itsm.filters.filter",
                            previous.map(|c| c.filter.as_str()),
                            &json_text(&f.filter),
                            condition_equal,
                        ),
                    }
                })
                .collect(),
        }
    });

    let im = settings.im.map(|im| ImBlock {
        escalation_policies: keep_configured(
            "im.escalation_policies",
            prior.im.known().map(|b| b.escalation_policies.as_str()),
            &json_text(&im.escalation_policies),
            array_of_maps_equal,
        ),
        connection_id: im.connection_id,
        connection_type: im.connection_type,
        auto_approval: im.auto_approval,
    });

    AdvancedSettingsState {
        justification: justification.into(),
        itsm: itsm.into(),
        im: im.into(),
        ..prior.clone()
    }
}

impl AdvancedSettingsResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn write(&self, plan: &AdvancedSettingsState, is_update: bool) -> Result<AdvancedSettingsState> {
        let resource_id = required("resource_id", &plan.resource_id)?;
        let kind: EntityKind = plan.resource_type.parse()?;
        let settings = to_settings(plan)?;
        self.api
            .client()
            .write_advanced_settings(
                self.api.cancel(),
                resource_id,
                kind.as_str(),
                &settings,
                is_update,
            )
            .with_context(|| format!("Failed to write advanced settings of {kind} {resource_id}"))?;

        let state = AdvancedSettingsState {
            id: Value::Known(AdvancedSettingsId::new(kind.as_str(), resource_id).to_string()),
            ..plan.clone()
        };
        Resource::read(self, &state)?
            .with_context(|| format!("{kind} {resource_id} disappeared while its settings were written"))
    }
}

impl Resource for AdvancedSettingsResource {
    type State = AdvancedSettingsState;

    fn type_name(&self) -> &'static str {
        "advanced_settings"
    }

    fn create(&self, plan: &AdvancedSettingsState) -> Result<AdvancedSettingsState> {
        self.write(plan, false)
    }

    fn read(&self, prior: &AdvancedSettingsState) -> Result<Option<AdvancedSettingsState>> {
        let settings = self
            .api
            .client()
            .read_advanced_settings(self.api.cancel(), &prior.resource_id, &prior.resource_type)
            .not_found_as_none()?;
        Ok(settings.map(|settings| from_server(settings, prior)))
    }

    fn update(&self, plan: &AdvancedSettingsState, _prior: &AdvancedSettingsState) -> Result<AdvancedSettingsState> {
        self.write(plan, true)
    }

    fn delete(&self, prior: &AdvancedSettingsState) -> Result<()> {
        match self.api.client().delete_advanced_settings(
            self.api.cancel(),
            &prior.resource_id,
            &prior.resource_type,
        ) {
            Err(e) if e.is_not_found() => Ok(()),
            other => Ok(other?),
        }
    }

    fn import(&self, id: &str) -> Result<AdvancedSettingsState> {
        let fields = ImportFormats::new(formats::ADVANCED_SETTINGS)?.parse(id)?;
        let kind: EntityKind = fields.get("type")?.parse()?;
        let resource_id = fields.get("id")?;
        Ok(AdvancedSettingsState {
            id: Value::Known(AdvancedSettingsId::new(kind.as_str(), resource_id).to_string()),
            resource_id: resource_id.to_string(),
            resource_type: kind.as_str().to_string(),
            ..AdvancedSettingsState::default()
        })
    }

    fn requires_replace(&self, plan: &AdvancedSettingsState, state: &AdvancedSettingsState) -> Result<bool> {
        Ok(plan.resource_id != state.resource_id || plan.resource_type != state.resource_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing;
    use pamclient::transport::Method;
    use serde_json::json;

    fn plan(resource_type: &str, resource_id: &str) -> AdvancedSettingsState {
        AdvancedSettingsState {
            resource_id: resource_id.into(),
            resource_type: resource_type.into(),
            justification: Value::Known(JustificationBlock {
                required: true,
                regex: Some("^INC[0-9]+$".into()),
            }),
            im: Value::Known(ImBlock {
                connection_id: "c1".into(),
                connection_type: "slack".into(),
                auto_approval: false,
                escalation_policies: r#"[{"name": "oncall"}, {"name": "leads"}]"#.into(),
            }),
            ..AdvancedSettingsState::default()
        }
    }

    fn served() -> serde_json::Value {
        json!({"settings": [
            {"type": "JUSTIFICATION", "required": true, "regex": "^INC[0-9]+$"},
            {"type": "IM", "connectionId": "c1", "connectionType": "slack", "autoApproval": false,
             "escalationPolicies": [{"name": "leads"}, {"name": "oncall"}]},
            {"type": "ITSM", "connectionId": "parent", "connectionType": "jira", "isInherited": true}
        ]})
    }

    #[test]
    fn test_application_create_posts_then_reads() {
        let (api, mock) = testing::api();
        mock.respond(Method::Post, "/apps/a1/advanced-settings", 204, "");
        mock.respond_json(Method::Get, "/apps/a1/advanced-settings", 200, &served());
        let resource = AdvancedSettingsResource::new(api);
        let desired = plan("application", "a1");

        let state = resource.create(&desired).unwrap();

        assert_eq!(
            state.id,
            Value::Known("application/a1/advanced-settings".to_string())
        );
        assert_eq!(state.itsm, Value::Null);
        assert_eq!(state.im, desired.im);
        assert!(!resource.needs_update(&desired, &state).unwrap());

        let body = mock.requests_to(Method::Post, "advanced-settings")[0].json().unwrap();
        assert_eq!(body["settings"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_profile_policy_settings_patch_the_policy() {
        let (api, mock) = testing::api();
        mock.respond(Method::Patch, "/paps/p1/policies/x1", 204, "");
        mock.respond_json(
            Method::Get,
            "/paps/p1/policies/x1",
            200,
            &json!({"id": "x1", "name": "n", "settings": served()["settings"]}),
        );

        let state = AdvancedSettingsResource::new(api)
            .update(&plan("profile_policy", "paps/p1/policies/x1"), &AdvancedSettingsState::default())
            .unwrap();
        assert_eq!(
            state.id,
            Value::Known("profile_policy/paps/p1/policies/x1/advanced-settings".to_string())
        );
        assert_eq!(mock.requests_to(Method::Patch, "/policies/x1").len(), 1);
    }

    #[test]
    fn test_unknown_resource_type_rejected() {
        let (api, mock) = testing::api();
        let resource = AdvancedSettingsResource::new(api);
        let err = resource.create(&plan("tag", "t1")).unwrap_err();
        assert!(err.to_string().contains("not supported"));
        assert!(mock.requests().is_empty());
        assert!(resource.import("tag/t1/advanced-settings").is_err());
    }

    #[test]
    fn test_import_and_delete() {
        let (api, mock) = testing::api();
        mock.respond(Method::Put, "/paps/p1/advanced-settings", 204, "");
        let resource = AdvancedSettingsResource::new(api);

        let state = resource.import("profile/p1/advanced-settings").unwrap();
        assert_eq!(state.resource_type, "profile");
        resource.delete(&state).unwrap();
        let body = mock.requests_to(Method::Put, "/paps/p1/advanced-settings")[0].json().unwrap();
        assert_eq!(body, json!({"settings": []}));
    }

    #[test]
    fn test_bad_filter_json_rejected() {
        let mut desired = plan("profile", "p1");
        desired.itsm = Value::Known(ItsmBlock {
            connection_id: "c2".into(),
            connection_type: "servicenow".into(),
            filters: vec![FilterBlock {
                name: "category".into(),
                filter: "{oops".into(),
            }],
        });
        assert!(to_settings(&desired).is_err());
    }
}
