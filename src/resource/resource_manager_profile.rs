//! Resource-manager profiles and their label associations

use super::{Api, deleted, known, required};
use anyhow::{Context, Result};
use declarative::{Resource, Value};
use drift::semantic::{resource_labels_map_equal, split_label_values};
use pamclient::models::{LabelAssociation, LabelAssociations, ResourceManagerProfile};
use pamclient::{AllowNoContent, LockKey, NotFoundAsNone};
use resourceid::{ImportFormats, ResourceManagerProfileId, formats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceManagerProfileState {
    /// `resource-manager/profile/{profileId}`
    #[serde(default)]
    pub id: Value<String>,
    #[serde(default)]
    pub profile_id: Value<String>,
    pub name: String,
    #[serde(default)]
    pub description: Value<String>,
    /// Label name to comma-separated values
    #[serde(default)]
    pub associations: Value<BTreeMap<String, String>>,
}

pub struct ResourceManagerProfileResource {
    api: Api,
}

fn label_associations(plan: &ResourceManagerProfileState) -> LabelAssociations {
    let associations = plan
        .associations
        .known()
        .map(|labels| {
            labels
                .iter()
                .map(|(label, values)| LabelAssociation {
                    label: label.clone(),
                    values: split_label_values(values),
                })
                .collect()
        })
        .unwrap_or_default();
    LabelAssociations { associations }
}

fn from_server(profile: ResourceManagerProfile, prior: &ResourceManagerProfileState) -> ResourceManagerProfileState {
    let served: BTreeMap<String, String> = profile
        .associations
        .into_iter()
        .map(|a| (a.label, a.values.join(",")))
        .collect();
    let associations = match prior.associations.known() {
        Some(configured) if resource_labels_map_equal(&served, configured) => {
            Value::Known(configured.clone())
        }
        None if served.is_empty() => Value::Null,
        _ => Value::Known(served),
    };
    let description = if profile.description.is_empty() && !prior.description.is_known() {
        Value::Null
    } else {
        Value::Known(profile.description)
    };
    ResourceManagerProfileState {
        id: Value::Known(
            ResourceManagerProfileId {
                profile_id: profile.id.clone(),
            }
            .to_string(),
        ),
        profile_id: Value::Known(profile.id),
        name: profile.name,
        description,
        associations,
    }
}

impl ResourceManagerProfileResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn body(plan: &ResourceManagerProfileState) -> Result<ResourceManagerProfile> {
        Ok(ResourceManagerProfile {
            name: required("name", &plan.name)?.to_string(),
            description: plan.description.known().cloned().unwrap_or_default(),
            ..ResourceManagerProfile::default()
        })
    }

    fn associate(&self, profile_id: &str, plan: &ResourceManagerProfileState) -> Result<()> {
        self.api
            .client()
            .post(
                self.api.cancel(),
                &format!("resource-manager/profile/{profile_id}/associations"),
                &label_associations(plan),
                LockKey::ResourceManagerProfile,
            )
            .allow_no_content()
            .with_context(|| format!("Failed to associate labels with resource-manager profile {profile_id}"))?;
        Ok(())
    }

    fn read_back(&self, state: &ResourceManagerProfileState) -> Result<ResourceManagerProfileState> {
        Resource::read(self, state)?
            .with_context(|| format!("resource-manager profile {} disappeared while being written", state.name))
    }
}

impl Resource for ResourceManagerProfileResource {
    type State = ResourceManagerProfileState;

    fn type_name(&self) -> &'static str {
        "resource_manager_profile"
    }

    /// A profile whose labels cannot be attached is deleted again.
    fn create(&self, plan: &ResourceManagerProfileState) -> Result<ResourceManagerProfileState> {
        let created: ResourceManagerProfile = self.api.client().post_json(
            self.api.cancel(),
            "resource-manager/profile",
            &Self::body(plan)?,
            LockKey::ResourceManagerProfile,
        )?;
        log::info!("Created resource-manager profile {} ({})", created.name, created.id);

        if plan.associations.is_known() {
            if let Err(e) = self.associate(&created.id, plan) {
                log::warn!("Rolling back resource-manager profile {}", created.id);
                if let Err(rollback) = deleted(self.api.client().delete(
                    self.api.cancel(),
                    &format!("resource-manager/profile/{}", created.id),
                    LockKey::ResourceManagerProfile,
                )) {
                    log::error!("Rollback of resource-manager profile {} failed: {rollback:#}", created.id);
                }
                return Err(e);
            }
        }

        let state = ResourceManagerProfileState {
            profile_id: Value::Known(created.id),
            ..plan.clone()
        };
        self.read_back(&state)
    }

    fn read(&self, prior: &ResourceManagerProfileState) -> Result<Option<ResourceManagerProfileState>> {
        let profile_id = known("profile id", &prior.profile_id)?;
        let profile: Option<ResourceManagerProfile> = self
            .api
            .client()
            .get_json(
                self.api.cancel(),
                &format!("resource-manager/profile/{profile_id}"),
                LockKey::ResourceManagerProfile,
            )
            .not_found_as_none()?;
        Ok(profile.map(|profile| from_server(profile, prior)))
    }

    fn update(&self, plan: &ResourceManagerProfileState, prior: &ResourceManagerProfileState) -> Result<ResourceManagerProfileState> {
        let profile_id = known("profile id", &prior.profile_id)?;
        self.api
            .client()
            .patch(
                self.api.cancel(),
                &format!("resource-manager/profile/{profile_id}"),
                &Self::body(plan)?,
                LockKey::ResourceManagerProfile,
            )
            .allow_no_content()?;
        if plan.associations.is_known() {
            self.associate(profile_id, plan)?;
        }
        let state = ResourceManagerProfileState {
            profile_id: prior.profile_id.clone(),
            ..plan.clone()
        };
        self.read_back(&state)
    }

    fn delete(&self, prior: &ResourceManagerProfileState) -> Result<()> {
        let profile_id = known("profile id", &prior.profile_id)?;
        deleted(self.api.client().delete(
            self.api.cancel(),
            &format!("resource-manager/profile/{profile_id}"),
            LockKey::ResourceManagerProfile,
        ))
    }

    fn import(&self, id: &str) -> Result<ResourceManagerProfileState> {
        let fields = ImportFormats::new(formats::RESOURCE_MANAGER_PROFILE)?.parse(id)?;
        Ok(ResourceManagerProfileState {
            profile_id: Value::Known(fields.get("profile")?.to_string()),
            ..ResourceManagerProfileState::default()
        })
    }

    fn needs_update(&self, plan: &ResourceManagerProfileState, state: &ResourceManagerProfileState) -> Result<bool> {
        if plan.name != state.name {
            return Ok(true);
        }
        if let Some(description) = plan.description.known() {
            if state.description.known() != Some(description) {
                return Ok(true);
            }
        }
        Ok(match (plan.associations.known(), state.associations.known()) {
            (Some(planned), Some(current)) => !resource_labels_map_equal(current, planned),
            (Some(planned), None) => !planned.is_empty(),
            (None, _) => false,
        })
    }
}
