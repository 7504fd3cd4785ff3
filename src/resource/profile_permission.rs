//! Permissions bound to a profile. Bindings are added and removed, never edited.

use super::{Api, known, removed, required};
use anyhow::{Context, Result, bail};
use declarative::{Resource, Value};
use pamclient::models::ProfilePermission;
use pamclient::{AllowNoContent, LockKey, NotFoundAsNone};
use resourceid::{ImportFormats, ProfilePermissionId, formats};
use serde::{Deserialize, Serialize};

const PERMISSION_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilePermissionState {
    /// `paps/{profileId}/permissions/{name}/type/{type}`
    #[serde(default)]
    pub id: Value<String>,
    pub profile_id: String,
    pub permission_name: String,
    pub permission_type: String,
}

impl ProfilePermissionState {
    fn from_id(id: &ProfilePermissionId) -> Self {
        Self {
            id: Value::Known(id.to_string()),
            profile_id: id.profile_id.clone(),
            permission_name: id.permission_name.clone(),
            permission_type: id.permission_type.clone(),
        }
    }
}

pub struct ProfilePermissionResource {
    api: Api,
}

impl ProfilePermissionResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn change(&self, id: &ProfilePermissionId, operation: &str) -> Result<()> {
        let body = ProfilePermission {
            name: id.permission_name.clone(),
            permission_type: id.permission_type.clone(),
        };
        self.api
            .client()
            .put(
                self.api.cancel(),
                &format!("paps/{}/permissions?operation={operation}", id.profile_id),
                &body,
                LockKey::Profile,
            )
            .allow_no_content()
            .with_context(|| format!("Failed to {operation} permission {}", id.permission_name))?;
        Ok(())
    }
}

impl Resource for ProfilePermissionResource {
    type State = ProfilePermissionState;

    fn type_name(&self) -> &'static str {
        "profile_permission"
    }

    fn create(&self, plan: &ProfilePermissionState) -> Result<ProfilePermissionState> {
        let id = ProfilePermissionId::new(
            required("profile_id", &plan.profile_id)?,
            required("permission_name", &plan.permission_name)?,
            required("permission_type", &plan.permission_type)?,
        );
        self.change(&id, "add")?;
        log::info!("Added permission {} to profile {}", id.permission_name, id.profile_id);
        Ok(ProfilePermissionState::from_id(&id))
    }

    fn read(&self, prior: &ProfilePermissionState) -> Result<Option<ProfilePermissionState>> {
        let id: ProfilePermissionId = known("profile permission id", &prior.id)?.parse()?;
        let bound: Option<Vec<ProfilePermission>> = self
            .api
            .client()
            .query(LockKey::Profile)
            .with_size(PERMISSION_PAGE_SIZE)
            .fetch(self.api.cancel(), &format!("paps/{}/permissions", id.profile_id))
            .not_found_as_none()?;
        let present = bound.unwrap_or_default().iter().any(|p| {
            p.name == id.permission_name
                && p.permission_type.eq_ignore_ascii_case(&id.permission_type)
        });
        Ok(present.then(|| ProfilePermissionState {
            // Keep the configured spelling of the type.
            permission_type: prior.permission_type.clone(),
            ..ProfilePermissionState::from_id(&id)
        }))
    }

    fn update(&self, plan: &ProfilePermissionState, _prior: &ProfilePermissionState) -> Result<ProfilePermissionState> {
        bail!(
            "permission {} on profile {} cannot be changed in place",
            plan.permission_name,
            plan.profile_id
        )
    }

    fn delete(&self, prior: &ProfilePermissionState) -> Result<()> {
        let id: ProfilePermissionId = known("profile permission id", &prior.id)?.parse()?;
        removed(self.change(&id, "remove"))
    }

    fn import(&self, id: &str) -> Result<ProfilePermissionState> {
        let fields = ImportFormats::new(formats::PROFILE_PERMISSION)?.parse(id)?;
        let id = ProfilePermissionId::new(
            fields.get("profile")?,
            fields.get("name")?,
            fields.get("type")?,
        );
        Ok(ProfilePermissionState::from_id(&id))
    }

    fn needs_update(&self, plan: &ProfilePermissionState, state: &ProfilePermissionState) -> Result<bool> {
        Ok(plan.profile_id != state.profile_id
            || plan.permission_name != state.permission_name
            || !plan.permission_type.eq_ignore_ascii_case(&state.permission_type))
    }

    fn requires_replace(&self, _plan: &ProfilePermissionState, _state: &ProfilePermissionState) -> Result<bool> {
        Ok(true)
    }
}
