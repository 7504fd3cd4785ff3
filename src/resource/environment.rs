//! Environments and environment groups under an application's root group

use super::{Api, deleted, known, required};
use anyhow::{Context, Result, bail};
use declarative::{Resource, Value};
use pamclient::models::{Application, EnvironmentEntity, EnvironmentKind};
use pamclient::{AllowNoContent, LockKey, NotFoundAsNone};
use resourceid::{EnvironmentGroupId, EnvironmentId, ImportFormats, formats};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentState {
    /// `apps/{appId}/root-environment-group/{environments|groups}/{entityId}`
    #[serde(default)]
    pub id: Value<String>,
    /// Server id, the form other entities refer to
    #[serde(default)]
    pub entity_id: Value<String>,
    pub application_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Value<String>,
    /// Defaults to the application's root group
    #[serde(default)]
    pub parent_group_id: Value<String>,
}

pub struct EnvironmentResource {
    api: Api,
    kind: EnvironmentKind,
}

impl EnvironmentResource {
    pub fn environment(api: Api) -> Self {
        Self {
            api,
            kind: EnvironmentKind::Environment,
        }
    }

    pub fn group(api: Api) -> Self {
        Self {
            api,
            kind: EnvironmentKind::Group,
        }
    }

    fn collection(&self, app_id: &str) -> String {
        format!("apps/{app_id}/root-environment-group/{}", self.kind.collection())
    }

    fn canonical_id(&self, app_id: &str, entity_id: &str) -> String {
        match self.kind {
            EnvironmentKind::Environment => EnvironmentId {
                app_id: app_id.to_string(),
                environment_id: entity_id.to_string(),
            }
            .to_string(),
            EnvironmentKind::Group => EnvironmentGroupId {
                app_id: app_id.to_string(),
                group_id: entity_id.to_string(),
            }
            .to_string(),
        }
    }

    /// Application and entity ids held in a canonical id
    fn parse_id(&self, id: &str) -> Result<(String, String)> {
        Ok(match self.kind {
            EnvironmentKind::Environment => {
                let id: EnvironmentId = id.parse()?;
                (id.app_id, id.environment_id)
            }
            EnvironmentKind::Group => {
                let id: EnvironmentGroupId = id.parse()?;
                (id.app_id, id.group_id)
            }
        })
    }

    fn entity_path(&self, state: &EnvironmentState) -> Result<String> {
        let (app_id, entity_id) = self.parse_id(known("environment id", &state.id)?)?;
        Ok(format!("{}/{entity_id}", self.collection(&app_id)))
    }

    fn from_server(&self, entity: EnvironmentEntity, prior: &EnvironmentState) -> EnvironmentState {
        let description = if entity.description.is_empty() && !prior.description.is_known() {
            Value::Null
        } else {
            Value::Known(entity.description)
        };
        EnvironmentState {
            id: Value::Known(self.canonical_id(&prior.application_id, &entity.id)),
            entity_id: Value::Known(entity.id),
            application_id: prior.application_id.clone(),
            name: entity.name,
            description,
            parent_group_id: entity.parent_group_id.into(),
        }
    }

    fn root_group(&self, app_id: &str) -> Result<Option<String>> {
        let app: Application = self.api.client().get_json(
            self.api.cancel(),
            &format!("apps/{app_id}"),
            LockKey::Application,
        )?;
        Ok(app.root_environment_group_id)
    }

    fn read_back(&self, state: &EnvironmentState) -> Result<EnvironmentState> {
        Resource::read(self, state)?
            .with_context(|| format!("{} {} disappeared while being written", self.kind.collection(), state.name))
    }
}

impl Resource for EnvironmentResource {
    type State = EnvironmentState;

    fn type_name(&self) -> &'static str {
        match self.kind {
            EnvironmentKind::Environment => "environment",
            EnvironmentKind::Group => "environment_group",
        }
    }

    fn create(&self, plan: &EnvironmentState) -> Result<EnvironmentState> {
        let app_id = required("application_id", &plan.application_id)?;
        required("name", &plan.name)?;
        let parent_group_id = match plan.parent_group_id.non_empty() {
            Some(parent) => Some(parent.to_string()),
            None => self.root_group(app_id)?,
        };
        let body = EnvironmentEntity {
            name: plan.name.clone(),
            description: plan.description.known().cloned().unwrap_or_default(),
            parent_group_id,
            ..EnvironmentEntity::default()
        };
        let created: EnvironmentEntity = self.api.client().post_json(
            self.api.cancel(),
            &self.collection(app_id),
            &body,
            LockKey::Application,
        )?;
        log::info!("Created {} {} ({})", self.type_name(), created.name, created.id);

        let state = EnvironmentState {
            id: Value::Known(self.canonical_id(app_id, &created.id)),
            entity_id: Value::Known(created.id),
            ..plan.clone()
        };
        self.read_back(&state)
    }

    fn read(&self, prior: &EnvironmentState) -> Result<Option<EnvironmentState>> {
        let entity: Option<EnvironmentEntity> = self
            .api
            .client()
            .get_json(self.api.cancel(), &self.entity_path(prior)?, LockKey::Application)
            .not_found_as_none()?;
        Ok(entity.map(|entity| self.from_server(entity, prior)))
    }

    fn update(&self, plan: &EnvironmentState, prior: &EnvironmentState) -> Result<EnvironmentState> {
        required("name", &plan.name)?;
        let path = self.entity_path(prior)?;

        // The PATCH body is the entity as it stands, with the configured fields on top.
        let mut body: EnvironmentEntity = self
            .api
            .client()
            .get_json(self.api.cancel(), &path, LockKey::Application)
            .with_context(|| format!("Failed to read {} before update", plan.name))?;
        body.name = plan.name.clone();
        if let Some(description) = plan.description.known() {
            body.description = description.clone();
        }
        if let Some(parent) = plan.parent_group_id.non_empty() {
            body.parent_group_id = Some(parent.to_string());
        }
        self.api
            .client()
            .patch(self.api.cancel(), &path, &body, LockKey::Application)
            .allow_no_content()?;

        let state = EnvironmentState {
            id: prior.id.clone(),
            entity_id: prior.entity_id.clone(),
            ..plan.clone()
        };
        self.read_back(&state)
    }

    fn delete(&self, prior: &EnvironmentState) -> Result<()> {
        deleted(self.api.client().delete(
            self.api.cancel(),
            &self.entity_path(prior)?,
            LockKey::Application,
        ))
    }

    fn import(&self, id: &str) -> Result<EnvironmentState> {
        let patterns = match self.kind {
            EnvironmentKind::Environment => formats::ENVIRONMENT,
            EnvironmentKind::Group => formats::ENVIRONMENT_GROUP,
        };
        let fields = ImportFormats::new(patterns)?.parse(id)?;
        let app_id = fields.get("app")?;
        let entity_id = fields.get("id")?;

        if self.kind == EnvironmentKind::Group
            && self.root_group(app_id)?.as_deref() == Some(entity_id)
        {
            bail!("{entity_id} is the root environment group of application {app_id} and cannot be imported");
        }
        Ok(EnvironmentState {
            id: Value::Known(self.canonical_id(app_id, entity_id)),
            entity_id: Value::Known(entity_id.to_string()),
            application_id: app_id.to_string(),
            ..EnvironmentState::default()
        })
    }

    fn requires_replace(&self, plan: &EnvironmentState, state: &EnvironmentState) -> Result<bool> {
        Ok(plan.application_id != state.application_id)
    }
}
