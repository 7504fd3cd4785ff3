//! Constraints narrowing a profile permission, plain or condition

use super::{Api, known, removed, required};
use anyhow::{Context, Result, bail};
use declarative::{Resource, Value};
use drift::semantic::{
    ConditionParts, condition_constraint_equal, condition_equal, constraint_equal, keep_configured,
};
use pamclient::models::{ConstraintOperation, ConstraintValue};
use pamclient::{AllowNoContent, LockKey, NotFoundAsNone};
use resourceid::{ConstraintId, ImportFormats, formats};
use serde::{Deserialize, Serialize};

const CONDITION: &str = "condition";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstraintState {
    #[serde(default)]
    pub id: Value<String>,
    pub profile_id: String,
    pub permission_name: String,
    pub permission_type: String,
    /// `condition`, or a plain constraint type such as `bigquery`
    pub constraint_type: String,
    /// Plain constraints only
    #[serde(default)]
    pub name: Value<String>,
    /// Condition constraints only
    #[serde(default)]
    pub title: Value<String>,
    #[serde(default)]
    pub expression: Value<String>,
    #[serde(default)]
    pub description: Value<String>,
}

impl ConstraintState {
    fn is_condition(&self) -> bool {
        self.constraint_type.eq_ignore_ascii_case(CONDITION)
    }

    /// Name of a plain constraint or title of a condition, checked against the type
    fn key(&self) -> Result<&str> {
        if self.is_condition() {
            if self.name.non_empty().is_some() {
                bail!("condition constraints take title and expression, not name");
            }
            required("title", self.title.non_empty().unwrap_or(""))
        } else {
            if self.title.non_empty().is_some() || self.expression.non_empty().is_some() {
                bail!("title and expression apply only to the condition constraint type");
            }
            required("name", self.name.non_empty().unwrap_or(""))
        }
    }

    fn constraint_id(&self) -> Result<ConstraintId> {
        Ok(ConstraintId {
            profile_id: required("profile_id", &self.profile_id)?.to_string(),
            permission_name: required("permission_name", &self.permission_name)?.to_string(),
            permission_type: required("permission_type", &self.permission_type)?.to_string(),
            constraint_type: required("constraint_type", &self.constraint_type)?.to_string(),
            value: self.key()?.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ConstraintList {
    #[serde(default)]
    result: Vec<ConstraintValue>,
}

pub struct ConstraintResource {
    api: Api,
}

fn endpoint(id: &ConstraintId) -> String {
    format!(
        "paps/{}/permissions/{}/{}/constraints/{}",
        id.profile_id, id.permission_name, id.permission_type, id.constraint_type
    )
}

impl ConstraintResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn change(&self, id: &ConstraintId, operation: ConstraintOperation, body: &ConstraintValue) -> Result<()> {
        let url = format!("{}?operation={}", endpoint(id), operation.as_str());
        self.api
            .client()
            .put(self.api.cancel(), &url, body, LockKey::Constraint)
            .allow_no_content()
            .with_context(|| format!("Failed to {} constraint {}", operation.as_str(), id.value))?;
        Ok(())
    }

    fn list(&self, id: &ConstraintId) -> Result<Option<Vec<ConstraintValue>>> {
        let url = format!("{}?type={}", endpoint(id), id.constraint_type);
        let list: Option<ConstraintList> = self
            .api
            .client()
            .get_json(self.api.cancel(), &url, LockKey::Constraint)
            .not_found_as_none()?;
        Ok(list.map(|l| l.result))
    }
}

impl Resource for ConstraintResource {
    type State = ConstraintState;

    fn type_name(&self) -> &'static str {
        "constraint"
    }

    fn create(&self, plan: &ConstraintState) -> Result<ConstraintState> {
        let id = plan.constraint_id()?;
        let body = if plan.is_condition() {
            let expression = required("expression", plan.expression.non_empty().unwrap_or(""))?;
            ConstraintValue::condition(
                &id.value,
                expression,
                plan.description.non_empty().map(str::to_string),
            )
        } else {
            ConstraintValue::plain(&id.value)
        };
        self.change(&id, ConstraintOperation::Add, &body)?;
        log::info!("Added {} constraint {} to {}", id.constraint_type, id.value, id.permission_name);
        Ok(ConstraintState {
            id: Value::Known(id.to_string()),
            ..plan.clone()
        })
    }

    fn read(&self, prior: &ConstraintState) -> Result<Option<ConstraintState>> {
        let id: ConstraintId = known("constraint id", &prior.id)?.parse()?;
        let Some(values) = self.list(&id)? else {
            return Ok(None);
        };

        let mut state = ConstraintState {
            id: prior.id.clone(),
            profile_id: id.profile_id.clone(),
            permission_name: id.permission_name.clone(),
            permission_type: id.permission_type.clone(),
            constraint_type: id.constraint_type.clone(),
            ..ConstraintState::default()
        };
        if id.constraint_type.eq_ignore_ascii_case(CONDITION) {
            let Some(found) = values.iter().find(|v| v.title.as_deref() == Some(id.value.as_str()))
            else {
                return Ok(None);
            };
            state.title = Value::Known(id.value.clone());
            let served = ConditionParts {
                title: found.title.as_deref().unwrap_or_default(),
                expression: found.expression.as_deref().unwrap_or_default(),
                description: found.description.as_deref().filter(|d| !d.is_empty()),
            };
            let configured = prior.expression.known().map(|expression| ConditionParts {
                title: &id.value,
                expression: expression.as_str(),
                description: prior.description.non_empty(),
            });
            // A verbatim match keeps the configured fields as they are.
            if let Some(configured) =
                configured.filter(|c| condition_constraint_equal(c, std::slice::from_ref(&served)))
            {
                state.expression = Value::Known(configured.expression.to_string());
                state.description = match served.description {
                    Some(d) => Value::Known(d.to_string()),
                    None => prior.description.clone(),
                };
                return Ok(Some(state));
            }
            state.expression = Value::Known(keep_configured(
                "expression",
                prior.expression.known().map(String::as_str),
                found.expression.as_deref().unwrap_or_default(),
                condition_equal,
            ));
            state.description = match found.description.as_deref() {
                Some(d) if !d.is_empty() => Value::Known(d.to_string()),
                _ if prior.description.is_known() => Value::Known(String::new()),
                _ => Value::Null,
            };
        } else {
            let names: Vec<String> = values.into_iter().filter_map(|v| v.name).collect();
            if !constraint_equal(&id.value, &names) {
                return Ok(None);
            }
            state.name = Value::Known(id.value.clone());
        }
        Ok(Some(state))
    }

    fn update(&self, plan: &ConstraintState, _prior: &ConstraintState) -> Result<ConstraintState> {
        bail!("constraint {} cannot be changed in place", plan.key().unwrap_or("?"))
    }

    /// A condition removal carries only its title.
    fn delete(&self, prior: &ConstraintState) -> Result<()> {
        let id: ConstraintId = known("constraint id", &prior.id)?.parse()?;
        let body = if id.constraint_type.eq_ignore_ascii_case(CONDITION) {
            ConstraintValue::title_only(&id.value)
        } else {
            ConstraintValue::plain(&id.value)
        };
        removed(self.change(&id, ConstraintOperation::Remove, &body))
    }

    fn import(&self, id: &str) -> Result<ConstraintState> {
        let fields = ImportFormats::new(formats::CONSTRAINT)?.parse(id)?;
        let id = ConstraintId {
            profile_id: fields.get("profile")?.to_string(),
            permission_name: fields.get("name")?.to_string(),
            permission_type: fields.get("ptype")?.to_string(),
            constraint_type: fields.get("ctype")?.to_string(),
            value: fields.get("value")?.to_string(),
        };
        Ok(ConstraintState {
            id: Value::Known(id.to_string()),
            profile_id: id.profile_id,
            permission_name: id.permission_name,
            permission_type: id.permission_type,
            constraint_type: id.constraint_type,
            ..ConstraintState::default()
        })
    }

    fn requires_replace(&self, _plan: &ConstraintState, _state: &ConstraintState) -> Result<bool> {
        Ok(true)
    }
}
