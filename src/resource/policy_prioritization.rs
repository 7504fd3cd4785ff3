//! Evaluation order of the policies on a profile

use super::{Api, required};
use anyhow::{Context, Result};
use declarative::{Resource, Value};
use drift::PolicyPriority;
use drift::priority::{materialize, normalize_policy_id, project};
use pamclient::NotFoundAsNone;
use resourceid::{ImportFormats, PolicyPriorityId, formats};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyPrioritizationState {
    /// `paps/{profileId}/policies/priority`
    #[serde(default)]
    pub id: Value<String>,
    pub profile_id: String,
    #[serde(default)]
    pub enabled: Value<bool>,
    /// Pinned positions; unpinned policies keep their server order
    #[serde(default)]
    pub policy_priorities: Value<Vec<PolicyPriority>>,
}

impl PolicyPrioritizationState {
    fn is_enabled(&self) -> bool {
        self.enabled.known().copied().unwrap_or(true)
    }

    fn pins(&self) -> Vec<PolicyPriority> {
        self.policy_priorities
            .known()
            .map(|pins| {
                pins.iter()
                    .map(|p| PolicyPriority::new(normalize_policy_id(&p.policy_id), p.priority))
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub struct PolicyPrioritizationResource {
    api: Api,
}

impl PolicyPrioritizationResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn apply(&self, plan: &PolicyPrioritizationState) -> Result<PolicyPrioritizationState> {
        let profile_id = required("profile_id", &plan.profile_id)?;
        let order = self
            .api
            .client()
            .set_policy_priorities(self.api.cancel(), profile_id, plan.is_enabled(), &plan.pins())
            .with_context(|| format!("Failed to prioritize policies of profile {profile_id}"))?;
        log::info!(
            "Prioritized {} policies on profile {profile_id}",
            order.len()
        );

        let state = PolicyPrioritizationState {
            id: Value::Known(
                PolicyPriorityId {
                    profile_id: profile_id.to_string(),
                }
                .to_string(),
            ),
            enabled: Value::Known(plan.is_enabled()),
            policy_priorities: match plan.policy_priorities {
                Value::Known(_) => Value::Known(plan.pins()),
                _ => Value::Null,
            },
            ..plan.clone()
        };
        Resource::read(self, &state)?
            .with_context(|| format!("profile {profile_id} disappeared while being prioritized"))
    }
}

fn same_pins(a: &[PolicyPriority], b: &[PolicyPriority]) -> bool {
    let set = |pins: &[PolicyPriority]| -> BTreeSet<(String, usize)> {
        pins.iter()
            .map(|p| (normalize_policy_id(&p.policy_id).to_string(), p.priority))
            .collect()
    };
    set(a) == set(b)
}

impl Resource for PolicyPrioritizationResource {
    type State = PolicyPrioritizationState;

    fn type_name(&self) -> &'static str {
        "policy_prioritization"
    }

    fn create(&self, plan: &PolicyPrioritizationState) -> Result<PolicyPrioritizationState> {
        self.apply(plan)
    }

    /// The enabled flag is not listed with the order; it keeps its prior value.
    fn read(&self, prior: &PolicyPrioritizationState) -> Result<Option<PolicyPrioritizationState>> {
        let profile_id = required("profile_id", &prior.profile_id)?;
        let Some(server_order) = self
            .api
            .client()
            .policy_order(self.api.cancel(), profile_id)
            .not_found_as_none()?
        else {
            return Ok(None);
        };

        let policy_priorities = match prior.policy_priorities.known() {
            Some(pins) => project(&server_order, pins),
            None => materialize(&server_order),
        };
        Ok(Some(PolicyPrioritizationState {
            policy_priorities: Value::Known(policy_priorities),
            ..prior.clone()
        }))
    }

    fn update(&self, plan: &PolicyPrioritizationState, _prior: &PolicyPrioritizationState) -> Result<PolicyPrioritizationState> {
        self.apply(plan)
    }

    fn delete(&self, prior: &PolicyPrioritizationState) -> Result<()> {
        let profile_id = required("profile_id", &prior.profile_id)?;
        match self
            .api
            .client()
            .set_policy_priorities(self.api.cancel(), profile_id, false, &[])
        {
            Err(e) if e.is_not_found() => Ok(()),
            other => other.map(|_| ()).map_err(Into::into),
        }
    }

    /// Imports materialize the full server order into state.
    fn import(&self, id: &str) -> Result<PolicyPrioritizationState> {
        let fields = ImportFormats::new(formats::POLICY_PRIORITY)?.parse(id)?;
        let id = PolicyPriorityId {
            profile_id: fields.get("profile")?.to_string(),
        };
        Ok(PolicyPrioritizationState {
            id: Value::Known(id.to_string()),
            profile_id: id.profile_id,
            enabled: Value::Known(true),
            policy_priorities: Value::Null,
        })
    }

    fn needs_update(&self, plan: &PolicyPrioritizationState, state: &PolicyPrioritizationState) -> Result<bool> {
        if plan.profile_id != state.profile_id || plan.is_enabled() != state.is_enabled() {
            return Ok(true);
        }
        // Order is not managed while prioritization is off.
        if !plan.is_enabled() {
            return Ok(false);
        }
        Ok(match (plan.policy_priorities.known(), state.policy_priorities.known()) {
            (Some(planned), Some(current)) => !same_pins(planned, current),
            (Some(planned), None) => !planned.is_empty(),
            (None, _) => false,
        })
    }

    fn requires_replace(&self, plan: &PolicyPrioritizationState, state: &PolicyPrioritizationState) -> Result<bool> {
        Ok(plan.profile_id != state.profile_id)
    }
}
