//! Access policies of a profile

use super::profile::ProfileAssociation;
use super::{Api, deleted, json_attr, known, required};
use anyhow::{Context, Result};
use declarative::{Resource, Value};
use drift::semantic::{condition_equal, keep_configured, members_equal};
use pamclient::models::Policy;
use pamclient::{AllowNoContent, LockKey, NotFoundAsNone};
use resourceid::{ImportFormats, ProfilePolicyId, formats};
use serde::{Deserialize, Serialize};

const CONSUMER: &str = "papservice";
const ACCESS_TYPE: &str = "Allow";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfilePolicyState {
    /// `paps/{profileId}/policies/{policyId}`
    #[serde(default)]
    pub id: Value<String>,
    #[serde(default)]
    pub policy_id: Value<String>,
    pub profile_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Value<String>,
    #[serde(default)]
    pub active: Value<bool>,
    #[serde(default)]
    pub draft: Value<bool>,
    #[serde(default)]
    pub read_only: Value<bool>,
    #[serde(default)]
    pub access_type: Value<String>,
    /// JSON document of member sets, e.g. `{"users": ["u1"]}`
    #[serde(default)]
    pub members: Value<String>,
    /// JSON document
    #[serde(default)]
    pub condition: Value<String>,
    #[serde(default)]
    pub associations: Value<Vec<ProfileAssociation>>,
}

pub struct ProfilePolicyResource {
    api: Api,
}

fn policy_body(plan: &ProfilePolicyState) -> Result<Policy> {
    required("name", &plan.name)?;
    let condition = plan.condition.non_empty().unwrap_or_default();
    json_attr("condition", condition)?;
    let associations = match plan.associations.known() {
        Some(associations) => associations
            .iter()
            .map(ProfileAssociation::to_wire)
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    Ok(Policy {
        name: plan.name.clone(),
        description: plan.description.known().cloned().unwrap_or_default(),
        active: plan.active.known().copied().unwrap_or(true),
        draft: plan.draft.known().copied().unwrap_or(false),
        read_only: plan.read_only.known().copied().unwrap_or(false),
        consumer: CONSUMER.to_string(),
        access_type: plan
            .access_type
            .non_empty()
            .unwrap_or(ACCESS_TYPE)
            .to_string(),
        members: json_attr("members", plan.members.non_empty().unwrap_or_default())?,
        condition: condition.to_string(),
        associations,
        ..Policy::default()
    })
}

/// Map the server's policy onto state, keeping configured JSON spellings
fn from_server(policy: Policy, prior: &ProfilePolicyState) -> ProfilePolicyState {
    let members = if policy.members.is_null() {
        String::new()
    } else {
        policy.members.to_string()
    };
    let json_field = |field: &str, configured: &Value<String>, server: &str, eq: fn(&str, &str) -> bool| {
        if server.is_empty() && !configured.is_known() {
            Value::Null
        } else {
            Value::Known(keep_configured(
                field,
                configured.known().map(String::as_str),
                server,
                eq,
            ))
        }
    };

    let served: Vec<ProfileAssociation> = policy
        .associations
        .iter()
        .map(ProfileAssociation::from_wire)
        .collect();
    let associations = match prior.associations.known() {
        Some(configured) if same_set(configured, &served) => Value::Known(configured.clone()),
        None if served.is_empty() => Value::Null,
        _ => Value::Known(served),
    };
    let description = if policy.description.is_empty() && !prior.description.is_known() {
        Value::Null
    } else {
        Value::Known(policy.description)
    };

    ProfilePolicyState {
        id: Value::Known(ProfilePolicyId::new(&prior.profile_id, &policy.id).to_string()),
        policy_id: Value::Known(policy.id),
        profile_id: prior.profile_id.clone(),
        name: policy.name,
        description,
        active: Value::Known(policy.active),
        draft: Value::Known(policy.draft),
        read_only: Value::Known(policy.read_only),
        access_type: Value::Known(policy.access_type),
        members: json_field("members", &prior.members, &members, members_equal),
        condition: json_field("condition", &prior.condition, &policy.condition, condition_equal),
        associations,
    }
}

fn same_set(a: &[ProfileAssociation], b: &[ProfileAssociation]) -> bool {
    let normalize = |items: &[ProfileAssociation]| {
        let mut out: Vec<(String, String, Option<String>)> = items
            .iter()
            .map(|i| (i.association_type.to_lowercase(), i.value.clone(), i.parent_name.clone()))
            .collect();
        out.sort();
        out
    };
    normalize(a) == normalize(b)
}

impl ProfilePolicyResource {
    pub fn new(api: Api) -> Self {
        Self { api }
    }

    fn fetch(&self, profile_id: &str, policy_id: &str) -> pamclient::Result<Policy> {
        self.api.client().get_json(
            self.api.cancel(),
            &format!("paps/{profile_id}/policies/{policy_id}"),
            LockKey::Policy,
        )
    }

    fn read_back(&self, state: &ProfilePolicyState) -> Result<ProfilePolicyState> {
        Resource::read(self, state)?
            .with_context(|| format!("policy {} disappeared while being written", state.name))
    }
}

impl Resource for ProfilePolicyResource {
    type State = ProfilePolicyState;

    fn type_name(&self) -> &'static str {
        "profile_policy"
    }

    fn create(&self, plan: &ProfilePolicyState) -> Result<ProfilePolicyState> {
        let profile_id = required("profile_id", &plan.profile_id)?;
        let created: Policy = self.api.client().post_json(
            self.api.cancel(),
            &format!("paps/{profile_id}/policies"),
            &policy_body(plan)?,
            LockKey::Policy,
        )?;
        log::info!("Created policy {} ({})", created.name, created.id);

        let state = ProfilePolicyState {
            policy_id: Value::Known(created.id),
            ..plan.clone()
        };
        self.read_back(&state)
    }

    fn read(&self, prior: &ProfilePolicyState) -> Result<Option<ProfilePolicyState>> {
        let policy_id = known("policy id", &prior.policy_id)?;
        let policy = self
            .fetch(&prior.profile_id, policy_id)
            .not_found_as_none()?;
        Ok(policy.map(|policy| from_server(policy, prior)))
    }

    fn update(&self, plan: &ProfilePolicyState, prior: &ProfilePolicyState) -> Result<ProfilePolicyState> {
        let policy_id = known("policy id", &prior.policy_id)?;
        self.api
            .client()
            .patch(
                self.api.cancel(),
                &format!("paps/{}/policies/{policy_id}", prior.profile_id),
                &policy_body(plan)?,
                LockKey::Policy,
            )
            .allow_no_content()?;
        let state = ProfilePolicyState {
            policy_id: prior.policy_id.clone(),
            ..plan.clone()
        };
        self.read_back(&state)
    }

    fn delete(&self, prior: &ProfilePolicyState) -> Result<()> {
        let policy_id = known("policy id", &prior.policy_id)?;
        deleted(self.api.client().delete(
            self.api.cancel(),
            &format!("paps/{}/policies/{policy_id}", prior.profile_id),
            LockKey::Policy,
        ))
    }

    /// The policy part may be an id or a name.
    fn import(&self, id: &str) -> Result<ProfilePolicyState> {
        let fields = ImportFormats::new(formats::PROFILE_POLICY)?.parse(id)?;
        let profile_id = fields.get("profile")?;
        let policy = fields.get("policy")?;
        let policy_id = match self.fetch(profile_id, policy).not_found_as_none()? {
            Some(found) => found.id,
            None => {
                self.api
                    .client()
                    .policy_by_name(self.api.cancel(), profile_id, policy)?
                    .id
            }
        };
        Ok(ProfilePolicyState {
            policy_id: Value::Known(policy_id),
            profile_id: profile_id.to_string(),
            ..ProfilePolicyState::default()
        })
    }

    fn requires_replace(&self, plan: &ProfilePolicyState, state: &ProfilePolicyState) -> Result<bool> {
        Ok(plan.profile_id != state.profile_id)
    }
}
