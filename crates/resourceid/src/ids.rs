//! Canonical opaque identifiers.
//!
//! Every type here encodes with [`Display`](std::fmt::Display) and decodes
//! with [`FromStr`]. Decoding counts segments from the right, so the long
//! import form of an id (carrying an extra `apps/{app}/` prefix) parses to
//! the same fields as the canonical one.

use crate::error::{Error, Result};
use crate::segments::Segments;
use std::fmt;
use std::str::FromStr;

/// `paps/{profileId}/permissions/{name}/type/{type}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfilePermissionId {
    pub profile_id: String,
    pub permission_name: String,
    pub permission_type: String,
}

impl ProfilePermissionId {
    pub fn new(
        profile_id: impl Into<String>,
        permission_name: impl Into<String>,
        permission_type: impl Into<String>,
    ) -> Self {
        Self {
            profile_id: profile_id.into(),
            permission_name: permission_name.into(),
            permission_type: permission_type.into(),
        }
    }
}

impl fmt::Display for ProfilePermissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "paps/{}/permissions/{}/type/{}",
            self.profile_id, self.permission_name, self.permission_type
        )
    }
}

impl FromStr for ProfilePermissionId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let s = Segments::split(id, 6)?;
        s.expect_literal(2, "type")?;
        s.expect_literal(4, "permissions")?;
        s.expect_literal(6, "paps")?;
        Ok(Self {
            profile_id: s.field(5, "profile id")?,
            permission_name: s.field(3, "permission name")?,
            permission_type: s.field(1, "permission type")?,
        })
    }
}

/// `paps/{profileId}/permissions/{name}/{permissionType}/constraints/{constraintType}/{nameOrTitle}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstraintId {
    pub profile_id: String,
    pub permission_name: String,
    pub permission_type: String,
    pub constraint_type: String,
    /// Constraint name, or the title of a condition constraint.
    pub value: String,
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "paps/{}/permissions/{}/{}/constraints/{}/{}",
            self.profile_id,
            self.permission_name,
            self.permission_type,
            self.constraint_type,
            self.value
        )
    }
}

impl FromStr for ConstraintId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let s = Segments::split(id, 8)?;
        s.expect_literal(3, "constraints")?;
        s.expect_literal(6, "permissions")?;
        s.expect_literal(8, "paps")?;
        Ok(Self {
            profile_id: s.field(7, "profile id")?,
            permission_name: s.field(5, "permission name")?,
            permission_type: s.field(4, "permission type")?,
            constraint_type: s.field(2, "constraint type")?,
            value: s.field(1, "constraint name")?,
        })
    }
}

/// `paps/{profileId}/policies/{policyId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfilePolicyId {
    pub profile_id: String,
    pub policy_id: String,
}

impl ProfilePolicyId {
    pub fn new(profile_id: impl Into<String>, policy_id: impl Into<String>) -> Self {
        Self {
            profile_id: profile_id.into(),
            policy_id: policy_id.into(),
        }
    }
}

impl fmt::Display for ProfilePolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "paps/{}/policies/{}", self.profile_id, self.policy_id)
    }
}

impl FromStr for ProfilePolicyId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let s = Segments::split(id, 4)?;
        s.expect_literal(2, "policies")?;
        s.expect_literal(4, "paps")?;
        Ok(Self {
            profile_id: s.field(3, "profile id")?,
            policy_id: s.field(1, "policy id")?,
        })
    }
}

/// Trailing `{profileId}/policies/{policyId}` of any policy path.
///
/// Policy-embedded settings live under either `paps/{p}/policies/{id}` or
/// `resource-manager/profiles/{p}/policies/{id}`; only the tail matters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyTail {
    pub profile_id: String,
    pub policy_id: String,
}

impl FromStr for PolicyTail {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let s = Segments::split(id, 3)?;
        s.expect_literal(2, "policies")?;
        Ok(Self {
            profile_id: s.field(3, "profile id")?,
            policy_id: s.field(1, "policy id")?,
        })
    }
}

/// `paps/{profileId}/policies/priority`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyPriorityId {
    pub profile_id: String,
}

impl fmt::Display for PolicyPriorityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "paps/{}/policies/priority", self.profile_id)
    }
}

impl FromStr for PolicyPriorityId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let s = Segments::split(id, 4)?;
        s.expect_literal(1, "priority")?;
        s.expect_literal(2, "policies")?;
        s.expect_literal(4, "paps")?;
        Ok(Self {
            profile_id: s.field(3, "profile id")?,
        })
    }
}

/// `paps/{profileId}/additional-settings`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProfileSettingsId {
    pub profile_id: String,
}

impl fmt::Display for ProfileSettingsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "paps/{}/additional-settings", self.profile_id)
    }
}

impl FromStr for ProfileSettingsId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let s = Segments::split(id, 3)?;
        s.expect_literal(1, "additional-settings")?;
        s.expect_literal(3, "paps")?;
        Ok(Self {
            profile_id: s.field(2, "profile id")?,
        })
    }
}

/// `{entityType}/{entityId}/advanced-settings`
///
/// The entity id may itself be composite (`paps/{p}/policies/{id}` for
/// policy-embedded settings), so the type is read from the left and the id
/// is everything between the type and the trailing literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdvancedSettingsId {
    pub entity_type: String,
    pub entity_id: String,
}

impl AdvancedSettingsId {
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }
}

impl fmt::Display for AdvancedSettingsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/advanced-settings", self.entity_type, self.entity_id)
    }
}

impl FromStr for AdvancedSettingsId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let s = Segments::split(id, 3)?;
        s.expect_literal(1, "advanced-settings")?;
        let entity_type = s.first();
        if entity_type.trim().is_empty() {
            return Err(Error::invalid(id, "entity type is empty"));
        }
        Ok(Self {
            entity_type: entity_type.to_string(),
            entity_id: s.middle(1, 1, "entity id")?,
        })
    }
}

/// `apps/{appId}/root-environment-group/environments/{entityId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvironmentId {
    pub app_id: String,
    pub environment_id: String,
}

impl fmt::Display for EnvironmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "apps/{}/root-environment-group/environments/{}",
            self.app_id, self.environment_id
        )
    }
}

impl FromStr for EnvironmentId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let s = Segments::split(id, 5)?;
        s.expect_literal(2, "environments")?;
        s.expect_literal(3, "root-environment-group")?;
        s.expect_literal(5, "apps")?;
        Ok(Self {
            app_id: s.field(4, "application id")?,
            environment_id: s.field(1, "environment id")?,
        })
    }
}

/// `apps/{appId}/root-environment-group/groups/{entityId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvironmentGroupId {
    pub app_id: String,
    pub group_id: String,
}

impl fmt::Display for EnvironmentGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "apps/{}/root-environment-group/groups/{}",
            self.app_id, self.group_id
        )
    }
}

impl FromStr for EnvironmentGroupId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let s = Segments::split(id, 5)?;
        s.expect_literal(2, "groups")?;
        s.expect_literal(3, "root-environment-group")?;
        s.expect_literal(5, "apps")?;
        Ok(Self {
            app_id: s.field(4, "application id")?,
            group_id: s.field(1, "group id")?,
        })
    }
}

/// `resources/{resourceId}/broker-pools`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BrokerPoolId {
    pub resource_id: String,
}

impl fmt::Display for BrokerPoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resources/{}/broker-pools", self.resource_id)
    }
}

impl FromStr for BrokerPoolId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let s = Segments::split(id, 3)?;
        s.expect_literal(1, "broker-pools")?;
        s.expect_literal(3, "resources")?;
        Ok(Self {
            resource_id: s.field(2, "resource id")?,
        })
    }
}

/// `resource-manager/profile/{profileId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceManagerProfileId {
    pub profile_id: String,
}

impl fmt::Display for ResourceManagerProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource-manager/profile/{}", self.profile_id)
    }
}

impl FromStr for ResourceManagerProfileId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let s = Segments::split(id, 3)?;
        s.expect_literal(2, "profile")?;
        s.expect_literal(3, "resource-manager")?;
        Ok(Self {
            profile_id: s.field(1, "profile id")?,
        })
    }
}

/// `tags/{tagId}/users/{userId}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TagMemberId {
    pub tag_id: String,
    pub user_id: String,
}

impl fmt::Display for TagMemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tags/{}/users/{}", self.tag_id, self.user_id)
    }
}

impl FromStr for TagMemberId {
    type Err = Error;

    fn from_str(id: &str) -> Result<Self> {
        let s = Segments::split(id, 4)?;
        s.expect_literal(2, "users")?;
        s.expect_literal(4, "tags")?;
        Ok(Self {
            tag_id: s.field(3, "tag id")?,
            user_id: s.field(1, "user id")?,
        })
    }
}
