//! Access profiles, permission bindings and constraints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

impl Status {
    /// Path segment of the status-change endpoint.
    pub fn endpoint_segment(self) -> &'static str {
        match self {
            Status::Active => "enabled-statuses",
            Status::Inactive => "disabled-statuses",
        }
    }
}

/// What a profile or policy is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Association {
    #[serde(rename = "ENVIRONMENT_GROUP")]
    EnvironmentGroup { id: String },
    #[serde(rename = "ENVIRONMENT")]
    Environment { id: String },
    #[serde(rename = "APPLICATION_RESOURCE")]
    ApplicationResource {
        id: String,
        #[serde(rename = "parentResourceName")]
        parent_resource_name: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub application_id: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub associations: Vec<Association>,
    /// Milliseconds.
    #[serde(default)]
    pub expiration_duration: u64,
    #[serde(default)]
    pub extendable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_policy_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_url: Option<String>,
    #[serde(default)]
    pub policy_priority_enabled: bool,
}

/// A permission attached to a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePermission {
    pub name: String,
    #[serde(rename = "type")]
    pub permission_type: String,
}

/// One constraint value as the server lists it.
///
/// Plain constraints carry `name`; condition constraints carry `title`,
/// `expression` and optionally `description`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ConstraintValue {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn condition(
        title: impl Into<String>,
        expression: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            title: Some(title.into()),
            expression: Some(expression.into()),
            description,
            ..Self::default()
        }
    }

    /// Only the title, which is all a condition removal carries.
    pub fn title_only(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }
}

/// Add or remove, as the constraint endpoint's `operation` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOperation {
    Add,
    Remove,
}

impl ConstraintOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintOperation::Add => "add",
            ConstraintOperation::Remove => "remove",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_association_tagging() {
        let assoc = Association::ApplicationResource {
            id: "r1".to_string(),
            parent_resource_name: "db".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&assoc).unwrap(),
            json!({"type": "APPLICATION_RESOURCE", "id": "r1", "parentResourceName": "db"})
        );
        let env: Association =
            serde_json::from_value(json!({"type": "ENVIRONMENT", "id": "e1"})).unwrap();
        assert_eq!(env, Association::Environment { id: "e1".to_string() });
    }

    #[test]
    fn test_profile_defaults() {
        let profile: Profile = serde_json::from_value(json!({"id": "p1", "name": "ops"})).unwrap();
        assert_eq!(profile.status, Status::Active);
        assert!(profile.associations.is_empty());
        assert_eq!(Status::Inactive.endpoint_segment(), "disabled-statuses");
    }

    #[test]
    fn test_condition_removal_carries_title_only() {
        let body = serde_json::to_value(ConstraintValue::title_only("night")).unwrap();
        assert_eq!(body, json!({"title": "night"}));
    }
}
