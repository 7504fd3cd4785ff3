//! Applications and their environments.

use serde::{Deserialize, Serialize};

/// Property types whose values the server masks.
pub const SECRET_TYPES: &[&str] = &["Secret", "SecretFile"];

/// Property the server owns; never written by this client.
pub const ICON_URL: &str = "iconUrl";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Catalog type, e.g. `OKTA` or `GENERIC`.
    #[serde(rename = "type")]
    pub app_type: String,
    pub version: String,
    #[serde(default)]
    pub properties: Vec<AppProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub user_account_mappings: Vec<UserAccountMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_environment_group_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppProperty {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub property_type: String,
    pub value: String,
}

impl AppProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            property_type: String::new(),
            value: value.into(),
        }
    }

    /// Whether the server masks this property's value.
    pub fn is_secret(&self) -> bool {
        SECRET_TYPES.contains(&self.property_type.as_str())
    }
}

/// Body of `PATCH /apps/{id}/properties`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertiesPatch {
    pub properties: Vec<AppProperty>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccountMapping {
    pub account_name: String,
    pub user_attribute: String,
}

/// Body of `POST /apps/{id}/user-account-mappings`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccountMappings {
    pub user_account_mappings: Vec<UserAccountMapping>,
}

/// An environment or environment group under an application's root group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentEntity {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<EnvironmentAttribute>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentAttribute {
    pub name: String,
    pub value: String,
}

/// Which collection under the root group an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentKind {
    Environment,
    Group,
}

impl EnvironmentKind {
    /// Collection path segment.
    pub fn collection(self) -> &'static str {
        match self {
            EnvironmentKind::Environment => "environments",
            EnvironmentKind::Group => "groups",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_application_wire_shape() {
        let app = Application {
            name: "crm".to_string(),
            app_type: "GENERIC".to_string(),
            version: "1".to_string(),
            ..Application::default()
        };
        let value = serde_json::to_value(&app).unwrap();
        assert_eq!(value["type"], "GENERIC");
        assert!(value.get("id").is_none());
        assert!(value.get("userAccountMappings").is_none());

        let read: Application = serde_json::from_value(json!({
            "id": "a1", "name": "crm", "type": "GENERIC", "version": "1",
            "properties": [{"name": "password", "type": "Secret", "value": "*"}],
            "rootEnvironmentGroupId": "g0"
        }))
        .unwrap();
        assert!(read.properties[0].is_secret());
        assert_eq!(read.root_environment_group_id.as_deref(), Some("g0"));
    }
}
