//! Tags, users, roles, permissions and the other entities looked up by name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub identity_provider_id: String,
    #[serde(default)]
    pub status: String,
    /// Synchronized from an identity provider; read-only here.
    #[serde(default)]
    pub external: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Body of `POST /tags/{id}/users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMembers {
    pub user_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permissions: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub consumer: String,
    #[serde(default)]
    pub resources: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
}

/// A server resource reachable through a broker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerResource {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub resource_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionAttributeType {
    /// A literal value.
    Static,
    /// A reference to an identity attribute by name.
    Identity,
}

impl SessionAttributeType {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionAttributeType::Static => "STATIC",
            SessionAttributeType::Identity => "IDENTITY",
        }
    }
}

impl fmt::Display for SessionAttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionAttributeType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "STATIC" => Ok(Self::Static),
            "IDENTITY" => Ok(Self::Identity),
            _ => Err(crate::Error::NotSupported(format!(
                "session attribute type {s:?}; expected static or identity"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAttribute {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub attribute_type: SessionAttributeType,
    pub mapping_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
}

impl SessionAttribute {
    /// Exactly one of value/name must be set, as the type dictates.
    pub fn validate(&self) -> crate::Result<()> {
        let (field, required, forbidden) = match self.attribute_type {
            SessionAttributeType::Static => {
                ("attribute_value", &self.attribute_value, &self.attribute_name)
            }
            SessionAttributeType::Identity => {
                ("attribute_name", &self.attribute_name, &self.attribute_value)
            }
        };
        if required.as_deref().is_none_or(|v| v.trim().is_empty()) {
            return Err(crate::Error::Validation(format!(
                "{field} is required for {} session attributes",
                self.attribute_type
            )));
        }
        if forbidden.is_some() {
            return Err(crate::Error::Validation(format!(
                "only {field} may be set for {} session attributes",
                self.attribute_type
            )));
        }
        Ok(())
    }
}

/// A label selector on a resource-manager profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LabelAssociation {
    pub label: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceManagerProfile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associations: Vec<LabelAssociation>,
}

/// Body of `POST /resource-manager/profile/{id}/associations`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAssociations {
    pub associations: Vec<LabelAssociation>,
}
