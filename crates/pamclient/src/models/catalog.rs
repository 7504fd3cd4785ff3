//! The catalog of application types (`GET /system/apps`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogApp {
    #[serde(rename = "type")]
    pub app_type: String,
    #[serde(default)]
    pub versions: Vec<CatalogVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogVersion {
    pub version: String,
    #[serde(default)]
    pub properties: Vec<CatalogProperty>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProperty {
    pub name: String,
    /// Java class name of the value, e.g. `java.lang.Boolean`.
    #[serde(rename = "type", default)]
    pub java_type: String,
    #[serde(default)]
    pub overridable: bool,
}
