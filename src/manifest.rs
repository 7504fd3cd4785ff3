//! Desired-state manifest.
//!
//! ```toml
//! [provider]
//! base_url = "https://tenant.example/api"
//!
//! [[resource]]
//! type = "profile"
//! name = "ops"
//! config = { application_id = "a1", name = "ops", expiration_duration = "2h30m" }
//! ```

use crate::config::ProviderBlock;
use anyhow::{Context, Result, bail};
use declarative::Desired;
use serde::Deserialize;
use serde_json::Value as Json;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub provider: Option<ProviderBlock>,
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceEntry {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    #[serde(default)]
    pub config: toml::Table,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest {}", path.display()))?;
        let manifest = Self::parse(&content)
            .with_context(|| format!("Invalid manifest: {}", path.display()))?;
        log::debug!(
            "Loaded {} resources from {}",
            manifest.resources.len(),
            path.display()
        );
        Ok(manifest)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Self = toml::from_str(content)?;
        let mut seen = HashSet::new();
        for entry in &manifest.resources {
            if entry.name.trim().is_empty() || entry.name.contains('.') {
                bail!(
                    "Resource name {:?} of type {} must be non-empty and contain no '.'",
                    entry.name,
                    entry.type_name
                );
            }
            if !seen.insert((entry.type_name.as_str(), entry.name.as_str())) {
                bail!("Duplicate resource {}.{}", entry.type_name, entry.name);
            }
        }
        Ok(manifest)
    }

    /// The entries as engine input, configs converted to JSON.
    pub fn desired(&self) -> Vec<Desired> {
        self.resources
            .iter()
            .map(|entry| {
                let config = Json::Object(
                    entry
                        .config
                        .iter()
                        .map(|(k, v)| (k.clone(), toml_to_json(v)))
                        .collect(),
                );
                Desired::new(&entry.type_name, &entry.name, config)
            })
            .collect()
    }
}

fn toml_to_json(value: &toml::Value) -> Json {
    match value {
        toml::Value::String(s) => Json::String(s.clone()),
        toml::Value::Integer(i) => Json::from(*i),
        toml::Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
        toml::Value::Boolean(b) => Json::Bool(*b),
        toml::Value::Datetime(d) => Json::String(d.to_string()),
        toml::Value::Array(items) => Json::Array(items.iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Json::Object(
            table
                .iter()
                .map(|(k, v)| (k.clone(), toml_to_json(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"
[provider]
base_url = "https://t.example"

[[resource]]
type = "profile"
name = "ops"
config = { application_id = "a1", name = "ops", expiration_duration = "2h30m", extendable = false }

[[resource]]
type = "profile_policy"
name = "night"

[resource.config]
profile_id = "${profile.ops.id}"
name = "night shift"
resource_labels = { env = "prod,stage" }
"#;

    #[test]
    fn test_parse_and_convert() {
        let manifest = Manifest::parse(SAMPLE).unwrap();
        assert_eq!(
            manifest.provider.as_ref().unwrap().base_url.as_deref(),
            Some("https://t.example")
        );

        let desired = manifest.desired();
        assert_eq!(desired.len(), 2);
        assert_eq!(desired[0].address, "profile.ops");
        assert_eq!(desired[0].config["extendable"], json!(false));
        assert_eq!(desired[1].config["profile_id"], json!("${profile.ops.id}"));
        assert_eq!(
            desired[1].config["resource_labels"],
            json!({"env": "prod,stage"})
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let content = r#"
[[resource]]
type = "tag_member"
name = "alice"

[[resource]]
type = "tag_member"
name = "alice"
"#;
        let err = Manifest::parse(content).unwrap_err();
        assert!(err.to_string().contains("tag_member.alice"));
    }

    #[test]
    fn test_dotted_name_rejected() {
        let content = "[[resource]]\ntype = \"profile\"\nname = \"a.b\"\n";
        assert!(Manifest::parse(content).is_err());
    }

    #[test]
    fn test_datetime_becomes_string() {
        let value: toml::Value = toml::from_str::<toml::Table>("at = 2024-01-02T03:04:05Z")
            .unwrap()
            .remove("at")
            .unwrap();
        assert_eq!(toml_to_json(&value), json!("2024-01-02T03:04:05Z"));
    }
}
