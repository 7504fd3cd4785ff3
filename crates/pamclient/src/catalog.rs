//! Application catalog checks.
//!
//! Before an application is created or its properties patched, the
//! requested catalog type and version must exist, and every property the
//! catalog types as a Java boolean or number must parse as one.

use crate::cancel::CancelToken;
use crate::client::Client;
use crate::error::{Error, Result};
use crate::lock::LockKey;
use crate::models::app::ICON_URL;
use crate::models::{AppProperty, CatalogApp, CatalogVersion};

impl Client {
    /// Fetch the catalog of application types.
    pub fn catalog(&self, cancel: &CancelToken) -> Result<Vec<CatalogApp>> {
        self.get_json(cancel, "system/apps", LockKey::Application)
    }
}

/// Find the catalog entry for a type and version.
pub fn find_version<'a>(
    catalog: &'a [CatalogApp],
    app_type: &str,
    version: &str,
) -> Result<&'a CatalogVersion> {
    let app = catalog
        .iter()
        .find(|app| app.app_type.eq_ignore_ascii_case(app_type))
        .ok_or_else(|| {
            Error::NotSupported(format!("application type {app_type:?} is not in the catalog"))
        })?;
    app.versions
        .iter()
        .find(|v| v.version == version)
        .ok_or_else(|| {
            let available: Vec<&str> = app.versions.iter().map(|v| v.version.as_str()).collect();
            Error::Validation(format!(
                "version {version:?} does not exist for application type {}; available: {}",
                app.app_type,
                available.join(", ")
            ))
        })
}

/// Check property values against the types the catalog declares.
pub fn validate_properties(version: &CatalogVersion, properties: &[AppProperty]) -> Result<()> {
    for property in properties {
        let Some(declared) = version.properties.iter().find(|p| p.name == property.name) else {
            continue;
        };
        let ok = match declared.java_type.as_str() {
            "java.lang.Boolean" => parse_bool(&property.value).is_some(),
            "java.lang.Integer" | "java.lang.Long" | "java.lang.Short" => {
                property.value.parse::<i64>().is_ok()
            }
            "java.lang.Float" | "java.lang.Double" => property.value.parse::<f64>().is_ok(),
            _ => true,
        };
        if !ok {
            return Err(Error::Validation(format!(
                "property {} must be a {} value, got {:?}",
                property.name, declared.java_type, property.value
            )));
        }
    }
    Ok(())
}

/// Drop properties the server owns.
pub fn writable(properties: Vec<AppProperty>) -> Vec<AppProperty> {
    properties
        .into_iter()
        .filter(|p| p.name != ICON_URL)
        .collect()
}

/// Boolean spellings accepted by the tenant.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CatalogProperty;

    fn catalog() -> Vec<CatalogApp> {
        vec![CatalogApp {
            app_type: "GENERIC".to_string(),
            versions: vec![CatalogVersion {
                version: "2".to_string(),
                properties: vec![
                    CatalogProperty {
                        name: "sslEnabled".to_string(),
                        java_type: "java.lang.Boolean".to_string(),
                        overridable: true,
                    },
                    CatalogProperty {
                        name: "port".to_string(),
                        java_type: "java.lang.Integer".to_string(),
                        overridable: true,
                    },
                    CatalogProperty {
                        name: "ratio".to_string(),
                        java_type: "java.lang.Double".to_string(),
                        overridable: true,
                    },
                ],
            }],
        }]
    }

    #[test]
    fn test_find_version() {
        let catalog = catalog();
        assert!(find_version(&catalog, "generic", "2").is_ok());
        let err = find_version(&catalog, "GENERIC", "3").unwrap_err();
        assert!(err.to_string().contains("available: 2"));
        let err = find_version(&catalog, "OKTA", "1").unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::NotSupported);
    }

    #[test]
    fn test_typed_properties() {
        let catalog = catalog();
        let version = find_version(&catalog, "GENERIC", "2").unwrap();

        let good = [
            AppProperty::new("sslEnabled", "T"),
            AppProperty::new("port", "-8443"),
            AppProperty::new("ratio", "0.75"),
            AppProperty::new("free", "anything"),
        ];
        assert!(validate_properties(version, &good).is_ok());

        assert!(validate_properties(version, &[AppProperty::new("sslEnabled", "yes")]).is_err());
        assert!(validate_properties(version, &[AppProperty::new("port", "80.5")]).is_err());
        assert!(validate_properties(version, &[AppProperty::new("ratio", "half")]).is_err());
    }

    #[test]
    fn test_icon_url_never_written() {
        let props = writable(vec![
            AppProperty::new("iconUrl", "https://cdn/x.png"),
            AppProperty::new("port", "22"),
        ]);
        assert_eq!(props.len(), 1);
        assert_eq!(props[0].name, "port");
    }
}
