//! Advanced settings records.
//!
//! The server keeps settings as a flat list of typed records. Each entity
//! carries at most one record per type; records flagged `isInherited`
//! belong to a parent entity and are hidden from the child's state.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Setting {
    #[serde(rename = "JUSTIFICATION")]
    Justification(Justification),
    #[serde(rename = "ITSM")]
    Itsm(Itsm),
    #[serde(rename = "IM")]
    Im(InstantMessaging),
    /// A record type this client does not manage.
    #[serde(other)]
    Unknown,
}

impl Setting {
    pub fn is_inherited(&self) -> bool {
        match self {
            Setting::Justification(s) => s.is_inherited,
            Setting::Itsm(s) => s.is_inherited,
            Setting::Im(s) => s.is_inherited,
            Setting::Unknown => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Justification {
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default, skip_serializing)]
    pub is_inherited: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itsm {
    pub connection_id: String,
    pub connection_type: String,
    #[serde(default)]
    pub filter_criteria: Vec<FilterCriterion>,
    #[serde(default, skip_serializing)]
    pub is_inherited: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriterion {
    pub name: String,
    /// Filter expression as a JSON document.
    #[serde(default)]
    pub filter: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantMessaging {
    pub connection_id: String,
    pub connection_type: String,
    #[serde(default)]
    pub auto_approval: bool,
    /// Array of escalation policy objects.
    #[serde(default)]
    pub escalation_policies: serde_json::Value,
    #[serde(default, skip_serializing)]
    pub is_inherited: bool,
}

/// Envelope used by every settings endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsEnvelope {
    #[serde(default)]
    pub settings: Vec<Setting>,
}

/// The settings one entity owns: at most one record of each type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvancedSettings {
    pub justification: Option<Justification>,
    pub itsm: Option<Itsm>,
    pub im: Option<InstantMessaging>,
}

impl AdvancedSettings {
    /// Pick the first own record of each type, dropping inherited ones.
    pub fn from_settings(settings: Vec<Setting>) -> Self {
        let mut out = Self::default();
        for setting in settings.into_iter().filter(|s| !s.is_inherited()) {
            match setting {
                Setting::Justification(s) if out.justification.is_none() => {
                    out.justification = Some(s);
                }
                Setting::Itsm(s) if out.itsm.is_none() => out.itsm = Some(s),
                Setting::Im(s) if out.im.is_none() => out.im = Some(s),
                _ => {}
            }
        }
        out
    }

    pub fn to_settings(&self) -> Vec<Setting> {
        let mut out = Vec::new();
        if let Some(s) = &self.justification {
            out.push(Setting::Justification(s.clone()));
        }
        if let Some(s) = &self.itsm {
            out.push(Setting::Itsm(s.clone()));
        }
        if let Some(s) = &self.im {
            out.push(Setting::Im(s.clone()));
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.justification.is_none() && self.itsm.is_none() && self.im.is_none()
    }
}
