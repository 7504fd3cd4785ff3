//! Access policies.
//!
//! Profile policies, resource policies and resource-manager profile
//! policies share one wire shape.

use crate::models::profile::Association;
use crate::models::settings::Setting;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub consumer: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub access_type: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub members: serde_json::Value,
    /// Condition expression, itself a JSON document encoded as a string.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub condition: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub associations: Vec<Association>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_labels: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<Setting>,
}

/// One entry of a policy order submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOrderEntry {
    pub id: String,
    pub priority: usize,
}

/// Body of `POST /paps/{id}/policies/order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyOrder {
    pub policy_priority_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<PolicyOrderEntry>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_policy_round_trips_members_as_json() {
        let policy: Policy = serde_json::from_value(json!({
            "id": "x1",
            "name": "night shift",
            "active": true,
            "members": {"users": ["u2", "u1"]},
            "condition": "{\"op\":\"and\"}",
            "priority": 2
        }))
        .unwrap();
        assert_eq!(policy.members["users"][1], "u1");
        assert_eq!(policy.priority, Some(2));

        let out = serde_json::to_value(&policy).unwrap();
        assert!(out.get("settings").is_none());
        assert_eq!(out["condition"], "{\"op\":\"and\"}");
    }

    #[test]
    fn test_disabled_order_sends_flag_only() {
        let order = PolicyOrder {
            policy_priority_enabled: false,
            policies: None,
        };
        assert_eq!(
            serde_json::to_value(order).unwrap(),
            json!({"policyPriorityEnabled": false})
        );
    }
}
