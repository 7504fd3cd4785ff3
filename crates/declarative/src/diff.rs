//! Diff computation for plan output

use crate::planner::{Change, ExecutionPlan};
use crate::types::Action;
use serde::Serialize;
use serde_json::Value as Json;
use std::collections::BTreeMap;

/// Placeholder shown for sensitive attribute values
pub const SENSITIVE: &str = "(sensitive)";

/// One attribute that a change touches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeChange {
    pub name: String,
    pub before: Option<Json>,
    pub after: Option<Json>,
}

/// Attributes that differ between `before` and `after`.
///
/// Null attributes in `after` are unconstrained and not listed unless
/// `after` is absent altogether (a delete). Sensitive attribute values are
/// replaced by [`SENSITIVE`].
pub fn attribute_changes(
    before: Option<&Json>,
    after: Option<&Json>,
    sensitive: &[&str],
) -> Vec<AttributeChange> {
    let empty = serde_json::Map::new();
    let before_map = before.and_then(Json::as_object).unwrap_or(&empty);
    let after_map = after.and_then(Json::as_object).unwrap_or(&empty);

    let mask = |name: &str, value: Option<&Json>| {
        value.filter(|v| !v.is_null()).map(|v| {
            if sensitive.contains(&name) {
                Json::String(SENSITIVE.to_string())
            } else {
                v.clone()
            }
        })
    };

    let mut names: Vec<&String> = after_map.keys().collect();
    if after.is_none() {
        names = before_map.keys().collect();
    }

    names
        .into_iter()
        .filter_map(|name| {
            let old = before_map.get(name);
            let new = after_map.get(name);
            if after.is_some() && new.is_none_or(Json::is_null) {
                return None;
            }
            if old == new {
                return None;
            }
            Some(AttributeChange {
                name: name.clone(),
                before: mask(name.as_str(), old),
                after: mask(name.as_str(), new),
            })
        })
        .filter(|c| c.before != c.after || sensitive.contains(&c.name.as_str()))
        .collect()
}

/// A planned change prepared for display
#[derive(Debug, Clone, Serialize)]
pub struct ChangeDiff {
    pub address: String,
    pub type_name: String,
    pub action: Action,
    pub attributes: Vec<AttributeChange>,
}

impl ChangeDiff {
    pub fn from_change(change: &Change) -> Self {
        let sensitive = change.resource.sensitive_attributes();
        Self {
            address: change.address.clone(),
            type_name: change.type_name.clone(),
            action: change.action,
            attributes: attribute_changes(
                change.prior.as_ref(),
                change.planned.as_ref(),
                sensitive,
            ),
        }
    }
}

/// Diffs for every change in a plan
pub fn compute_diffs(plan: &ExecutionPlan) -> Vec<ChangeDiff> {
    plan.changes.iter().map(ChangeDiff::from_change).collect()
}

/// Diff summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub creates: usize,
    pub updates: usize,
    pub replacements: usize,
    pub deletes: usize,
}

impl DiffSummary {
    pub fn from_diffs(diffs: &[ChangeDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            match diff.action {
                Action::Create => summary.creates += 1,
                Action::Update => summary.updates += 1,
                Action::Replace => summary.replacements += 1,
                Action::Delete => summary.deletes += 1,
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.creates + self.updates + self.replacements + self.deletes
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Group diffs by resource type
pub fn group_by_type(diffs: &[ChangeDiff]) -> BTreeMap<&str, Vec<&ChangeDiff>> {
    let mut groups: BTreeMap<&str, Vec<&ChangeDiff>> = BTreeMap::new();
    for diff in diffs {
        groups.entry(diff.type_name.as_str()).or_default().push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_lists_configured_differences() {
        let before = json!({"id": "1", "name": "a", "size": 2, "note": "x"});
        let after = json!({"name": "a", "size": 3, "note": null});
        let changes = attribute_changes(Some(&before), Some(&after), &[]);
        assert_eq!(
            changes,
            vec![AttributeChange {
                name: "size".into(),
                before: Some(json!(2)),
                after: Some(json!(3)),
            }]
        );
    }

    #[test]
    fn test_create_and_delete() {
        let config = json!({"name": "a", "id": null});
        let created = attribute_changes(None, Some(&config), &[]);
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].before, None);

        let deleted = attribute_changes(Some(&json!({"id": "1", "name": "a"})), None, &[]);
        assert_eq!(deleted.len(), 2);
        assert!(deleted.iter().all(|c| c.after.is_none()));
    }

    #[test]
    fn test_sensitive_values_masked() {
        let before = json!({"secret": "hash-of-old"});
        let after = json!({"secret": "new-password"});
        let changes = attribute_changes(Some(&before), Some(&after), &["secret"]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].after, Some(json!(SENSITIVE)));
        assert_eq!(changes[0].before, Some(json!(SENSITIVE)));
    }

    #[test]
    fn test_summary_counts() {
        let diff = |action| ChangeDiff {
            address: "t.a".into(),
            type_name: "t".into(),
            action,
            attributes: vec![],
        };
        let diffs = vec![diff(Action::Create), diff(Action::Create), diff(Action::Delete)];
        let summary = DiffSummary::from_diffs(&diffs);
        assert_eq!(summary.creates, 2);
        assert_eq!(summary.deletes, 1);
        assert_eq!(summary.total(), 3);
        assert_eq!(group_by_type(&diffs)["t"].len(), 3);
    }
}
