//! Core types for planning and applying changes

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeSet;
use std::fmt;

/// What a change does to its resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    /// Delete, then create from the new configuration
    Replace,
    Delete,
}

impl Action {
    /// Symbol used in plan output
    pub fn symbol(self) -> &'static str {
        match self {
            Action::Create => "+",
            Action::Update => "~",
            Action::Replace => "-/+",
            Action::Delete => "-",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Replace => "replace",
            Action::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Result of applying one change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ApplyResult {
    Created { state: Json },
    Updated { state: Json },
    Replaced { state: Json },
    Deleted,
    /// Apply failed; `state` holds whatever the server has after a
    /// partial success (e.g. created but not fully configured)
    Failed { error: String, state: Option<Json> },
    Skipped { reason: String },
}

impl ApplyResult {
    /// Check if the result represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }

    /// New state to store, if the result changes what state holds
    pub fn new_state(&self) -> Option<&Json> {
        match self {
            Self::Created { state } | Self::Updated { state } | Self::Replaced { state } => {
                Some(state)
            }
            Self::Failed { state, .. } => state.as_ref(),
            Self::Deleted | Self::Skipped { .. } => None,
        }
    }
}

/// Summary of execution results
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecuteSummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ExecuteSummary {
    /// Total number of actual changes made
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.replaced + self.deleted
    }

    /// Check if execution was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Total number of changes processed
    pub fn total(&self) -> usize {
        self.total_changes() + self.skipped + self.failed
    }

    /// Add a result to the summary
    pub fn add_result(&mut self, result: &ApplyResult) {
        match result {
            ApplyResult::Created { .. } => self.created += 1,
            ApplyResult::Updated { .. } => self.updated += 1,
            ApplyResult::Replaced { .. } => self.replaced += 1,
            ApplyResult::Deleted => self.deleted += 1,
            ApplyResult::Failed { .. } => self.failed += 1,
            ApplyResult::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// Default number of changes applied at once
pub const DEFAULT_JOBS: usize = 10;

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of changes applied in parallel
    pub jobs: usize,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            jobs: DEFAULT_JOBS,
        }
    }
}

/// A resource as recorded in state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracked {
    #[serde(rename = "type")]
    pub type_name: String,
    pub attributes: Json,
    /// Addresses its configuration referred to when last applied
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub depends_on: BTreeSet<String>,
}

impl Tracked {
    pub fn new(type_name: impl Into<String>, attributes: Json) -> Self {
        Self {
            type_name: type_name.into(),
            attributes,
            depends_on: BTreeSet::new(),
        }
    }
}

/// A resource as declared in a manifest
#[derive(Debug, Clone, PartialEq)]
pub struct Desired {
    pub address: String,
    pub type_name: String,
    pub config: Json,
}

impl Desired {
    pub fn new(type_name: &str, name: &str, config: Json) -> Self {
        Self {
            address: format!("{type_name}.{name}"),
            type_name: type_name.to_string(),
            config,
        }
    }
}

/// How state changes after a change ran
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    Keep,
    Set(Json),
    Remove,
}

/// Split an address `type.name` into its parts
pub fn split_address(address: &str) -> Option<(&str, &str)> {
    address
        .split_once('.')
        .filter(|(t, n)| !t.is_empty() && !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary() {
        let mut summary = ExecuteSummary::default();
        summary.add_result(&ApplyResult::Created { state: json!({}) });
        summary.add_result(&ApplyResult::Deleted);
        summary.add_result(&ApplyResult::Failed {
            error: "boom".into(),
            state: Some(json!({"id": "a1"})),
        });
        assert_eq!(summary.total_changes(), 2);
        assert_eq!(summary.total(), 3);
        assert!(!summary.is_success());
    }

    #[test]
    fn test_failed_keeps_partial_state() {
        let failed = ApplyResult::Failed {
            error: "patch failed".into(),
            state: Some(json!({"id": "a1"})),
        };
        assert_eq!(failed.new_state(), Some(&json!({"id": "a1"})));
        assert!(ApplyResult::Deleted.new_state().is_none());
    }

    #[test]
    fn test_desired_address() {
        let desired = Desired::new("profile", "ops", json!({}));
        assert_eq!(desired.address, "profile.ops");
    }

    #[test]
    fn test_split_address() {
        assert_eq!(split_address("profile.ops"), Some(("profile", "ops")));
        assert_eq!(split_address("profile.ops.v2"), Some(("profile", "ops.v2")));
        assert_eq!(split_address("profile"), None);
        assert_eq!(split_address(".ops"), None);
    }
}
