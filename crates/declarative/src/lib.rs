//! # Declarative
//!
//! A framework for declarative management of remote entities.
//!
//! Callers declare the entities they want, keep a record of what was
//! created, and let the engine work out and apply the difference.
//!
//! ## Core Concepts
//!
//! - **Resource**: one kind of remote entity with create, read, update,
//!   delete and import verbs, working on a typed state
//! - **Value**: tri-state attribute (unknown, null, known)
//! - **ExecutionPlan**: the changes that converge state on a manifest,
//!   ordered by `${type.name.attr}` references between resources
//! - **Executor**: applies a plan wave by wave on a bounded thread pool
//!
//! ## Example
//!
//! ```
//! use declarative::{
//!     Desired, ExecuteOptions, ExecutionPlan, Registry, Resource, Value, execute_simple,
//! };
//! use serde::{Deserialize, Serialize};
//! use std::collections::BTreeMap;
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct NoteState {
//!     #[serde(default)]
//!     id: Value<String>,
//!     text: String,
//! }
//!
//! struct Note;
//!
//! impl Resource for Note {
//!     type State = NoteState;
//!     fn type_name(&self) -> &'static str { "note" }
//!     fn create(&self, plan: &NoteState) -> anyhow::Result<NoteState> {
//!         Ok(NoteState { id: Value::Known("n1".into()), ..plan.clone() })
//!     }
//!     fn read(&self, prior: &NoteState) -> anyhow::Result<Option<NoteState>> {
//!         Ok(Some(prior.clone()))
//!     }
//!     fn update(&self, plan: &NoteState, prior: &NoteState) -> anyhow::Result<NoteState> {
//!         Ok(NoteState { id: prior.id.clone(), ..plan.clone() })
//!     }
//!     fn delete(&self, _prior: &NoteState) -> anyhow::Result<()> { Ok(()) }
//!     fn import(&self, id: &str) -> anyhow::Result<NoteState> {
//!         Ok(NoteState { id: Value::Known(id.into()), ..NoteState::default() })
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry.register(Note);
//!
//! let desired = vec![Desired::new("note", "hello", serde_json::json!({"text": "hi"}))];
//! let plan = ExecutionPlan::build(&registry, &desired, &BTreeMap::new())?;
//! let report = execute_simple(&plan, &ExecuteOptions::default())?;
//! assert_eq!(report.summary.created, 1);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Provider Traits
//!
//! - [`ProgressCallback`]: Receives progress updates
//! - [`ConfirmCallback`]: Handles user confirmations
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks.

#![warn(clippy::all)]

pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod planner;
pub mod reference;
pub mod resource;
pub mod types;
pub mod value;

// Re-export main types at crate root
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{
    AttributeChange, ChangeDiff, DiffSummary, SENSITIVE, attribute_changes, compute_diffs,
    group_by_type,
};
pub use error::{PartialApply, PlanError};
pub use executor::{ExecuteReport, Outcome, execute, execute_simple};
pub use planner::{Change, ExecutionPlan};
pub use reference::{Reference, parse_reference, referenced_addresses};
pub use resource::{
    BoxedResource, DynResource, Registry, Resource, configured_differs, import_and_read,
};
pub use types::{
    Action, ApplyResult, DEFAULT_JOBS, Desired, ExecuteOptions, ExecuteSummary, StateChange,
    Tracked, split_address,
};
pub use value::Value;
