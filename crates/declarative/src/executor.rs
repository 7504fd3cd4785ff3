//! Execution engine - applies a plan wave by wave with bounded parallelism

use crate::context::{ConfirmCallback, ProgressCallback};
use crate::error::PartialApply;
use crate::planner::{Change, ExecutionPlan};
use crate::reference::{referenced_addresses, resolve};
use crate::types::{Action, ApplyResult, ExecuteOptions, ExecuteSummary, StateChange};
use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;
use serde_json::Value as Json;
use std::collections::{BTreeMap, BTreeSet};

/// Result of one change
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub address: String,
    pub type_name: String,
    pub action: Action,
    pub result: ApplyResult,
    /// Addresses the applied configuration refers to
    pub references: BTreeSet<String>,
}

impl Outcome {
    /// How the state entry for this address should change
    pub fn state_change(&self) -> StateChange {
        match (&self.result, self.action) {
            (ApplyResult::Deleted, _) => StateChange::Remove,
            (ApplyResult::Skipped { .. }, _) => StateChange::Keep,
            (ApplyResult::Failed { state: None, .. }, Action::Replace) => StateChange::Remove,
            (result, _) => result
                .new_state()
                .map_or(StateChange::Keep, |state| StateChange::Set(state.clone())),
        }
    }
}

/// Everything that happened during an execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteReport {
    pub outcomes: Vec<Outcome>,
    pub summary: ExecuteSummary,
}

impl ExecuteReport {
    fn push(&mut self, outcome: Outcome) {
        self.summary.add_result(&outcome.result);
        self.outcomes.push(outcome);
    }
}

/// Execute a plan with the given options and callbacks
///
/// Waves run in order; the changes of one wave run on a pool of
/// `opts.jobs` threads. A change whose dependency failed is skipped.
pub fn execute<P, C>(
    plan: &ExecutionPlan,
    opts: &ExecuteOptions,
    progress: &P,
    confirm: &mut C,
) -> Result<ExecuteReport>
where
    P: ProgressCallback,
    C: ConfirmCallback,
{
    let waves = plan.waves()?;
    let mut report = ExecuteReport::default();
    if plan.is_empty() {
        return Ok(report);
    }

    if opts.dry_run {
        for change in &plan.changes {
            report.push(skipped(change, "dry run".to_string()));
        }
        return Ok(report);
    }

    let prompt = format!("Apply {} change(s)?", plan.len());
    if !confirm.confirm(&prompt)? {
        for change in &plan.changes {
            report.push(skipped(change, "not confirmed".to_string()));
        }
        return Ok(report);
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.jobs.max(1))
        .build()
        .context("Failed to create thread pool")?;

    let mut states = plan.known.clone();
    let mut unapplied: BTreeSet<String> = BTreeSet::new();

    for (index, wave) in waves.iter().enumerate() {
        progress.on_wave_start(index, wave.len());
        let outcomes: Vec<Outcome> = pool.install(|| {
            wave.par_iter()
                .map(|change| {
                    if let Some(dep) = change.depends_on.iter().find(|d| unapplied.contains(*d)) {
                        let outcome = skipped(change, format!("{dep} was not applied"));
                        progress.on_change_complete(&change.address, &outcome.result);
                        return outcome;
                    }
                    progress.on_change_start(&change.address, change.action);
                    let result = apply_change(change, &states);
                    progress.on_change_complete(&change.address, &result);
                    Outcome {
                        address: change.address.clone(),
                        type_name: change.type_name.clone(),
                        action: change.action,
                        result,
                        references: references(change),
                    }
                })
                .collect()
        });

        for outcome in outcomes {
            match &outcome.result {
                ApplyResult::Failed { error, .. } => {
                    warn!("{} {}: {error}", outcome.action, outcome.address);
                    unapplied.insert(outcome.address.clone());
                }
                ApplyResult::Skipped { .. } => {
                    unapplied.insert(outcome.address.clone());
                }
                _ => info!("{} {}", outcome.action, outcome.address),
            }
            match outcome.state_change() {
                StateChange::Set(state) => {
                    states.insert(outcome.address.clone(), state);
                }
                StateChange::Remove => {
                    states.remove(&outcome.address);
                }
                StateChange::Keep => {}
            }
            report.push(outcome);
        }
        progress.on_wave_complete(index);
    }

    Ok(report)
}

fn skipped(change: &Change, reason: String) -> Outcome {
    Outcome {
        address: change.address.clone(),
        type_name: change.type_name.clone(),
        action: change.action,
        result: ApplyResult::Skipped { reason },
        references: references(change),
    }
}

fn references(change: &Change) -> BTreeSet<String> {
    change.planned.as_ref().map(referenced_addresses).unwrap_or_default()
}

/// Apply a single change
fn apply_change(change: &Change, states: &BTreeMap<String, Json>) -> ApplyResult {
    let resource = &change.resource;

    if change.action == Action::Delete {
        let Some(prior) = &change.prior else {
            return ApplyResult::Deleted;
        };
        return match resource.delete(prior) {
            Ok(()) => ApplyResult::Deleted,
            Err(e) => failure(e, None),
        };
    }

    let Some(planned) = &change.planned else {
        return ApplyResult::Failed {
            error: "no configuration to apply".to_string(),
            state: None,
        };
    };
    let resolved = resolve(planned, states);
    if let Some(pending) = resolved.pending.first() {
        return ApplyResult::Failed {
            error: format!("unresolved reference to {}.{}", pending.address, pending.attribute),
            state: None,
        };
    }
    let config = &resolved.config;

    match (change.action, &change.prior) {
        (Action::Update, Some(prior)) => match resource.update(config, prior) {
            Ok(state) => ApplyResult::Updated { state },
            Err(e) => failure(e, None),
        },
        (Action::Replace, Some(prior)) => {
            if let Err(e) = resource.delete(prior) {
                return failure(e, Some(prior.clone()));
            }
            match resource.create(config) {
                Ok(state) => ApplyResult::Replaced { state },
                Err(e) => failure(e, None),
            }
        }
        _ => match resource.create(config) {
            Ok(state) => ApplyResult::Created { state },
            Err(e) => failure(e, None),
        },
    }
}

fn failure(error: anyhow::Error, fallback: Option<Json>) -> ApplyResult {
    match error.downcast_ref::<PartialApply>() {
        Some(partial) => ApplyResult::Failed {
            error: partial.message.clone(),
            state: Some(partial.state.clone()),
        },
        None => ApplyResult::Failed {
            error: format!("{error:#}"),
            state: fallback,
        },
    }
}

/// Execute without progress reporting or confirmation
pub fn execute_simple(plan: &ExecutionPlan, opts: &ExecuteOptions) -> Result<ExecuteReport> {
    use crate::context::{AutoConfirm, NoProgress};

    execute(plan, opts, &NoProgress, &mut AutoConfirm)
}
