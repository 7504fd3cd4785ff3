//! Execution planner - compares declared resources with state

use crate::error::{PlanError, Result};
use crate::reference::{referenced_addresses, resolve};
use crate::resource::{BoxedResource, Registry};
use crate::types::{Action, Desired, Tracked, split_address};
use log::debug;
use serde_json::Value as Json;
use std::collections::{BTreeMap, BTreeSet};

/// One change to apply
#[derive(Clone)]
pub struct Change {
    pub address: String,
    pub type_name: String,
    pub action: Action,
    pub resource: BoxedResource,
    /// Configuration to apply; references may still be unresolved. `None`
    /// for deletes.
    pub planned: Option<Json>,
    /// Current state. `None` for creates.
    pub prior: Option<Json>,
    /// Changed addresses this one must wait for
    pub depends_on: BTreeSet<String>,
}

impl std::fmt::Debug for Change {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Change")
            .field("address", &self.address)
            .field("action", &self.action)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

/// Changes needed to converge state on a manifest
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub changes: Vec<Change>,
    /// Attributes of every resource in state when the plan was made
    pub known: BTreeMap<String, Json>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan the changes that turn `current` into `desired`.
    ///
    /// `current` should already be refreshed from the server.
    pub fn build(
        registry: &Registry,
        desired: &[Desired],
        current: &BTreeMap<String, Tracked>,
    ) -> Result<Self> {
        let known: BTreeMap<String, Json> = current
            .iter()
            .map(|(address, tracked)| (address.clone(), tracked.attributes.clone()))
            .collect();

        let mut declared = BTreeSet::new();
        for entry in desired {
            if split_address(&entry.address).is_none() {
                return Err(PlanError::InvalidAddress(entry.address.clone()));
            }
            if !declared.insert(entry.address.as_str()) {
                return Err(PlanError::DuplicateAddress(entry.address.clone()));
            }
        }

        let mut changes = Vec::new();
        for entry in desired {
            let resource = lookup(registry, &entry.address, &entry.type_name)?;
            let refs = referenced_addresses(&entry.config);
            if let Some(target) = refs
                .iter()
                .find(|t| !declared.contains(t.as_str()) && !known.contains_key(*t))
            {
                return Err(PlanError::UnknownReference {
                    address: entry.address.clone(),
                    target: target.clone(),
                });
            }

            let prior = current.get(&entry.address).map(|t| t.attributes.clone());
            if let Some(action) = plan_action(resource, entry, prior.as_ref(), &known)? {
                changes.push(Change {
                    address: entry.address.clone(),
                    type_name: entry.type_name.clone(),
                    action,
                    resource: resource.clone(),
                    planned: Some(entry.config.clone()),
                    prior,
                    depends_on: refs,
                });
            }
        }

        propagate_replacements(&mut changes, desired, registry, current)?;

        // A delete waits for the deletes of everything that referred to it.
        let orphans: Vec<(&String, &Tracked)> = current
            .iter()
            .filter(|(address, _)| !declared.contains(address.as_str()))
            .collect();
        for (address, tracked) in &orphans {
            let resource = lookup(registry, address, &tracked.type_name)?;
            let dependents = orphans
                .iter()
                .filter(|(_, other)| other.depends_on.contains(*address))
                .map(|(other, _)| (*other).clone())
                .collect();
            changes.push(Change {
                address: (*address).clone(),
                type_name: tracked.type_name.clone(),
                action: Action::Delete,
                resource: resource.clone(),
                planned: None,
                prior: Some(tracked.attributes.clone()),
                depends_on: dependents,
            });
        }

        let changed: BTreeSet<String> = changes.iter().map(|c| c.address.clone()).collect();
        for change in &mut changes {
            change.depends_on.retain(|d| changed.contains(d) && *d != change.address);
        }

        Ok(Self { changes, known })
    }

    /// Keep only changes matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(mut self, target: Option<&str>) -> Self {
        if let Some(target) = target {
            self.changes.retain(|c| matches_target(c, target));
            let kept: BTreeSet<String> = self.changes.iter().map(|c| c.address.clone()).collect();
            for change in &mut self.changes {
                change.depends_on.retain(|d| kept.contains(d));
            }
        }
        self
    }

    /// Group changes into waves; every change runs after the waves holding
    /// its dependencies. Deletes come after everything else, dependents
    /// before the resources they referred to.
    pub fn waves(&self) -> Result<Vec<Vec<&Change>>> {
        let (deletes, rest): (Vec<&Change>, Vec<&Change>) = self
            .changes
            .iter()
            .partition(|c| c.action == Action::Delete);

        let mut done: BTreeSet<&str> = BTreeSet::new();
        let mut waves = Vec::new();
        layer(rest, &mut done, &mut waves)?;
        layer(deletes, &mut done, &mut waves)?;
        Ok(waves)
    }

    /// Total number of changes in the plan
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Append the waves of `remaining`, given the addresses already `done`
fn layer<'p>(
    mut remaining: Vec<&'p Change>,
    done: &mut BTreeSet<&'p str>,
    waves: &mut Vec<Vec<&'p Change>>,
) -> Result<()> {
    while !remaining.is_empty() {
        let (ready, blocked): (Vec<&Change>, Vec<&Change>) = remaining
            .into_iter()
            .partition(|c| c.depends_on.iter().all(|d| done.contains(d.as_str())));
        if ready.is_empty() {
            let mut cycle: Vec<String> = blocked.iter().map(|c| c.address.clone()).collect();
            cycle.sort();
            return Err(PlanError::Cycle(cycle));
        }
        done.extend(ready.iter().map(|c| c.address.as_str()));
        waves.push(ready);
        remaining = blocked;
    }
    Ok(())
}

fn lookup<'r>(registry: &'r Registry, address: &str, type_name: &str) -> Result<&'r BoxedResource> {
    registry.get(type_name).ok_or_else(|| PlanError::UnknownType {
        address: address.to_string(),
        type_name: type_name.to_string(),
    })
}

fn plan_action(
    resource: &BoxedResource,
    entry: &Desired,
    prior: Option<&Json>,
    known: &BTreeMap<String, Json>,
) -> Result<Option<Action>> {
    let resolved = resolve(&entry.config, known);
    let Some(prior) = prior else {
        if resolved.is_complete() {
            resource
                .validate(&resolved.config)
                .map_err(|e| PlanError::resource(&entry.address, e))?;
        }
        return Ok(Some(Action::Create));
    };
    if !resolved.is_complete() {
        debug!("{}: references not yet known, planning update", entry.address);
        return Ok(Some(Action::Update));
    }

    let config = &resolved.config;
    let wrap = |e: anyhow::Error| PlanError::resource(&entry.address, e);
    resource.validate(config).map_err(wrap)?;
    if !resource.needs_update(config, prior).map_err(wrap)? {
        return Ok(None);
    }
    if resource.requires_replace(config, prior).map_err(wrap)? {
        return Ok(Some(Action::Replace));
    }
    Ok(Some(Action::Update))
}

/// A replaced resource gets a new id, so anything referring to it must be
/// updated as well.
fn propagate_replacements(
    changes: &mut Vec<Change>,
    desired: &[Desired],
    registry: &Registry,
    current: &BTreeMap<String, Tracked>,
) -> Result<()> {
    loop {
        let replaced: BTreeSet<&str> = changes
            .iter()
            .filter(|c| c.action == Action::Replace)
            .map(|c| c.address.as_str())
            .collect();
        let planned: BTreeSet<&str> = changes.iter().map(|c| c.address.as_str()).collect();
        let mut added = Vec::new();
        for entry in desired {
            if planned.contains(entry.address.as_str()) {
                continue;
            }
            let refs = referenced_addresses(&entry.config);
            if !refs.iter().any(|a| replaced.contains(a.as_str())) {
                continue;
            }
            debug!("{}: refers to a replaced resource, planning update", entry.address);
            added.push(Change {
                address: entry.address.clone(),
                type_name: entry.type_name.clone(),
                action: Action::Update,
                resource: lookup(registry, &entry.address, &entry.type_name)?.clone(),
                planned: Some(entry.config.clone()),
                prior: current.get(&entry.address).map(|t| t.attributes.clone()),
                depends_on: refs,
            });
        }
        if added.is_empty() {
            return Ok(());
        }
        changes.extend(added);
    }
}

fn matches_target(change: &Change, target: &str) -> bool {
    match split_address(target) {
        Some(_) => change.address == target,
        None => change.type_name == target,
    }
}
