//! Policy prioritization.
//!
//! A user pins some policies of a profile to positions; the server knows
//! the total order of every policy on that profile. [`reconcile`] merges
//! the two into a complete order to submit.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A policy pinned to a position, 0 being evaluated first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyPriority {
    pub policy_id: String,
    pub priority: usize,
}

impl PolicyPriority {
    pub fn new(policy_id: impl Into<String>, priority: usize) -> Self {
        Self {
            policy_id: policy_id.into(),
            priority,
        }
    }
}

/// Keep only the last `/` segment of a policy reference.
pub fn normalize_policy_id(policy_id: &str) -> &str {
    policy_id.rsplit('/').next().unwrap_or(policy_id)
}

/// Normalize ids and check pins against a profile with `total` policies.
///
/// Priorities must lie in `[0, total)`; ids and priorities must be distinct.
pub fn validate(pins: &[PolicyPriority], total: usize) -> Result<Vec<PolicyPriority>> {
    let mut ids = HashSet::new();
    let mut positions = HashSet::new();
    let mut out = Vec::with_capacity(pins.len());

    for pin in pins {
        let policy_id = normalize_policy_id(&pin.policy_id).to_string();
        if pin.priority >= total {
            return Err(Error::PriorityOutOfRange {
                policy_id,
                priority: pin.priority,
                total,
            });
        }
        if !ids.insert(policy_id.clone()) {
            return Err(Error::DuplicatePolicy(policy_id));
        }
        if !positions.insert(pin.priority) {
            return Err(Error::DuplicatePriority(pin.priority));
        }
        out.push(PolicyPriority::new(policy_id, pin.priority));
    }
    Ok(out)
}

/// Merge user pins into the server's natural order.
///
/// Walks positions `0..N`: a pinned position takes its pinned policy, any
/// other position takes the next server policy that is not pinned
/// elsewhere. The result has exactly `N` entries.
pub fn reconcile(server_order: &[String], pins: &[PolicyPriority]) -> Result<Vec<PolicyPriority>> {
    let total = server_order.len();
    let pins = validate(pins, total)?;

    let server: Vec<&str> = server_order.iter().map(|id| normalize_policy_id(id)).collect();
    for pin in &pins {
        if !server.contains(&pin.policy_id.as_str()) {
            return Err(Error::UnknownPolicy(pin.policy_id.clone()));
        }
    }

    let by_position: HashMap<usize, &str> = pins
        .iter()
        .map(|p| (p.priority, p.policy_id.as_str()))
        .collect();
    let pinned: HashSet<&str> = by_position.values().copied().collect();
    let mut unpinned = server.iter().copied().filter(|id| !pinned.contains(id));

    let mut seen = HashSet::new();
    let mut order = Vec::with_capacity(total);
    for position in 0..total {
        let policy_id = match by_position.get(&position) {
            Some(id) => *id,
            None => match unpinned.next() {
                Some(id) => id,
                None => {
                    return Err(Error::IncompleteOrder {
                        found: order.len(),
                        expected: total,
                    });
                }
            },
        };
        if !seen.insert(policy_id) {
            return Err(Error::DuplicatePolicy(policy_id.to_string()));
        }
        order.push(PolicyPriority::new(policy_id, position));
    }
    Ok(order)
}

/// The server order as a full list of priorities.
pub fn materialize(server_order: &[String]) -> Vec<PolicyPriority> {
    server_order
        .iter()
        .enumerate()
        .map(|(i, id)| PolicyPriority::new(normalize_policy_id(id), i))
        .collect()
}

/// Project the server order back onto the policies the user pinned.
///
/// Pinned policies no longer attached to the profile are dropped, so the
/// next plan shows them as drift.
pub fn project(server_order: &[String], pins: &[PolicyPriority]) -> Vec<PolicyPriority> {
    let positions: HashMap<&str, usize> = server_order
        .iter()
        .enumerate()
        .map(|(i, id)| (normalize_policy_id(id), i))
        .collect();
    pins.iter()
        .filter_map(|pin| {
            let id = normalize_policy_id(&pin.policy_id);
            positions
                .get(id)
                .map(|&priority| PolicyPriority::new(id, priority))
        })
        .collect()
}
