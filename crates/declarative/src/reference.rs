//! References between resources.
//!
//! A configuration string whose entire value is `${TYPE.NAME.ATTR}` stands
//! for attribute `ATTR` of the resource at address `TYPE.NAME`. References
//! order execution: a resource is applied after every resource it refers
//! to.

use serde_json::Value as Json;
use std::collections::{BTreeMap, BTreeSet};

/// A parsed `${TYPE.NAME.ATTR}` reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Reference {
    pub address: String,
    pub attribute: String,
}

/// Parse a reference if it is the entire value.
pub fn parse_reference(value: &str) -> Option<Reference> {
    let inner = value.trim().strip_prefix("${")?.strip_suffix('}')?;
    let mut parts = inner.split('.');
    let (type_name, name, attribute) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || [type_name, name, attribute].iter().any(|p| p.is_empty()) {
        return None;
    }
    Some(Reference {
        address: format!("{type_name}.{name}"),
        attribute: attribute.to_string(),
    })
}

/// Every reference inside a configuration, in order of appearance.
pub fn references(config: &Json) -> Vec<Reference> {
    let mut out = Vec::new();
    collect(config, &mut out);
    out
}

/// Addresses a configuration refers to.
pub fn referenced_addresses(config: &Json) -> BTreeSet<String> {
    references(config).into_iter().map(|r| r.address).collect()
}

fn collect(value: &Json, out: &mut Vec<Reference>) {
    match value {
        Json::String(s) => out.extend(parse_reference(s)),
        Json::Array(items) => items.iter().for_each(|v| collect(v, out)),
        Json::Object(map) => map.values().for_each(|v| collect(v, out)),
        _ => {}
    }
}

/// Outcome of substituting references.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub config: Json,
    /// References whose target attribute is not known yet.
    pub pending: Vec<Reference>,
}

impl Resolved {
    pub fn is_complete(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Substitute references with attributes from `states`.
///
/// Unresolvable references are left in place and reported as pending.
pub fn resolve(config: &Json, states: &BTreeMap<String, Json>) -> Resolved {
    let mut pending = Vec::new();
    let config = substitute(config, states, &mut pending);
    Resolved { config, pending }
}

fn substitute(value: &Json, states: &BTreeMap<String, Json>, pending: &mut Vec<Reference>) -> Json {
    match value {
        Json::String(s) => match parse_reference(s) {
            Some(reference) => {
                let found = states
                    .get(&reference.address)
                    .and_then(|state| state.get(&reference.attribute))
                    .filter(|v| !v.is_null());
                match found {
                    Some(v) => v.clone(),
                    None => {
                        pending.push(reference);
                        value.clone()
                    }
                }
            }
            None => value.clone(),
        },
        Json::Array(items) => Json::Array(items.iter().map(|v| substitute(v, states, pending)).collect()),
        Json::Object(map) => Json::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, states, pending)))
                .collect(),
        ),
        other => other.clone(),
    }
}
