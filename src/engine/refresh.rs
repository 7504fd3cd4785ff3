//! Re-read tracked entities before planning

use anyhow::{Context, Result};
use declarative::{Registry, Tracked};
use rayon::prelude::*;
use serde_json::Value as Json;

use crate::progress;
use crate::state::StateFile;

/// What a refresh found
#[derive(Debug, Default)]
pub struct RefreshReport {
    pub refreshed: usize,
    /// Addresses whose entity no longer exists; dropped from state
    pub gone: Vec<String>,
    /// Addresses that could not be read; left untouched
    pub failed: Vec<(String, String)>,
}

impl RefreshReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

enum ReadOutcome {
    Found(Json),
    Gone,
    Failed(String),
}

fn read_one(registry: &Registry, tracked: &Tracked) -> ReadOutcome {
    let Some(resource) = registry.get(&tracked.type_name) else {
        return ReadOutcome::Failed(format!("unknown resource type {}", tracked.type_name));
    };
    match resource.read(&tracked.attributes) {
        Ok(Some(state)) => ReadOutcome::Found(state),
        Ok(None) => ReadOutcome::Gone,
        Err(e) => ReadOutcome::Failed(format!("{e:#}")),
    }
}

/// Read every state entry on `jobs` threads and fold the results into state
pub fn refresh(
    registry: &Registry,
    state: &mut StateFile,
    jobs: usize,
    quiet: bool,
) -> Result<RefreshReport> {
    let entries: Vec<(String, Tracked)> = state
        .resources
        .iter()
        .map(|(address, tracked)| (address.clone(), tracked.clone()))
        .collect();
    let mut report = RefreshReport::default();
    if entries.is_empty() {
        return Ok(report);
    }

    let pb = progress::bar(entries.len(), quiet)?;
    pb.set_message("Refreshing");
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .context("Failed to create refresh thread pool")?;

    let results: Vec<(String, Tracked, ReadOutcome)> = pool.install(|| {
        entries
            .par_iter()
            .map(|(address, tracked)| {
                let outcome = read_one(registry, tracked);
                pb.set_message(address.clone());
                pb.inc(1);
                (address.clone(), tracked.clone(), outcome)
            })
            .collect()
    });
    pb.finish_and_clear();

    for (address, tracked, outcome) in results {
        match outcome {
            ReadOutcome::Found(attributes) => {
                state.insert(address, Tracked { attributes, ..tracked });
                report.refreshed += 1;
            }
            ReadOutcome::Gone => {
                log::info!("{address} no longer exists, dropping from state");
                state.remove(&address);
                report.gone.push(address);
            }
            ReadOutcome::Failed(error) => {
                log::warn!("Could not refresh {address}: {error}");
                report.failed.push((address, error));
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{Resource, Value};
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct Item {
        #[serde(default)]
        id: Value<String>,
        #[serde(default)]
        size: u32,
    }

    struct Items;

    impl Resource for Items {
        type State = Item;

        fn type_name(&self) -> &'static str {
            "item"
        }

        fn create(&self, plan: &Item) -> anyhow::Result<Item> {
            Ok(plan.clone())
        }

        fn read(&self, prior: &Item) -> anyhow::Result<Option<Item>> {
            match prior.id.known().map(String::as_str) {
                Some("gone") => Ok(None),
                Some("broken") => anyhow::bail!("server error"),
                _ => Ok(Some(Item {
                    size: 9,
                    ..prior.clone()
                })),
            }
        }

        fn update(&self, plan: &Item, _prior: &Item) -> anyhow::Result<Item> {
            Ok(plan.clone())
        }

        fn delete(&self, _prior: &Item) -> anyhow::Result<()> {
            Ok(())
        }

        fn import(&self, id: &str) -> anyhow::Result<Item> {
            Ok(Item {
                id: Value::Known(id.to_string()),
                size: 0,
            })
        }
    }

    fn tracked(type_name: &str, id: &str) -> Tracked {
        Tracked::new(type_name, json!({"id": id, "size": 1}))
    }

    #[test]
    fn test_refresh_folds_results() {
        let mut registry = Registry::new();
        registry.register(Items);

        let mut state = StateFile::default();
        state.insert("item.a", tracked("item", "a"));
        state.insert("item.b", tracked("item", "gone"));
        state.insert("item.c", tracked("item", "broken"));
        state.insert("widget.d", tracked("widget", "d"));

        let report = refresh(&registry, &mut state, 4, true).unwrap();

        assert_eq!(report.refreshed, 1);
        assert_eq!(report.gone, vec!["item.b".to_string()]);
        assert_eq!(report.failed.len(), 2);
        assert!(!report.is_success());
        assert_eq!(state.get("item.a").unwrap().attributes["size"], 9);
        assert!(state.get("item.b").is_none());
        assert_eq!(state.get("item.c").unwrap().attributes["size"], 1);
        assert!(state.get("widget.d").is_some());
    }
}
