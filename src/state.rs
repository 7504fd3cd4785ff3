use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use declarative::{Outcome, StateChange, Tracked};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const STATE_VERSION: u32 = 1;

// ============================================================================
// State Structures
// ============================================================================

/// Entities pamform created or imported, keyed by `type.name`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StateFile {
    pub version: u32,

    /// Last time the state was updated
    pub last_updated: DateTime<Utc>,

    #[serde(default)]
    pub resources: BTreeMap<String, Tracked>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            last_updated: Utc::now(),
            resources: BTreeMap::new(),
        }
    }
}

// ============================================================================
// StateFile Implementation
// ============================================================================

impl StateFile {
    /// Load state from disk, or return default if file doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("State file does not exist, using default state");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read state file: {}", path.display()))?;

        let state: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse state file: {}", path.display()))?;

        if state.version > STATE_VERSION {
            bail!(
                "State file {} has version {}, this build understands up to {STATE_VERSION}",
                path.display(),
                state.version
            );
        }

        log::debug!("Loaded state from {}", path.display());
        Ok(state)
    }

    /// Save state to disk, replacing the previous file atomically
    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.last_updated = Utc::now();
        let content =
            serde_json::to_string_pretty(&self).context("Failed to serialize state to JSON")?;

        let tmp = temp_path(path);
        fs::write(&tmp, content)
            .with_context(|| format!("Failed to write state file: {}", tmp.display()))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace state file: {}", path.display()))?;

        log::debug!("Saved state to {}", path.display());
        Ok(())
    }

    pub fn get(&self, address: &str) -> Option<&Tracked> {
        self.resources.get(address)
    }

    pub fn insert(&mut self, address: impl Into<String>, tracked: Tracked) {
        self.resources.insert(address.into(), tracked);
    }

    pub fn remove(&mut self, address: &str) -> Option<Tracked> {
        self.resources.remove(address)
    }

    /// Record what an execution did; returns the number of entries touched
    pub fn apply_outcomes(&mut self, outcomes: &[Outcome]) -> usize {
        let mut touched = 0;
        for outcome in outcomes {
            match outcome.state_change() {
                StateChange::Keep => continue,
                StateChange::Set(attributes) => {
                    self.resources.insert(
                        outcome.address.clone(),
                        Tracked {
                            type_name: outcome.type_name.clone(),
                            attributes,
                            depends_on: outcome.references.clone(),
                        },
                    );
                }
                StateChange::Remove => {
                    self.resources.remove(&outcome.address);
                }
            }
            touched += 1;
        }
        touched
    }
}

/// Sibling temp file, so the rename stays on one filesystem
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "state".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}
