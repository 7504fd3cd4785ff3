//! Subcommand implementations

pub mod apply;
pub mod import;
pub mod plan;
pub mod refresh;
pub mod state;
pub mod types;

use anyhow::{Context as _, Result};
use declarative::{ExecutionPlan, Registry};
use std::path::Path;

use crate::Context;
use crate::config::{ProviderBlock, ProviderConfig};
use crate::engine;
use crate::manifest::Manifest;
use crate::resource::{self, Api};
use crate::state::StateFile;
use crate::ui;

/// Registry bound to the configured tenant
pub(crate) fn connect(ctx: &Context, provider: Option<&ProviderBlock>) -> Result<Registry> {
    let config = ProviderConfig::load(ctx.config.as_deref(), provider)?;
    log::debug!("Using tenant {}", config.base_url);
    let api = Api::new(config.client(), pamclient::CancelToken::new());
    Ok(resource::registry(&api))
}

/// Refresh state, reporting what changed on the tenant
pub(crate) fn refresh_state(
    ctx: &Context,
    registry: &Registry,
    state: &mut StateFile,
    jobs: usize,
) -> Result<engine::RefreshReport> {
    let report = engine::refresh(registry, state, jobs, ctx.quiet)?;
    for address in &report.gone {
        ui::warn(&format!("{address} was deleted outside pamform"));
    }
    for (address, error) in &report.failed {
        ui::error(&format!("Could not refresh {address}: {error}"));
    }
    Ok(report)
}

/// Load a manifest and state and plan the changes between them.
pub(crate) fn prepare(
    ctx: &Context,
    manifest_path: &Path,
    target: Option<&str>,
    refresh: bool,
    jobs: usize,
) -> Result<(ExecutionPlan, StateFile)> {
    let manifest = Manifest::load(manifest_path)?;
    let registry = connect(ctx, manifest.provider.as_ref())?;
    let mut state = StateFile::load(&ctx.state)?;

    if refresh {
        refresh_state(ctx, &registry, &mut state, jobs)?;
    }

    let plan = ExecutionPlan::build(&registry, &manifest.desired(), &state.resources)
        .with_context(|| format!("Failed to plan {}", manifest_path.display()))?
        .filter_by_target(target);
    Ok((plan, state))
}
