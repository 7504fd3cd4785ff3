use anyhow::{Result, bail};
use declarative::DEFAULT_JOBS;

use crate::Context;
use crate::state::StateFile;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let mut state = StateFile::load(&ctx.state)?;
    if state.resources.is_empty() {
        ui::info("Nothing tracked yet");
        return Ok(());
    }

    let registry = super::connect(ctx, None)?;
    let report = super::refresh_state(ctx, &registry, &mut state, DEFAULT_JOBS)?;
    state.save(&ctx.state)?;

    if !report.is_success() {
        bail!("{} resource(s) could not be refreshed", report.failed.len());
    }
    if !ctx.quiet {
        ui::success(&format!(
            "Refreshed {} resource(s), {} gone",
            report.refreshed,
            report.gone.len()
        ));
    }
    Ok(())
}
