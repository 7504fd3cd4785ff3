use anyhow::{Result, bail};

use crate::Context;
use crate::cli::ApplyArgs;
use crate::engine::{self, ApplyOptions};

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<()> {
    let (plan, mut state) = super::prepare(
        ctx,
        &args.manifest,
        args.target.as_deref(),
        !args.no_refresh,
        args.jobs,
    )?;

    let opts = ApplyOptions {
        dry_run: args.dry_run,
        jobs: args.jobs,
        yes: args.yes,
        verbose: ctx.verbose > 0,
        quiet: ctx.quiet,
    };
    let report = engine::apply(&plan, &opts)?;

    if args.dry_run {
        return Ok(());
    }

    // Partial results are recorded even when some changes failed.
    if state.apply_outcomes(&report.outcomes) > 0 {
        state.save(&ctx.state)?;
    }

    if !report.summary.is_success() {
        bail!("{} change(s) failed", report.summary.failed);
    }
    Ok(())
}
