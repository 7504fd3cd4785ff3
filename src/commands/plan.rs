use anyhow::Result;
use declarative::{DEFAULT_JOBS, DiffSummary, compute_diffs};

use crate::Context;
use crate::cli::PlanArgs;
use crate::engine::display_diff;

pub fn run(ctx: &Context, args: PlanArgs) -> Result<()> {
    let (plan, _) = super::prepare(
        ctx,
        &args.manifest,
        args.target.as_deref(),
        !args.no_refresh,
        DEFAULT_JOBS,
    )?;

    let diffs = compute_diffs(&plan);
    display_diff(&diffs, ctx.verbose > 0);

    let summary = DiffSummary::from_diffs(&diffs);
    if summary.has_changes() && !ctx.quiet {
        println!();
        println!("  Run `pamform apply` to make these {} change(s).", summary.total());
    }
    Ok(())
}
