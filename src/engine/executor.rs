//! Apply a plan with terminal confirmation, progress and summary

use anyhow::Result;
use colored::Colorize;
use declarative::{
    ApplyResult, ConfirmCallback, ExecuteOptions, ExecuteReport, ExecuteSummary, ExecutionPlan,
    compute_diffs,
};

use super::differ::display_diff;
use crate::progress::BarProgress;

/// Options for applying (adds `yes` for confirmation skip)
#[derive(Debug, Clone)]
pub struct ApplyOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Number of parallel operations
    pub jobs: usize,
    /// Skip confirmation prompts
    pub yes: bool,
    pub verbose: bool,
    pub quiet: bool,
}

/// Asks on the terminal unless `--yes` was given
struct TerminalConfirm {
    yes: bool,
    declined: bool,
}

impl ConfirmCallback for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.yes {
            return Ok(true);
        }
        println!();
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()?;
        self.declined = !confirmed;
        Ok(confirmed)
    }
}

/// Show the plan, confirm and execute it
pub fn apply(plan: &ExecutionPlan, opts: &ApplyOptions) -> Result<ExecuteReport> {
    display_diff(&compute_diffs(plan), opts.verbose);

    if plan.is_empty() {
        return Ok(ExecuteReport::default());
    }

    let progress = BarProgress::new(plan.len(), opts.quiet || opts.dry_run)?;
    let mut confirm = TerminalConfirm {
        yes: opts.yes,
        declined: false,
    };
    let exec_opts = ExecuteOptions {
        dry_run: opts.dry_run,
        jobs: opts.jobs,
    };
    let report = declarative::execute(plan, &exec_opts, &progress, &mut confirm)?;
    progress.finish();

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
    } else if confirm.declined {
        println!();
        println!("  {} Aborted", "✗".red());
    } else {
        print_failures(&report);
        print_summary(&report.summary);
    }

    Ok(report)
}

fn print_failures(report: &ExecuteReport) {
    let failed: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|o| match &o.result {
            ApplyResult::Failed { error, .. } => Some((o, error)),
            _ => None,
        })
        .collect();
    if failed.is_empty() {
        return;
    }

    println!();
    for (outcome, error) in failed {
        println!(
            "  {} {} {}: {}",
            "✗".red(),
            outcome.action,
            outcome.address.bold(),
            error
        );
    }
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!(
            "  {} Configuration applied successfully!",
            "✓".green().bold()
        );
    } else {
        println!(
            "  {} Configuration applied with errors",
            "⚠".yellow().bold()
        );
    }

    if summary.created > 0 {
        println!("    • {} resources created", summary.created);
    }
    if summary.updated > 0 {
        println!("    • {} resources updated", summary.updated);
    }
    if summary.replaced > 0 {
        println!("    • {} resources replaced", summary.replaced);
    }
    if summary.deleted > 0 {
        println!("    • {} resources removed", summary.deleted);
    }
    if summary.skipped > 0 {
        println!("    • {} resources skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {} failed", summary.failed, "resources".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_skips_prompt() {
        let mut confirm = TerminalConfirm {
            yes: true,
            declined: false,
        };
        assert!(confirm.confirm("Apply 3 change(s)?").unwrap());
    }

    #[test]
    fn test_empty_plan_is_noop() {
        let opts = ApplyOptions {
            dry_run: false,
            jobs: 2,
            yes: true,
            verbose: false,
            quiet: true,
        };
        let report = apply(&ExecutionPlan::new(), &opts).unwrap();
        assert_eq!(report.summary.total(), 0);
    }
}
