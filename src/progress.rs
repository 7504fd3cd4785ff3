//! Progress indicators for apply and refresh.

use anyhow::{Context, Result};
use declarative::{Action, ApplyResult, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// A bar with the standard style
pub fn bar(len: usize, quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(TEMPLATE)
            .context("Invalid progress template")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

/// Symbol shown next to a finished change
pub fn result_symbol(result: &ApplyResult) -> &'static str {
    match result {
        ApplyResult::Created { .. }
        | ApplyResult::Updated { .. }
        | ApplyResult::Replaced { .. }
        | ApplyResult::Deleted => "✓",
        ApplyResult::Failed { .. } => "✗",
        ApplyResult::Skipped { .. } => "⊘",
    }
}

/// Drives a progress bar from engine callbacks
pub struct BarProgress {
    pb: ProgressBar,
}

impl BarProgress {
    pub fn new(total: usize, quiet: bool) -> Result<Self> {
        Ok(Self {
            pb: bar(total, quiet)?,
        })
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

impl ProgressCallback for BarProgress {
    fn on_wave_start(&self, index: usize, count: usize) {
        log::debug!("wave {index}: {count} change(s)");
    }

    fn on_change_start(&self, address: &str, action: Action) {
        self.pb.set_message(format!("{} {address}", action.symbol()));
    }

    fn on_change_complete(&self, address: &str, result: &ApplyResult) {
        self.pb
            .set_message(format!("{} {address}", result_symbol(result)));
        self.pb.inc(1);
    }

    fn on_wave_complete(&self, _index: usize) {}
}
