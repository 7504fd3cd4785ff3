//! Progress and confirmation hooks
//!
//! These traits keep the engine free of any terminal or UI dependency.

use crate::types::{Action, ApplyResult};
use anyhow::Result;

/// Progress callback for execution operations
///
/// Changes within a wave run on several threads, so the per-change hooks
/// take `&self`.
pub trait ProgressCallback: Sync {
    /// Called when starting a wave of independent changes
    fn on_wave_start(&self, index: usize, count: usize);

    /// Called when a change starts
    fn on_change_start(&self, address: &str, action: Action);

    /// Called when a change completes
    fn on_change_complete(&self, address: &str, result: &ApplyResult);

    /// Called when a wave completes
    fn on_wave_complete(&self, index: usize);
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    ///
    /// Returns `true` if the user confirmed.
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_wave_start(&self, _index: usize, _count: usize) {}
    fn on_change_start(&self, _address: &str, _action: Action) {}
    fn on_change_complete(&self, _address: &str, _result: &ApplyResult) {}
    fn on_wave_complete(&self, _index: usize) {}
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}
