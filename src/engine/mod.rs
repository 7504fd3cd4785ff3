//! Terminal side of the lifecycle engine
//!
//! 1. Refreshing - re-read tracked entities from the tenant
//! 2. Diffing - display what a plan changes
//! 3. Executing - confirm, apply with progress, summarize

pub mod differ;
pub mod executor;
pub mod refresh;

pub use differ::display_diff;
pub use executor::{ApplyOptions, apply};
pub use refresh::{RefreshReport, refresh};
