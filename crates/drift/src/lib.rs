//! # drift
//!
//! Drift-tolerant reconciliation between what a user configured and what
//! the server returns.
//!
//! The server frequently hands back an equivalent but differently spelled
//! value: JSON with reordered keys, member lists in another order, durations
//! in milliseconds, secrets masked as `*`. Treating every such difference as
//! drift would produce a change on every plan. This crate provides the
//! equivalence checks and merge rules that let read paths keep the user's
//! phrasing whenever it still means the same thing.
//!
//! ## Modules
//!
//! - [`semantic`]: order-insensitive equality for JSON blobs, member blocks,
//!   label maps and constraints
//! - [`sensitive`]: masked secret merging and argon2id equality checks
//! - [`priority`]: merging pinned policy priorities with the server order
//! - [`duration`]: `2h30m0s`-style durations against server milliseconds

#![warn(clippy::all)]

pub mod duration;
pub mod error;
pub mod priority;
pub mod semantic;
pub mod sensitive;

pub use error::{Error, Result};
pub use priority::PolicyPriority;
pub use sensitive::Property;
