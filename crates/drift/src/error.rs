//! Error types for reconciliation.

use thiserror::Error;

/// Result type alias for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reconciling configured and server state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The same sensitive property carries two unrelated values.
    #[error("conflicting sensitive values for property {name:?}")]
    ConflictingSensitiveValues {
        /// Property name.
        name: String,
    },

    /// A property name appears in both the plain and the sensitive list,
    /// or twice in the plain list.
    #[error("property {0:?} is declared more than once")]
    DuplicateProperty(String),

    /// The hashing backend rejected its input.
    #[error("sensitive value hashing failed: {0}")]
    Hash(String),

    /// A pinned priority does not fit the profile's policy count.
    #[error("priority {priority} for policy {policy_id:?} is out of range [0, {total})")]
    PriorityOutOfRange {
        /// Policy the priority was pinned for.
        policy_id: String,
        /// The requested position.
        priority: usize,
        /// Number of policies attached to the profile.
        total: usize,
    },

    /// A policy id appears twice, in the input or in the computed order.
    #[error("policy {0:?} appears more than once in the priority order")]
    DuplicatePolicy(String),

    /// Two policies were pinned to the same position.
    #[error("priority {0} is assigned to more than one policy")]
    DuplicatePriority(usize),

    /// A pinned policy is not attached to the profile.
    #[error("policy {0:?} is not attached to the profile")]
    UnknownPolicy(String),

    /// The computed order ran out of server policies before every slot was filled.
    #[error("computed priority order has {found} entries, expected {expected}")]
    IncompleteOrder {
        /// Entries produced.
        found: usize,
        /// Entries required.
        expected: usize,
    },

    /// A duration string could not be parsed.
    #[error("invalid duration {input:?}: {reason}")]
    InvalidDuration {
        /// The text the user wrote.
        input: String,
        /// What was wrong with it.
        reason: String,
    },
}
