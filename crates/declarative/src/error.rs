//! Error types for planning and applying.

use serde::Serialize;
use serde_json::Value as Json;

/// Result type alias for planning.
pub type Result<T> = std::result::Result<T, PlanError>;

/// A manifest that cannot be turned into a plan.
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("unknown resource type '{type_name}' at {address}")]
    UnknownType { address: String, type_name: String },

    #[error("resource {0} is declared more than once")]
    DuplicateAddress(String),

    #[error("invalid address '{0}', expected TYPE.NAME")]
    InvalidAddress(String),

    #[error("{address} refers to {target}, which is neither declared nor in state")]
    UnknownReference { address: String, target: String },

    #[error("reference cycle between {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("{address}: {source:#}")]
    Resource {
        address: String,
        #[source]
        source: anyhow::Error,
    },
}

impl PlanError {
    pub(crate) fn resource(address: &str, source: anyhow::Error) -> Self {
        Self::Resource {
            address: address.to_string(),
            source,
        }
    }
}

/// An apply step that failed after the remote entity was changed.
///
/// Resources return this (through `anyhow`) when an entity exists on the
/// server but a later step failed, so the engine still records it in state.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct PartialApply {
    pub state: Json,
    pub message: String,
}

impl PartialApply {
    /// Wrap `error`, keeping `state` as what the server now holds.
    pub fn error<S: Serialize>(state: &S, error: impl std::fmt::Display) -> anyhow::Error {
        match serde_json::to_value(state) {
            Ok(state) => anyhow::Error::new(Self {
                state,
                message: error.to_string(),
            }),
            Err(encode) => anyhow::anyhow!("{error} (state not recorded: {encode})"),
        }
    }
}
