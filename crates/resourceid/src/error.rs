//! Error types for identifier encoding and parsing.

use thiserror::Error;

/// Result type alias for identifier operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while parsing opaque or import identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The identifier does not have the expected structure.
    #[error("invalid resource id {id:?}: {reason}")]
    InvalidResourceId {
        /// The offending identifier, verbatim.
        id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A user-visible field was empty or whitespace only.
    #[error("{field} must not be empty or whitespace")]
    EmptyField {
        /// Name of the field.
        field: String,
    },

    /// An import identifier matched none of the accepted shapes.
    #[error("import id {id:?} does not match expected formats: {}", .formats.join(", "))]
    UnmatchedImportId {
        /// The identifier the user typed.
        id: String,
        /// The accepted patterns, in the order they were tried.
        formats: Vec<String>,
    },

    /// An import pattern failed to compile.
    #[error("invalid import pattern {pattern:?}: {message}")]
    InvalidPattern {
        /// The pattern source.
        pattern: String,
        /// Compiler message from the regex engine.
        message: String,
    },
}

impl Error {
    pub(crate) fn invalid(id: &str, reason: impl Into<String>) -> Self {
        Self::InvalidResourceId {
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether this error describes a malformed identifier.
    pub fn is_invalid_id(&self) -> bool {
        matches!(
            self,
            Self::InvalidResourceId { .. } | Self::UnmatchedImportId { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmatched_lists_id_and_formats() {
        let err = Error::UnmatchedImportId {
            id: "a/b/c".to_string(),
            formats: vec!["^x$".to_string(), "^y$".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("\"a/b/c\""));
        assert!(msg.contains("^x$, ^y$"));
        assert!(err.is_invalid_id());
    }

    #[test]
    fn test_empty_field_display() {
        let err = Error::EmptyField {
            field: "profile_id".to_string(),
        };
        assert_eq!(err.to_string(), "profile_id must not be empty or whitespace");
        assert!(!err.is_invalid_id());
    }
}
