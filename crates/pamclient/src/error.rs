//! Error types for tenant API operations.
//!
//! Errors are categorized so callers can decide what a failure means for
//! state: a read that ends in [`ErrorCategory::NotFound`] removes the entity
//! from state, a 204 is a success in disguise, and everything else is
//! surfaced to the user.

use std::fmt;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of client errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The entity no longer exists on the server.
    NotFound,
    /// HTTP 204; a success sentinel.
    NoContent,
    /// An input fell outside an enumerated set.
    NotSupported,
    /// An opaque or import identifier failed to parse.
    InvalidId,
    /// A structural or value precondition failed before any request.
    Validation,
    /// The server rejected the request.
    Server,
    /// Connection or decoding failure.
    Network,
    /// The caller cancelled the operation.
    Cancelled,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Entity not found",
            Self::NoContent => "No content",
            Self::NotSupported => "Not supported",
            Self::InvalidId => "Invalid resource id",
            Self::Validation => "Invalid configuration",
            Self::Server => "Rejected by the server",
            Self::Network => "Network or decoding issue",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "The entity was removed outside of pamform; refresh to drop it from state",
            Self::NoContent => "No action needed",
            Self::NotSupported => "Check the value against the documented choices",
            Self::InvalidId => "Check the id against the accepted import formats",
            Self::Validation => "Fix the configuration value and try again",
            Self::Server => "Check the server message for details",
            Self::Network => "Check the tenant URL and your connection, then try again",
            Self::Cancelled => "Re-run the operation",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the tenant.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP 404, or an empty lookup result.
    #[error("not found: {0}")]
    NotFound(String),

    /// HTTP 204.
    #[error("no content")]
    NoContent,

    /// A value outside an enumerated set.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// A lookup matched more than one entity.
    #[error("{what} {value:?} matched {count} entities, expected one")]
    Ambiguous {
        /// Kind of entity looked up.
        what: String,
        /// The name searched for.
        value: String,
        /// Number of matches.
        count: usize,
    },

    /// A precondition on user input failed.
    #[error("{0}")]
    Validation(String),

    /// Structured error lifted from the server's `{errorCode, message}` body.
    #[error("{code}: {message}")]
    Api {
        /// Server error code.
        code: String,
        /// Server error message.
        message: String,
        /// HTTP status.
        status: u16,
    },

    /// Non-2xx response without a structured body.
    #[error("{method} {url} failed with status {status}: {body}")]
    Http {
        /// HTTP method.
        method: String,
        /// Full request URL.
        url: String,
        /// HTTP status.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Connection-level failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A request or response body failed to (de)serialize.
    #[error("invalid body: {0}")]
    Decode(String),

    /// The operation was cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// Identifier parse failure.
    #[error(transparent)]
    Id(#[from] resourceid::Error),

    /// Reconciliation failure.
    #[error(transparent)]
    Drift(#[from] drift::Error),
}

impl Error {
    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound(_) => ErrorCategory::NotFound,
            Error::NoContent => ErrorCategory::NoContent,
            Error::NotSupported(_) => ErrorCategory::NotSupported,
            Error::Ambiguous { .. } | Error::Validation(_) => ErrorCategory::Validation,
            Error::Api { .. } | Error::Http { .. } => ErrorCategory::Server,
            Error::Transport(_) | Error::Decode(_) => ErrorCategory::Network,
            Error::Cancelled => ErrorCategory::Cancelled,
            Error::Id(e) if e.is_invalid_id() => ErrorCategory::InvalidId,
            Error::Id(_) | Error::Drift(_) => ErrorCategory::Validation,
        }
    }

    /// Whether the entity is gone.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.category() == ErrorCategory::NotFound
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Treat HTTP 204 as an empty success.
pub trait AllowNoContent {
    fn allow_no_content(self) -> Result<Vec<u8>>;
}

impl AllowNoContent for Result<Vec<u8>> {
    fn allow_no_content(self) -> Result<Vec<u8>> {
        match self {
            Err(Error::NoContent) => Ok(Vec::new()),
            other => other,
        }
    }
}

/// Treat a missing entity as `None`.
pub trait NotFoundAsNone<T> {
    fn not_found_as_none(self) -> Result<Option<T>>;
}

impl<T> NotFoundAsNone<T> for Result<T> {
    fn not_found_as_none(self) -> Result<Option<T>> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
