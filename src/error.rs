//! Error types for binding, resolution and invocation
//!
//! Hard failures only. Problems found while analysing expressions are
//! reported as [`Diagnostic`](crate::diagnostics::Diagnostic)s instead.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = ConnectorError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Malformed or missing input, detected before any I/O
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The expected operation is missing or its result is not a record
    #[error("schema resolution failed: {0}")]
    SchemaResolutionFailure(String),

    /// A capability instance does not satisfy the kind it was registered under
    #[error("capability type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// The injected invoker reported an error or a non-success status
    #[error("transport failure: {message}")]
    TransportFailure {
        status: Option<u16>,
        message: String,
    },

    /// The cancellation token fired before the call completed
    #[error("operation cancelled")]
    Cancelled,
}

impl ConnectorError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        ConnectorError::InvalidArgument(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        ConnectorError::SchemaResolutionFailure(message.into())
    }

    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        ConnectorError::TransportFailure {
            status,
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConnectorError::Cancelled)
    }
}
