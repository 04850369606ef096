//! Error types for the playlist engine.
//!
//! Pure steps (normalization, clustering, partitioning) fail fast with an
//! [`EngineError`] and never apply partially. Anything the catalog reports is
//! carried as a [`CatalogError`] and surfaces as
//! [`EngineError::ExternalCallFailure`].

use thiserror::Error;

/// Result type used throughout the engine.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure reported by a [`CatalogClient`](crate::catalog::CatalogClient) call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {message}")]
pub struct CatalogError {
    /// Name of the catalog operation, e.g. `append_tracks`.
    pub operation: &'static str,
    pub message: String,
}

impl CatalogError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Requested cluster count is zero or exceeds the number of tracks.
    #[error("Invalid cluster count {requested}: must be between 1 and {available}")]
    InvalidClusterCount { requested: usize, available: usize },

    /// Fewer tracks than the operation needs.
    #[error("Insufficient data for {operation}: need at least {required} tracks, got {available}")]
    InsufficientData {
        operation: &'static str,
        required: usize,
        available: usize,
    },

    /// A catalog call failed. Never retried here.
    #[error("External call failed: {0}")]
    ExternalCallFailure(#[from] CatalogError),

    /// An `added_at` value without a readable year/month prefix.
    #[error("Malformed timestamp `{value}`: {reason}")]
    MalformedTimestamp { value: String, reason: &'static str },

    /// Ordered scan requested on a history that is not most-recent-first.
    #[error("Listening history is not in descending order at position {index}")]
    OutOfOrderHistory { index: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    pub(crate) fn malformed(value: &str, reason: &'static str) -> Self {
        Self::MalformedTimestamp {
            value: value.to_string(),
            reason,
        }
    }
}
