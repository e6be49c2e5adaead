//! Error types for sigdash-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A snapshot entry or push payload could not be normalized.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid mode: {0}")]
    InvalidMode(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
