//! Error types for folio-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid task id: {0}")]
    InvalidTaskId(String),

    #[error("Invalid task payload: {0}")]
    InvalidPayload(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
