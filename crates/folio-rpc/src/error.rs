//! RPC error types.

use thiserror::Error;

/// Errors from talking to the backend process.
#[derive(Debug, Error)]
pub enum RpcError {
    /// The call itself failed (connection refused, timeout, bad status).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend answered, but the response did not have the expected
    /// shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The backend answered with an explicit error message.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type alias for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;
