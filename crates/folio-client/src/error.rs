//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Monitor error: {0}")]
    Monitor(#[from] folio_monitor::MonitorError),

    #[error("RPC error: {0}")]
    Rpc(#[from] folio_rpc::RpcError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] folio_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
