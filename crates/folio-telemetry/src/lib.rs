//! Structured logging and Prometheus metrics for the folio client.
//!
//! Observability for the task monitor:
//! - Prometheus metrics for outstanding tasks, completions, poll errors
//! - Structured logging with tracing

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
