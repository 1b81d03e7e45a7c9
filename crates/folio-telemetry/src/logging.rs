//! Logging initialization for a client session.
//!
//! The poll loop talks to the backend every couple of seconds, so the
//! default directives keep the HTTP stack at `warn` while session events
//! (task registration, barrier transitions, consolidation) stay visible.

use crate::error::{TelemetryError, TelemetryResult};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter directives when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVES: &str = "info,folio=debug,reqwest=warn,hyper=warn";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Initialize logging for the client.
///
/// Interactive desktop sessions get a compact single-line format. Setting
/// `FOLIO_LOG_JSON=1` switches to JSON lines for headless runs whose
/// output is collected by another process.
///
/// Errors if a global subscriber is already installed.
pub fn init_logging() -> TelemetryResult<()> {
    let json = std::env::var("FOLIO_LOG_JSON")
        .map(|v| v == "1")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter());
    let result = if json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry
            .with(fmt::layer().compact().with_target(true))
            .try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
