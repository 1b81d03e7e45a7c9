//! Application configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Client configuration, loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the backend's JSON API.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// Poll interval for outstanding task results (ms).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request transport timeout (secs).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Exchanges with configured API credentials; each gets its own
    /// balance-source job on refresh.
    #[serde(default)]
    pub exchanges: Vec<String>,

    /// Blockchains with tracked accounts; each gets its own
    /// balance-source job on refresh.
    #[serde(default)]
    pub blockchains: Vec<String>,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:4242/api/1".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            exchanges: Vec::new(),
            blockchains: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Poll interval as a duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Request timeout as a duration.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
