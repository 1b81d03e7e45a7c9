//! Main application orchestration.
//!
//! Owns the session wiring:
//! - Backend connection
//! - Task monitor and its poller
//! - One-time page handler registration
//! - Balance refresh and trade history actions the UI triggers

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{info, warn};

use folio_core::{TaskId, TaskType};
use folio_monitor::{JobOptions, PollerConfig, TaskMonitor, TaskPoller};
use folio_rpc::{DynBackend, HttpBackend};

use crate::config::AppConfig;
use crate::error::AppResult;

/// Main application.
pub struct Application {
    config: AppConfig,
    monitor: Arc<TaskMonitor>,
    shutdown_tx: watch::Sender<bool>,
}

impl Application {
    /// Create an application talking to the configured backend.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let backend: DynBackend = Arc::new(HttpBackend::new(
            &config.backend_url,
            Some(config.request_timeout()),
        )?);
        Ok(Self::with_backend(config, backend))
    }

    /// Create an application over an injected backend. Used by tests.
    #[must_use]
    pub fn with_backend(config: AppConfig, backend: DynBackend) -> Self {
        let monitor = Arc::new(TaskMonitor::new(backend));
        let (shutdown_tx, _) = watch::channel(false);
        let app = Self {
            config,
            monitor,
            shutdown_tx,
        };
        app.register_page_handlers();
        app
    }

    /// Handle to the session's task monitor.
    #[must_use]
    pub fn monitor(&self) -> Arc<TaskMonitor> {
        Arc::clone(&self.monitor)
    }

    /// One-time registration of the handlers the UI pages listen with.
    ///
    /// The actual page rendering lives in the view layer; these handlers
    /// only hand the payloads over and log what arrived.
    fn register_page_handlers(&self) {
        self.monitor
            .on_completed(TaskType::QueryExchangeBalances, |payload| {
                info!(payload = %summary(payload), "exchange balances updated");
                Ok(())
            });
        self.monitor
            .on_completed(TaskType::QueryBlockchainBalances, |payload| {
                info!(payload = %summary(payload), "blockchain balances updated");
                Ok(())
            });
        self.monitor
            .on_completed(TaskType::ProcessTradeHistory, |payload| {
                info!(payload = %summary(payload), "trade history processed");
                Ok(())
            });
    }

    /// Fan out one balance-source job per configured exchange and tracked
    /// blockchain. Once all of them report in, the barrier triggers the
    /// consolidating snapshot automatically.
    pub async fn refresh_balances(&self) -> AppResult<()> {
        if self.config.exchanges.is_empty() && self.config.blockchains.is_empty() {
            warn!("no balance sources configured; nothing to refresh");
            return Ok(());
        }

        for exchange in &self.config.exchanges {
            self.monitor
                .spawn_job(
                    TaskType::QueryExchangeBalances,
                    json!({ "name": exchange }),
                    JobOptions::balance_source(),
                )
                .await?;
        }
        for blockchain in &self.config.blockchains {
            self.monitor
                .spawn_job(
                    TaskType::QueryBlockchainBalances,
                    json!({ "blockchain": blockchain }),
                    JobOptions::balance_source(),
                )
                .await?;
        }
        info!(
            exchanges = self.config.exchanges.len(),
            blockchains = self.config.blockchains.len(),
            "balance refresh started"
        );
        Ok(())
    }

    /// Ask the backend to process trade history for the tax report.
    pub async fn process_trade_history(&self, start_ts: i64, end_ts: i64) -> AppResult<TaskId> {
        let id = self
            .monitor
            .spawn_job(
                TaskType::ProcessTradeHistory,
                json!({ "start_ts": start_ts, "end_ts": end_ts }),
                JobOptions::with_callback(),
            )
            .await?;
        Ok(id)
    }

    /// Clear all session state. Must run on logout so the next login does
    /// not see the previous session's tasks.
    pub fn logout(&self) {
        info!("logging out; clearing session task state");
        self.monitor.reset();
    }

    /// Run the session: start the poller, kick off the initial balance
    /// refresh, then wait for shutdown.
    pub async fn run(&self) -> AppResult<()> {
        let poller = TaskPoller::new(
            self.monitor(),
            PollerConfig {
                interval: self.config.poll_interval(),
                stale_after: None,
            },
        );
        let poller_handle = tokio::spawn(poller.run(self.shutdown_tx.subscribe()));

        self.refresh_balances().await?;

        tokio::signal::ctrl_c().await?;
        info!("shutdown signal received");

        let _ = self.shutdown_tx.send(true);
        let _ = poller_handle.await;
        self.logout();
        Ok(())
    }
}

/// Compact log form of a result payload: object keys only, so balance
/// amounts do not end up in the logs.
fn summary(payload: &Value) -> String {
    match payload {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("{{{}}}", keys.join(", "))
        }
        other => format!("{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_monitor::BarrierState;
    use folio_rpc::MockBackend;

    fn test_config() -> AppConfig {
        AppConfig {
            exchanges: vec!["kraken".to_string()],
            blockchains: vec!["eth".to_string()],
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn test_refresh_starts_one_job_per_source() {
        let mock = Arc::new(MockBackend::new());
        let app = Application::with_backend(test_config(), mock.clone());

        app.refresh_balances().await.unwrap();

        let jobs = mock.started_jobs();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].name, "query_exchange_balances");
        assert_eq!(jobs[0].args, json!({"name": "kraken"}));
        assert_eq!(jobs[1].name, "query_blockchain_balances");
        assert_eq!(app.monitor().barrier_state(), BarrierState::Requested);
    }

    #[tokio::test]
    async fn test_refresh_with_no_sources_is_a_noop() {
        let mock = Arc::new(MockBackend::new());
        let app = Application::with_backend(AppConfig::default(), mock.clone());

        app.refresh_balances().await.unwrap();
        assert!(mock.started_jobs().is_empty());
        assert_eq!(app.monitor().barrier_state(), BarrierState::Start);
    }

    #[tokio::test]
    async fn test_trade_history_job_is_not_barrier_tracked() {
        let mock = Arc::new(MockBackend::new());
        let app = Application::with_backend(AppConfig::default(), mock);

        let id = app.process_trade_history(0, 1_700_000_000).await.unwrap();
        assert_eq!(app.monitor().barrier_state(), BarrierState::Start);
        assert_eq!(app.monitor().pending_tasks()[0].id, id);
    }

    #[tokio::test]
    async fn test_logout_resets_monitor() {
        let mock = Arc::new(MockBackend::new());
        let app = Application::with_backend(test_config(), mock);

        app.refresh_balances().await.unwrap();
        assert!(app.monitor().has_pending());

        app.logout();
        assert!(!app.monitor().has_pending());
        assert_eq!(app.monitor().barrier_state(), BarrierState::Start);
    }

    #[test]
    fn test_summary_hides_values() {
        let s = summary(&json!({"BTC": {"amount": "1.5"}, "ETH": {"amount": "10"}}));
        assert_eq!(s, "{BTC, ETH}");
        assert_eq!(summary(&json!(null)), "null");
    }
}
