//! Session lifecycle integration tests.
//!
//! Drives a full session against the mock backend with a paused clock:
//! balance refresh fan-out, poll-driven resolution, the single
//! consolidation trigger, idle detection and logout reset.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::watch;
use tokio::time::sleep;

use folio_client::{AppConfig, Application};
use folio_monitor::{Activity, BarrierState, PollerConfig, TaskPoller};
use folio_rpc::MockBackend;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

fn test_config() -> AppConfig {
    AppConfig {
        exchanges: vec!["kraken".to_string(), "poloniex".to_string()],
        blockchains: vec!["eth".to_string()],
        ..AppConfig::default()
    }
}

fn start_poller(app: &Application) -> (watch::Sender<bool>, tokio::task::JoinHandle<()>) {
    let poller = TaskPoller::new(
        app.monitor(),
        PollerConfig {
            interval: POLL_INTERVAL,
            stale_after: None,
        },
    );
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(poller.run(shutdown_rx));
    (shutdown_tx, handle)
}

/// Let the paused clock advance through poll ticks.
async fn run_ticks(n: u32) {
    for _ in 0..n {
        sleep(POLL_INTERVAL).await;
    }
}

#[tokio::test(start_paused = true)]
async fn balance_batch_consolidates_and_goes_idle() {
    let mock = Arc::new(MockBackend::new());
    let app = Application::with_backend(test_config(), mock.clone());
    let monitor = app.monitor();
    let (shutdown_tx, handle) = start_poller(&app);

    app.refresh_balances().await.unwrap();
    let sources = mock.started_jobs();
    assert_eq!(sources.len(), 3);
    assert_eq!(monitor.barrier_state(), BarrierState::Requested);

    // Two sources report in; the batch is still outstanding.
    mock.complete_job(sources[0].id.clone(), json!({"kraken": {}}));
    mock.complete_job(sources[1].id.clone(), json!({"poloniex": {}}));
    run_ticks(2).await;
    assert_eq!(monitor.barrier_state(), BarrierState::Requested);
    assert_eq!(mock.consolidation_calls(), 0);
    assert_eq!(monitor.activity(), Activity::Busy);

    // The last source finishes: exactly one consolidation fires and its
    // task id is tracked.
    mock.complete_job(sources[2].id.clone(), json!({"eth": {}}));
    run_ticks(2).await;
    assert_eq!(monitor.barrier_state(), BarrierState::Complete);
    assert_eq!(mock.consolidation_calls(), 1);

    let pending = monitor.pending_tasks();
    assert_eq!(pending.len(), 1);
    let consolidation_id = pending[0].id.clone();

    // Once the consolidation job resolves, the session drains to idle.
    mock.complete_job(consolidation_id, json!({"net_usd": "12345.67"}));
    run_ticks(3).await;
    assert!(!monitor.has_pending());
    assert_eq!(monitor.activity(), Activity::Idle);
    assert_eq!(mock.consolidation_calls(), 1);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn repeated_refreshes_consolidate_once_each() {
    let mock = Arc::new(MockBackend::new());
    let app = Application::with_backend(test_config(), mock.clone());
    let monitor = app.monitor();
    let (shutdown_tx, handle) = start_poller(&app);

    for round in 1..=2 {
        app.refresh_balances().await.unwrap();
        for job in mock.started_jobs() {
            // Completing already resolved ids is harmless: they are no
            // longer in the registry and never polled again.
            mock.complete_job(job.id.clone(), json!({}));
        }
        run_ticks(4).await;
        assert_eq!(mock.consolidation_calls(), round);
        assert_eq!(monitor.barrier_state(), BarrierState::Complete);
    }

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn logout_mid_batch_resets_cleanly() {
    let mock = Arc::new(MockBackend::new());
    let app = Application::with_backend(test_config(), mock.clone());
    let monitor = app.monitor();
    let (shutdown_tx, handle) = start_poller(&app);

    app.refresh_balances().await.unwrap();
    run_ticks(1).await;
    assert_eq!(monitor.activity(), Activity::Busy);

    // User logs out before any source finished.
    app.logout();
    assert!(!monitor.has_pending());
    assert_eq!(monitor.barrier_state(), BarrierState::Start);
    assert_eq!(monitor.activity(), Activity::Idle);

    // A fresh login's refresh works from the clean slate; results of the
    // old session's jobs are never delivered because their ids are gone.
    app.refresh_balances().await.unwrap();
    for job in mock.started_jobs() {
        mock.complete_job(job.id.clone(), json!({}));
    }
    run_ticks(4).await;
    assert_eq!(mock.consolidation_calls(), 1);
    // Only the new batch's consolidation task can still be in flight.
    let pending = monitor.pending_tasks();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].task_type, folio_core::TaskType::QueryBalances);

    shutdown_tx.send(true).unwrap();
    handle.await.unwrap();
}
