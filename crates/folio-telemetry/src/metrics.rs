//! Prometheus metrics for the folio client.
//!
//! Tracks the health of the task monitor:
//! - Outstanding task count and busy/idle state
//! - Task registrations and completions by type
//! - Poll transport errors and handler failures
//! - Consolidation triggers
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent
//! failure. These panics only occur during static initialization, never at
//! runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_int_gauge, Counter, CounterVec, IntGauge,
};

/// Number of tasks currently tracked by the registry.
pub static ACTIVE_TASKS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "folio_active_tasks",
        "Number of outstanding backend tasks in the registry"
    )
    .unwrap()
});

/// Session busy state (1 = tasks outstanding, 0 = idle).
pub static SESSION_BUSY: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("folio_session_busy", "Session busy state (1=busy, 0=idle)").unwrap()
});

/// Total tasks registered, by task type.
pub static TASKS_REGISTERED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "folio_tasks_registered_total",
        "Total backend tasks registered",
        &["task_type"]
    )
    .unwrap()
});

/// Total tasks completed, by task type.
pub static TASKS_COMPLETED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "folio_tasks_completed_total",
        "Total backend tasks resolved by the poller",
        &["task_type"]
    )
    .unwrap()
});

/// Total transport errors while polling task results.
pub static POLL_ERRORS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "folio_poll_errors_total",
        "Total transport errors while polling task results"
    )
    .unwrap()
});

/// Total handler failures during callback dispatch, by task type.
pub static HANDLER_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "folio_handler_errors_total",
        "Total callback handler failures",
        &["task_type"]
    )
    .unwrap()
});

/// Total consolidating balance queries triggered by the barrier.
pub static CONSOLIDATIONS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "folio_consolidations_total",
        "Total consolidating balance queries triggered"
    )
    .unwrap()
});

/// Facade for recording metrics.
pub struct Metrics;

impl Metrics {
    /// Record a task registration.
    pub fn task_registered(task_type: &str) {
        TASKS_REGISTERED_TOTAL.with_label_values(&[task_type]).inc();
    }

    /// Record a task completion.
    pub fn task_completed(task_type: &str) {
        TASKS_COMPLETED_TOTAL.with_label_values(&[task_type]).inc();
    }

    /// Record a transport error during a poll.
    pub fn poll_error() {
        POLL_ERRORS_TOTAL.inc();
    }

    /// Record a callback handler failure.
    pub fn handler_error(task_type: &str) {
        HANDLER_ERRORS_TOTAL.with_label_values(&[task_type]).inc();
    }

    /// Record a consolidation trigger.
    pub fn consolidation_fired() {
        CONSOLIDATIONS_TOTAL.inc();
    }

    /// Update the outstanding task gauge.
    pub fn set_active_tasks(count: i64) {
        ACTIVE_TASKS.set(count);
    }

    /// Update the session busy/idle gauge.
    pub fn set_busy(busy: bool) {
        SESSION_BUSY.set(i64::from(busy));
    }
}
