//! Backend job API trait.
//!
//! Provides a trait-based abstraction over the backend's asynchronous job
//! surface. This allows for:
//! - Dependency injection for testing
//! - Separation of the monitor core from the transport
//! - Future flexibility in transport implementation

use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

use folio_core::TaskId;

use crate::error::{RpcError, RpcResult};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

/// The backend's asynchronous job API.
///
/// Every call is independently timed out by the transport; this layer has
/// no retry or timeout policy of its own.
pub trait BackendRpc: Send + Sync {
    /// Start a named long-running job. Returns immediately with the task id
    /// the backend assigned to it.
    fn start_job(&self, name: &str, args: Value) -> BoxFuture<'_, RpcResult<TaskId>>;

    /// Ask whether a job's result is ready.
    ///
    /// Returns `Ok(None)` while the job is still running, else the result
    /// payload (which may itself be success- or error-shaped).
    fn poll_job(&self, id: TaskId) -> BoxFuture<'_, RpcResult<Option<Value>>>;

    /// Trigger the consolidating balance computation and persist job.
    /// Asynchronous like any other job; the returned id is polled normally.
    fn query_all_balances(&self) -> BoxFuture<'_, RpcResult<TaskId>>;
}

/// Arc wrapper for BackendRpc trait objects.
pub type DynBackend = Arc<dyn BackendRpc>;

/// A job the mock backend has been asked to start.
#[derive(Debug, Clone)]
pub struct StartedJob {
    /// Id the mock assigned.
    pub id: TaskId,
    /// Job name as given to `start_job` (or `query_balances` for the
    /// consolidation call).
    pub name: String,
    /// Arguments as given to `start_job`.
    pub args: Value,
}

/// Mock backend for testing.
///
/// Assigns sequential numeric task ids and records every call for
/// verification. Tests queue results per task id and can inject transport
/// failures per method.
#[derive(Debug, Default)]
pub struct MockBackend {
    next_id: AtomicI64,
    started: parking_lot::Mutex<Vec<StartedJob>>,
    results: parking_lot::Mutex<HashMap<TaskId, Value>>,
    failing_polls: parking_lot::Mutex<HashSet<TaskId>>,
    start_failure: parking_lot::Mutex<Option<String>>,
    consolidation_failure: parking_lot::Mutex<Option<String>>,
    consolidation_calls: AtomicU64,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named job's result available to the next poll.
    pub fn complete_job(&self, id: TaskId, payload: Value) {
        self.results.lock().insert(id, payload);
    }

    /// Fail the next `start_job` call with a transport error.
    pub fn fail_next_start(&self, message: impl Into<String>) {
        *self.start_failure.lock() = Some(message.into());
    }

    /// Fail the next `query_all_balances` call with a transport error.
    pub fn fail_next_consolidation(&self, message: impl Into<String>) {
        *self.consolidation_failure.lock() = Some(message.into());
    }

    /// Make every poll for this id fail with a transport error until
    /// cleared.
    pub fn fail_polls(&self, id: TaskId) {
        self.failing_polls.lock().insert(id);
    }

    /// Stop failing polls for this id.
    pub fn clear_poll_failure(&self, id: &TaskId) {
        self.failing_polls.lock().remove(id);
    }

    /// All jobs started so far, in call order.
    pub fn started_jobs(&self) -> Vec<StartedJob> {
        self.started.lock().clone()
    }

    /// How many `query_all_balances` calls the mock accepted. Calls that
    /// hit an injected failure are not counted.
    pub fn consolidation_calls(&self) -> u64 {
        self.consolidation_calls.load(Ordering::SeqCst)
    }

    fn assign_id(&self) -> TaskId {
        TaskId::Num(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl BackendRpc for MockBackend {
    fn start_job(&self, name: &str, args: Value) -> BoxFuture<'_, RpcResult<TaskId>> {
        let name = name.to_string();
        Box::pin(async move {
            if let Some(message) = self.start_failure.lock().take() {
                return Err(RpcError::Transport(message));
            }
            let id = self.assign_id();
            self.started.lock().push(StartedJob {
                id: id.clone(),
                name,
                args,
            });
            Ok(id)
        })
    }

    fn poll_job(&self, id: TaskId) -> BoxFuture<'_, RpcResult<Option<Value>>> {
        Box::pin(async move {
            if self.failing_polls.lock().contains(&id) {
                return Err(RpcError::Transport(format!("injected poll failure for {id}")));
            }
            Ok(self.results.lock().get(&id).cloned())
        })
    }

    fn query_all_balances(&self) -> BoxFuture<'_, RpcResult<TaskId>> {
        Box::pin(async move {
            if let Some(message) = self.consolidation_failure.lock().take() {
                return Err(RpcError::Transport(message));
            }
            self.consolidation_calls.fetch_add(1, Ordering::SeqCst);
            let id = self.assign_id();
            self.started.lock().push(StartedJob {
                id: id.clone(),
                name: "query_balances".to_string(),
                args: Value::Null,
            });
            Ok(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_assigns_sequential_ids() {
        let mock = MockBackend::new();
        let a = mock.start_job("query_exchange_balances", json!({})).await.unwrap();
        let b = mock.start_job("query_blockchain_balances", json!({})).await.unwrap();
        assert_eq!(a, TaskId::Num(1));
        assert_eq!(b, TaskId::Num(2));
        assert_eq!(mock.started_jobs().len(), 2);
    }

    #[tokio::test]
    async fn test_mock_poll_lifecycle() {
        let mock = MockBackend::new();
        let id = mock.start_job("process_trade_history", json!({})).await.unwrap();

        assert!(mock.poll_job(id.clone()).await.unwrap().is_none());

        mock.complete_job(id.clone(), json!({"trades": 3}));
        assert_eq!(
            mock.poll_job(id.clone()).await.unwrap(),
            Some(json!({"trades": 3}))
        );
    }

    #[tokio::test]
    async fn test_mock_injected_failures() {
        let mock = MockBackend::new();
        mock.fail_next_start("backend down");
        assert!(mock.start_job("query_balances", json!({})).await.is_err());
        // Failure is one-shot.
        assert!(mock.start_job("query_balances", json!({})).await.is_ok());

        let id = TaskId::Num(99);
        mock.fail_polls(id.clone());
        assert!(mock.poll_job(id.clone()).await.is_err());
        mock.clear_poll_failure(&id);
        assert!(mock.poll_job(id).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_consolidation_counting() {
        let mock = MockBackend::new();
        assert_eq!(mock.consolidation_calls(), 0);
        let id = mock.query_all_balances().await.unwrap();
        assert_eq!(mock.consolidation_calls(), 1);
        let jobs = mock.started_jobs();
        assert_eq!(jobs[0].name, "query_balances");
        assert_eq!(jobs[0].id, id);
    }

    #[tokio::test]
    async fn test_failed_consolidation_not_counted() {
        let mock = MockBackend::new();
        mock.fail_next_consolidation("backend down");
        assert!(mock.query_all_balances().await.is_err());
        assert_eq!(mock.consolidation_calls(), 0);

        // Only the accepted retry shows up in the count.
        assert!(mock.query_all_balances().await.is_ok());
        assert_eq!(mock.consolidation_calls(), 1);
    }
}
