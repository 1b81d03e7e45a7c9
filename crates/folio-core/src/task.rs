//! Task identity and the task entity.
//!
//! A `Task` is the client-side handle for one asynchronous job running in
//! the backend process. The backend assigns the id when the job is started;
//! historically ids have been numeric, but string ids must also round-trip,
//! so `TaskId` covers both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;

/// Backend-assigned identifier for an asynchronous job.
///
/// Opaque to the client: it is only ever compared, hashed and echoed back
/// to the backend when polling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskId {
    Num(i64),
    Text(String),
}

impl TaskId {
    /// Extract a task id from a JSON value as returned by the backend's
    /// `start_job` / `query_all_balances` responses.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, CoreError> {
        match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(TaskId::Num)
                .ok_or_else(|| CoreError::InvalidTaskId(format!("non-integer id: {n}"))),
            serde_json::Value::String(s) => Ok(TaskId::Text(s.clone())),
            other => Err(CoreError::InvalidTaskId(format!(
                "expected number or string, got {other}"
            ))),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Num(n) => write!(f, "{n}"),
            TaskId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for TaskId {
    fn from(n: i64) -> Self {
        TaskId::Num(n)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId::Text(s.to_string())
    }
}

/// Kind of backend job a task represents.
///
/// The job names known at compile time get their own variants; anything
/// else stays a `Custom` string so new backend jobs keep working without a
/// client release. The string form is what crosses the RPC boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskType {
    /// Per-exchange balance query (one task per configured exchange).
    QueryExchangeBalances,
    /// Per-blockchain balance query (one task per tracked chain).
    QueryBlockchainBalances,
    /// Consolidating balance computation across all sources.
    QueryBalances,
    /// Trade history processing for the tax report.
    ProcessTradeHistory,
    /// A job name only the backend knows about.
    Custom(String),
}

impl TaskType {
    /// The wire name of this task type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::QueryExchangeBalances => "query_exchange_balances",
            TaskType::QueryBlockchainBalances => "query_blockchain_balances",
            TaskType::QueryBalances => "query_balances",
            TaskType::ProcessTradeHistory => "process_trade_history",
            TaskType::Custom(s) => s,
        }
    }
}

impl From<&str> for TaskType {
    fn from(s: &str) -> Self {
        match s {
            "query_exchange_balances" => TaskType::QueryExchangeBalances,
            "query_blockchain_balances" => TaskType::QueryBlockchainBalances,
            "query_balances" => TaskType::QueryBalances,
            "process_trade_history" => TaskType::ProcessTradeHistory,
            other => TaskType::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(TaskType::from(s.as_str()))
    }
}

/// One outstanding asynchronous backend job.
///
/// Owned exclusively by the task registry from registration until the
/// poller observes a result for it. Whether the task participates in the
/// balance barrier is tracked by the barrier itself, not here; barrier
/// membership and callback expectation are orthogonal attributes.
#[derive(Debug, Clone)]
pub struct Task {
    /// Backend-assigned id.
    pub id: TaskId,
    /// What kind of job this is.
    pub task_type: TaskType,
    /// Whether a completed result must be routed through the dispatch
    /// table. Fire-and-forget tasks are discarded once they resolve.
    pub expects_callback: bool,
    /// When the task was registered, for age diagnostics on jobs that
    /// never report completion.
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task registered now.
    #[must_use]
    pub fn new(id: TaskId, task_type: TaskType, expects_callback: bool) -> Self {
        Self {
            id,
            task_type,
            expects_callback,
            created_at: Utc::now(),
        }
    }

    /// How long this task has been outstanding.
    #[must_use]
    pub fn age(&self) -> std::time::Duration {
        (Utc::now() - self.created_at).to_std().unwrap_or_default()
    }
}
