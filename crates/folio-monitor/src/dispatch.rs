//! Callback dispatch table.
//!
//! UI pages register handlers for the task types they care about once at
//! module initialization; entries are never removed. A completed task's
//! payload is routed to every handler registered for its type, in
//! registration order.

use parking_lot::RwLock;
use serde_json::Value;
use tracing::warn;

use folio_core::TaskType;
use folio_telemetry::Metrics;

/// A callback invoked with a completed task's result payload.
pub type Handler = Box<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Append-only, ordered list of (task type, handler) pairs.
///
/// Multiple handlers may be registered for the same type; all of them fire
/// for a completed task of that type.
#[derive(Default)]
pub struct CallbackTable {
    entries: RwLock<Vec<(TaskType, Handler)>>,
}

impl CallbackTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for a task type. Never replaces earlier entries;
    /// registering the same type again adds a second handler.
    pub fn register<F>(&self, task_type: TaskType, handler: F)
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.entries.write().push((task_type, Box::new(handler)));
    }

    /// Invoke every handler registered for this type, in registration
    /// order. A failing handler is logged and counted but never prevents
    /// the remaining handlers from running.
    ///
    /// Returns the number of handlers that matched so the caller can log
    /// the no-handler diagnostic.
    pub fn dispatch(&self, task_type: &TaskType, payload: &Value) -> usize {
        let entries = self.entries.read();
        let mut matched = 0;
        for (registered, handler) in entries.iter() {
            if registered != task_type {
                continue;
            }
            matched += 1;
            if let Err(error) = handler(payload) {
                Metrics::handler_error(task_type.as_str());
                warn!(task_type = %task_type, %error, "callback handler failed");
            }
        }
        matched
    }

    /// Number of registered entries (all types).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no handlers have been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
