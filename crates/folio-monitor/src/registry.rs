//! Registry of in-flight backend tasks.

use std::collections::HashMap;

use folio_core::{Task, TaskId};

use crate::error::{MonitorError, MonitorResult};

/// Mapping from task id to task.
///
/// Ids are unique at all times: the backend is trusted to generate
/// session-unique ids, and a removed id is never re-inserted with stale
/// data. Insertion happens when a job is launched, removal the moment the
/// poller observes a result.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<TaskId, Task>,
}

impl TaskRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a newly launched task. Errors if the id is already tracked.
    pub fn register(&mut self, task: Task) -> MonitorResult<()> {
        if self.tasks.contains_key(&task.id) {
            return Err(MonitorError::DuplicateTask(task.id));
        }
        self.tasks.insert(task.id.clone(), task);
        Ok(())
    }

    /// Remove a resolved task. Errors if the id is not tracked; the poller
    /// only resolves ids it is currently tracking, so an unknown id means
    /// bookkeeping has gone wrong (or a duplicate result raced us).
    pub fn remove(&mut self, id: &TaskId) -> MonitorResult<Task> {
        self.tasks
            .remove(id)
            .ok_or_else(|| MonitorError::UnknownTask(id.clone()))
    }

    /// Look up a task without removing it.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Number of in-flight tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether no tasks are in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Clone out the current tasks for one poll tick.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    /// Drop every task. Used on logout.
    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}
