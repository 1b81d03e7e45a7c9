//! Session-scoped task monitor.
//!
//! One `TaskMonitor` exists per logged-in session and is shared by handle
//! with whatever UI code needs to start jobs or register handlers. It owns
//! the task registry and the balance barrier behind a single lock so that
//! removing a task and checking barrier emptiness happen as one atomic
//! step, with no await point in between. Two results arriving
//! back-to-back can therefore never both observe "not yet empty" (skipping
//! the consolidation) nor both observe "empty" (firing it twice).

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use folio_core::{Task, TaskId, TaskType};
use folio_rpc::DynBackend;
use folio_telemetry::Metrics;

use crate::barrier::{BalanceBarrier, BarrierState, BarrierTransition};
use crate::dispatch::CallbackTable;
use crate::error::{MonitorError, MonitorResult};
use crate::registry::TaskRegistry;

/// Session busy/idle indicator, updated by the poller at tick granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// No tasks in the registry as of the last tick.
    Idle,
    /// At least one task was outstanding at the last tick.
    Busy,
}

/// How a newly started job should be tracked.
///
/// The two flags are orthogonal: whether a task contributes to the
/// consolidated balance snapshot says nothing about whether its result is
/// routed to the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobOptions {
    /// Track completion in the balance barrier.
    pub balance_task: bool,
    /// Route the result payload through the dispatch table.
    pub expects_callback: bool,
}

impl JobOptions {
    /// A per-source balance query: barrier-tracked, result shown in the UI.
    #[must_use]
    pub fn balance_source() -> Self {
        Self {
            balance_task: true,
            expects_callback: true,
        }
    }

    /// A plain job whose result the UI wants to see.
    #[must_use]
    pub fn with_callback() -> Self {
        Self {
            balance_task: false,
            expects_callback: true,
        }
    }

    /// A job run purely for its backend side effect; the result is
    /// discarded once the poller sees it.
    #[must_use]
    pub fn fire_and_forget() -> Self {
        Self {
            balance_task: false,
            expects_callback: false,
        }
    }
}

/// Registry and barrier, guarded together.
#[derive(Debug, Default)]
struct SessionState {
    registry: TaskRegistry,
    barrier: BalanceBarrier,
}

/// Client-side scheduler for the backend's long-running jobs.
pub struct TaskMonitor {
    backend: DynBackend,
    callbacks: CallbackTable,
    state: Mutex<SessionState>,
    activity_tx: watch::Sender<Activity>,
}

impl TaskMonitor {
    /// Create a monitor for a fresh session.
    #[must_use]
    pub fn new(backend: DynBackend) -> Self {
        let (activity_tx, _) = watch::channel(Activity::Idle);
        Self {
            backend,
            callbacks: CallbackTable::new(),
            state: Mutex::new(SessionState::default()),
            activity_tx,
        }
    }

    /// The backend handle, shared with the poller.
    #[must_use]
    pub fn backend(&self) -> DynBackend {
        self.backend.clone()
    }

    /// Register a handler for completed tasks of a type. One-time wiring
    /// done at page initialization; entries are never removed.
    pub fn on_completed<F>(&self, task_type: TaskType, handler: F)
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.callbacks.register(task_type, handler);
    }

    /// Ask the backend to start a job and track the returned task id.
    pub async fn spawn_job(
        &self,
        task_type: TaskType,
        args: Value,
        options: JobOptions,
    ) -> MonitorResult<TaskId> {
        let id = self.backend.start_job(task_type.as_str(), args).await?;
        self.track(id.clone(), task_type, options)?;
        Ok(id)
    }

    /// Track a task id the backend has already assigned.
    ///
    /// Registers the task first; only a successfully registered balance
    /// task is added to the barrier, so a duplicate id cannot skew the
    /// outstanding set.
    pub fn track(&self, id: TaskId, task_type: TaskType, options: JobOptions) -> MonitorResult<()> {
        let active = {
            let mut state = self.state.lock();
            state
                .registry
                .register(Task::new(id.clone(), task_type.clone(), options.expects_callback))?;
            if options.balance_task {
                state.barrier.add_outstanding(id.clone());
            }
            state.registry.len()
        };

        Metrics::task_registered(task_type.as_str());
        Metrics::set_active_tasks(active as i64);
        debug!(
            task_id = %id,
            task_type = %task_type,
            balance_task = options.balance_task,
            expects_callback = options.expects_callback,
            active,
            "task registered"
        );
        Ok(())
    }

    /// Handle a completed task's result payload.
    ///
    /// The task is claimed (removed from the registry) and the barrier
    /// stepped in one atomic section; only the claimant dispatches, so two
    /// overlapping polls delivering the same result can never route one
    /// payload to the handlers twice. If the barrier completed, one
    /// consolidating balance query is issued after dispatch and its id is
    /// tracked as a plain fire-and-forget task.
    pub async fn complete(&self, id: &TaskId, payload: &Value) -> MonitorResult<()> {
        // Claim + barrier emptiness check must not be separated by an
        // await: see the module docs. A duplicate result for the same id
        // fails with UnknownTask here, before any handler can run.
        let (task, transition, active) = {
            let mut state = self.state.lock();
            let task = state.registry.remove(id)?;
            let transition = if state.barrier.contains(id) {
                Some(state.barrier.remove_outstanding(id)?)
            } else {
                None
            };
            (task, transition, state.registry.len())
        };

        if task.expects_callback {
            let matched = self.callbacks.dispatch(&task.task_type, payload);
            if matched == 0 {
                // The page that requested this result is no longer
                // listening. Diagnostic only; the task is already resolved.
                warn!(
                    task_id = %id,
                    task_type = %task.task_type,
                    "no handler registered for completed task"
                );
            }
        }

        Metrics::task_completed(task.task_type.as_str());
        Metrics::set_active_tasks(active as i64);
        debug!(task_id = %id, task_type = %task.task_type, active, "task resolved");

        if transition == Some(BarrierTransition::Completed) {
            self.fire_consolidation().await;
        }
        Ok(())
    }

    /// Issue the consolidating balance query after the last source of a
    /// batch finished. On failure the barrier stays `Complete`; there is
    /// no retry loop here, the next balance batch re-arms it.
    async fn fire_consolidation(&self) {
        info!("all balance sources reported; requesting consolidated snapshot");
        Metrics::consolidation_fired();
        match self.backend.query_all_balances().await {
            Ok(id) => {
                // The backend persisting the snapshot is the effect that
                // matters; nobody listens for the result.
                if let Err(error) =
                    self.track(id.clone(), TaskType::QueryBalances, JobOptions::fire_and_forget())
                {
                    error!(task_id = %id, %error, "failed to track consolidation task");
                }
            }
            Err(error) => {
                error!(%error, "consolidation call failed");
            }
        }
    }

    /// Tasks to poll this tick.
    #[must_use]
    pub fn pending_tasks(&self) -> Vec<Task> {
        self.state.lock().registry.snapshot()
    }

    /// Whether any tasks are in flight right now.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.state.lock().registry.is_empty()
    }

    /// Current barrier state.
    #[must_use]
    pub fn barrier_state(&self) -> BarrierState {
        self.state.lock().barrier.state()
    }

    /// Current busy/idle indicator.
    #[must_use]
    pub fn activity(&self) -> Activity {
        *self.activity_tx.borrow()
    }

    /// Subscribe to busy/idle changes.
    #[must_use]
    pub fn subscribe_activity(&self) -> watch::Receiver<Activity> {
        self.activity_tx.subscribe()
    }

    /// Update the busy/idle indicator, notifying only on change.
    pub(crate) fn set_activity(&self, activity: Activity) {
        let changed = self.activity_tx.send_if_modified(|current| {
            if *current == activity {
                false
            } else {
                *current = activity;
                true
            }
        });
        if changed {
            Metrics::set_busy(activity == Activity::Busy);
            debug!(?activity, "session activity changed");
        }
    }

    /// Clear all session state: registry emptied, barrier back to `Start`,
    /// indicator idle. Must be called on logout so a freshly logged-in
    /// session does not see stale tasks.
    pub fn reset(&self) {
        let dropped = {
            let mut state = self.state.lock();
            let dropped = state.registry.len();
            state.registry.clear();
            state.barrier.reset();
            dropped
        };
        self.set_activity(Activity::Idle);
        Metrics::set_active_tasks(0);
        if dropped > 0 {
            info!(dropped, "task monitor reset with tasks still in flight");
        } else {
            debug!("task monitor reset");
        }
    }
}
