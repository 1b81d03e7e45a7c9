//! Counting barrier over outstanding balance-source tasks.
//!
//! Balances come from many independent sources (each exchange, each
//! blockchain), queried concurrently as separate backend jobs. Only once
//! *all* of them have reported in is it safe to ask the backend for the
//! consolidated snapshot; issuing it earlier would race with in-flight
//! per-source updates. The barrier tracks which source jobs are still
//! outstanding and reports the exact moment the last one finishes, so the
//! consolidation fires exactly once per batch.

use std::collections::HashSet;

use tracing::debug;

use folio_core::TaskId;

use crate::error::{MonitorError, MonitorResult};

/// Barrier lifecycle state.
///
/// Invariant: `Requested` iff the outstanding set is non-empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierState {
    /// No balance batch has run this session.
    Start,
    /// At least one balance-source task is outstanding.
    Requested,
    /// A batch finished; the consolidation has been triggered.
    Complete,
}

/// Outcome of removing an outstanding task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierTransition {
    /// Sources are still outstanding (count remaining).
    Pending(usize),
    /// The last source reported in; the caller must trigger the
    /// consolidation now, exactly once.
    Completed,
}

/// Tracks the balance-source tasks of the current batch.
///
/// Not internally synchronized; the monitor guards it together with the
/// task registry under one lock so removal and the emptiness check happen
/// as a single atomic step.
#[derive(Debug)]
pub struct BalanceBarrier {
    state: BarrierState,
    outstanding: HashSet<TaskId>,
}

impl Default for BalanceBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceBarrier {
    /// Create a new barrier in the `Start` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: BarrierState::Start,
            outstanding: HashSet::new(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BarrierState {
        self.state
    }

    /// Whether this id belongs to the current batch.
    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.outstanding.contains(id)
    }

    /// Number of sources still outstanding.
    #[must_use]
    pub fn outstanding_len(&self) -> usize {
        self.outstanding.len()
    }

    /// Track a newly started balance-source task.
    ///
    /// Arms the barrier (`Start`/`Complete` -> `Requested`) on the first
    /// task of a batch; adding more sources while already `Requested` only
    /// grows the set.
    pub fn add_outstanding(&mut self, id: TaskId) {
        self.outstanding.insert(id.clone());
        match self.state {
            BarrierState::Start | BarrierState::Complete => {
                self.state = BarrierState::Requested;
                debug!(task_id = %id, "balance barrier armed");
            }
            BarrierState::Requested => {
                debug!(task_id = %id, outstanding = self.outstanding.len(), "balance source added");
            }
        }
    }

    /// Remove a finished balance-source task.
    ///
    /// Errors without mutating the set when the barrier is not `Requested`
    /// or the id is not tracked; both mean the caller's bookkeeping has
    /// desynchronized from ours.
    pub fn remove_outstanding(&mut self, id: &TaskId) -> MonitorResult<BarrierTransition> {
        if self.state != BarrierState::Requested {
            return Err(MonitorError::BarrierOutOfSync {
                state: self.state,
                id: id.clone(),
            });
        }
        if !self.outstanding.remove(id) {
            return Err(MonitorError::BarrierOutOfSync {
                state: self.state,
                id: id.clone(),
            });
        }

        if self.outstanding.is_empty() {
            self.state = BarrierState::Complete;
            debug!(task_id = %id, "last balance source finished");
            Ok(BarrierTransition::Completed)
        } else {
            Ok(BarrierTransition::Pending(self.outstanding.len()))
        }
    }

    /// Drop all bookkeeping and return to `Start`. Used on logout.
    pub fn reset(&mut self) {
        self.outstanding.clear();
        self.state = BarrierState::Start;
    }
}
