//! Monitor error types.

use thiserror::Error;

use folio_core::TaskId;
use folio_rpc::RpcError;

use crate::barrier::BarrierState;

/// Errors from the task monitor core.
///
/// `UnknownTask`, `DuplicateTask` and `BarrierOutOfSync` indicate the
/// registry and the barrier have desynchronized. They must surface to the
/// caller instead of being swallowed: continuing with inconsistent
/// bookkeeping risks either never firing the consolidation call or firing
/// it more than once.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Unknown task id: {0}")]
    UnknownTask(TaskId),

    #[error("Duplicate task id: {0}")]
    DuplicateTask(TaskId),

    #[error("Balance barrier out of sync: removing {id} while state is {state:?}")]
    BarrierOutOfSync { state: BarrierState, id: TaskId },

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),
}

/// Result type alias for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;
