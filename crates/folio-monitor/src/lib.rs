//! Task monitor and balance aggregation for the folio portfolio client.
//!
//! The backend runs every expensive operation (balance queries, trade
//! history processing) as a long-running job and hands back a task id.
//! This crate is the client-side scheduler around those ids:
//! - `TaskRegistry`: the set of in-flight tasks, keyed by id
//! - `BalanceBarrier`: waits for every balance-source job of a batch to
//!   finish, then triggers one consolidating balance query
//! - `CallbackTable`: routes completed results to whatever UI code is
//!   listening for that task type
//! - `TaskMonitor`: session-scoped facade tying registry, barrier and
//!   dispatch together with atomic resolve semantics
//! - `TaskPoller`: fixed-interval loop asking the backend which tasks have
//!   finished

pub mod barrier;
pub mod dispatch;
pub mod error;
pub mod monitor;
pub mod poller;
pub mod registry;

pub use barrier::{BalanceBarrier, BarrierState, BarrierTransition};
pub use dispatch::CallbackTable;
pub use error::{MonitorError, MonitorResult};
pub use monitor::{Activity, JobOptions, TaskMonitor};
pub use poller::{PollerConfig, TaskPoller};
pub use registry::TaskRegistry;
