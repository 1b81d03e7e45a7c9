//! Core domain types for the folio portfolio client.
//!
//! This crate provides the fundamental types shared by the task monitor
//! and the RPC layer:
//! - `TaskId`: Backend-assigned identifier for an asynchronous job
//! - `TaskType`: Tag identifying what kind of job a task represents
//! - `Task`: One outstanding asynchronous backend job

pub mod error;
pub mod task;

pub use error::{CoreError, Result};
pub use task::{Task, TaskId, TaskType};
