//! Backend RPC surface for the folio portfolio client.
//!
//! The backend process owns all business logic (balance queries, trade
//! history, tax accounting); this crate only defines how the client asks it
//! to start long-running jobs and polls for their results:
//! - `BackendRpc`: dyn-compatible async trait over the job API
//! - `HttpBackend`: JSON-over-HTTP implementation
//! - `MockBackend`: in-memory implementation for tests

pub mod backend;
pub mod client;
pub mod error;

pub use backend::{BackendRpc, BoxFuture, DynBackend, MockBackend, StartedJob};
pub use client::HttpBackend;
pub use error::{RpcError, RpcResult};
