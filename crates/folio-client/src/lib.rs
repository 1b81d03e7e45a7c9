//! Desktop client shell for the folio portfolio tracker.
//!
//! Wires the pieces together for one user session:
//! - HTTP backend connection
//! - Task monitor and poller
//! - Page handler registration for the task types the UI listens to
//! - Session lifecycle (login state reset on logout)

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
