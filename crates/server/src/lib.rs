//! HTTP front end for alarm reminders.
//!
//! Validates requests, turns them into provisioning batches for the
//! orchestrator and persists the resulting records.

pub mod api;
pub mod auth;
pub mod error;
pub mod router;
pub mod service;
pub mod startup;
pub mod state;

pub use router::build_router;
pub use service::{AlarmService, ServiceError};
pub use state::AppState;
