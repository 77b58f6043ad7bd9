//! Concurrent provisioning of the remote schedules behind one alarm.
//!
//! This crate provides:
//! - `Provisioner` trait for the remote schedule API, with an EventBridge
//!   Scheduler implementation
//! - `Task` / `TaskOutcome`, one unit of create or delete work and its result
//! - `Aggregator` and `CancellationController`, the only state shared
//!   between concurrently running units
//! - `Orchestrator`, which fans a task list out, fans the results back in
//!   and reports either every generated key or the first failure

pub mod aggregator;
pub mod cancel;
pub mod error;
pub mod orchestrator;
pub mod provisioner;
pub mod scheduler;
pub mod task;

pub use aggregator::Aggregator;
pub use cancel::{CancellationController, FirstFailure};
pub use error::ProvisionError;
pub use orchestrator::{AggregatedResult, Compensation, OrchestrationResult, Orchestrator};
pub use provisioner::Provisioner;
pub use scheduler::EventBridgeScheduler;
pub use task::{FailureMode, ScheduleSpec, Task, TaskKind, TaskOutcome};
pub use tokio_util::sync::CancellationToken;
