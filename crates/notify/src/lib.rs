//! Delivery of fired alarms.
//!
//! This crate provides:
//! - `Notifier` trait for pluggable delivery channels
//! - SNS and log-only notifier implementations
//! - Dispatcher that hands one alarm event to every configured channel
//! - The `alarm-executor` binary invoked when a schedule fires

pub mod dispatcher;
pub mod log;
pub mod sns;
pub mod traits;

pub use dispatcher::Dispatcher;
pub use log::LogNotifier;
pub use sns::SnsNotifier;
pub use traits::{parse_event, DispatchResult, Notifier, NotifyError};
