//! Route handlers.

pub mod alarms;
pub mod health;

pub use alarms::{create_alarm, delete_alarm, list_alarms};
pub use health::health;
