pub mod alarm;
pub mod aws;
pub mod config;
pub mod error;
pub mod schedule;

pub use alarm::{Alarm, AlarmEvent, NewAlarm};
pub use config::{Config, StoreBackend};
pub use error::*;
pub use schedule::{ScheduleExpression, ScheduleKey, ScheduleKind};
