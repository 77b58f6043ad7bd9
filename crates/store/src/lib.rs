//! Durable storage for alarm records.
//!
//! Records are keyed by owner and record id. Two backends are provided:
//! DynamoDB for deployments and an in-memory map for local runs and tests.

pub mod dynamo;
pub mod error;
pub mod memory;
pub mod traits;

pub use dynamo::DynamoAlarmStore;
pub use error::StoreError;
pub use memory::MemoryAlarmStore;
pub use traits::AlarmStore;
