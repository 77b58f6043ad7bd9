use async_trait::async_trait;

use reminder_core::Alarm;

use crate::error::StoreError;

/// Persistence for alarm records, scoped by owner.
///
/// Every lookup takes the owner id, so one owner can never read or delete
/// another owner's records.
#[async_trait]
pub trait AlarmStore: Send + Sync {
    /// Insert or replace a record.
    async fn put(&self, alarm: &Alarm) -> Result<(), StoreError>;

    async fn get(&self, owner_id: &str, alarm_id: &str) -> Result<Option<Alarm>, StoreError>;

    /// Remove a record. Removing an absent record is not an error.
    async fn delete(&self, owner_id: &str, alarm_id: &str) -> Result<(), StoreError>;

    /// All records of one owner, in no particular order.
    async fn list(&self, owner_id: &str) -> Result<Vec<Alarm>, StoreError>;

    /// Backend name for logs and health output.
    fn backend_name(&self) -> &str;
}
