//! Remote provisioner trait.

use async_trait::async_trait;

use reminder_core::ScheduleKey;

use crate::error::ProvisionError;
use crate::task::ScheduleSpec;

/// Creates and deletes remote schedules, one per call.
///
/// Implementations are shared by every unit of a batch and must be safe to
/// call concurrently.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create a schedule named `key` and return the key it is reachable under.
    async fn create_schedule(
        &self,
        key: &ScheduleKey,
        spec: &ScheduleSpec,
    ) -> Result<ScheduleKey, ProvisionError>;

    /// Delete the schedule named `key`.
    ///
    /// Returns [`ProvisionError::NotFound`] when the schedule does not exist,
    /// so callers can tell absence apart from a hard failure.
    async fn delete_schedule(&self, key: &ScheduleKey) -> Result<(), ProvisionError>;

    /// Human-readable name for this backend (e.g., "eventbridge").
    fn backend_name(&self) -> &str;
}
