//! Log-only notifier for local runs without a topic.

use reminder_core::AlarmEvent;

use crate::traits::{Notifier, NotifyError};

pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &AlarmEvent) -> Result<(), NotifyError> {
        tracing::info!(user_id = %event.user_id, message = %event.message, "alarm fired");
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
