//! Notifier trait definition and shared error types.

use reminder_core::AlarmEvent;

/// Errors that can occur during alarm delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid alarm event: {0}")]
    InvalidEvent(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Trait for delivery channel implementations.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one fired alarm to its owner.
    async fn notify(&self, event: &AlarmEvent) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "sns").
    fn channel_name(&self) -> &str;
}

/// Result of delivering an event through a single channel.
#[derive(Debug)]
pub struct DispatchResult {
    pub channel: String,
    pub user_id: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Decode the JSON payload a schedule delivers when it fires.
pub fn parse_event(raw: &str) -> Result<AlarmEvent, NotifyError> {
    let event: AlarmEvent =
        serde_json::from_str(raw.trim()).map_err(|e| NotifyError::InvalidEvent(e.to_string()))?;
    if event.user_id.is_empty() {
        return Err(NotifyError::InvalidEvent("userID is empty".to_string()));
    }
    Ok(event)
}
