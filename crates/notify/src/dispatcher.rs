//! Hands a fired alarm to every configured channel.
//!
//! Channels are tried in order. A failing channel does not stop delivery
//! through the others; the caller decides what a partial failure means.

use reminder_core::AlarmEvent;

use crate::traits::{DispatchResult, Notifier};

pub struct Dispatcher {
    channels: Vec<Box<dyn Notifier>>,
}

impl Dispatcher {
    pub fn new(channels: Vec<Box<dyn Notifier>>) -> Self {
        Self { channels }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Deliver `event` through every channel.
    pub async fn dispatch(&self, event: &AlarmEvent) -> Vec<DispatchResult> {
        if self.channels.is_empty() {
            tracing::debug!(user_id = %event.user_id, "No delivery channels configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.channels.len());

        for channel in &self.channels {
            let start = std::time::Instant::now();
            let result = channel.notify(event).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::info!(
                        user_id = %event.user_id,
                        channel = channel.channel_name(),
                        duration_ms,
                        "Alarm delivered"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = %event.user_id,
                        channel = channel.channel_name(),
                        error = %e,
                        duration_ms,
                        "Alarm delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                channel: channel.channel_name().to_string(),
                user_id: event.user_id.clone(),
                success,
                error,
                duration_ms,
            });
        }

        results
    }
}
