//! SNS notifier.
//!
//! Publishes the alarm message to one topic, tagged with a `userID` message
//! attribute. Per-user subscriptions carry a filter policy on that attribute,
//! so each owner only receives their own alarms.

use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::Client;
use aws_types::SdkConfig;
use tracing::{debug, info};

use reminder_core::config::NotifyConfig;
use reminder_core::AlarmEvent;

use crate::traits::{Notifier, NotifyError};

pub struct SnsNotifier {
    client: Client,
    topic_arn: String,
}

impl SnsNotifier {
    pub fn new(sdk: &SdkConfig, notify: &NotifyConfig) -> Result<Self, NotifyError> {
        let topic_arn = notify
            .topic_arn
            .clone()
            .ok_or_else(|| NotifyError::Config("SNS_TOPIC_ARN is not set".to_string()))?;
        info!(topic = %topic_arn, "SNS notifier initialized");
        Ok(Self {
            client: Client::new(sdk),
            topic_arn,
        })
    }
}

fn owner_attribute(user_id: &str) -> Result<MessageAttributeValue, NotifyError> {
    MessageAttributeValue::builder()
        .data_type("String")
        .string_value(user_id)
        .build()
        .map_err(|e| NotifyError::Delivery(e.to_string()))
}

#[async_trait::async_trait]
impl Notifier for SnsNotifier {
    async fn notify(&self, event: &AlarmEvent) -> Result<(), NotifyError> {
        let output = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .message(&event.message)
            .message_attributes("userID", owner_attribute(&event.user_id)?)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(DisplayErrorContext(&e).to_string()))?;

        debug!(
            user_id = %event.user_id,
            message_id = output.message_id().unwrap_or("-"),
            "alarm published"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "sns"
    }
}
