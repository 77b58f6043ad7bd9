//! EventBridge Scheduler provisioner.

use async_trait::async_trait;
use aws_sdk_scheduler::error::DisplayErrorContext;
use aws_sdk_scheduler::types::{
    ActionAfterCompletion, FlexibleTimeWindow, FlexibleTimeWindowMode, Target,
};
use aws_sdk_scheduler::Client;
use aws_types::SdkConfig;
use tracing::{debug, info};

use reminder_core::config::SchedulerConfig;
use reminder_core::ScheduleKey;

use crate::error::ProvisionError;
use crate::provisioner::Provisioner;
use crate::task::ScheduleSpec;

/// Provisions one EventBridge schedule per alarm firing time.
///
/// Every schedule invokes the same target (the alarm executor) with the
/// owner and message as JSON input, and removes itself after its last firing.
pub struct EventBridgeScheduler {
    client: Client,
    target_arn: String,
    role_arn: String,
    group_name: Option<String>,
}

impl EventBridgeScheduler {
    pub fn new(sdk: &SdkConfig, scheduler: &SchedulerConfig) -> Result<Self, ProvisionError> {
        Self::from_client(Client::new(sdk), scheduler)
    }

    pub fn from_client(client: Client, scheduler: &SchedulerConfig) -> Result<Self, ProvisionError> {
        let target_arn = scheduler.target_arn.clone().ok_or_else(|| {
            ProvisionError::Internal("SCHEDULER_TARGET_ARN is not configured".to_string())
        })?;
        let role_arn = scheduler.role_arn.clone().ok_or_else(|| {
            ProvisionError::Internal("SCHEDULER_ROLE_ARN is not configured".to_string())
        })?;

        info!(
            target = %target_arn,
            group = scheduler.group_name.as_deref().unwrap_or("default"),
            "EventBridge scheduler initialized"
        );

        Ok(Self {
            client,
            target_arn,
            role_arn,
            group_name: scheduler.group_name.clone(),
        })
    }
}

/// JSON handed to the target on every firing.
fn target_input(spec: &ScheduleSpec) -> Result<String, ProvisionError> {
    serde_json::to_string(&spec.event())
        .map_err(|e| ProvisionError::Internal(format!("encode target input: {e}")))
}

#[async_trait]
impl Provisioner for EventBridgeScheduler {
    async fn create_schedule(
        &self,
        key: &ScheduleKey,
        spec: &ScheduleSpec,
    ) -> Result<ScheduleKey, ProvisionError> {
        let expression = spec
            .expression
            .render()
            .map_err(|e| ProvisionError::Internal(e.to_string()))?;

        let window = FlexibleTimeWindow::builder()
            .mode(FlexibleTimeWindowMode::Off)
            .build()
            .map_err(|e| ProvisionError::Internal(e.to_string()))?;

        let target = Target::builder()
            .arn(&self.target_arn)
            .role_arn(&self.role_arn)
            .input(target_input(spec)?)
            .build()
            .map_err(|e| ProvisionError::Internal(e.to_string()))?;

        self.client
            .create_schedule()
            .name(key.as_str())
            .set_group_name(self.group_name.clone())
            .schedule_expression(&expression)
            .schedule_expression_timezone(&spec.timezone)
            .description(&spec.message)
            .action_after_completion(ActionAfterCompletion::Delete)
            .flexible_time_window(window)
            .target(target)
            .client_token(uuid::Uuid::new_v4().to_string())
            .send()
            .await
            .map_err(|e| ProvisionError::Provider(DisplayErrorContext(&e).to_string()))?;

        debug!(key = %key, expression = %expression, "schedule created");
        Ok(key.clone())
    }

    async fn delete_schedule(&self, key: &ScheduleKey) -> Result<(), ProvisionError> {
        let result = self
            .client
            .delete_schedule()
            .name(key.as_str())
            .set_group_name(self.group_name.clone())
            .client_token(uuid::Uuid::new_v4().to_string())
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!(key = %key, "schedule deleted");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_resource_not_found_exception()) =>
            {
                Err(ProvisionError::NotFound(key.to_string()))
            }
            Err(e) => Err(ProvisionError::Provider(DisplayErrorContext(&e).to_string())),
        }
    }

    fn backend_name(&self) -> &str {
        "eventbridge"
    }
}
