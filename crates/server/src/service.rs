//! Alarm use cases: create, delete, list.
//!
//! Remote schedules and the stored record are written in a fixed order.
//! Creation provisions every schedule before the record is stored; deletion
//! removes every schedule before the record is removed. A record therefore
//! never references a schedule that was not confirmed at the time.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use reminder_core::{Alarm, NewAlarm, ValidationError};
use reminder_provision::{
    CancellationToken, FailureMode, Orchestrator, ProvisionError, ScheduleSpec, Task,
};
use reminder_store::{AlarmStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("alarm not found")]
    NotFound,

    #[error("provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("store failed: {0}")]
    Store(#[from] StoreError),
}

/// Cancellation scope that fires once `timeout` elapses.
///
/// Dropping it stops the timer; the scope itself stays uncancelled.
struct Deadline {
    scope: CancellationToken,
    timer: JoinHandle<()>,
}

impl Deadline {
    fn start(timeout: Duration) -> Self {
        let scope = CancellationToken::new();
        let expiry = scope.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!(timeout_secs = timeout.as_secs(), "request deadline passed, cancelling provisioning");
            expiry.cancel();
        });
        Self { scope, timer }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

pub struct AlarmService {
    orchestrator: Orchestrator,
    store: Arc<dyn AlarmStore>,
    request_timeout: Duration,
}

impl AlarmService {
    pub fn new(orchestrator: Orchestrator, store: Arc<dyn AlarmStore>, request_timeout: Duration) -> Self {
        Self {
            orchestrator,
            store,
            request_timeout,
        }
    }

    pub fn store_backend(&self) -> &str {
        self.store.backend_name()
    }

    /// Provision one schedule per firing time, then store the record.
    pub async fn create(&self, owner_id: &str, request: NewAlarm) -> Result<Alarm, ServiceError> {
        let expressions = request.validate()?;

        let tasks: Vec<Task> = expressions
            .into_iter()
            .map(|expression| {
                Task::create(ScheduleSpec {
                    expression,
                    timezone: request.timezone.clone(),
                    message: request.message.clone(),
                    owner_id: owner_id.to_string(),
                })
            })
            .collect();

        let deadline = Deadline::start(self.request_timeout);
        let created = self
            .orchestrator
            .run_scoped(tasks, FailureMode::FailFast, &deadline.scope)
            .await?;
        drop(deadline);

        let alarm = Alarm::from_schedules(owner_id, &request, created);
        self.store.put(&alarm).await?;

        info!(alarm_id = %alarm.id, schedules = alarm.schedule_count(), "alarm created");
        Ok(alarm)
    }

    /// Remove every schedule of the alarm, then the record.
    ///
    /// Schedules already gone (fired one-shot dates, an earlier partial
    /// delete) do not block the deletion.
    pub async fn delete(&self, owner_id: &str, alarm_id: &str) -> Result<(), ServiceError> {
        let alarm = self
            .store
            .get(owner_id, alarm_id)
            .await?
            .ok_or(ServiceError::NotFound)?;

        let tasks: Vec<Task> = alarm.schedule_keys().into_iter().map(Task::delete).collect();

        let deadline = Deadline::start(self.request_timeout);
        self.orchestrator
            .run_scoped(tasks, FailureMode::TolerateNotFound, &deadline.scope)
            .await?;
        drop(deadline);

        self.store.delete(owner_id, alarm_id).await?;

        info!(alarm_id = %alarm_id, schedules = alarm.schedule_count(), "alarm deleted");
        Ok(())
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<Alarm>, ServiceError> {
        Ok(self.store.list(owner_id).await?)
    }
}
