//! Shared state initialization: SDK clients, provisioner, store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use reminder_core::{Config, StoreBackend};
use reminder_provision::{Compensation, EventBridgeScheduler, Orchestrator};
use reminder_store::{AlarmStore, DynamoAlarmStore, MemoryAlarmStore};

use crate::service::AlarmService;
use crate::state::AppState;

pub async fn build_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    config
        .scheduler
        .require()
        .context("EventBridge Scheduler is not configured")?;
    let backend = config.store.backend_kind()?;

    let sdk = reminder_core::aws::sdk_config(&config.aws).await;

    let scheduler = EventBridgeScheduler::new(&sdk, &config.scheduler)?;
    let compensation = if config.scheduler.compensate_on_failure {
        Compensation::DeleteCreated
    } else {
        Compensation::None
    };
    let orchestrator = Orchestrator::new(Arc::new(scheduler)).with_compensation(compensation);
    info!(compensation = ?orchestrator.compensation(), "Orchestrator ready");

    let store: Arc<dyn AlarmStore> = match backend {
        StoreBackend::DynamoDb => Arc::new(DynamoAlarmStore::new(&sdk, &config.store)),
        StoreBackend::Memory => {
            info!("Using in-memory alarm store, records are lost on restart");
            Arc::new(MemoryAlarmStore::new())
        }
    };

    let alarms = AlarmService::new(
        orchestrator,
        store,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    Ok(Arc::new(AppState { config, alarms }))
}
