//! In-memory alarm store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use reminder_core::Alarm;

use crate::error::StoreError;
use crate::traits::AlarmStore;

/// Map-backed store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryAlarmStore {
    // (owner id, alarm id) -> record
    alarms: RwLock<HashMap<(String, String), Alarm>>,
}

impl MemoryAlarmStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AlarmStore for MemoryAlarmStore {
    async fn put(&self, alarm: &Alarm) -> Result<(), StoreError> {
        self.alarms
            .write()
            .await
            .insert((alarm.owner_id.clone(), alarm.id.clone()), alarm.clone());
        Ok(())
    }

    async fn get(&self, owner_id: &str, alarm_id: &str) -> Result<Option<Alarm>, StoreError> {
        let alarms = self.alarms.read().await;
        Ok(alarms
            .get(&(owner_id.to_string(), alarm_id.to_string()))
            .cloned())
    }

    async fn delete(&self, owner_id: &str, alarm_id: &str) -> Result<(), StoreError> {
        self.alarms
            .write()
            .await
            .remove(&(owner_id.to_string(), alarm_id.to_string()));
        Ok(())
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Alarm>, StoreError> {
        let alarms = self.alarms.read().await;
        Ok(alarms
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
