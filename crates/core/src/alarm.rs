//! The alarm record and the payloads derived from it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::schedule::{ScheduleExpression, ScheduleKey, ScheduleKind};

/// A persisted alarm: one message plus the remote schedules that fire it.
///
/// Field names match the stored item and the JSON the frontend consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    #[serde(rename = "EventID")]
    pub id: String,
    #[serde(rename = "UserID")]
    pub owner_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Timezone")]
    pub timezone: String,
    /// Schedule key → absolute date as the user wrote it.
    #[serde(rename = "Dates", default)]
    pub dates: BTreeMap<String, String>,
    /// Schedule key → cron expression as the user wrote it.
    #[serde(rename = "Crons", default)]
    pub crons: BTreeMap<String, String>,
}

impl Alarm {
    /// Assemble a record from provisioned schedules, generating a fresh id.
    pub fn from_schedules<I>(owner_id: &str, request: &NewAlarm, schedules: I) -> Self
    where
        I: IntoIterator<Item = (ScheduleKey, ScheduleExpression)>,
    {
        let mut dates = BTreeMap::new();
        let mut crons = BTreeMap::new();
        for (key, expression) in schedules {
            match expression.kind {
                ScheduleKind::At => dates.insert(key.into_string(), expression.value),
                ScheduleKind::Cron => crons.insert(key.into_string(), expression.value),
            };
        }
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            title: request.message.clone(),
            timezone: request.timezone.clone(),
            dates,
            crons,
        }
    }

    /// Keys of every remote schedule this alarm owns.
    pub fn schedule_keys(&self) -> Vec<ScheduleKey> {
        self.dates
            .keys()
            .chain(self.crons.keys())
            .map(|k| ScheduleKey::from(k.as_str()))
            .collect()
    }

    pub fn schedule_count(&self) -> usize {
        self.dates.len() + self.crons.len()
    }
}

/// A request to create an alarm, as submitted by its owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAlarm {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub crons: Vec<String>,
    #[serde(default)]
    pub timezone: String,
}

impl NewAlarm {
    /// Check the request and return its firing times in submission order.
    pub fn validate(&self) -> Result<Vec<ScheduleExpression>, ValidationError> {
        if self.message.trim().is_empty() {
            return Err(ValidationError::EmptyField("message"));
        }
        if self.timezone.trim().is_empty() {
            return Err(ValidationError::EmptyField("timezone"));
        }
        if self.dates.is_empty() && self.crons.is_empty() {
            return Err(ValidationError::NoSchedules);
        }

        let expressions: Vec<ScheduleExpression> = self
            .dates
            .iter()
            .map(ScheduleExpression::at)
            .chain(self.crons.iter().map(ScheduleExpression::cron))
            .collect();
        for expression in &expressions {
            expression.validate()?;
        }
        Ok(expressions)
    }
}

/// Payload attached to every remote schedule and delivered when it fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmEvent {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub message: String,
}
