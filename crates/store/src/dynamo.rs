//! DynamoDB alarm store.
//!
//! One item per alarm, keyed by `UserID` (partition) and `EventID` (sort).
//! `Dates` and `Crons` are maps of schedule key to the expression the user
//! wrote, stored as `M` of `S`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use aws_types::SdkConfig;
use tracing::{debug, info};

use reminder_core::config::StoreConfig;
use reminder_core::Alarm;

use crate::error::StoreError;
use crate::traits::AlarmStore;

type Item = HashMap<String, AttributeValue>;

const OWNER: &str = "UserID";
const ID: &str = "EventID";
const TITLE: &str = "Title";
const TIMEZONE: &str = "Timezone";
const DATES: &str = "Dates";
const CRONS: &str = "Crons";

pub struct DynamoAlarmStore {
    client: Client,
    table_name: String,
}

impl DynamoAlarmStore {
    pub fn new(sdk: &SdkConfig, store: &StoreConfig) -> Self {
        Self::from_client(Client::new(sdk), &store.table_name)
    }

    pub fn from_client(client: Client, table_name: &str) -> Self {
        info!(table = %table_name, "DynamoDB alarm store initialized");
        Self {
            client,
            table_name: table_name.to_string(),
        }
    }

    fn key(owner_id: &str, alarm_id: &str) -> Item {
        HashMap::from([
            (OWNER.to_string(), AttributeValue::S(owner_id.to_string())),
            (ID.to_string(), AttributeValue::S(alarm_id.to_string())),
        ])
    }
}

fn backend_err<E>(err: E) -> StoreError
where
    E: std::error::Error,
{
    StoreError::Backend(DisplayErrorContext(&err).to_string())
}

fn string_map(map: &BTreeMap<String, String>) -> AttributeValue {
    AttributeValue::M(
        map.iter()
            .map(|(k, v)| (k.clone(), AttributeValue::S(v.clone())))
            .collect(),
    )
}

pub(crate) fn alarm_to_item(alarm: &Alarm) -> Item {
    HashMap::from([
        (ID.to_string(), AttributeValue::S(alarm.id.clone())),
        (OWNER.to_string(), AttributeValue::S(alarm.owner_id.clone())),
        (TITLE.to_string(), AttributeValue::S(alarm.title.clone())),
        (TIMEZONE.to_string(), AttributeValue::S(alarm.timezone.clone())),
        (DATES.to_string(), string_map(&alarm.dates)),
        (CRONS.to_string(), string_map(&alarm.crons)),
    ])
}

fn read_string(item: &Item, name: &str) -> Result<String, StoreError> {
    match item.get(name) {
        Some(AttributeValue::S(s)) => Ok(s.clone()),
        Some(_) => Err(StoreError::Decode(format!("{name} is not a string"))),
        None => Err(StoreError::Decode(format!("{name} is missing"))),
    }
}

/// Missing maps decode as empty; items written before a kind existed lack it.
fn read_string_map(item: &Item, name: &str) -> Result<BTreeMap<String, String>, StoreError> {
    let Some(value) = item.get(name) else {
        return Ok(BTreeMap::new());
    };
    let AttributeValue::M(entries) = value else {
        return Err(StoreError::Decode(format!("{name} is not a map")));
    };
    entries
        .iter()
        .map(|(k, v)| match v {
            AttributeValue::S(s) => Ok((k.clone(), s.clone())),
            _ => Err(StoreError::Decode(format!("{name}.{k} is not a string"))),
        })
        .collect()
}

pub(crate) fn item_to_alarm(item: &Item) -> Result<Alarm, StoreError> {
    Ok(Alarm {
        id: read_string(item, ID)?,
        owner_id: read_string(item, OWNER)?,
        title: read_string(item, TITLE)?,
        timezone: read_string(item, TIMEZONE)?,
        dates: read_string_map(item, DATES)?,
        crons: read_string_map(item, CRONS)?,
    })
}

#[async_trait]
impl AlarmStore for DynamoAlarmStore {
    async fn put(&self, alarm: &Alarm) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(alarm_to_item(alarm)))
            .send()
            .await
            .map_err(backend_err)?;
        debug!(alarm_id = %alarm.id, schedules = alarm.schedule_count(), "alarm stored");
        Ok(())
    }

    async fn get(&self, owner_id: &str, alarm_id: &str) -> Result<Option<Alarm>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(owner_id, alarm_id)))
            .consistent_read(true)
            .send()
            .await
            .map_err(backend_err)?;

        output.item().map(item_to_alarm).transpose()
    }

    async fn delete(&self, owner_id: &str, alarm_id: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(Self::key(owner_id, alarm_id)))
            .send()
            .await
            .map_err(backend_err)?;
        debug!(alarm_id = %alarm_id, "alarm record deleted");
        Ok(())
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Alarm>, StoreError> {
        let mut alarms = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("#owner = :owner")
                .expression_attribute_names("#owner", OWNER)
                .expression_attribute_values(":owner", AttributeValue::S(owner_id.to_string()))
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(backend_err)?;

            for item in output.items() {
                alarms.push(item_to_alarm(item)?);
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(alarms)
    }

    fn backend_name(&self) -> &str {
        "dynamodb"
    }
}
