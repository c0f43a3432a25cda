// Persisted weekly schedule, override table and sound flag
// Reads are tolerant: each entry is decoded on its own and a corrupt one is skipped

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::{ContentOverride, ContentOverrides, NotificationContent};
use super::platform::KeyValueStore;
use super::trigger::{SlotTime, Weekday};
use super::{NotificationError, NotificationId, NotificationResult};

/// One weekly recurrence entry as submitted by the caller and persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub id: NotificationId,
    pub weekday: Weekday,
    pub hour: u32,
    pub minute: u32,
    #[serde(flatten)]
    pub content: NotificationContent,
}

impl ScheduledNotification {
    pub fn new(
        id: impl Into<NotificationId>,
        weekday: Weekday,
        time: SlotTime,
        content: NotificationContent,
    ) -> Self {
        Self {
            id: id.into(),
            weekday,
            hour: time.hour(),
            minute: time.minute(),
            content,
        }
    }

    /// Validated slot time
    pub fn slot(&self) -> NotificationResult<SlotTime> {
        SlotTime::new(self.hour, self.minute).map_err(|e| self.malformed(e))
    }

    pub fn validate(&self) -> NotificationResult<()> {
        self.slot().map(|_| ())
    }

    /// Decode one persisted or submitted entry
    pub fn from_value(value: Value) -> NotificationResult<Self> {
        let hint = value
            .get("id")
            .map(Value::to_string)
            .unwrap_or_else(|| "<no id>".to_string());
        let entry: ScheduledNotification = serde_json::from_value(value)
            .map_err(|e| NotificationError::malformed(format!("schedule[{}]", hint), e.to_string()))?;
        entry.validate()?;
        Ok(entry)
    }

    fn malformed(&self, cause: NotificationError) -> NotificationError {
        let message = match cause {
            NotificationError::MalformedEntry { entry, message } => format!("{}: {}", entry, message),
            other => other.to_string(),
        };
        NotificationError::malformed(format!("schedule[{}]", self.id), message)
    }
}

/// Persisted key names, derived from the configured namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeys {
    pub schedule: String,
    pub overrides: String,
    pub sound_enabled: String,
}

impl StoreKeys {
    pub fn new(namespace: &str) -> Self {
        Self {
            schedule: format!("{}/dailySchedule", namespace),
            overrides: format!("{}/factsByDate", namespace),
            sound_enabled: format!("{}/soundEnabled", namespace),
        }
    }
}

/// Result of a tolerant schedule read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedSchedule {
    pub entries: BTreeMap<NotificationId, ScheduledNotification>,
    /// Entries that could not be decoded, one error each
    pub skipped: Vec<NotificationError>,
}

impl LoadedSchedule {
    pub fn ids(&self) -> impl Iterator<Item = NotificationId> + '_ {
        self.entries.keys().copied()
    }
}

/// Typed access to the notifier's persisted state
#[derive(Clone)]
pub struct ScheduleStore {
    kv: Arc<dyn KeyValueStore>,
    keys: StoreKeys,
}

impl ScheduleStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, namespace: &str) -> Self {
        Self {
            kv,
            keys: StoreKeys::new(namespace),
        }
    }

    pub fn keys(&self) -> &StoreKeys {
        &self.keys
    }

    /// Read the schedule, skipping (and reporting) entries that fail to decode
    ///
    /// Accepts the keyed-object form and the legacy array form.
    pub fn load_schedule(&self) -> NotificationResult<LoadedSchedule> {
        let mut loaded = LoadedSchedule::default();
        let Some(raw) = self.kv.get(&self.keys.schedule)? else {
            return Ok(loaded);
        };
        if raw.trim().is_empty() {
            return Ok(loaded);
        }

        let values: Vec<(Option<String>, Value)> = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map.into_iter().map(|(k, v)| (Some(k), v)).collect(),
            Ok(Value::Array(list)) => list.into_iter().map(|v| (None, v)).collect(),
            Ok(other) => {
                loaded.skipped.push(NotificationError::malformed(
                    "dailySchedule",
                    format!("expected an object or array, found {}", json_kind(&other)),
                ));
                return Ok(loaded);
            },
            Err(e) => {
                tracing::warn!(error = %e, "Persisted schedule is not valid JSON");
                loaded
                    .skipped
                    .push(NotificationError::malformed("dailySchedule", e.to_string()));
                return Ok(loaded);
            },
        };

        for (key, value) in values {
            match ScheduledNotification::from_value(value) {
                Ok(entry) => {
                    if let Some(key) = key.as_deref()
                        && key.parse::<NotificationId>().ok() != Some(entry.id)
                    {
                        tracing::warn!(key, id = %entry.id, "Schedule key disagrees with entry id, using entry id");
                    }
                    loaded.entries.insert(entry.id, entry);
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping persisted schedule entry");
                    loaded.skipped.push(e);
                },
            }
        }

        Ok(loaded)
    }

    pub fn save_schedule(
        &self,
        entries: &BTreeMap<NotificationId, ScheduledNotification>,
    ) -> NotificationResult<()> {
        if entries.is_empty() {
            return self.kv.remove(&self.keys.schedule);
        }
        let json = serde_json::to_string(entries).map_err(|e| NotificationError::SerializationError {
            what: "dailySchedule".to_string(),
            message: e.to_string(),
        })?;
        self.kv.put(&self.keys.schedule, json)
    }

    /// Read the override table, skipping entries with a bad date or shape
    pub fn load_overrides(&self) -> NotificationResult<ContentOverrides> {
        let Some(raw) = self.kv.get(&self.keys.overrides)? else {
            return Ok(ContentOverrides::new());
        };

        let map = match serde_json::from_str::<BTreeMap<String, Value>>(&raw) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "Persisted content overrides are unreadable, ignoring them");
                return Ok(ContentOverrides::new());
            },
        };

        let mut overrides = ContentOverrides::new();
        for (key, value) in map {
            let Ok(date) = NaiveDate::parse_from_str(&key, "%Y-%m-%d") else {
                tracing::warn!(key, "Skipping content override with an invalid date");
                continue;
            };
            match serde_json::from_value::<ContentOverride>(value) {
                Ok(entry) => {
                    overrides.insert(date, entry);
                },
                Err(e) => tracing::warn!(date = %date, error = %e, "Skipping malformed content override"),
            }
        }
        Ok(overrides)
    }

    pub fn save_overrides(&self, overrides: &ContentOverrides) -> NotificationResult<()> {
        let json = serde_json::to_string(overrides).map_err(|e| NotificationError::SerializationError {
            what: "factsByDate".to_string(),
            message: e.to_string(),
        })?;
        self.kv.put(&self.keys.overrides, json)
    }

    /// Sound flag; absent or unreadable values mean enabled
    pub fn sound_enabled(&self) -> NotificationResult<bool> {
        Ok(match self.kv.get(&self.keys.sound_enabled)? {
            Some(raw) => raw.trim() != "false",
            None => true,
        })
    }

    pub fn set_sound_enabled(&self, enabled: bool) -> NotificationResult<()> {
        self.kv.put(&self.keys.sound_enabled, enabled.to_string())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
