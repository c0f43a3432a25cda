// Weekly notification components
// Domain model, persisted schedule, host capabilities and the fire-and-rearm engine

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod config;
pub mod content;
pub mod lifecycle;
pub mod notifier;
pub mod plan;
pub mod platform;
pub mod render;
pub mod schedule;
pub mod trigger;

pub use config::NotifierConfig;
pub use content::{ContentOverride, ContentOverrides, NotificationContent, TintColor, is_valid_icon_name};
pub use lifecycle::{LifecycleTable, ScheduleLifecycle, ScheduleState, StateTransition, TransitionReason};
pub use notifier::{
    ArmedTimer, FireOutcome, IgnoredReason, NotifierBuilder, RecoveryReport, ScheduleReport,
    WeeklyNotifier,
};
pub use plan::{DAILY_NOTIFICATION_IDS, OVERRIDE_WINDOW_DAYS, WeeklyPlan, daily_id, override_dates};
pub use platform::{
    AlarmHost, Clock, FireEvent, HostEvent, KeyValueStore, ManualClock, NotificationHost,
    SystemClock, TimerPrecision, TimerRequest, TimerScheduler,
};
pub use render::{ChannelSpec, LargeIcon, NotificationRenderer, RenderedNotification, SoundChoice};
pub use schedule::{LoadedSchedule, ScheduleStore, ScheduledNotification, StoreKeys};
pub use trigger::{SlotTime, Weekday, next_trigger};

/// Caller-assigned notification id, stable across reschedules
///
/// Doubles as the host's timer request code and displayed-notification id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(i32);

impl NotificationId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

impl From<i32> for NotificationId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for NotificationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Token attached to one armed timer
///
/// The host hands it back in the [`FireEvent`]; a fire whose token does not
/// match the currently armed one is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerToken(Uuid);

impl TimerToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for TimerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error types for the scheduling engine and its hosts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    /// A required host service is absent; the operation is aborted
    #[error("Host service unavailable: {service}")]
    HostUnavailable { service: String },
    /// One schedule or override entry failed validation or parsing
    #[error("Malformed entry {entry}: {message}")]
    MalformedEntry { entry: String, message: String },
    /// The host refused a privileged capability (exact timing)
    #[error("Permission denied for notification {id}: {capability}")]
    PermissionDenied {
        id: NotificationId,
        capability: String,
    },
    /// Durable key-value storage failed
    #[error("Storage error on key '{key}': {message}")]
    StorageError { key: String, message: String },
    /// Persisted state could not be encoded or decoded as a whole
    #[error("Serialization error for {what}: {message}")]
    SerializationError { what: String, message: String },
    /// The notification host failed to show a notification
    #[error("Display failed for notification {id}: {message}")]
    DisplayError { id: NotificationId, message: String },
}

impl NotificationError {
    pub fn host_unavailable(service: impl Into<String>) -> Self {
        Self::HostUnavailable {
            service: service.into(),
        }
    }

    pub fn malformed(entry: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedEntry {
            entry: entry.into(),
            message: message.into(),
        }
    }

    /// Errors that abort a whole operation instead of a single entry
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            NotificationError::HostUnavailable { .. } | NotificationError::StorageError { .. }
        )
    }
}

/// Type alias for results throughout the crate
pub type NotificationResult<T> = Result<T, NotificationError>;
