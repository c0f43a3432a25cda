// Host capability abstraction
// Alarm delivery, notification display, durable key-value storage and the wall clock are all
// supplied by the embedding host; the engine only talks to these traits

use chrono::{DateTime, Local, TimeZone, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::render::{ChannelSpec, RenderedNotification};
use super::{NotificationError, NotificationId, NotificationResult, TimerToken};

/// How precisely a host timer was registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerPrecision {
    /// Fires at the requested instant, even while the device idles
    Exact,
    /// Best effort; the host may batch or delay delivery
    Inexact,
}

impl TimerPrecision {
    pub fn is_exact(&self) -> bool {
        matches!(self, TimerPrecision::Exact)
    }
}

/// One timer registration handed to the alarm host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerRequest {
    pub id: NotificationId,
    pub fire_at: DateTime<Utc>,
    pub precision: TimerPrecision,
    pub token: TimerToken,
}

/// Payload the host delivers back when a timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FireEvent {
    pub id: NotificationId,
    pub token: TimerToken,
    /// Instant the timer was registered for; delivery may come earlier or later
    pub fire_at: DateTime<Utc>,
}

impl From<&TimerRequest> for FireEvent {
    fn from(request: &TimerRequest) -> Self {
        Self {
            id: request.id,
            token: request.token,
            fire_at: request.fire_at,
        }
    }
}

/// Events the host dispatches into the engine, one at a time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// The device finished booting; every host timer is gone
    BootCompleted,
    /// A previously requested timer fired
    AlarmFired(FireEvent),
    /// Anything else the host forwards; ignored
    Unrecognized(String),
}

/// One-shot alarm service (AlarmManager equivalent)
pub trait AlarmHost: Send + Sync {
    /// Whether the host currently grants exact timing
    fn can_schedule_exact(&self) -> bool;

    /// Register a timer, replacing any pending timer with the same id
    ///
    /// Returns `PermissionDenied` when exact timing is requested but refused.
    fn request_timer(&self, request: &TimerRequest) -> NotificationResult<()>;

    /// Cancel the pending timer for `id`; unknown ids are a no-op
    fn cancel_timer(&self, id: NotificationId) -> NotificationResult<()>;
}

/// Notification display service (NotificationManager equivalent)
pub trait NotificationHost: Send + Sync {
    /// Create or update the channel notifications are posted to
    fn ensure_channel(&self, channel: &ChannelSpec) -> NotificationResult<()>;

    /// Show (or replace) the notification with `notification.id`
    fn display(&self, notification: &RenderedNotification) -> NotificationResult<()>;

    /// Remove a visible notification; unknown ids are a no-op
    fn dismiss(&self, id: NotificationId) -> NotificationResult<()>;

    /// Whether the app bundles a sound resource with this name
    fn has_app_sound(&self, name: &str) -> bool;
}

/// Durable string key-value storage (shared preferences equivalent)
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> NotificationResult<Option<String>>;
    fn put(&self, key: &str, value: String) -> NotificationResult<()>;
    fn remove(&self, key: &str) -> NotificationResult<()>;
}

/// Source of the current local time
pub trait Clock: Send + Sync {
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// Wall clock in the device's local zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Settable clock for simulations and tests
#[derive(Debug)]
pub struct ManualClock<Tz: TimeZone> {
    now: Mutex<DateTime<Tz>>,
}

impl<Tz: TimeZone> ManualClock<Tz> {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Tz>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now = now.clone() + by;
    }
}

impl<Tz> Clock for ManualClock<Tz>
where
    Tz: TimeZone + Send + Sync,
    Tz::Offset: Send + Sync,
{
    type Tz = Tz;

    fn now(&self) -> DateTime<Tz> {
        self.now.lock().clone()
    }
}

/// Single entry point for arming host timers
///
/// Asks for exact timing when the host grants it. A `PermissionDenied`
/// answer to an exact request is retried once as inexact; the precision that
/// was actually registered is returned.
pub struct TimerScheduler;

impl TimerScheduler {
    pub fn arm(
        host: &dyn AlarmHost,
        id: NotificationId,
        fire_at: DateTime<Utc>,
        token: TimerToken,
    ) -> NotificationResult<TimerPrecision> {
        let precision = if host.can_schedule_exact() {
            TimerPrecision::Exact
        } else {
            TimerPrecision::Inexact
        };

        let request = TimerRequest {
            id,
            fire_at,
            precision,
            token,
        };

        match host.request_timer(&request) {
            Ok(()) => Ok(precision),
            Err(NotificationError::PermissionDenied { capability, .. }) if precision.is_exact() => {
                tracing::warn!(
                    id = %id,
                    capability = %capability,
                    "Exact timing denied, falling back to inexact timer"
                );
                let degraded = TimerRequest {
                    precision: TimerPrecision::Inexact,
                    ..request
                };
                host.request_timer(&degraded)?;
                Ok(TimerPrecision::Inexact)
            },
            Err(e) => Err(e),
        }
    }
}
