// Weekly notification engine
// Turns one-shot host timers into a weekly recurrence: every fire displays, then re-arms
// the next occurrence under the same id before returning

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::config::NotifierConfig;
use super::content::{ContentOverrides, NotificationContent};
use super::lifecycle::{LifecycleTable, ScheduleLifecycle, ScheduleState, TransitionReason};
use super::plan::DAILY_NOTIFICATION_IDS;
use super::platform::{
    AlarmHost, Clock, FireEvent, HostEvent, KeyValueStore, NotificationHost, TimerPrecision,
    TimerScheduler,
};
use super::render::NotificationRenderer;
use super::schedule::{LoadedSchedule, ScheduleStore, ScheduledNotification};
use super::trigger::next_trigger;
use super::{NotificationError, NotificationId, NotificationResult, TimerToken};

/// A timer the engine registered with the alarm host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedTimer {
    pub id: NotificationId,
    pub fire_at: DateTime<Utc>,
    pub precision: TimerPrecision,
}

/// Outcome of `schedule_weekly`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    pub armed: Vec<ArmedTimer>,
    /// Ids that were scheduled before and are not part of the new list
    pub cancelled: Vec<NotificationId>,
    pub skipped: Vec<NotificationError>,
}

/// Outcome of a boot recovery pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub armed: Vec<ArmedTimer>,
    pub skipped: Vec<NotificationError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    /// No persisted record for the id (never scheduled or cancelled)
    NotScheduled,
    /// The record exists but the engine holds no timer for it
    NotArmed,
    /// The fire carries a token that was replaced since
    StaleToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    Delivered {
        /// Content handed to the notification host
        shown: NotificationContent,
        /// Successor timer for the following week
        next: ArmedTimer,
        /// Set when the host failed to display; the successor is armed regardless
        display_error: Option<NotificationError>,
    },
    Ignored(IgnoredReason),
}

impl FireOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, FireOutcome::Delivered { .. })
    }
}

/// Builder for [`WeeklyNotifier`]
#[derive(Default)]
pub struct NotifierBuilder {
    alarms: Option<Arc<dyn AlarmHost>>,
    display: Option<Arc<dyn NotificationHost>>,
    store: Option<Arc<dyn KeyValueStore>>,
    config: NotifierConfig,
}

impl NotifierBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alarm_host(mut self, host: Arc<dyn AlarmHost>) -> Self {
        self.alarms = Some(host);
        self
    }

    pub fn with_notification_host(mut self, host: Arc<dyn NotificationHost>) -> Self {
        self.display = Some(host);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_config(mut self, config: NotifierConfig) -> Self {
        self.config = config;
        self
    }

    /// Assemble the engine; every host capability is required
    pub fn build<C: Clock>(self, clock: C) -> NotificationResult<WeeklyNotifier<C>> {
        let alarms = self
            .alarms
            .ok_or_else(|| NotificationError::host_unavailable("alarm host"))?;
        let display = self
            .display
            .ok_or_else(|| NotificationError::host_unavailable("notification host"))?;
        let kv = self
            .store
            .ok_or_else(|| NotificationError::host_unavailable("key-value store"))?;

        Ok(WeeklyNotifier {
            alarms,
            display,
            store: ScheduleStore::new(kv, &self.config.namespace),
            lifecycles: Mutex::new(LifecycleTable::new(self.config.history_limit)),
            config: self.config,
            clock,
        })
    }
}

/// Weekly recurring local-notification engine
///
/// Every operation takes the internal lock for its whole duration, so calls
/// from the app, the boot collaborator and the alarm dispatcher never overlap.
pub struct WeeklyNotifier<C: Clock> {
    alarms: Arc<dyn AlarmHost>,
    display: Arc<dyn NotificationHost>,
    store: ScheduleStore,
    config: NotifierConfig,
    clock: C,
    lifecycles: Mutex<LifecycleTable>,
}

impl<C: Clock> WeeklyNotifier<C> {
    pub fn config(&self) -> &NotifierConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn store(&self) -> &ScheduleStore {
        &self.store
    }

    /// Current lifecycle state of `id`
    pub fn state(&self, id: NotificationId) -> ScheduleState {
        self.lifecycles.lock().state(id)
    }

    pub fn lifecycle(&self, id: NotificationId) -> Option<ScheduleLifecycle> {
        self.lifecycles.lock().get(id).cloned()
    }

    /// Ids the engine currently holds a host timer for
    pub fn armed_ids(&self) -> Vec<NotificationId> {
        self.lifecycles.lock().armed_ids()
    }

    /// The persisted schedule as the next fire or recovery would see it
    pub fn scheduled(&self) -> NotificationResult<LoadedSchedule> {
        let _guard = self.lifecycles.lock();
        self.store.load_schedule()
    }

    /// Replace the persisted schedule and arm one timer per entry
    ///
    /// Invalid entries are reported and left out; a later entry with the same
    /// id replaces an earlier one. Ids that were scheduled before and are not
    /// in `entries` lose their timer.
    pub fn schedule_weekly(
        &self,
        entries: Vec<ScheduledNotification>,
    ) -> NotificationResult<ScheduleReport> {
        let mut table = self.lifecycles.lock();
        let now = self.clock.now();
        let now_utc = now.with_timezone(&Utc);
        let mut report = ScheduleReport::default();

        let mut accepted = BTreeMap::new();
        for entry in entries {
            match entry.validate() {
                Ok(()) => {
                    if accepted.insert(entry.id, entry).is_some() {
                        tracing::debug!("Duplicate schedule id, keeping the last entry");
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping invalid schedule entry");
                    report.skipped.push(e);
                },
            }
        }

        let previous = self.store.load_schedule()?;
        let dropped: BTreeSet<NotificationId> = previous
            .ids()
            .chain(table.armed_ids())
            .filter(|id| !accepted.contains_key(id))
            .collect();
        // Persisted record first; a failed write leaves every timer untouched
        self.store.save_schedule(&accepted)?;

        for id in dropped {
            self.alarms.cancel_timer(id)?;
            table.disarm(id, now_utc)?;
            report.cancelled.push(id);
        }

        for entry in accepted.values() {
            let reason = if table.state(entry.id).is_armed() {
                TransitionReason::Rescheduled
            } else {
                TransitionReason::Scheduled
            };
            match self.arm(&mut table, entry, &now, reason) {
                Ok(timer) => report.armed.push(timer),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(id = %entry.id, error = %e, "Failed to arm weekly timer");
                    report.skipped.push(e);
                },
            }
        }

        tracing::info!(
            armed = report.armed.len(),
            cancelled = report.cancelled.len(),
            skipped = report.skipped.len(),
            "Weekly schedule replaced"
        );
        Ok(report)
    }

    /// Disarm and forget `ids`; unknown ids are a no-op
    pub fn cancel(&self, ids: &[NotificationId]) -> NotificationResult<()> {
        let mut table = self.lifecycles.lock();
        let now_utc = self.clock.now().with_timezone(&Utc);
        let mut loaded = self.store.load_schedule()?;

        let removed = ids
            .iter()
            .filter(|&&id| loaded.entries.remove(&id).is_some())
            .count();
        if removed > 0 {
            self.store.save_schedule(&loaded.entries)?;
        }

        for &id in ids {
            self.alarms.cancel_timer(id)?;
            table.disarm(id, now_utc)?;
        }
        tracing::info!(requested = ids.len(), removed, "Cancelled weekly notifications");
        Ok(())
    }

    /// Show `content` now under the configured immediate id; nothing is persisted
    pub fn show_immediate(&self, content: NotificationContent) -> NotificationResult<()> {
        let _guard = self.lifecycles.lock();
        let sound_enabled = self.store.sound_enabled()?;
        self.present(self.config.immediate_notification_id, &content, sound_enabled)
    }

    pub fn set_sound_enabled(&self, enabled: bool) -> NotificationResult<()> {
        let _guard = self.lifecycles.lock();
        self.store.set_sound_enabled(enabled)?;
        tracing::debug!(enabled, "Notification sound setting changed");
        Ok(())
    }

    /// Replace the date-keyed content substitutions consulted at fire time
    pub fn set_content_overrides(&self, overrides: ContentOverrides) -> NotificationResult<()> {
        let _guard = self.lifecycles.lock();
        self.store.save_overrides(&overrides)?;
        tracing::debug!(dates = overrides.len(), "Content overrides replaced");
        Ok(())
    }

    /// Dismiss visible notifications for every id the engine knows about
    ///
    /// The fixed daily ids are always included, so a notification left over
    /// from a cancelled schedule in an earlier process is cleared too.
    pub fn clear_displayed(&self) -> NotificationResult<()> {
        let table = self.lifecycles.lock();
        let loaded = self.store.load_schedule()?;

        let mut ids: BTreeSet<NotificationId> = DAILY_NOTIFICATION_IDS
            .into_iter()
            .chain(loaded.ids())
            .chain(table.ids())
            .collect();
        ids.insert(self.config.immediate_notification_id);

        for id in ids {
            match self.display.dismiss(id) {
                Ok(()) => {},
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => tracing::warn!(id = %id, error = %e, "Failed to dismiss notification"),
            }
        }
        Ok(())
    }

    /// Boot collaborator: re-arm every persisted entry from the current time
    ///
    /// A corrupt or unarmable entry is skipped; the rest are still recovered.
    pub fn recover(&self) -> NotificationResult<RecoveryReport> {
        let mut table = self.lifecycles.lock();
        let now = self.clock.now();
        let loaded = self.store.load_schedule()?;

        let mut report = RecoveryReport {
            armed: Vec::new(),
            skipped: loaded.skipped,
        };

        for entry in loaded.entries.values() {
            match self.arm(&mut table, entry, &now, TransitionReason::Recovered) {
                Ok(timer) => report.armed.push(timer),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(id = %entry.id, error = %e, "Skipping entry during recovery");
                    report.skipped.push(e);
                },
            }
        }

        tracing::info!(
            armed = report.armed.len(),
            skipped = report.skipped.len(),
            "Recovered weekly schedule"
        );
        Ok(report)
    }

    /// React to a fired host timer
    ///
    /// Displays today's content for the id and arms the following week's
    /// occurrence before returning. Fires for cancelled ids or replaced timers
    /// are ignored.
    pub fn handle_fire(&self, event: FireEvent) -> NotificationResult<FireOutcome> {
        let mut table = self.lifecycles.lock();
        let now = self.clock.now();
        let now_utc = now.with_timezone(&Utc);
        let loaded = self.store.load_schedule()?;

        let Some(entry) = loaded.entries.get(&event.id) else {
            tracing::warn!(id = %event.id, "Fire for an id that is no longer scheduled");
            self.alarms.cancel_timer(event.id)?;
            table.disarm(event.id, now_utc)?;
            return Ok(FireOutcome::Ignored(IgnoredReason::NotScheduled));
        };

        let tracked = table
            .get(event.id)
            .map(|l| (l.state.is_armed(), l.is_live(event.token), l.state.fire_at()));
        let scheduled_at = match tracked {
            None => {
                tracing::info!(id = %event.id, "Adopting timer armed by an earlier process");
                table.insert(ScheduleLifecycle::adopted(
                    event.id,
                    event.token,
                    event.fire_at,
                    now_utc,
                    self.config.history_limit,
                ));
                event.fire_at
            },
            Some((false, _, _)) => {
                tracing::warn!(id = %event.id, "Fire for an id without a live timer");
                return Ok(FireOutcome::Ignored(IgnoredReason::NotArmed));
            },
            Some((true, false, _)) => {
                tracing::warn!(id = %event.id, token = %event.token, "Ignoring stale timer fire");
                return Ok(FireOutcome::Ignored(IgnoredReason::StaleToken));
            },
            Some((true, true, fire_at)) => fire_at.unwrap_or(event.fire_at),
        };

        table
            .entry(event.id)
            .transition_to(ScheduleState::Fired { at: now_utc }, now_utc, TransitionReason::Fired)?;

        let overrides = self.store.load_overrides().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Content overrides unavailable, using scheduled content");
            ContentOverrides::new()
        });
        let shown = overrides.resolve(now.date_naive(), &entry.content);
        let sound_enabled = self.store.sound_enabled().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Sound setting unavailable, assuming enabled");
            true
        });

        let display_error = match self.present(entry.id, &shown, sound_enabled) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(id = %entry.id, error = %e, "Failed to display notification");
                Some(e)
            },
        };

        // An early inexact delivery must not land the successor on the same occurrence
        let scheduled_local = scheduled_at.with_timezone(&now.timezone());
        let from = if scheduled_local > now { scheduled_local } else { now };
        let next = self.arm(&mut table, entry, &from, TransitionReason::Rearmed)?;

        Ok(FireOutcome::Delivered {
            shown,
            next,
            display_error,
        })
    }

    /// Single entry point for events delivered by the host
    pub fn dispatch(&self, event: HostEvent) -> NotificationResult<()> {
        match event {
            HostEvent::BootCompleted => {
                self.recover()?;
            },
            HostEvent::AlarmFired(fire) => {
                self.handle_fire(fire)?;
            },
            HostEvent::Unrecognized(action) => {
                tracing::debug!(action = %action, "Ignoring unrecognized host event");
            },
        }
        Ok(())
    }

    fn arm(
        &self,
        table: &mut LifecycleTable,
        entry: &ScheduledNotification,
        from: &DateTime<C::Tz>,
        reason: TransitionReason,
    ) -> NotificationResult<ArmedTimer> {
        let slot = entry.slot()?;
        let fire_at = next_trigger(entry.weekday, slot, from)?.with_timezone(&Utc);
        let token = TimerToken::generate();
        let precision = TimerScheduler::arm(&*self.alarms, entry.id, fire_at, token)?;

        let at = self.clock.now().with_timezone(&Utc);
        table.entry(entry.id).transition_to(
            ScheduleState::Armed {
                fire_at,
                precision,
                token,
            },
            at,
            reason,
        )?;

        tracing::info!(
            id = %entry.id,
            weekday = %entry.weekday,
            fire_at = %fire_at,
            precision = ?precision,
            "Armed weekly notification"
        );
        Ok(ArmedTimer {
            id: entry.id,
            fire_at,
            precision,
        })
    }

    fn present(
        &self,
        id: NotificationId,
        content: &NotificationContent,
        sound_enabled: bool,
    ) -> NotificationResult<()> {
        let renderer = NotificationRenderer::new(&self.config);
        let sound = renderer.sound_choice(sound_enabled, &*self.display);
        self.display.ensure_channel(&renderer.channel(sound.clone()))?;
        self.display.display(&renderer.render(id, content, sound))
    }
}
