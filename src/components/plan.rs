// Helpers for building a daily-fact schedule from user settings

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};

use super::content::NotificationContent;
use super::schedule::ScheduledNotification;
use super::trigger::{SlotTime, Weekday};
use super::{NotificationError, NotificationId, NotificationResult};

/// Fixed ids for the daily slots, Sunday through Saturday
pub const DAILY_NOTIFICATION_IDS: [NotificationId; 7] = [
    NotificationId::new(1),
    NotificationId::new(2),
    NotificationId::new(3),
    NotificationId::new(4),
    NotificationId::new(5),
    NotificationId::new(6),
    NotificationId::new(7),
];

/// Days of content overrides the app keeps filled ahead of time
pub const OVERRIDE_WINDOW_DAYS: u32 = 14;

/// "Notify me at HH:MM on these days"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyPlan {
    pub time: SlotTime,
    pub weekdays: BTreeSet<Weekday>,
    pub content: NotificationContent,
}

impl WeeklyPlan {
    pub fn new(time: SlotTime, content: NotificationContent) -> Self {
        Self {
            time,
            weekdays: BTreeSet::new(),
            content,
        }
    }

    /// Every day of the week
    pub fn daily(time: SlotTime, content: NotificationContent) -> Self {
        Self::new(time, content).with_weekdays(Weekday::ALL)
    }

    pub fn with_weekdays(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays.extend(weekdays);
        self
    }

    /// Parse the stored settings form: `"HH:MM"` plus weekday numbers (Sunday = 1)
    pub fn from_settings(
        time: &str,
        weekdays: &[u8],
        content: NotificationContent,
    ) -> NotificationResult<Self> {
        let time = SlotTime::parse(time)?;
        let weekdays = weekdays
            .iter()
            .map(|&n| Weekday::try_from(n))
            .collect::<NotificationResult<Vec<_>>>()?;
        Ok(Self::new(time, content).with_weekdays(weekdays))
    }

    /// One entry per selected day; the id is fixed by the weekday
    pub fn entries(&self) -> Vec<ScheduledNotification> {
        self.weekdays
            .iter()
            .map(|&day| {
                ScheduledNotification::new(
                    daily_id(day),
                    day,
                    self.time,
                    self.content.clone(),
                )
            })
            .collect()
    }
}

/// Id reserved for `weekday`'s daily slot
pub fn daily_id(weekday: Weekday) -> NotificationId {
    DAILY_NOTIFICATION_IDS[weekday.days_from_sunday() as usize]
}

/// `days` consecutive dates starting at `start`
pub fn override_dates(start: NaiveDate, days: u32) -> NotificationResult<Vec<NaiveDate>> {
    (0..days)
        .map(|offset| {
            start.checked_add_days(Days::new(u64::from(offset))).ok_or_else(|| {
                NotificationError::malformed("overrides", format!("{} + {} days overflows", start, offset))
            })
        })
        .collect()
}
