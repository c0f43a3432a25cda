// Weekly trigger-time calculation
// Local calendar arithmetic so DST transitions and month/year boundaries stay on the wall clock

use chrono::{Datelike, DateTime, Days, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone};
use serde::{Deserialize, Serialize};

use super::{NotificationError, NotificationResult};

/// Day of week for a weekly slot
///
/// Numbered Sunday = 1 through Saturday = 7 and persisted as that integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Weekday {
    Sunday = 1,
    Monday = 2,
    Tuesday = 3,
    Wednesday = 4,
    Thursday = 5,
    Friday = 6,
    Saturday = 7,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn number(&self) -> u8 {
        *self as u8
    }

    pub fn days_from_sunday(&self) -> u32 {
        u32::from(self.number() - 1)
    }

    pub fn to_chrono(&self) -> chrono::Weekday {
        match self {
            Weekday::Sunday => chrono::Weekday::Sun,
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Weekday::ALL[day.num_days_from_sunday() as usize]
    }
}

impl TryFrom<u8> for Weekday {
    type Error = NotificationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1..=7 => Ok(Weekday::ALL[usize::from(value - 1)]),
            _ => Err(NotificationError::malformed(
                "weekday",
                format!("{} is outside 1 (Sunday) ..= 7 (Saturday)", value),
            )),
        }
    }
}

impl From<Weekday> for u8 {
    fn from(day: Weekday) -> Self {
        day.number()
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Local wall-clock time of a weekly slot, minute precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime {
    hour: u8,
    minute: u8,
}

impl SlotTime {
    pub const DEFAULT: SlotTime = SlotTime { hour: 9, minute: 0 };

    pub fn new(hour: u32, minute: u32) -> NotificationResult<Self> {
        if hour > 23 {
            return Err(NotificationError::malformed(
                "hour",
                format!("{} is outside 0..=23", hour),
            ));
        }
        if minute > 59 {
            return Err(NotificationError::malformed(
                "minute",
                format!("{} is outside 0..=59", minute),
            ));
        }
        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    /// Parse `HH:MM`; a missing part falls back to 09:00's value
    pub fn parse(text: &str) -> NotificationResult<Self> {
        let mut parts = text.trim().splitn(2, ':');
        let hour = parse_part(parts.next(), u32::from(Self::DEFAULT.hour), "hour")?;
        let minute = parse_part(parts.next(), u32::from(Self::DEFAULT.minute), "minute")?;
        Self::new(hour, minute)
    }

    pub fn hour(&self) -> u32 {
        u32::from(self.hour)
    }

    pub fn minute(&self) -> u32 {
        u32::from(self.minute)
    }
}

impl Default for SlotTime {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Display for SlotTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

fn parse_part(part: Option<&str>, default: u32, field: &str) -> NotificationResult<u32> {
    match part.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| NotificationError::malformed(field, format!("'{}' is not a number", value))),
    }
}

/// Next instant strictly after `now` that falls on `weekday` at `time`
///
/// The candidate is this week's occurrence; when it is not after `now`
/// (equality included) it moves forward seven calendar days. The result
/// never lies more than one week after `now`.
pub fn next_trigger<Tz: TimeZone>(
    weekday: Weekday,
    time: SlotTime,
    now: &DateTime<Tz>,
) -> NotificationResult<DateTime<Tz>> {
    let tz = now.timezone();
    let today = now.date_naive();
    let today_index = today.weekday().num_days_from_sunday();
    let days_ahead = (7 + weekday.days_from_sunday() - today_index) % 7;

    let date = add_days(today, days_ahead)?;
    let candidate = resolve_local(&tz, at_slot(date, time)?);
    if candidate > *now {
        return Ok(candidate);
    }

    let date = add_days(date, 7)?;
    Ok(resolve_local(&tz, at_slot(date, time)?))
}

fn add_days(date: NaiveDate, days: u32) -> NotificationResult<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| NotificationError::malformed("trigger", format!("{} + {} days overflows", date, days)))
}

fn at_slot(date: NaiveDate, time: SlotTime) -> NotificationResult<NaiveDateTime> {
    date.and_hms_opt(time.hour(), time.minute(), 0)
        .ok_or_else(|| NotificationError::malformed("trigger", format!("invalid slot {} on {}", time, date)))
}

/// Map a wall-clock time onto the zone
///
/// Overlaps take the earliest instant. Times inside a gap are read with the
/// offset in effect before the transition, which lands them past the gap.
fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(instant) => instant,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => {
            let day_before = local - chrono::Duration::days(1);
            let offset = match tz.offset_from_local_datetime(&day_before) {
                LocalResult::Single(offset) | LocalResult::Ambiguous(offset, _) => offset.fix(),
                LocalResult::None => tz.offset_from_utc_datetime(&local).fix(),
            };
            let utc = local - chrono::Duration::seconds(i64::from(offset.local_minus_utc()));
            tz.from_utc_datetime(&utc)
        },
    }
}
