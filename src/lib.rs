//! Weekly time-of-day local notifications
//!
//! Schedules recurring "daily fact" notifications on top of a host's one-shot
//! alarm service. Every fire displays the content for the day and re-arms the
//! following week's occurrence under the same id; a boot pass re-arms every
//! persisted entry after the host lost its timers.
//!
//! The engine, [`WeeklyNotifier`], only talks to capability traits
//! ([`AlarmHost`], [`NotificationHost`], [`KeyValueStore`], [`Clock`]).
//! [`backends`] has in-process implementations of each.

pub mod backends;
pub mod components;

pub use backends::*;
pub use components::*;
