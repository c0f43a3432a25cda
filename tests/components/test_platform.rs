//! Tests for components/platform.rs

use chrono::{Duration, TimeZone, Utc};
use daily_fact_notify::{
    Clock, FireEvent, ManualClock, NotificationError, NotificationId, TimerPrecision,
    TimerRequest, TimerScheduler, TimerToken,
};

use crate::support::{FakeAlarmHost, berlin};

fn fire_at() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 22, 7, 0, 0).unwrap()
}

#[test]
fn test_arm_uses_exact_when_allowed() {
    let host = FakeAlarmHost::default();
    let precision =
        TimerScheduler::arm(&host, NotificationId::new(1), fire_at(), TimerToken::generate()).unwrap();

    assert_eq!(precision, TimerPrecision::Exact);
    assert_eq!(host.requests().len(), 1);
}

#[test]
fn test_arm_uses_inexact_when_exact_not_granted() {
    let host = FakeAlarmHost::default();
    host.set_exact_allowed(false);
    let precision =
        TimerScheduler::arm(&host, NotificationId::new(1), fire_at(), TimerToken::generate()).unwrap();

    assert_eq!(precision, TimerPrecision::Inexact);
    assert_eq!(host.requests().len(), 1);
}

#[test]
fn test_arm_retries_refused_exact_request_as_inexact() {
    let host = FakeAlarmHost::default();
    host.set_refuse_exact(true);
    let token = TimerToken::generate();
    let precision = TimerScheduler::arm(&host, NotificationId::new(5), fire_at(), token).unwrap();

    assert_eq!(precision, TimerPrecision::Inexact);
    let pending = host.timer(5).unwrap();
    assert_eq!(pending.token, token);
    assert_eq!(pending.fire_at, fire_at());
}

#[test]
fn test_arm_propagates_host_unavailable() {
    let host = FakeAlarmHost::default();
    host.set_unavailable(true);
    let result = TimerScheduler::arm(&host, NotificationId::new(1), fire_at(), TimerToken::generate());

    assert!(matches!(result, Err(NotificationError::HostUnavailable { .. })));
    assert!(result.unwrap_err().is_fatal());
}

#[test]
fn test_fire_event_carries_request_identity() {
    let request = TimerRequest {
        id: NotificationId::new(3),
        fire_at: fire_at(),
        precision: TimerPrecision::Exact,
        token: TimerToken::generate(),
    };
    let event = FireEvent::from(&request);
    assert_eq!(event.id, request.id);
    assert_eq!(event.token, request.token);
    assert_eq!(event.fire_at, request.fire_at);
}

#[test]
fn test_manual_clock_set_and_advance() {
    let clock = ManualClock::new(berlin(2024, 5, 15, 8, 0));
    clock.advance(Duration::minutes(90));
    assert_eq!(clock.now(), berlin(2024, 5, 15, 9, 30));

    clock.set(berlin(2024, 12, 24, 18, 0));
    assert_eq!(clock.now(), berlin(2024, 12, 24, 18, 0));
}

#[test]
fn test_notification_id_parsing() {
    assert_eq!(" 42 ".parse::<NotificationId>().unwrap(), NotificationId::new(42));
    assert!("x".parse::<NotificationId>().is_err());
    assert_eq!(NotificationId::from(7).to_string(), "7");
}
