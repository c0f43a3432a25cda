//! Tests for components/trigger.rs

use chrono::{DateTime, Duration, TimeZone, Utc};
use daily_fact_notify::{SlotTime, Weekday, next_trigger};

use crate::support::{BerlinLike, berlin, utc_plus_two};

fn slot(hour: u32, minute: u32) -> SlotTime {
    SlotTime::new(hour, minute).unwrap()
}

fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

#[test]
fn test_same_weekday_after_slot_rolls_a_week() {
    let now = utc_plus_two(2024, 5, 15, 10, 0);
    let next = next_trigger(Weekday::Wednesday, slot(9, 0), &now).unwrap();
    assert_eq!(next, utc_plus_two(2024, 5, 22, 9, 0));
}

#[test]
fn test_same_weekday_before_slot_is_today() {
    let now = utc_plus_two(2024, 5, 15, 8, 0);
    let next = next_trigger(Weekday::Wednesday, slot(9, 0), &now).unwrap();
    assert_eq!(next, utc_plus_two(2024, 5, 15, 9, 0));
}

#[test]
fn test_exact_slot_time_rolls_forward() {
    let now = utc_plus_two(2024, 5, 15, 9, 0);
    let next = next_trigger(Weekday::Wednesday, slot(9, 0), &now).unwrap();
    assert_eq!(next, utc_plus_two(2024, 5, 22, 9, 0));

    let just_before = now - Duration::milliseconds(1);
    let next = next_trigger(Weekday::Wednesday, slot(9, 0), &just_before).unwrap();
    assert_eq!(next, now);
}

#[test]
fn test_seconds_are_zeroed() {
    let now = utc_plus_two(2024, 5, 15, 8, 0) + Duration::seconds(42) + Duration::milliseconds(7);
    let next = next_trigger(Weekday::Thursday, slot(6, 15), &now).unwrap();
    assert_eq!(next, utc_plus_two(2024, 5, 16, 6, 15));
}

#[test]
fn test_month_and_year_boundaries() {
    // Friday 31 May -> Monday 3 June
    let next = next_trigger(Weekday::Monday, slot(7, 0), &utc_plus_two(2024, 5, 31, 20, 0)).unwrap();
    assert_eq!(next, utc_plus_two(2024, 6, 3, 7, 0));

    // Tuesday 31 December -> Wednesday 1 January
    let next = next_trigger(Weekday::Wednesday, slot(8, 0), &utc_plus_two(2024, 12, 31, 23, 0)).unwrap();
    assert_eq!(next, utc_plus_two(2025, 1, 1, 8, 0));

    // Wednesday 28 February of a leap year -> Thursday 29 February
    let next = next_trigger(Weekday::Thursday, slot(9, 0), &utc_plus_two(2024, 2, 28, 10, 0)).unwrap();
    assert_eq!(next, utc_plus_two(2024, 2, 29, 9, 0));
}

#[test]
fn test_spring_forward_keeps_wall_clock_time() {
    // Saturday before the transition, standard time
    let now = berlin(2024, 3, 30, 10, 0);
    let next = next_trigger(Weekday::Sunday, slot(9, 0), &now).unwrap();

    assert_eq!(next.naive_local(), berlin(2024, 3, 31, 9, 0).naive_local());
    assert_eq!(next.with_timezone(&Utc), utc(2024, 3, 31, 7, 0));
}

#[test]
fn test_slot_inside_spring_gap_moves_past_it() {
    // 02:30 does not exist on 31 March; read with the winter offset it is 03:30 summer time
    let now = berlin(2024, 3, 30, 10, 0);
    let next = next_trigger(Weekday::Sunday, slot(2, 30), &now).unwrap();

    assert_eq!(next.with_timezone(&Utc), utc(2024, 3, 31, 1, 30));
    assert_eq!(next.naive_local(), berlin(2024, 3, 31, 3, 30).naive_local());
    assert!(next > now);
}

#[test]
fn test_slot_inside_fall_overlap_takes_earliest() {
    let now = berlin(2024, 10, 26, 12, 0);
    let next = next_trigger(Weekday::Sunday, slot(2, 30), &now).unwrap();

    // 02:30 happens at 00:30 UTC (summer) and 01:30 UTC (winter)
    assert_eq!(next.with_timezone(&Utc), utc(2024, 10, 27, 0, 30));
}

#[test]
fn test_fall_back_week_is_seven_calendar_days() {
    let now = berlin(2024, 10, 26, 10, 0);
    let next = next_trigger(Weekday::Saturday, slot(9, 0), &now).unwrap();

    assert_eq!(next.naive_local(), berlin(2024, 11, 2, 9, 0).naive_local());
    // 169 hours, not 168
    assert_eq!(next.with_timezone(&Utc), utc(2024, 11, 2, 8, 0));
}

#[test]
fn test_result_is_after_now_and_within_a_week() {
    let start = utc_plus_two(2024, 1, 1, 0, 0);
    let step = Duration::minutes(7 * 60 + 13);
    let slots = [slot(0, 0), slot(9, 0), slot(23, 59)];

    let mut now = start;
    while now < start + Duration::days(366) {
        for weekday in Weekday::ALL {
            for time in slots {
                let next = next_trigger(weekday, time, &now).unwrap();
                assert!(next > now, "{weekday} {time} from {now}: {next}");
                assert!(next - Duration::days(7) <= now, "{weekday} {time} from {now}: {next}");
                assert_eq!(Weekday::from(chrono::Datelike::weekday(&next)), weekday);
            }
        }
        now += step;
    }
}

#[test]
fn test_dst_zone_result_is_after_now_and_at_most_a_week_of_dates_away() {
    let start = BerlinLike.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap();
    let step = Duration::minutes(97);

    let mut now = start;
    while now < start + Duration::days(230) {
        for weekday in Weekday::ALL {
            for time in [slot(2, 30), slot(9, 0)] {
                let next = next_trigger(weekday, time, &now).unwrap();
                assert!(next > now, "{weekday} {time} from {now}: {next}");
                let days = (next.date_naive() - now.date_naive()).num_days();
                assert!((0..=7).contains(&days), "{weekday} {time} from {now}: {next}");
            }
        }
        now += step;
    }
}

#[test]
fn test_weekday_persists_as_sunday_based_number() {
    assert_eq!(serde_json::to_string(&Weekday::Sunday).unwrap(), "1");
    assert_eq!(serde_json::to_string(&Weekday::Saturday).unwrap(), "7");
    assert_eq!(serde_json::from_str::<Weekday>("2").unwrap(), Weekday::Monday);
    assert!(serde_json::from_str::<Weekday>("0").is_err());
    assert!(serde_json::from_str::<Weekday>("8").is_err());
}

#[test]
fn test_slot_time_validation() {
    assert!(SlotTime::new(23, 59).is_ok());
    assert!(SlotTime::new(24, 0).is_err());
    assert!(SlotTime::new(12, 60).is_err());
    assert_eq!(SlotTime::parse(" 8:05 ").unwrap().to_string(), "08:05");
    assert_eq!(SlotTime::parse(":15").unwrap(), slot(9, 15));
}
