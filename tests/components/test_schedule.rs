//! Tests for components/schedule.rs and the key-value backends

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use daily_fact_notify::{
    ContentOverride, ContentOverrides, JsonFileStore, KeyValueStore, MemoryStore,
    NotificationError, NotificationId, ScheduleStore, ScheduledNotification, Weekday,
};

use crate::support::entry;

fn store_over(kv: Arc<dyn KeyValueStore>) -> ScheduleStore {
    ScheduleStore::new(kv, "FactMeNotification")
}

fn by_id(entries: Vec<ScheduledNotification>) -> BTreeMap<NotificationId, ScheduledNotification> {
    entries.into_iter().map(|e| (e.id, e)).collect()
}

#[test]
fn test_keys_are_namespaced() {
    let store = store_over(Arc::new(MemoryStore::new()));
    assert_eq!(store.keys().schedule, "FactMeNotification/dailySchedule");
    assert_eq!(store.keys().overrides, "FactMeNotification/factsByDate");
    assert_eq!(store.keys().sound_enabled, "FactMeNotification/soundEnabled");
}

#[test]
fn test_schedule_save_and_load() {
    let kv = Arc::new(MemoryStore::new());
    let store = store_over(kv.clone());
    let entries = by_id(vec![
        entry(1, Weekday::Sunday, 9, 0, "Sun"),
        entry(7, Weekday::Saturday, 21, 45, "Sat"),
    ]);

    store.save_schedule(&entries).unwrap();
    let loaded = store.load_schedule().unwrap();

    assert_eq!(loaded.entries, entries);
    assert!(loaded.skipped.is_empty());

    // Persisted as an object keyed by id
    let raw = kv.get("FactMeNotification/dailySchedule").unwrap().unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["7"]["weekday"], 7);
    assert_eq!(json["7"]["hour"], 21);
    assert_eq!(json["1"]["title"], "Sun");
}

#[test]
fn test_saving_an_empty_schedule_removes_the_key() {
    let kv = Arc::new(MemoryStore::new());
    let store = store_over(kv.clone());
    store
        .save_schedule(&by_id(vec![entry(1, Weekday::Monday, 9, 0, "Mon")]))
        .unwrap();
    store.save_schedule(&BTreeMap::new()).unwrap();

    assert!(kv.is_empty());
    assert!(store.load_schedule().unwrap().entries.is_empty());
}

#[test]
fn test_corrupt_entries_are_skipped_individually() {
    let kv = Arc::new(MemoryStore::with_values([(
        "FactMeNotification/dailySchedule",
        r#"{
            "1": {"id": 1, "title": "ok", "body": "", "weekday": 1, "hour": 9, "minute": 0},
            "2": {"id": 2, "title": "bad hour", "body": "", "weekday": 2, "hour": 30, "minute": 0},
            "3": {"id": 3, "title": "no weekday", "body": "", "hour": 9, "minute": 0},
            "4": "not an object"
        }"#,
    )]));
    let loaded = store_over(kv).load_schedule().unwrap();

    assert_eq!(loaded.ids().collect::<Vec<_>>(), vec![NotificationId::new(1)]);
    assert_eq!(loaded.skipped.len(), 3);
    assert!(
        loaded
            .skipped
            .iter()
            .all(|e| matches!(e, NotificationError::MalformedEntry { .. }))
    );
}

#[test]
fn test_unreadable_blob_is_reported_not_fatal() {
    let kv = Arc::new(MemoryStore::with_values([("FactMeNotification/dailySchedule", "{oops")]));
    let loaded = store_over(kv).load_schedule().unwrap();
    assert!(loaded.entries.is_empty());
    assert_eq!(loaded.skipped.len(), 1);
}

#[test]
fn test_overrides_skip_bad_dates() {
    let kv = Arc::new(MemoryStore::with_values([(
        "FactMeNotification/factsByDate",
        r#"{"2024-05-15": {"title": "A", "body": "a"}, "15/05/2024": {"title": "B"}, "2024-05-16": 3}"#,
    )]));
    let overrides = store_over(kv).load_overrides().unwrap();

    assert_eq!(overrides.len(), 1);
    let date = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
    assert_eq!(overrides.get(date).unwrap().title.as_deref(), Some("A"));
}

#[test]
fn test_override_round_trip_through_store() {
    let store = store_over(Arc::new(MemoryStore::new()));
    let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let overrides = ContentOverrides::new().with_entry(date, ContentOverride::new("NYE", "Fireworks"));

    store.save_overrides(&overrides).unwrap();
    assert_eq!(store.load_overrides().unwrap(), overrides);
}

#[test]
fn test_sound_flag_defaults_to_enabled() {
    let store = store_over(Arc::new(MemoryStore::new()));
    assert!(store.sound_enabled().unwrap());

    store.set_sound_enabled(false).unwrap();
    assert!(!store.sound_enabled().unwrap());

    store.set_sound_enabled(true).unwrap();
    assert!(store.sound_enabled().unwrap());
}

#[test]
fn test_json_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("prefs.json");

    {
        let kv = Arc::new(JsonFileStore::open(&path).unwrap());
        let store = store_over(kv.clone());
        store
            .save_schedule(&by_id(vec![entry(3, Weekday::Tuesday, 7, 30, "Tue")]))
            .unwrap();
        store.set_sound_enabled(false).unwrap();
        kv.put("scratch", "x".to_string()).unwrap();
        kv.remove("scratch").unwrap();
    }

    let kv = Arc::new(JsonFileStore::open(&path).unwrap());
    assert_eq!(kv.get("scratch").unwrap(), None);
    let store = store_over(kv);
    let loaded = store.load_schedule().unwrap();
    assert_eq!(loaded.entries[&NotificationId::new(3)].hour, 7);
    assert!(!store.sound_enabled().unwrap());
}

#[test]
fn test_json_file_store_rejects_corrupt_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.json");
    std::fs::write(&path, "not json").unwrap();

    let result = JsonFileStore::open(&path);
    assert!(matches!(result, Err(NotificationError::StorageError { .. })));
}
