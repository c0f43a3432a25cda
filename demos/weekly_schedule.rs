//! Example: weekly daily-fact schedule with in-process hosts
//!
//! Schedules a weekday plan, fills two weeks of content overrides, shows a
//! test notification and then simulates a device reboot to show recovery.
//!
//! Run with: cargo run --example weekly_schedule

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use daily_fact_notify::{
    ContentOverride, ContentOverrides, JsonFileStore, NotificationContent, NotifierBuilder,
    NotifierConfig, OVERRIDE_WINDOW_DAYS, SlotTime, SystemClock, TokioAlarmHost,
    TracingNotificationHost, WeeklyPlan, Weekday, override_dates, spawn_dispatcher,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let dir = tempfile::tempdir()?;
    let store = Arc::new(JsonFileStore::open(dir.path().join("preferences.json"))?);
    let (alarms, events) = TokioAlarmHost::channel()?;
    let alarms = Arc::new(alarms);
    let display = Arc::new(TracingNotificationHost::new().with_app_sound("notification_sound"));

    let notifier = Arc::new(
        NotifierBuilder::new()
            .with_alarm_host(alarms.clone())
            .with_notification_host(display.clone())
            .with_store(store.clone())
            .with_config(NotifierConfig::default())
            .build(SystemClock)?,
    );
    let dispatcher = spawn_dispatcher(Arc::clone(&notifier), events);

    // Weekdays at 08:30, one shared fallback text
    let plan = WeeklyPlan::new(
        SlotTime::parse("08:30")?,
        NotificationContent::new("Fact of the day", "Open the app to read today's fact")
            .with_large_icon("ic_topic_science"),
    )
    .with_weekdays([
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ]);

    let report = notifier.schedule_weekly(plan.entries())?;
    for timer in &report.armed {
        println!(
            "id {} -> {} ({:?})",
            timer.id,
            timer.fire_at.with_timezone(&Local),
            timer.precision
        );
    }

    let overrides: ContentOverrides = override_dates(Local::now().date_naive(), OVERRIDE_WINDOW_DAYS)?
        .into_iter()
        .enumerate()
        .map(|(n, date)| {
            let entry = ContentOverride::new(
                format!("Fact #{}", n + 1),
                format!("Something worth knowing on {}", date.format("%A %-d %B")),
            )
            .with_tint("#FF6F00");
            (date, entry)
        })
        .collect();
    notifier.set_content_overrides(overrides)?;

    notifier.show_immediate(NotificationContent::new(
        "Notifications are on",
        "You will get a fact every weekday at 08:30",
    ))?;

    println!("pending before reboot: {}", alarms.pending().len());
    alarms.simulate_reboot()?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("pending after recovery: {}", alarms.pending().len());

    notifier.clear_displayed()?;
    println!("visible after clear: {}", display.visible().len());

    dispatcher.abort();
    Ok(())
}
