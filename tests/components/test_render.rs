//! Tests for components/render.rs

use daily_fact_notify::{
    NotificationContent, NotificationHost, NotificationId, NotificationRenderer, NotifierConfig,
    SoundChoice, TintColor, TracingNotificationHost,
};

use crate::support::FakeNotificationHost;

#[test]
fn test_sound_choice() {
    let config = NotifierConfig::default();
    let renderer = NotificationRenderer::new(&config);

    let with_sound = FakeNotificationHost::default().with_app_sound();
    let without_sound = FakeNotificationHost::default();

    assert_eq!(
        renderer.sound_choice(true, &with_sound),
        SoundChoice::AppResource("notification_sound".to_string())
    );
    assert_eq!(renderer.sound_choice(true, &without_sound), SoundChoice::SystemDefault);
    assert_eq!(renderer.sound_choice(false, &with_sound), SoundChoice::Silent);
}

#[test]
fn test_channel_follows_sound() {
    let config = NotifierConfig::default();
    let renderer = NotificationRenderer::new(&config);

    let loud = renderer.channel(SoundChoice::SystemDefault);
    assert_eq!(loud.id, "daily_fact");
    assert_eq!(loud.name, "Daily fact");
    assert!(loud.vibration);

    let quiet = renderer.channel(SoundChoice::Silent);
    assert_eq!(quiet.sound, Some(SoundChoice::Silent));
    assert!(!quiet.vibration);
}

#[test]
fn test_render_with_decoration() {
    let config = NotifierConfig::default();
    let renderer = NotificationRenderer::new(&config);
    let content = NotificationContent::new("Fact", "Body")
        .with_large_icon("ic_topic_space")
        .with_tint("navy");

    let rendered = renderer.render(NotificationId::new(2), &content, SoundChoice::SystemDefault);

    assert_eq!(rendered.channel_id, "daily_fact");
    assert_eq!(rendered.small_icon_candidates[0], "ic_notification_app");
    let icon = rendered.large_icon.unwrap();
    assert_eq!(icon.drawable, "ic_topic_space");
    assert_eq!(icon.tint, Some(TintColor::from_argb(0xFF00_0080)));
    assert!(rendered.auto_cancel);
    assert!(rendered.opens_app);
}

#[test]
fn test_invalid_decoration_is_dropped_not_fatal() {
    let config = NotifierConfig::default();
    let renderer = NotificationRenderer::new(&config);

    let bad_tint = NotificationContent::new("Fact", "Body")
        .with_large_icon("ic_topic_space")
        .with_tint("not-a-color");
    let rendered = renderer.render(NotificationId::new(1), &bad_tint, SoundChoice::Silent);
    let icon = rendered.large_icon.unwrap();
    assert_eq!(icon.drawable, "ic_topic_space");
    assert_eq!(icon.tint, None);

    let bad_icon = NotificationContent::new("Fact", "Body").with_large_icon("Topic Space");
    let rendered = renderer.render(NotificationId::new(1), &bad_icon, SoundChoice::Silent);
    assert!(rendered.large_icon.is_none());
    assert_eq!(rendered.title, "Fact");
}

#[test]
fn test_tracing_host_tracks_visible_notifications() {
    let config = NotifierConfig::default();
    let renderer = NotificationRenderer::new(&config);
    let host = TracingNotificationHost::new().with_app_sound("notification_sound");
    assert!(host.has_app_sound("notification_sound"));

    let sound = renderer.sound_choice(true, &host);
    host.ensure_channel(&renderer.channel(sound.clone())).unwrap();
    host.display(&renderer.render(
        NotificationId::new(3),
        &NotificationContent::new("A", "a"),
        sound,
    ))
    .unwrap();

    assert_eq!(host.visible().len(), 1);
    assert!(host.channel("daily_fact").unwrap().vibration);

    host.dismiss(NotificationId::new(3)).unwrap();
    host.dismiss(NotificationId::new(3)).unwrap();
    assert!(host.visible_for(NotificationId::new(3)).is_none());
}
