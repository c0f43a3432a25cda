// Notification host that logs instead of drawing
// Keeps the set of visible notifications so callers can inspect what a device would show

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;

use crate::components::{
    ChannelSpec, NotificationHost, NotificationId, NotificationResult, RenderedNotification,
};

#[derive(Debug, Default)]
pub struct TracingNotificationHost {
    visible: Mutex<BTreeMap<NotificationId, RenderedNotification>>,
    channels: Mutex<BTreeMap<String, ChannelSpec>>,
    app_sounds: BTreeSet<String>,
}

impl TracingNotificationHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the app bundles a raw sound resource called `name`
    pub fn with_app_sound(mut self, name: impl Into<String>) -> Self {
        self.app_sounds.insert(name.into());
        self
    }

    /// Visible notifications ordered by id
    pub fn visible(&self) -> Vec<RenderedNotification> {
        self.visible.lock().values().cloned().collect()
    }

    pub fn visible_for(&self, id: NotificationId) -> Option<RenderedNotification> {
        self.visible.lock().get(&id).cloned()
    }

    pub fn channel(&self, id: &str) -> Option<ChannelSpec> {
        self.channels.lock().get(id).cloned()
    }
}

impl NotificationHost for TracingNotificationHost {
    fn ensure_channel(&self, channel: &ChannelSpec) -> NotificationResult<()> {
        tracing::debug!(
            channel = %channel.id,
            sound = ?channel.sound,
            vibration = channel.vibration,
            "Channel ready"
        );
        self.channels
            .lock()
            .insert(channel.id.clone(), channel.clone());
        Ok(())
    }

    fn display(&self, notification: &RenderedNotification) -> NotificationResult<()> {
        tracing::info!(
            id = %notification.id,
            channel = %notification.channel_id,
            title = %notification.title,
            body = %notification.body,
            small_icon = notification.small_icon_candidates.first().map(String::as_str),
            large_icon = notification.large_icon.as_ref().map(|icon| icon.drawable.as_str()),
            sound = ?notification.sound,
            "Notification shown"
        );
        self.visible
            .lock()
            .insert(notification.id, notification.clone());
        Ok(())
    }

    fn dismiss(&self, id: NotificationId) -> NotificationResult<()> {
        if self.visible.lock().remove(&id).is_some() {
            tracing::debug!(id = %id, "Notification dismissed");
        }
        Ok(())
    }

    fn has_app_sound(&self, name: &str) -> bool {
        self.app_sounds.contains(name)
    }
}
