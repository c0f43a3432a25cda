// Rendering of content into what the notification host posts
// Sound selection, channel description and large-icon decoration

use serde::{Deserialize, Serialize};

use super::config::NotifierConfig;
use super::content::{NotificationContent, TintColor, is_valid_icon_name};
use super::platform::NotificationHost;
use super::NotificationId;

/// Sound a channel or notification plays
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundChoice {
    /// No sound and no vibration
    Silent,
    /// Raw sound resource shipped with the app
    AppResource(String),
    /// The device's default notification sound
    SystemDefault,
}

impl SoundChoice {
    pub fn is_silent(&self) -> bool {
        matches!(self, SoundChoice::Silent)
    }
}

/// Channel notifications are posted to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(skip)]
    pub sound: Option<SoundChoice>,
    #[serde(skip)]
    pub vibration: bool,
}

impl Default for ChannelSpec {
    fn default() -> Self {
        Self {
            id: "daily_fact".to_string(),
            name: "Daily fact".to_string(),
            description: "Daily fact notifications".to_string(),
            sound: None,
            vibration: false,
        }
    }
}

impl ChannelSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach the sound; vibration follows whether the channel makes noise
    pub fn with_sound(mut self, sound: SoundChoice) -> Self {
        self.vibration = !sound.is_silent();
        self.sound = Some(sound);
        self
    }
}

/// Large icon drawable plus optional tint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargeIcon {
    pub drawable: String,
    pub tint: Option<TintColor>,
}

/// A notification ready to be handed to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNotification {
    pub id: NotificationId,
    pub channel_id: String,
    pub title: String,
    pub body: String,
    /// Small icon drawables in preference order; the host uses the first it has
    pub small_icon_candidates: Vec<String>,
    pub large_icon: Option<LargeIcon>,
    pub sound: SoundChoice,
    /// Dismiss when tapped
    pub auto_cancel: bool,
    /// Tapping opens the app's launch screen
    pub opens_app: bool,
}

/// Builds channel specs and rendered notifications from configuration
pub struct NotificationRenderer<'a> {
    config: &'a NotifierConfig,
}

impl<'a> NotificationRenderer<'a> {
    pub fn new(config: &'a NotifierConfig) -> Self {
        Self { config }
    }

    pub fn sound_choice(&self, sound_enabled: bool, host: &dyn NotificationHost) -> SoundChoice {
        if !sound_enabled {
            return SoundChoice::Silent;
        }
        if host.has_app_sound(&self.config.app_sound_name) {
            SoundChoice::AppResource(self.config.app_sound_name.clone())
        } else {
            SoundChoice::SystemDefault
        }
    }

    pub fn channel(&self, sound: SoundChoice) -> ChannelSpec {
        self.config.channel.clone().with_sound(sound)
    }

    pub fn render(
        &self,
        id: NotificationId,
        content: &NotificationContent,
        sound: SoundChoice,
    ) -> RenderedNotification {
        RenderedNotification {
            id,
            channel_id: self.config.channel.id.clone(),
            title: content.title.clone(),
            body: content.body.clone(),
            small_icon_candidates: self.config.small_icon_candidates.clone(),
            large_icon: large_icon(id, content),
            sound,
            auto_cancel: true,
            opens_app: true,
        }
    }
}

fn large_icon(id: NotificationId, content: &NotificationContent) -> Option<LargeIcon> {
    let drawable = content.large_icon_name.as_deref()?;
    if !is_valid_icon_name(drawable) {
        tracing::warn!(id = %id, icon = drawable, "Ignoring invalid large icon name");
        return None;
    }

    let tint = content
        .large_icon_tint
        .as_deref()
        .and_then(|text| match TintColor::parse(text) {
            Ok(tint) => Some(tint),
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Ignoring large icon tint");
                None
            },
        });

    Some(LargeIcon {
        drawable: drawable.to_string(),
        tint,
    })
}
