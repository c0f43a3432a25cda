// Engine configuration
// Every field has a default, so a partial JSON document is enough

use serde::{Deserialize, Serialize};

use super::render::ChannelSpec;
use super::{NotificationError, NotificationId, NotificationResult};

/// Tunables for [`WeeklyNotifier`](super::notifier::WeeklyNotifier)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotifierConfig {
    /// Prefix for every persisted key
    pub namespace: String,
    pub channel: ChannelSpec,
    /// Id used by `show_immediate`; also dismissed by `clear_displayed`
    pub immediate_notification_id: NotificationId,
    /// Small icon drawables in preference order
    pub small_icon_candidates: Vec<String>,
    /// Raw sound resource preferred over the system default
    pub app_sound_name: String,
    /// Transitions kept per id in the lifecycle history
    pub history_limit: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            namespace: "FactMeNotification".to_string(),
            channel: ChannelSpec::default(),
            immediate_notification_id: NotificationId::new(999),
            small_icon_candidates: vec![
                "ic_notification_app".to_string(),
                "ic_notification_small".to_string(),
                "ic_launcher_small".to_string(),
            ],
            app_sound_name: "notification_sound".to_string(),
            history_limit: 32,
        }
    }
}

impl NotifierConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> NotificationResult<Self> {
        serde_json::from_str(json).map_err(|e| NotificationError::SerializationError {
            what: "notifier config".to_string(),
            message: e.to_string(),
        })
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_channel(mut self, channel: ChannelSpec) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_immediate_id(mut self, id: NotificationId) -> Self {
        self.immediate_notification_id = id;
        self
    }

    pub fn with_app_sound(mut self, name: impl Into<String>) -> Self {
        self.app_sound_name = name.into();
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }
}
