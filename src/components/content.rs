// Notification content, per-date overrides and icon decoration
// Decoration problems never invalidate an entry: bad tints and icon names are dropped with a warning

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use super::{NotificationError, NotificationResult};

static ICON_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9_]*$").unwrap_or_else(|e| panic!("icon name pattern is invalid: {e}"))
});

/// Check a drawable resource name (lowercase letters, digits, underscores)
pub fn is_valid_icon_name(name: &str) -> bool {
    ICON_NAME.is_match(name)
}

/// Text and decoration shown for one notification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationContent {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    /// Drawable resource used as the large icon
    #[serde(
        default,
        alias = "largeIconDrawableName",
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub large_icon_name: Option<String>,
    /// Color the large icon is tinted with (`#RRGGBB`, `#AARRGGBB` or a color name)
    #[serde(
        default,
        alias = "largeIconTintColor",
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub large_icon_tint: Option<String>,
}

impl NotificationContent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            large_icon_name: None,
            large_icon_tint: None,
        }
    }

    pub fn with_large_icon(mut self, name: impl Into<String>) -> Self {
        self.large_icon_name = non_empty(name.into());
        self
    }

    pub fn with_tint(mut self, tint: impl Into<String>) -> Self {
        self.large_icon_tint = non_empty(tint.into());
        self
    }

    /// Apply an override, falling back field by field to this content
    pub fn overridden_by(&self, patch: &ContentOverride) -> NotificationContent {
        NotificationContent {
            title: patch.title.clone().unwrap_or_else(|| self.title.clone()),
            body: patch.body.clone().unwrap_or_else(|| self.body.clone()),
            large_icon_name: patch
                .large_icon_name
                .clone()
                .or_else(|| self.large_icon_name.clone()),
            large_icon_tint: patch
                .large_icon_tint
                .clone()
                .or_else(|| self.large_icon_tint.clone()),
        }
    }
}

/// Per-date replacement for scheduled content
///
/// Only the fields that are present replace the scheduled values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(
        default,
        alias = "largeIconDrawableName",
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub large_icon_name: Option<String>,
    #[serde(
        default,
        alias = "largeIconTintColor",
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub large_icon_tint: Option<String>,
}

impl ContentOverride {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            body: Some(body.into()),
            large_icon_name: None,
            large_icon_tint: None,
        }
    }

    pub fn with_large_icon(mut self, name: impl Into<String>) -> Self {
        self.large_icon_name = non_empty(name.into());
        self
    }

    pub fn with_tint(mut self, tint: impl Into<String>) -> Self {
        self.large_icon_tint = non_empty(tint.into());
        self
    }
}

/// Calendar-date keyed content substitutions consulted at fire time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentOverrides(BTreeMap<NaiveDate, ContentOverride>);

impl ContentOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, date: NaiveDate, entry: ContentOverride) -> Self {
        self.0.insert(date, entry);
        self
    }

    pub fn insert(&mut self, date: NaiveDate, entry: ContentOverride) -> Option<ContentOverride> {
        self.0.insert(date, entry)
    }

    pub fn get(&self, date: NaiveDate) -> Option<&ContentOverride> {
        self.0.get(&date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.0.keys().copied()
    }

    /// Content to show on `date`; `fallback` itself is left untouched
    pub fn resolve(&self, date: NaiveDate, fallback: &NotificationContent) -> NotificationContent {
        match self.0.get(&date) {
            Some(patch) => fallback.overridden_by(patch),
            None => fallback.clone(),
        }
    }
}

impl FromIterator<(NaiveDate, ContentOverride)> for ContentOverrides {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, ContentOverride)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// ARGB color used to tint the large icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TintColor(u32);

impl TintColor {
    pub const fn from_argb(argb: u32) -> Self {
        Self(argb)
    }

    pub fn argb(&self) -> u32 {
        self.0
    }

    pub fn alpha(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    pub fn red(&self) -> u8 {
        (self.0 >> 16) as u8
    }

    pub fn green(&self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn blue(&self) -> u8 {
        self.0 as u8
    }

    /// Parse `#RRGGBB`, `#AARRGGBB` or one of the host's named colors
    pub fn parse(text: &str) -> NotificationResult<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            let value = u32::from_str_radix(hex, 16).map_err(|_| invalid_tint(text))?;
            return match hex.len() {
                6 => Ok(Self(0xFF00_0000 | value)),
                8 => Ok(Self(value)),
                _ => Err(invalid_tint(text)),
            };
        }

        let argb = match text.to_ascii_lowercase().as_str() {
            "black" => 0xFF00_0000,
            "darkgray" | "darkgrey" => 0xFF44_4444,
            "gray" | "grey" => 0xFF88_8888,
            "lightgray" | "lightgrey" => 0xFFCC_CCCC,
            "white" => 0xFFFF_FFFF,
            "red" => 0xFFFF_0000,
            "green" => 0xFF00_FF00,
            "blue" => 0xFF00_00FF,
            "yellow" => 0xFFFF_FF00,
            "cyan" | "aqua" => 0xFF00_FFFF,
            "magenta" | "fuchsia" => 0xFFFF_00FF,
            "lime" => 0xFF00_FF00,
            "maroon" => 0xFF80_0000,
            "navy" => 0xFF00_0080,
            "olive" => 0xFF80_8000,
            "purple" => 0xFF80_0080,
            "silver" => 0xFFC0_C0C0,
            "teal" => 0xFF00_8080,
            _ => return Err(invalid_tint(text)),
        };
        Ok(Self(argb))
    }
}

impl std::fmt::Display for TintColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:08X}", self.0)
    }
}

impl std::str::FromStr for TintColor {
    type Err = NotificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn invalid_tint(text: &str) -> NotificationError {
    NotificationError::malformed("largeIconTint", format!("'{}' is not a color", text))
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() { None } else { Some(value) }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(non_empty))
}
