//! Notification preferences and the delivery filter.
//!
//! Preferences arrive as loosely shaped JSON from the subscriber. The fields
//! the filter reads are typed; everything else is kept verbatim in `extra`
//! so that a shallow merge round-trips whatever the client sent.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Category wildcard that disables category filtering.
pub const ALL_CATEGORIES: &str = "all";

/// A daily window during which notifications are suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietHours {
    #[serde(default)]
    pub enabled: bool,

    /// Window start, `HH:MM`
    #[serde(with = "hhmm", default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveTime>,

    /// Window end, `HH:MM`
    #[serde(with = "hhmm", default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveTime>,
}

fn default_quiet_start() -> NaiveTime {
    NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_quiet_end() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start: Some(default_quiet_start()),
            end: Some(default_quiet_end()),
        }
    }
}

impl QuietHours {
    /// Window from `start` to `end`, enabled.
    pub fn between(start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            enabled: true,
            start: Some(start),
            end: Some(end),
        }
    }

    /// Whether `now` (minute precision) falls inside the window.
    ///
    /// `start > end` wraps midnight. Both bounds are inclusive. A window
    /// missing either bound contains nothing.
    pub fn contains(&self, now: NaiveTime) -> bool {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return false;
        };
        let now = truncate_to_minute(now);
        if start > end {
            now >= start || now <= end
        } else {
            now >= start && now <= end
        }
    }

    /// Whether the window is enabled and `now` falls inside it.
    pub fn is_quiet(&self, now: NaiveTime) -> bool {
        self.enabled && self.contains(now)
    }
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// Per-connection notification preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub enabled: bool,

    /// Allowed categories; empty or containing `"all"` means everything
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHours>,

    /// Fields the server does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial preferences; present fields overwrite, absent fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHours>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Preferences {
    /// Shallow merge of `patch` into these preferences.
    pub fn apply(&mut self, patch: PreferencesPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(categories) = patch.categories {
            self.categories = categories;
        }
        if let Some(quiet_hours) = patch.quiet_hours {
            self.quiet_hours = Some(quiet_hours);
        }
        self.extra.extend(patch.extra);
    }

    /// Whether a post in `category` passes the category allow-list.
    pub fn accepts_category(&self, category: &str) -> bool {
        self.categories.is_empty()
            || self
                .categories
                .iter()
                .any(|c| c == ALL_CATEGORIES || c == category)
    }

    /// Whether the subscriber is inside its quiet hours at `now`.
    pub fn is_quiet_at(&self, now: NaiveTime) -> bool {
        self.quiet_hours.is_some_and(|q| q.is_quiet(now))
    }
}

/// Decide whether a post in `category` should be delivered at local time `now`.
pub fn should_send_notification(preferences: &Preferences, category: &str, now: NaiveTime) -> bool {
    preferences.enabled && preferences.accepts_category(category) && !preferences.is_quiet_at(now)
}

/// Serde adapter for optional `HH:MM` times.
mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.serialize_str(&time.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        NaiveTime::parse_from_str(&raw, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid time '{}': {}", raw, e)))
    }
}
