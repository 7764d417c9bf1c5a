//! Subscriber-side preferences.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{Preferences, PreferencesPatch, QuietHours};

/// Preferences persisted by the client.
///
/// A superset of what the server filters on; the extra flags travel to the
/// server untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientPreferences {
    pub enabled: bool,
    pub browser_notifications: bool,
    pub toast_notifications: bool,
    pub categories: Vec<String>,
    pub quiet_hours: QuietHours,
    /// Days to wait before prompting again after a denial
    pub ask_again_after: u32,
}

impl Default for ClientPreferences {
    fn default() -> Self {
        Self {
            enabled: false,
            browser_notifications: true,
            toast_notifications: true,
            categories: vec!["all".into()],
            quiet_hours: QuietHours::default(),
            ask_again_after: 7,
        }
    }
}

/// Partial update for [`ClientPreferences`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPreferencesPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toast_notifications: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours: Option<QuietHours>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask_again_after: Option<u32>,
}

impl ClientPreferencesPatch {
    pub fn categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: Some(categories.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }
}

impl ClientPreferences {
    pub fn apply(&mut self, patch: ClientPreferencesPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(browser) = patch.browser_notifications {
            self.browser_notifications = browser;
        }
        if let Some(toast) = patch.toast_notifications {
            self.toast_notifications = toast;
        }
        if let Some(categories) = patch.categories {
            self.categories = categories;
        }
        if let Some(quiet_hours) = patch.quiet_hours {
            self.quiet_hours = quiet_hours;
        }
        if let Some(days) = patch.ask_again_after {
            self.ask_again_after = days;
        }
    }

    /// Client-only flags, carried to the server as opaque fields.
    fn extra(&self) -> Map<String, Value> {
        let mut extra = Map::new();
        extra.insert("browserNotifications".into(), self.browser_notifications.into());
        extra.insert("toastNotifications".into(), self.toast_notifications.into());
        extra.insert("askAgainAfter".into(), self.ask_again_after.into());
        extra
    }

    /// Full preferences as sent with `identify`.
    pub fn to_wire(&self) -> Preferences {
        Preferences {
            enabled: self.enabled,
            categories: self.categories.clone(),
            quiet_hours: Some(self.quiet_hours),
            extra: self.extra(),
        }
    }

    /// Every field as a merge patch, for `subscribe` and `update_preferences`.
    pub fn to_patch(&self) -> PreferencesPatch {
        PreferencesPatch {
            enabled: Some(self.enabled),
            categories: Some(self.categories.clone()),
            quiet_hours: Some(self.quiet_hours),
            extra: self.extra(),
        }
    }
}
