//! Client settings for the notification subscriber.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Settings for [`crate::client::NotificationClient`].
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    /// Base URL of the REST API (used by the polling fallback)
    pub api_url: String,

    /// WebSocket URL of the notification endpoint
    pub ws_url: String,

    /// Seconds between polls once the realtime channel is given up
    pub poll_interval_secs: u64,

    /// Number of most recent posts fetched per poll
    pub poll_limit: u32,

    /// Delay before the first reconnect attempt; doubles per attempt
    pub reconnect_base_delay_ms: u64,

    /// Reconnect attempts before falling back to polling
    pub max_reconnect_attempts: u32,

    /// Delay between consecutive notifications of one batch
    pub stagger_ms: u64,

    /// Native notification auto-dismiss
    pub native_dismiss_secs: u64,

    /// Toast auto-dismiss
    pub toast_dismiss_secs: u64,

    /// Directory holding persisted client state
    pub state_dir: PathBuf,

    /// Optional JWT passed with `identify`
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000/api".into(),
            ws_url: "ws://localhost:5000/ws/notifications".into(),
            poll_interval_secs: 300,
            poll_limit: 10,
            reconnect_base_delay_ms: 1000,
            max_reconnect_attempts: 5,
            stagger_ms: 1000,
            native_dismiss_secs: 10,
            toast_dismiss_secs: 8,
            state_dir: PathBuf::from(".blog-notifier"),
            auth_token: None,
        }
    }
}

impl ClientSettings {
    /// Load client settings.
    ///
    /// Order: built-in defaults, `config/client.toml`, then `NOTIFY__*`
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        Config::builder()
            .set_default("api_url", defaults.api_url)?
            .set_default("ws_url", defaults.ws_url)?
            .set_default("poll_interval_secs", defaults.poll_interval_secs as i64)?
            .set_default("poll_limit", defaults.poll_limit as i64)?
            .set_default("reconnect_base_delay_ms", defaults.reconnect_base_delay_ms as i64)?
            .set_default("max_reconnect_attempts", defaults.max_reconnect_attempts as i64)?
            .set_default("stagger_ms", defaults.stagger_ms as i64)?
            .set_default("native_dismiss_secs", defaults.native_dismiss_secs as i64)?
            .set_default("toast_dismiss_secs", defaults.toast_dismiss_secs as i64)?
            .set_default("state_dir", defaults.state_dir.to_string_lossy().to_string())?
            .add_source(File::with_name("config/client").required(false))
            .add_source(
                Environment::default()
                    .prefix("NOTIFY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }

    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }
}
