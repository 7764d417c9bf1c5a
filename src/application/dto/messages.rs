//! WebSocket Message Types
//!
//! Every frame is a JSON object `{"type": <string>, ...fields}` in both
//! directions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{BlogSummary, Preferences, PreferencesPatch};

/// Message types a client may send.
pub const CLIENT_MESSAGE_TYPES: [&str; 5] =
    ["identify", "subscribe", "unsubscribe", "update_preferences", "pong"];

/// Client -> server message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Identify {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preferences: Option<Preferences>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Subscribe {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preferences: Option<PreferencesPatch>,
    },
    #[serde(rename_all = "camelCase")]
    Unsubscribe {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    UpdatePreferences {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        preferences: Option<PreferencesPatch>,
    },
    Pong,
}

/// Reasons an inbound frame could not be turned into a [`ClientMessage`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid message format")]
    Malformed,

    #[error("Unknown message type: {0}")]
    UnknownType(String),
}

impl ClientMessage {
    /// Parse a text frame.
    ///
    /// Non-JSON input and known types with unusable payloads are
    /// [`ProtocolError::Malformed`]; a missing or unrecognized `type` is
    /// [`ProtocolError::UnknownType`].
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(|_| ProtocolError::Malformed)?;

        let kind = match value.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => other.to_string(),
            None => "undefined".to_string(),
        };
        if !CLIENT_MESSAGE_TYPES.contains(&kind.as_str()) {
            return Err(ProtocolError::UnknownType(kind));
        }

        serde_json::from_value(value).map_err(|_| ProtocolError::Malformed)
    }

    /// Wire name of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Identify { .. } => "identify",
            ClientMessage::Subscribe { .. } => "subscribe",
            ClientMessage::Unsubscribe { .. } => "unsubscribe",
            ClientMessage::UpdatePreferences { .. } => "update_preferences",
            ClientMessage::Pong => "pong",
        }
    }
}

/// Server -> client message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Connected {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Identified {
        user_id: String,
        authenticated: bool,
    },
    Subscribed {
        message: String,
    },
    Unsubscribed {
        message: String,
    },
    PreferencesUpdated {
        preferences: Preferences,
    },
    Error {
        message: String,
    },
    NewBlog {
        blog: BlogSummary,
        timestamp: DateTime<Utc>,
    },
    BlogUpdated {
        blog: BlogSummary,
        timestamp: DateTime<Utc>,
    },
    Ping,
}

impl ServerMessage {
    pub fn connected() -> Self {
        ServerMessage::Connected {
            message: "WebSocket connection established".into(),
        }
    }

    pub fn subscribed() -> Self {
        ServerMessage::Subscribed {
            message: "Successfully subscribed to notifications".into(),
        }
    }

    pub fn unsubscribed() -> Self {
        ServerMessage::Unsubscribed {
            message: "Successfully unsubscribed from notifications".into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    /// Wire name of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMessage::Connected { .. } => "connected",
            ServerMessage::Identified { .. } => "identified",
            ServerMessage::Subscribed { .. } => "subscribed",
            ServerMessage::Unsubscribed { .. } => "unsubscribed",
            ServerMessage::PreferencesUpdated { .. } => "preferences_updated",
            ServerMessage::Error { .. } => "error",
            ServerMessage::NewBlog { .. } => "new_blog",
            ServerMessage::BlogUpdated { .. } => "blog_updated",
            ServerMessage::Ping => "ping",
        }
    }
}
