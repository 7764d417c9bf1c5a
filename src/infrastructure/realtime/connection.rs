//! A single live notification socket.
//!
//! The socket itself is owned by its handler task; everything else talks to
//! it through an unbounded channel of [`Outbound`] frames drained by a writer
//! task. A send fails once that writer has gone away.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::application::dto::ServerMessage;
use crate::domain::Preferences;

/// Frame queued for the writer task.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(String),
    /// Close the socket and stop writing
    Close,
}

/// Why a frame could not be queued.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("connection closed")]
    Closed,

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Mutable per-connection state.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    pub user_id: Option<String>,
    pub preferences: Option<Preferences>,
    pub is_alive: bool,
    pub is_authenticated: bool,
    /// Subject of the verified token, when authenticated
    pub auth_subject: Option<String>,
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            user_id: None,
            preferences: None,
            is_alive: true,
            is_authenticated: false,
            auth_subject: None,
        }
    }
}

/// Live notification socket
#[derive(Debug)]
pub struct Connection {
    id: Uuid,
    sender: mpsc::UnboundedSender<Outbound>,
    open: AtomicBool,
    connected_at: DateTime<Utc>,
    state: Mutex<ConnectionState>,
}

impl Connection {
    pub fn new(sender: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            open: AtomicBool::new(true),
            connected_at: Utc::now(),
            state: Mutex::new(ConnectionState::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Whether the socket can still accept frames.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.sender.is_closed()
    }

    /// Record that the socket has stopped reading.
    pub fn mark_closed(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// Queue a protocol message.
    pub fn send(&self, message: &ServerMessage) -> Result<(), SendError> {
        let text = serde_json::to_string(message)?;
        self.send_text(text)
    }

    /// Queue an arbitrary JSON payload.
    pub fn send_value(&self, value: &Value) -> Result<(), SendError> {
        self.send_text(value.to_string())
    }

    fn send_text(&self, text: String) -> Result<(), SendError> {
        if !self.open.load(Ordering::Acquire) {
            return Err(SendError::Closed);
        }
        self.sender
            .send(Outbound::Text(text))
            .map_err(|_| SendError::Closed)
    }

    /// Forcibly close the socket.
    pub fn terminate(&self) {
        self.mark_closed();
        let _ = self.sender.send(Outbound::Close);
    }

    pub fn user_id(&self) -> Option<String> {
        self.state.lock().user_id.clone()
    }

    pub fn preferences(&self) -> Option<Preferences> {
        self.state.lock().preferences.clone()
    }

    /// Whether preferences exist and are enabled.
    pub fn is_subscribed(&self) -> bool {
        self.state
            .lock()
            .preferences
            .as_ref()
            .is_some_and(|p| p.enabled)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().is_authenticated
    }

    pub fn is_alive(&self) -> bool {
        self.state.lock().is_alive
    }

    pub fn mark_alive(&self) {
        self.state.lock().is_alive = true;
    }

    pub fn set_alive(&self, alive: bool) {
        self.state.lock().is_alive = alive;
    }

    /// Run `f` with exclusive access to the mutable state.
    pub fn update<R>(&self, f: impl FnOnce(&mut ConnectionState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn snapshot(&self) -> ConnectionState {
        self.state.lock().clone()
    }
}
