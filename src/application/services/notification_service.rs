//! Notification Service
//!
//! Owns the connection registry and implements the notification protocol:
//! connection lifecycle, message dispatch, preference-gated broadcast and
//! heartbeat eviction.
//!
//! Nothing here returns an error to the caller. Protocol problems are
//! answered with an `error` envelope on the offending socket, and a socket
//! that cannot be written to is dropped from the registry.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::token_service::TokenService;
use crate::application::dto::{ClientMessage, ConnectionStats, ServerMessage};
use crate::domain::{should_send_notification, BlogSummary, Preferences, PreferencesPatch};
use crate::infrastructure::metrics;
use crate::infrastructure::realtime::{Connection, ConnectionRegistry};
use crate::shared::clock::Clock;

const IDENTITY_MISMATCH: &str = "User not identified or ID mismatch";

/// Outcome of one heartbeat sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatReport {
    pub pinged: usize,
    pub evicted: usize,
}

/// Notification fan-out service
pub struct NotificationService {
    registry: ConnectionRegistry,
    tokens: Arc<TokenService>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    pub fn new(tokens: Arc<TokenService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            tokens,
            clock,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// A socket was accepted.
    pub fn on_open(&self, connection: &Arc<Connection>) {
        tracing::debug!(connection_id = %connection.id(), "New WebSocket connection established");
        if let Err(e) = connection.send(&ServerMessage::connected()) {
            tracing::debug!(connection_id = %connection.id(), error = %e, "Failed to send welcome");
        }
    }

    /// A socket closed.
    pub fn on_close(&self, connection: &Arc<Connection>) {
        connection.mark_closed();
        if let Some(user_id) = connection.user_id() {
            if self.registry.remove(&user_id, connection) {
                tracing::info!(user_id = %user_id, "WebSocket connection closed");
            } else {
                tracing::debug!(user_id = %user_id, "Closed connection was no longer registered");
            }
            self.publish_gauges();
        }
    }

    /// Handle one inbound text frame.
    pub fn handle_text(&self, connection: &Arc<Connection>, text: &str) {
        // Any traffic proves the peer is alive.
        connection.mark_alive();

        match ClientMessage::parse(text) {
            Ok(message) => self.handle_message(connection, message),
            Err(e) => {
                tracing::debug!(connection_id = %connection.id(), error = %e, "Rejected message");
                self.reply(connection, ServerMessage::error(e.to_string()));
            }
        }
    }

    /// Dispatch a parsed message.
    pub fn handle_message(&self, connection: &Arc<Connection>, message: ClientMessage) {
        match message {
            ClientMessage::Identify {
                user_id,
                preferences,
                token,
            } => self.identify(connection, user_id, preferences, token),
            ClientMessage::Subscribe {
                user_id,
                preferences,
            } => self.subscribe(connection, user_id, preferences),
            ClientMessage::Unsubscribe { user_id } => self.unsubscribe(connection, user_id),
            ClientMessage::UpdatePreferences {
                user_id,
                preferences,
            } => self.update_preferences(connection, user_id, preferences),
            ClientMessage::Pong => connection.mark_alive(),
        }
    }

    fn identify(
        &self,
        connection: &Arc<Connection>,
        user_id: Option<String>,
        preferences: Option<Preferences>,
        token: Option<String>,
    ) {
        let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
            self.reply(connection, ServerMessage::error("User ID is required"));
            return;
        };

        // A bad token downgrades to anonymous rather than rejecting.
        let subject = token.and_then(|token| match self.tokens.verify(&token) {
            Ok(claims) => Some(claims.sub),
            Err(e) => {
                tracing::debug!(user_id = %user_id, error = %e, "Token verification failed");
                None
            }
        });
        let authenticated = subject.is_some();

        let previous_user_id = connection.update(|state| {
            let previous = state.user_id.replace(user_id.clone());
            state.preferences = Some(preferences.unwrap_or_default());
            state.is_authenticated = authenticated;
            state.auth_subject = subject;
            previous
        });

        // Re-identifying under a new id releases the old key.
        if let Some(previous) = previous_user_id.filter(|p| *p != user_id) {
            self.registry.remove(&previous, connection);
        }

        if let Some(replaced) = self.registry.insert(&user_id, connection.clone()) {
            if replaced.id() != connection.id() {
                tracing::debug!(
                    user_id = %user_id,
                    replaced_connection = %replaced.id(),
                    "Replaced previous connection for user; it stays open but unregistered"
                );
            }
        }
        self.publish_gauges();

        tracing::info!(user_id = %user_id, authenticated, "User identified");

        self.reply(
            connection,
            ServerMessage::Identified {
                user_id,
                authenticated,
            },
        );
    }

    fn subscribe(
        &self,
        connection: &Arc<Connection>,
        user_id: Option<String>,
        patch: Option<PreferencesPatch>,
    ) {
        let Some(user_id) = self.verified_user(connection, user_id) else {
            return;
        };

        connection.update(|state| {
            let preferences = state.preferences.get_or_insert_with(Preferences::default);
            preferences.apply(patch.unwrap_or_default());
            preferences.enabled = true;
        });
        self.publish_gauges();

        tracing::info!(user_id = %user_id, "User subscribed to notifications");
        self.reply(connection, ServerMessage::subscribed());
    }

    fn unsubscribe(&self, connection: &Arc<Connection>, user_id: Option<String>) {
        let Some(user_id) = self.verified_user(connection, user_id) else {
            return;
        };

        connection.update(|state| {
            state
                .preferences
                .get_or_insert_with(Preferences::default)
                .enabled = false;
        });
        self.publish_gauges();

        tracing::info!(user_id = %user_id, "User unsubscribed from notifications");
        self.reply(connection, ServerMessage::unsubscribed());
    }

    fn update_preferences(
        &self,
        connection: &Arc<Connection>,
        user_id: Option<String>,
        patch: Option<PreferencesPatch>,
    ) {
        let Some(user_id) = self.verified_user(connection, user_id) else {
            return;
        };

        let preferences = connection.update(|state| {
            let preferences = state.preferences.get_or_insert_with(Preferences::default);
            preferences.apply(patch.unwrap_or_default());
            preferences.clone()
        });
        self.publish_gauges();

        tracing::info!(user_id = %user_id, "User updated notification preferences");
        self.reply(connection, ServerMessage::PreferencesUpdated { preferences });
    }

    /// The claimed id, if this connection already identified as exactly it.
    fn verified_user(&self, connection: &Arc<Connection>, claimed: Option<String>) -> Option<String> {
        let current = connection.user_id();
        match (current, claimed) {
            (Some(current), Some(claimed)) if current == claimed => Some(current),
            _ => {
                self.reply(connection, ServerMessage::error(IDENTITY_MISMATCH));
                None
            }
        }
    }

    fn reply(&self, connection: &Arc<Connection>, message: ServerMessage) {
        if let Err(e) = connection.send(&message) {
            tracing::debug!(
                connection_id = %connection.id(),
                kind = message.kind(),
                error = %e,
                "Failed to send reply"
            );
        }
    }

    /// Notify every eligible connection about a newly published post.
    ///
    /// Returns the number of successful deliveries.
    pub fn broadcast_new_blog(&self, blog: &BlogSummary) -> usize {
        let message = ServerMessage::NewBlog {
            blog: blog.published_notice(),
            timestamp: self.clock.now(),
        };
        let now = self.clock.local_time();

        let sent = self.broadcast(&message, |preferences| {
            should_send_notification(preferences, &blog.category, now)
        });

        metrics::record_notifications_sent("new_blog", sent);
        tracing::info!(sent, title = %blog.title, "New blog notification sent");
        sent
    }

    /// Notify every subscribed connection that a post changed.
    ///
    /// Category and quiet hours are not applied to updates.
    pub fn broadcast_blog_update(&self, blog: &BlogSummary) -> usize {
        let message = ServerMessage::BlogUpdated {
            blog: blog.update_notice(),
            timestamp: self.clock.now(),
        };

        let sent = self.broadcast(&message, |_| true);

        metrics::record_notifications_sent("blog_updated", sent);
        tracing::info!(sent, title = %blog.title, "Blog update notification sent");
        sent
    }

    fn broadcast(&self, message: &ServerMessage, accepts: impl Fn(&Preferences) -> bool) -> usize {
        let mut sent = 0;

        for (user_id, connection) in self.registry.snapshot() {
            if !connection.is_open() {
                continue;
            }
            let eligible = connection
                .preferences()
                .is_some_and(|p| p.enabled && accepts(&p));
            if !eligible {
                continue;
            }

            match connection.send(message) {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::warn!(
                        user_id = %user_id,
                        kind = message.kind(),
                        error = %e,
                        "Error sending notification, dropping connection"
                    );
                    self.registry.remove(&user_id, &connection);
                    metrics::record_eviction("send_failure");
                }
            }
        }

        self.publish_gauges();
        sent
    }

    /// Deliver an arbitrary payload to one user's open connection.
    pub fn send_to_user(&self, user_id: &str, payload: &Value) -> bool {
        let Some(connection) = self.registry.get(user_id) else {
            return false;
        };
        if !connection.is_open() {
            return false;
        }

        match connection.send_value(payload) {
            Ok(()) => {
                metrics::record_notifications_sent("direct", 1);
                true
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Error sending notification to user");
                self.registry.remove(user_id, &connection);
                metrics::record_eviction("send_failure");
                self.publish_gauges();
                false
            }
        }
    }

    /// One heartbeat cycle.
    ///
    /// A connection still marked not-alive from the previous cycle is
    /// terminated and removed; every other connection is marked not-alive and
    /// pinged.
    pub fn heartbeat_sweep(&self) -> HeartbeatReport {
        let mut report = HeartbeatReport::default();

        for (user_id, connection) in self.registry.snapshot() {
            if !connection.is_alive() {
                tracing::info!(user_id = %user_id, "Terminating dead connection");
                connection.terminate();
                self.registry.remove(&user_id, &connection);
                metrics::record_eviction("heartbeat");
                report.evicted += 1;
                continue;
            }

            connection.set_alive(false);
            match connection.send(&ServerMessage::Ping) {
                Ok(()) => report.pinged += 1,
                Err(e) => {
                    tracing::debug!(user_id = %user_id, error = %e, "Error pinging user");
                    self.registry.remove(&user_id, &connection);
                    metrics::record_eviction("send_failure");
                    report.evicted += 1;
                }
            }
        }

        if report.evicted > 0 {
            self.publish_gauges();
        }
        report
    }

    /// Run [`Self::heartbeat_sweep`] every `period` until the task is aborted.
    pub fn spawn_heartbeat(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // Skip first immediate tick

            loop {
                ticker.tick().await;
                let report = service.heartbeat_sweep();
                tracing::trace!(pinged = report.pinged, evicted = report.evicted, "Heartbeat sweep");
            }
        })
    }

    /// Registry counts.
    pub fn stats(&self) -> ConnectionStats {
        let mut stats = ConnectionStats {
            total_connections: self.registry.len(),
            ..Default::default()
        };
        for (_, connection) in self.registry.snapshot() {
            if connection.is_subscribed() {
                stats.subscribed_connections += 1;
            }
            if connection.is_open() {
                stats.active_connections += 1;
            }
        }
        stats
    }

    /// Close every registered socket and clear the registry.
    pub fn shutdown(&self) {
        let connections = self.registry.drain();
        let count = connections.len();
        for connection in connections {
            connection.terminate();
        }
        self.publish_gauges();
        tracing::info!(closed = count, "Notification service shut down");
    }

    fn publish_gauges(&self) {
        let stats = self.stats();
        metrics::set_websocket_connections(stats.total_connections, stats.subscribed_connections);
    }
}
