//! Notification client service.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use super::channel::{Backoff, ChannelState, NextStep};
use super::error::ClientError;
use super::feed::{select_new_posts, BlogFeed};
use super::history::{HistoryEntry, NotificationHistory};
use super::permission::{decide_permission, Permission, PermissionDecision, PermissionRecord};
use super::platform::{NotificationPlatform, StatusNotice};
use super::preferences::{ClientPreferences, ClientPreferencesPatch};
use super::presenter::{Delivery, NoticeKind, Presenter};
use super::storage::{keys, StateStore};
use crate::application::dto::{ClientMessage, ServerMessage};
use crate::config::ClientSettings;
use crate::domain::BlogSummary;
use crate::shared::clock::Clock;

/// Snapshot returned by [`NotificationClient::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatus {
    pub is_subscribed: bool,
    pub has_permission: bool,
    pub is_supported: bool,
    pub channel: ChannelState,
}

struct Inner {
    preferences: ClientPreferences,
    user_id: String,
    history: NotificationHistory,
    last_check: Option<DateTime<Utc>>,
    channel: ChannelState,
    /// Queue into the live socket, when connected
    outbound: Option<mpsc::UnboundedSender<ClientMessage>>,
    /// Channel or polling task
    worker: Option<JoinHandle<()>>,
}

/// Subscriber side of the notification service.
pub struct NotificationClient {
    settings: ClientSettings,
    store: StateStore,
    platform: Arc<dyn NotificationPlatform>,
    feed: Arc<dyn BlogFeed>,
    clock: Arc<dyn Clock>,
    presenter: Presenter,
    inner: Mutex<Inner>,
}

impl NotificationClient {
    /// Load persisted state. Generates and stores a user id on first use.
    pub fn new(
        settings: ClientSettings,
        store: StateStore,
        platform: Arc<dyn NotificationPlatform>,
        feed: Arc<dyn BlogFeed>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let preferences = store.load(keys::PREFERENCES).unwrap_or_default();
        let history = store.load(keys::HISTORY).unwrap_or_default();
        let last_check = store.load(keys::LAST_CHECK);
        let user_id = store.load(keys::USER_ID).unwrap_or_else(|| {
            let id = format!("user_{}", Uuid::new_v4());
            store.save(keys::USER_ID, &id);
            id
        });

        let presenter = Presenter::new(Arc::clone(&platform), &settings);

        Arc::new(Self {
            settings,
            store,
            platform,
            feed,
            clock,
            presenter,
            inner: Mutex::new(Inner {
                preferences,
                user_id,
                history,
                last_check,
                channel: ChannelState::Idle,
                outbound: None,
                worker: None,
            }),
        })
    }

    /// Resume delivery if the user was subscribed in a previous run.
    pub fn initialize(self: &Arc<Self>) {
        if self.inner.lock().preferences.enabled {
            self.ensure_channel();
        }
    }

    /// Opt in, asking for permission first.
    ///
    /// Nothing changes unless permission is granted.
    pub async fn subscribe(self: &Arc<Self>, patch: ClientPreferencesPatch) -> Result<(), ClientError> {
        self.ensure_permission().await?;

        let now = self.clock.now();
        let (message, connected) = {
            let mut inner = self.inner.lock();
            inner.preferences.apply(patch);
            inner.preferences.enabled = true;
            self.store.save(keys::PREFERENCES, &inner.preferences);
            if inner.last_check.is_none() {
                inner.last_check = Some(now);
                self.store.save(keys::LAST_CHECK, &now);
            }
            let message = ClientMessage::Subscribe {
                user_id: Some(inner.user_id.clone()),
                preferences: Some(inner.preferences.to_patch()),
            };
            (message, inner.outbound.clone())
        };

        match connected {
            Some(outbound) => {
                let _ = outbound.send(message);
            }
            None => self.ensure_channel(),
        }

        tracing::info!("Subscribed to blog notifications");
        self.platform.notice(StatusNotice::Subscribed);
        Ok(())
    }

    /// Opt out. Polling stops; an open socket stays open.
    pub fn unsubscribe(&self) {
        let mut inner = self.inner.lock();
        inner.preferences.enabled = false;
        self.store.save(keys::PREFERENCES, &inner.preferences);

        if inner.channel == ChannelState::Polling {
            if let Some(worker) = inner.worker.take() {
                worker.abort();
            }
            inner.channel = ChannelState::Idle;
        }
        if let Some(outbound) = &inner.outbound {
            let _ = outbound.send(ClientMessage::Unsubscribe {
                user_id: Some(inner.user_id.clone()),
            });
        }
        drop(inner);

        tracing::info!("Unsubscribed from blog notifications");
        self.platform.notice(StatusNotice::Unsubscribed);
    }

    /// Merge `patch` into the stored preferences and tell the server.
    pub fn update_preferences(&self, patch: ClientPreferencesPatch) -> ClientPreferences {
        let mut inner = self.inner.lock();
        inner.preferences.apply(patch);
        self.store.save(keys::PREFERENCES, &inner.preferences);
        if let Some(outbound) = &inner.outbound {
            let _ = outbound.send(ClientMessage::UpdatePreferences {
                user_id: Some(inner.user_id.clone()),
                preferences: Some(inner.preferences.to_patch()),
            });
        }
        inner.preferences.clone()
    }

    pub fn preferences(&self) -> ClientPreferences {
        self.inner.lock().preferences.clone()
    }

    pub fn user_id(&self) -> String {
        self.inner.lock().user_id.clone()
    }

    pub fn channel_state(&self) -> ChannelState {
        self.inner.lock().channel
    }

    pub fn last_check(&self) -> Option<DateTime<Utc>> {
        self.inner.lock().last_check
    }

    pub fn status(&self) -> ClientStatus {
        let inner = self.inner.lock();
        let is_supported = self.platform.is_supported();
        ClientStatus {
            is_subscribed: inner.preferences.enabled,
            has_permission: is_supported && self.platform.permission() == Permission::Granted,
            is_supported,
            channel: inner.channel,
        }
    }

    /// Delivered notifications, oldest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.inner.lock().history.entries().cloned().collect()
    }

    pub fn mark_read(&self, blog_id: &str) -> bool {
        let mut inner = self.inner.lock();
        let found = inner.history.mark_read(blog_id);
        if found {
            self.store.save(keys::HISTORY, &inner.history);
        }
        found
    }

    pub fn unread_count(&self) -> usize {
        self.inner.lock().history.unread_count()
    }

    /// Stop the channel or polling task.
    pub fn cleanup(&self) {
        let mut inner = self.inner.lock();
        if let Some(worker) = inner.worker.take() {
            worker.abort();
        }
        inner.outbound = None;
        inner.channel = ChannelState::Idle;
    }

    async fn ensure_permission(&self) -> Result<(), ClientError> {
        if !self.platform.is_supported() {
            self.platform.notice(StatusNotice::Unsupported);
            return Err(ClientError::Unsupported);
        }

        let ask_again_after = self.inner.lock().preferences.ask_again_after;
        let last_prompt: Option<PermissionRecord> = self.store.load(keys::PERMISSION_ASKED);
        let now = self.clock.now();

        match decide_permission(self.platform.permission(), last_prompt.as_ref(), ask_again_after, now) {
            PermissionDecision::AlreadyGranted => Ok(()),
            PermissionDecision::Blocked => {
                self.platform.notice(StatusNotice::Blocked);
                Err(ClientError::PermissionDenied)
            }
            PermissionDecision::Throttled { retry_after } => {
                tracing::debug!(%retry_after, "Permission prompt throttled");
                Err(ClientError::PermissionThrottled { retry_after })
            }
            PermissionDecision::Prompt => {
                let result = self.platform.request_permission().await;
                self.store.save(
                    keys::PERMISSION_ASKED,
                    &PermissionRecord {
                        asked_at: now,
                        result,
                    },
                );
                if result == Permission::Granted {
                    self.platform.notice(StatusNotice::PermissionGranted);
                    Ok(())
                } else {
                    self.platform.notice(StatusNotice::PermissionDenied);
                    Err(ClientError::PermissionDenied)
                }
            }
        }
    }

    /// Start the channel task unless one is running.
    fn ensure_channel(self: &Arc<Self>) {
        let mut inner = self.inner.lock();
        if inner.worker.as_ref().is_some_and(|w| !w.is_finished()) {
            return;
        }
        inner.channel = ChannelState::Connecting;
        inner.worker = Some(tokio::spawn(Arc::clone(self).run_channel()));
    }

    fn set_channel(&self, state: ChannelState) {
        self.inner.lock().channel = state;
    }

    /// Connect, reconnect with backoff, and finally poll forever.
    async fn run_channel(self: Arc<Self>) {
        let mut backoff = Backoff::new(
            self.settings.reconnect_base_delay(),
            self.settings.max_reconnect_attempts,
        );

        loop {
            match self.connect_once().await {
                Ok(()) => {
                    tracing::debug!("Notification channel closed");
                    backoff.reset();
                }
                Err(e) => tracing::debug!(error = %e, "Notification channel failed"),
            }
            self.inner.lock().outbound = None;

            match backoff.on_failure() {
                NextStep::Retry { attempt, delay } => {
                    tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");
                    self.set_channel(ChannelState::Reconnecting { attempt });
                    tokio::time::sleep(delay).await;
                }
                NextStep::FallBackToPolling => {
                    tracing::info!("Realtime channel unavailable, falling back to polling");
                    self.set_channel(ChannelState::Polling);
                    self.run_polling().await;
                    return;
                }
            }
        }
    }

    /// One socket session. `Ok` once an established socket closes.
    async fn connect_once(self: &Arc<Self>) -> Result<(), ClientError> {
        let (stream, _) = tokio_tungstenite::connect_async(self.settings.ws_url.as_str()).await?;
        let (mut write, mut read) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<ClientMessage>();

        let identify = {
            let mut inner = self.inner.lock();
            inner.outbound = Some(tx.clone());
            inner.channel = ChannelState::Connected;
            ClientMessage::Identify {
                user_id: Some(inner.user_id.clone()),
                preferences: Some(inner.preferences.to_wire()),
                token: self.settings.auth_token.clone(),
            }
        };
        tracing::info!(url = %self.settings.ws_url, "Notification channel connected");
        let _ = tx.send(identify);

        loop {
            tokio::select! {
                Some(message) = rx.recv() => {
                    let text = serde_json::to_string(&message)?;
                    write.send(Message::Text(text.into())).await?;
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_server_text(text.as_str(), &tx),
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "Notification channel read error");
                        return Ok(());
                    }
                },
            }
        }
    }

    fn handle_server_text(&self, text: &str, outbound: &mpsc::UnboundedSender<ClientMessage>) {
        let message = match serde_json::from_str::<ServerMessage>(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unrecognized server message");
                return;
            }
        };

        match message {
            ServerMessage::NewBlog { blog, .. } => self.deliver(vec![blog], NoticeKind::NewPost),
            ServerMessage::BlogUpdated { blog, .. } => {
                self.deliver(vec![blog], NoticeKind::UpdatedPost)
            }
            ServerMessage::Ping => {
                let _ = outbound.send(ClientMessage::Pong);
            }
            ServerMessage::Error { message } => {
                tracing::warn!(%message, "Notification server reported an error")
            }
            other => tracing::debug!(kind = other.kind(), "Notification server acknowledged"),
        }
    }

    async fn run_polling(&self) {
        let mut ticker = interval(self.settings.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.poll_once().await {
                tracing::warn!(error = %e, "Error checking for new blogs");
            }
        }
    }

    /// Fetch the latest posts and deliver the ones published since the last
    /// check. The check time then advances to now.
    pub async fn poll_once(&self) -> Result<Vec<BlogSummary>, ClientError> {
        let (preferences, last_check) = {
            let inner = self.inner.lock();
            if !inner.preferences.enabled {
                return Ok(Vec::new());
            }
            (inner.preferences.to_wire(), inner.last_check)
        };
        let last_check = last_check.unwrap_or_else(|| self.clock.now());

        let blogs = self.feed.latest(self.settings.poll_limit).await?;
        let fresh = select_new_posts(blogs, last_check, &preferences, self.clock.local_time());
        if !fresh.is_empty() {
            tracing::info!(count = fresh.len(), "New blog posts found");
            self.deliver(fresh.clone(), NoticeKind::NewPost);
        }

        let now = self.clock.now();
        self.inner.lock().last_check = Some(now);
        self.store.save(keys::LAST_CHECK, &now);

        Ok(fresh)
    }

    /// Record `blogs` in history and show them.
    fn deliver(&self, blogs: Vec<BlogSummary>, kind: NoticeKind) {
        let now = self.clock.now();
        let delivery = {
            let mut inner = self.inner.lock();
            if !inner.preferences.enabled {
                return;
            }
            for blog in &blogs {
                inner.history.push(blog.id.clone(), blog.title.clone(), now);
            }
            self.store.save(keys::HISTORY, &inner.history);

            Delivery {
                native: inner.preferences.browser_notifications
                    && self.platform.is_supported()
                    && self.platform.permission() == Permission::Granted,
                toast: inner.preferences.toast_notifications,
            }
        };

        self.presenter.present(blogs, kind, delivery);
    }
}
