//! Notification client
//!
//! The subscriber side of the notification service: persisted opt-in state,
//! a realtime channel with reconnect backoff, a polling fallback and
//! delivery through a [`NotificationPlatform`].
//!
//! ```text
//! Idle -> Connecting -> Connected -> Reconnecting(n) -> ... -> Polling
//!                           ^              |
//!                           +--------------+
//! ```

mod channel;
mod error;
mod feed;
mod history;
mod permission;
mod platform;
mod preferences;
mod presenter;
mod service;
mod storage;

pub use channel::{Backoff, ChannelState, NextStep};
pub use error::ClientError;
pub use feed::{select_new_posts, BlogFeed, HttpBlogFeed};
pub use history::{HistoryEntry, NotificationHistory, HISTORY_CAPACITY};
pub use permission::{decide_permission, Permission, PermissionDecision, PermissionRecord};
pub use platform::{ConsolePlatform, NotificationPlatform, StatusNotice};
pub use preferences::{ClientPreferences, ClientPreferencesPatch};
pub use presenter::{excerpt_preview, Delivery, NativeNotification, NoticeKind, Presenter, Toast};
pub use service::{ClientStatus, NotificationClient};
pub use storage::{keys, FileStore, KeyValueStore, LayeredStore, MemoryStore, StateStore};
