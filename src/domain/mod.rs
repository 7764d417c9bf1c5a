//! # Domain Layer
//!
//! Core notification rules, independent of transport and storage.
//!
//! ## Structure
//!
//! - **blog**: the blog summary carried by every notification
//! - **preferences**: per-subscriber preferences, quiet hours and the
//!   delivery filter shared by the server broadcaster and the polling client

pub mod blog;
pub mod preferences;

pub use blog::{BlogPage, BlogSummary};
pub use preferences::{should_send_notification, Preferences, PreferencesPatch, QuietHours};
