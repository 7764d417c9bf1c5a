//! Delivered-notification history.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entries kept; older ones are dropped first.
pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub blog_id: String,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

/// Capped history in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationHistory {
    entries: VecDeque<HistoryEntry>,
}

impl NotificationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, blog_id: impl Into<String>, title: impl Into<String>, timestamp: DateTime<Utc>) {
        self.entries.push_back(HistoryEntry {
            blog_id: blog_id.into(),
            title: title.into(),
            timestamp,
            read: false,
        });
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    /// Mark every entry for `blog_id` read. Returns whether any matched.
    pub fn mark_read(&mut self, blog_id: &str) -> bool {
        let mut found = false;
        for entry in self.entries.iter_mut().filter(|e| e.blog_id == blog_id) {
            entry.read = true;
            found = true;
        }
        found
    }

    pub fn unread_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.read).count()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
