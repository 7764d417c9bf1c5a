//! Connection registry
//!
//! Maps a client-supplied user id to its single current connection.
//! Identifying again under the same id replaces the entry (last writer wins).

use std::sync::Arc;

use dashmap::DashMap;

use super::connection::Connection;

/// In-memory `user_id -> connection` map owned by the notification service.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<Connection>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `connection` under `user_id`, returning the entry it replaced.
    pub fn insert(&self, user_id: &str, connection: Arc<Connection>) -> Option<Arc<Connection>> {
        self.connections.insert(user_id.to_string(), connection)
    }

    /// Remove the entry for `user_id` if it still points at `connection`.
    ///
    /// A stale socket that lost its entry to a newer `identify` must not evict
    /// the newer connection when it closes.
    pub fn remove(&self, user_id: &str, connection: &Connection) -> bool {
        self.connections
            .remove_if(user_id, |_, current| current.id() == connection.id())
            .is_some()
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(user_id).map(|entry| entry.value().clone())
    }

    /// Copy of the current entries, safe to iterate while removing.
    pub fn snapshot(&self) -> Vec<(String, Arc<Connection>)> {
        self.connections
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Remove every entry, returning the removed connections.
    pub fn drain(&self) -> Vec<Arc<Connection>> {
        let drained = self.snapshot();
        self.connections.clear();
        drained.into_iter().map(|(_, conn)| conn).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
