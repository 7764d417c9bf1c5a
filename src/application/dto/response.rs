//! Response DTOs
//!
//! Bodies returned by the notification HTTP endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registry counts. The three numbers are independent counts over the
/// same registry, not disjoint buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    /// Registered connections
    pub total_connections: usize,
    /// Registered connections with `preferences.enabled`
    pub subscribed_connections: usize,
    /// Registered connections whose socket is open
    pub active_connections: usize,
}

/// `GET /api/notifications/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: ConnectionStats,
    pub timestamp: DateTime<Utc>,
}

/// Result of a broadcast hook.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub delivered: usize,
}

/// Result of a direct delivery to one user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DirectDeliveryResponse {
    pub delivered: bool,
}
