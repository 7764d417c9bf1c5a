//! Infrastructure Layer
//!
//! Contains implementations backing the notification service:
//! - In-memory realtime connection registry
//! - Prometheus metrics

pub mod metrics;
pub mod realtime;
