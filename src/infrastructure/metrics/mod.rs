//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts by method, path, and status
//! - HTTP request latency histograms
//! - Registered and subscribed WebSocket connection gauges
//! - Notifications delivered, by kind
//! - Connections evicted, by reason

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests")
            .namespace("blog_notifier"),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace("blog_notifier")
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Registry gauges
pub static WEBSOCKET_CONNECTIONS: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new("websocket_connections", "Number of registered WebSocket connections")
            .namespace("blog_notifier"),
        &["state"], // "registered", "subscribed"
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS metric")
});

/// Notifications successfully queued to a connection
pub static NOTIFICATIONS_SENT_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("notifications_sent_total", "Notifications delivered to connections")
            .namespace("blog_notifier"),
        &["kind"], // "new_blog", "blog_updated", "direct"
    )
    .expect("Failed to create NOTIFICATIONS_SENT_TOTAL metric")
});

/// Connections dropped from the registry by the server
pub static CONNECTIONS_EVICTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("connections_evicted_total", "Connections removed by the server")
            .namespace("blog_notifier"),
        &["reason"], // "heartbeat", "send_failure"
    )
    .expect("Failed to create CONNECTIONS_EVICTED_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register HTTP_REQUESTS_TOTAL");
    registry
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register HTTP_REQUEST_DURATION_SECONDS");
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS");
    registry
        .register(Box::new(NOTIFICATIONS_SENT_TOTAL.clone()))
        .expect("Failed to register NOTIFICATIONS_SENT_TOTAL");
    registry
        .register(Box::new(CONNECTIONS_EVICTED_TOTAL.clone()))
        .expect("Failed to register CONNECTIONS_EVICTED_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, &status.to_string()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Helper to update registry gauges
pub fn set_websocket_connections(registered: usize, subscribed: usize) {
    WEBSOCKET_CONNECTIONS
        .with_label_values(&["registered"])
        .set(registered as f64);
    WEBSOCKET_CONNECTIONS
        .with_label_values(&["subscribed"])
        .set(subscribed as f64);
}

pub fn record_notifications_sent(kind: &str, count: usize) {
    NOTIFICATIONS_SENT_TOTAL
        .with_label_values(&[kind])
        .inc_by(count as u64);
}

pub fn record_eviction(reason: &str) {
    CONNECTIONS_EVICTED_TOTAL.with_label_values(&[reason]).inc();
}
