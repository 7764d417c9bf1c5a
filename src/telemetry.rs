//! Telemetry and Observability
//!
//! Structured logging setup.

use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Default filter for the server
pub const SERVER_FILTER: &str = "info,blog_notifier=debug,tower_http=debug";

/// Initialize tracing subscriber for the server
pub fn init_tracing() {
    init_tracing_with(SERVER_FILTER);
}

/// Initialize tracing with `default_filter` unless `RUST_LOG` is set
pub fn init_tracing_with(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::debug!("Tracing initialized");
}
