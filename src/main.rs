//! # Blog Notifier
//!
//! Notification fan-out server for the portfolio blog.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - HTTP/WebSocket server with the heartbeat sweep

use anyhow::Result;
use tracing::info;

use blog_notifier::config::Settings;
use blog_notifier::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    blog_notifier::telemetry::init_tracing();

    info!("Starting Blog Notifier...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        ws_path = %settings.websocket.path,
        "Configuration loaded"
    );

    // Build and run the application
    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    info!("Server stopped");
    Ok(())
}
