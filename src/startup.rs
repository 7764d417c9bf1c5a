//! Application Startup
//!
//! Application building and server initialization.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;

use crate::application::services::{NotificationService, TokenService};
use crate::config::Settings;
use crate::presentation::http::{handlers::health, routes};
use crate::presentation::middleware::{cors, logging};
use crate::shared::clock::{Clock, SystemClock};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub notifications: Arc<NotificationService>,
    pub tokens: Arc<TokenService>,
    pub settings: Arc<Settings>,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    /// State whose quiet-hours checks read `clock`.
    pub fn with_clock(settings: Settings, clock: Arc<dyn Clock>) -> Self {
        let tokens = Arc::new(TokenService::new(&settings.jwt));
        let notifications = Arc::new(NotificationService::new(Arc::clone(&tokens), clock));

        Self {
            notifications,
            tokens,
            settings: Arc::new(settings),
        }
    }
}

/// Router with tracing and CORS applied.
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    state: AppState,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        Self::build_with_state(AppState::new(settings)).await
    }

    /// Build around an existing state (tests use this to pin the clock)
    pub async fn build_with_state(state: AppState) -> Result<Self> {
        health::init_server_start();

        let router = build_router(state.clone());

        // Bind to address
        let addr = state.settings.server.socket_addr()?;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router,
            state,
        })
    }

    /// Run the server until Ctrl-C
    pub async fn run_until_stopped(self) -> Result<()> {
        self.run_with_shutdown(shutdown_signal()).await
    }

    /// Run the server until `signal` resolves.
    ///
    /// The heartbeat runs for the lifetime of the server. On shutdown every
    /// registered socket is closed and the registry cleared.
    pub async fn run_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let notifications = Arc::clone(&self.state.notifications);
        let period = Duration::from_secs(self.state.settings.websocket.heartbeat_interval_secs);
        let heartbeat = notifications.spawn_heartbeat(period);
        tracing::info!(interval_secs = period.as_secs(), "Heartbeat started");

        let on_shutdown = Arc::clone(&notifications);
        let result = axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                signal.await;
                tracing::info!("Shutdown signal received");
                on_shutdown.shutdown();
            })
            .await;

        heartbeat.abort();
        result?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn notifications(&self) -> Arc<NotificationService> {
        Arc::clone(&self.state.notifications)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
