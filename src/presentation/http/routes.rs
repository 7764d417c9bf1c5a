//! Route Configuration
//!
//! Configures all HTTP routes for the notification service.

use axum::{
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::infrastructure::metrics;
use crate::presentation::middleware::{require_admin, track_metrics};
use crate::presentation::websocket::ws_handler;
use crate::startup::AppState;

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    let ws_path = state.settings.websocket.path.clone();

    Router::new()
        .nest("/api/notifications", notification_routes(state.clone()))
        // Notification socket; any client may upgrade
        .route(&ws_path, get(ws_handler))
        // Health check endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness))
        .route("/health/ready", get(handlers::health::readiness))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        .route_layer(middleware::from_fn(track_metrics))
        .with_state(state)
}

/// Prometheus metrics endpoint handler
async fn metrics_handler() -> impl IntoResponse {
    let metrics = metrics::gather_metrics();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        metrics,
    )
}

/// Notification routes
fn notification_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/stats", get(handlers::notifications::stats))
        .merge(admin_routes(state))
}

/// Broadcast hooks (admin only)
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/blogs/published",
            post(handlers::notifications::blog_published),
        )
        .route("/blogs/updated", post(handlers::notifications::blog_updated))
        .route("/users/{user_id}", post(handlers::notifications::notify_user))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}
