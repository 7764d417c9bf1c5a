//! Notification Handlers
//!
//! Operational stats plus the admin hooks the blog API calls after a post is
//! created or edited.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::Value;

use crate::application::dto::{BroadcastResponse, DirectDeliveryResponse, StatsResponse};
use crate::domain::BlogSummary;
use crate::presentation::http::extractors::ValidatedJson;
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::startup::AppState;

/// GET /api/notifications/stats
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        stats: state.notifications.stats(),
        timestamp: Utc::now(),
    })
}

/// POST /api/notifications/blogs/published
pub async fn blog_published(
    State(state): State<AppState>,
    axum::Extension(admin): axum::Extension<AuthUser>,
    ValidatedJson(blog): ValidatedJson<BlogSummary>,
) -> Json<BroadcastResponse> {
    tracing::debug!(admin = %admin.subject, blog_id = %blog.id, "Broadcasting new blog");
    let delivered = state.notifications.broadcast_new_blog(&blog);
    Json(BroadcastResponse { delivered })
}

/// POST /api/notifications/blogs/updated
pub async fn blog_updated(
    State(state): State<AppState>,
    axum::Extension(admin): axum::Extension<AuthUser>,
    ValidatedJson(blog): ValidatedJson<BlogSummary>,
) -> Json<BroadcastResponse> {
    tracing::debug!(admin = %admin.subject, blog_id = %blog.id, "Broadcasting blog update");
    let delivered = state.notifications.broadcast_blog_update(&blog);
    Json(BroadcastResponse { delivered })
}

/// POST /api/notifications/users/{user_id}
pub async fn notify_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<DirectDeliveryResponse>, AppError> {
    let has_type = payload
        .get("type")
        .is_some_and(|kind| kind.as_str().is_some_and(|s| !s.is_empty()));
    if !payload.is_object() || !has_type {
        return Err(AppError::BadRequest(
            "Notification must be a JSON object with a string \"type\"".into(),
        ));
    }

    let delivered = state.notifications.send_to_user(&user_id, &payload);
    Ok(Json(DirectDeliveryResponse { delivered }))
}
