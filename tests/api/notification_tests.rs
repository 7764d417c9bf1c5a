//! Notification endpoint tests
//!
//! Admin gating, payload validation and broadcast results. Sockets are
//! registered directly on the service so these run without a listener.

use std::sync::Arc;

use axum::http::StatusCode;
use blog_notifier::infrastructure::realtime::{Connection, Outbound};
use fake::faker::lorem::en::Sentence;
use fake::Fake;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::common::{blog, body_json, TestApp};

/// Open and identify a socket without a network.
fn attach(app: &TestApp, user_id: &str, preferences: Value) -> (Arc<Connection>, UnboundedReceiver<Outbound>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let connection = Arc::new(Connection::new(tx));
    let service = &app.state.notifications;
    service.on_open(&connection);
    service.handle_text(
        &connection,
        &json!({"type": "identify", "userId": user_id, "preferences": preferences}).to_string(),
    );
    while rx.try_recv().is_ok() {}
    (connection, rx)
}

fn next_json(rx: &mut UnboundedReceiver<Outbound>) -> Option<Value> {
    match rx.try_recv().ok()? {
        Outbound::Text(text) => serde_json::from_str(&text).ok(),
        Outbound::Close => None,
    }
}

#[tokio::test]
async fn test_stats_counts() {
    let app = TestApp::new();
    let (_a, _rx_a) = attach(&app, "a", json!({"enabled": true}));
    let (_b, _rx_b) = attach(&app, "b", json!({"enabled": false}));

    let response = app.get("/api/notifications/stats").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["totalConnections"], 2);
    assert_eq!(json["subscribedConnections"], 1);
    assert_eq!(json["activeConnections"], 2);
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_broadcast_requires_token() {
    let app = TestApp::new();
    let body = serde_json::to_string(&blog("1", "Technology")).unwrap();

    let response = app.post_json("/api/notifications/blogs/published", &body).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_broadcast_rejects_bad_token() {
    let app = TestApp::new();
    let body = serde_json::to_string(&blog("1", "Technology")).unwrap();

    let response = app
        .post_json_auth("/api/notifications/blogs/published", &body, "not-a-token")
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_broadcast_requires_admin_role() {
    let app = TestApp::new();
    let body = serde_json::to_string(&blog("1", "Technology")).unwrap();

    let response = app
        .post_json_auth("/api/notifications/blogs/published", &body, &app.user_token())
        .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_published_hook_filters_by_category() {
    let app = TestApp::new();
    let (_tech, mut tech_rx) = attach(&app, "tech", json!({"enabled": true, "categories": ["Technology"]}));
    let (_all, mut all_rx) = attach(&app, "all", json!({"enabled": true, "categories": ["all"]}));
    let (_off, mut off_rx) = attach(&app, "off", json!({"enabled": false}));

    let mut post = blog("1", "Personal");
    post.title = Sentence(3..6).fake();
    let response = app
        .post_json_auth(
            "/api/notifications/blogs/published",
            &serde_json::to_string(&post).unwrap(),
            &app.admin_token(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"delivered": 1}));

    let delivered = next_json(&mut all_rx).unwrap();
    assert_eq!(delivered["type"], "new_blog");
    assert_eq!(delivered["blog"]["title"], post.title.as_str());
    assert!(next_json(&mut tech_rx).is_none());
    assert!(next_json(&mut off_rx).is_none());
}

#[tokio::test]
async fn test_updated_hook_reaches_every_subscriber() {
    let app = TestApp::new();
    let (_tech, mut tech_rx) = attach(&app, "tech", json!({"enabled": true, "categories": ["Technology"]}));
    let (_all, _all_rx) = attach(&app, "all", json!({"enabled": true}));

    let response = app
        .post_json_auth(
            "/api/notifications/blogs/updated",
            &serde_json::to_string(&blog("1", "Personal")).unwrap(),
            &app.admin_token(),
        )
        .await;

    assert_eq!(body_json(response).await, json!({"delivered": 2}));
    let update = next_json(&mut tech_rx).unwrap();
    assert_eq!(update["type"], "blog_updated");
    assert!(update["blog"].get("publishedAt").is_none());
    assert!(update["blog"].get("tags").is_none());
}

#[tokio::test]
async fn test_invalid_blog_payload_is_rejected() {
    let app = TestApp::new();
    let body = json!({"_id": "", "title": "", "slug": "x"}).to_string();

    let response = app
        .post_json_auth("/api/notifications/blogs/published", &body, &app.admin_token())
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_direct_notification() {
    let app = TestApp::new();
    let (_conn, mut rx) = attach(&app, "user_1", json!({}));
    let token = app.admin_token();

    let response = app
        .post_json_auth(
            "/api/notifications/users/user_1",
            r#"{"type":"announcement","text":"hello"}"#,
            &token,
        )
        .await;
    assert_eq!(body_json(response).await, json!({"delivered": true}));
    assert_eq!(next_json(&mut rx).unwrap()["text"], "hello");

    let missing = app
        .post_json_auth("/api/notifications/users/nobody", r#"{"type":"announcement"}"#, &token)
        .await;
    assert_eq!(body_json(missing).await, json!({"delivered": false}));

    let untyped = app
        .post_json_auth("/api/notifications/users/user_1", r#"{"text":"no type"}"#, &token)
        .await;
    assert_eq!(untyped.status(), StatusCode::BAD_REQUEST);
}
