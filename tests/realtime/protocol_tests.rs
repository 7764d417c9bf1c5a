//! WebSocket protocol tests over real sockets.

use std::time::Duration;

use blog_notifier::application::services::Role;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::common::{blog, eventually, noon, test_settings, TestServer, WsClient};

#[tokio::test]
async fn test_identify_round_trip() {
    let server = TestServer::spawn().await;
    let mut client = WsClient::connect(&server.ws_url()).await;

    let reply = client.identify("user_1", json!({"enabled": true})).await;

    assert_eq!(
        reply,
        json!({"type": "identified", "userId": "user_1", "authenticated": false})
    );
    assert_eq!(server.state.notifications.stats().subscribed_connections, 1);
}

#[tokio::test]
async fn test_identify_with_token_is_authenticated() {
    let server = TestServer::spawn().await;
    let token = server.state.tokens.issue("reader-9", Role::User).unwrap();
    let mut client = WsClient::connect(&server.ws_url()).await;

    client
        .send_json(json!({"type": "identify", "userId": "user_1", "token": token}))
        .await;

    assert_eq!(client.recv_json().await["authenticated"], true);
}

#[tokio::test]
async fn test_errors_keep_the_socket_open() {
    let server = TestServer::spawn().await;
    let mut client = WsClient::connect(&server.ws_url()).await;

    client.send_raw("definitely not json").await;
    assert_eq!(
        client.recv_json().await,
        json!({"type": "error", "message": "Invalid message format"})
    );

    client.send_json(json!({"type": "teleport"})).await;
    assert_eq!(
        client.recv_json().await["message"],
        "Unknown message type: teleport"
    );

    client
        .send_json(json!({"type": "subscribe", "userId": "user_1"}))
        .await;
    assert_eq!(
        client.recv_json().await["message"],
        "User not identified or ID mismatch"
    );

    let reply = client.identify("user_1", json!({})).await;
    assert_eq!(reply["type"], "identified");
}

#[tokio::test]
async fn test_subscribe_update_unsubscribe() {
    let server = TestServer::spawn().await;
    let mut client = WsClient::connect(&server.ws_url()).await;
    client.identify("user_1", json!({})).await;

    client
        .send_json(json!({"type": "subscribe", "userId": "user_1", "preferences": {"categories": ["Technology"]}}))
        .await;
    assert_eq!(client.recv_json().await["type"], "subscribed");

    client
        .send_json(json!({
            "type": "update_preferences",
            "userId": "user_1",
            "preferences": {"quietHours": {"enabled": true, "start": "23:00", "end": "06:00"}}
        }))
        .await;
    let updated = client.recv_json().await;
    assert_eq!(updated["type"], "preferences_updated");
    assert_eq!(updated["preferences"]["enabled"], true);
    assert_eq!(updated["preferences"]["categories"], json!(["Technology"]));

    client
        .send_json(json!({"type": "unsubscribe", "userId": "user_1"}))
        .await;
    assert_eq!(client.recv_json().await["type"], "unsubscribed");
    assert_eq!(server.state.notifications.stats().subscribed_connections, 0);
}

#[tokio::test]
async fn test_second_identify_replaces_first() {
    let server = TestServer::spawn().await;
    let mut first = WsClient::connect(&server.ws_url()).await;
    first.identify("user_1", json!({"enabled": true})).await;
    let mut second = WsClient::connect(&server.ws_url()).await;
    second.identify("user_1", json!({"enabled": true})).await;

    assert_eq!(server.state.notifications.stats().total_connections, 1);

    let delivered = server
        .state
        .notifications
        .broadcast_new_blog(&blog("1", "Technology"));
    assert_eq!(delivered, 1);
    assert_eq!(second.recv_json().await["type"], "new_blog");
    assert!(first.try_recv_json(Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn test_close_removes_registration() {
    let server = TestServer::spawn().await;
    let mut client = WsClient::connect(&server.ws_url()).await;
    client.identify("user_1", json!({})).await;
    drop(client);

    let notifications = server.state.notifications.clone();
    assert!(eventually(|| notifications.stats().total_connections == 0).await);
}

#[tokio::test]
async fn test_admin_hook_reaches_socket() {
    let server = TestServer::spawn().await;
    let mut client = WsClient::connect(&server.ws_url()).await;
    client.identify("user_1", json!({"enabled": true})).await;

    let response: serde_json::Value = reqwest::Client::new()
        .post(server.url("/api/notifications/blogs/published"))
        .bearer_auth(server.admin_token())
        .json(&blog("42", "Technology"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(response, json!({"delivered": 1}));
    let event = client.recv_json().await;
    assert_eq!(event["type"], "new_blog");
    assert_eq!(event["blog"]["_id"], "42");
    assert!(event["timestamp"].is_string());
}

#[tokio::test]
async fn test_heartbeat_evicts_silent_peer() {
    let mut settings = test_settings();
    settings.websocket.heartbeat_interval_secs = 1;
    let server = TestServer::spawn_with(settings, noon()).await;

    let mut silent = WsClient::connect(&server.ws_url()).await;
    silent.identify("silent", json!({})).await;

    let mut responsive = WsClient::connect(&server.ws_url()).await;
    responsive.identify("responsive", json!({})).await;
    let responder = tokio::spawn(async move {
        while let Some(message) = responsive.try_recv_json(Duration::from_secs(5)).await {
            if message["type"] == "ping" {
                responsive.send_json(json!({"type": "pong"})).await;
            }
        }
    });

    assert!(silent.closed_within(Duration::from_secs(5)).await);

    let registry = server.state.notifications.registry();
    assert!(registry.get("silent").is_none());
    assert!(registry.get("responsive").is_some());
    responder.abort();
}

#[tokio::test]
async fn test_shutdown_closes_sockets() {
    let mut server = TestServer::spawn().await;
    let mut client = WsClient::connect(&server.ws_url()).await;
    client.identify("user_1", json!({})).await;

    server.shutdown();

    assert!(client.closed_within(Duration::from_secs(5)).await);
    assert_eq!(server.state.notifications.stats().total_connections, 0);
}
