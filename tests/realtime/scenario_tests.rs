//! End-to-end scenarios: notification client against a live server.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;

use blog_notifier::client::{
    keys, ChannelState, ClientPreferencesPatch, HttpBlogFeed, NotificationClient, StateStore,
};
use blog_notifier::config::ClientSettings;
use blog_notifier::shared::clock::SystemClock;

use crate::common::{blog, eventually, noon, unused_addr, RecordingPlatform, StubBlogApi, TestServer};

fn client_settings(ws_url: String, api_url: String) -> ClientSettings {
    ClientSettings {
        api_url,
        ws_url,
        stagger_ms: 10,
        reconnect_base_delay_ms: 10,
        ..Default::default()
    }
}

async fn subscribed_client(
    server: &TestServer,
    platform: Arc<RecordingPlatform>,
) -> Arc<NotificationClient> {
    let api = "http://127.0.0.1:9/api".to_string();
    let client = NotificationClient::new(
        client_settings(server.ws_url(), api.clone()),
        StateStore::memory(),
        platform,
        Arc::new(HttpBlogFeed::new(api)),
        noon(),
    );
    client
        .subscribe(ClientPreferencesPatch::categories(["Technology"]))
        .await
        .unwrap();

    let notifications = server.state.notifications.clone();
    assert!(eventually(|| notifications.stats().subscribed_connections == 1).await);
    client
}

#[tokio::test]
async fn test_category_filter_blocks_other_categories() {
    let server = TestServer::spawn().await;
    let platform = RecordingPlatform::new();
    let client = subscribed_client(&server, platform.clone()).await;

    let delivered = server
        .state
        .notifications
        .broadcast_new_blog(&blog("1", "Personal"));

    assert_eq!(delivered, 0);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(client.history().is_empty());
    assert!(platform.natives.lock().is_empty());
    client.cleanup();
}

#[tokio::test]
async fn test_matching_post_is_shown_and_recorded() {
    let server = TestServer::spawn().await;
    let platform = RecordingPlatform::new();
    let client = subscribed_client(&server, platform.clone()).await;

    let delivered = server
        .state
        .notifications
        .broadcast_new_blog(&blog("7", "Technology"));
    assert_eq!(delivered, 1);

    let recorded = platform.clone();
    assert!(eventually(|| recorded.natives.lock().len() == 1 && recorded.toasts.lock().len() == 1).await);

    let native = platform.natives.lock()[0].clone();
    assert_eq!(native.title, "New Blog Post Published!");
    assert_eq!(native.tag, "blog-7");
    assert_eq!(platform.toasts.lock()[0].title, "New Blog Post!");

    let history = client.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].blog_id, "7");
    assert_eq!(client.unread_count(), 1);
    assert!(client.mark_read("7"));
    assert_eq!(client.unread_count(), 0);
    assert_eq!(client.channel_state(), ChannelState::Connected);
    client.cleanup();
}

#[tokio::test]
async fn test_unreachable_server_falls_back_to_polling() {
    let mut post = blog("99", "Technology");
    post.published_at = Some(Utc::now() - chrono::Duration::minutes(30));
    let api = StubBlogApi::spawn(vec![post]).await;

    let settings = ClientSettings {
        max_reconnect_attempts: 1,
        poll_interval_secs: 3600,
        ..client_settings(format!("ws://{}/ws/notifications", unused_addr().await), api.api_url())
    };
    let store = StateStore::memory();
    let seeded = Utc::now() - chrono::Duration::hours(1);
    store.save(keys::LAST_CHECK, &seeded);

    let platform = RecordingPlatform::new();
    let client = NotificationClient::new(
        settings,
        store,
        platform.clone(),
        Arc::new(HttpBlogFeed::new(api.api_url())),
        Arc::new(SystemClock),
    );
    client.subscribe(ClientPreferencesPatch::default()).await.unwrap();

    let watched = Arc::clone(&client);
    assert!(
        eventually(|| {
            api.hits() >= 1
                && watched.channel_state() == ChannelState::Polling
                && watched.history().len() == 1
        })
        .await
    );
    assert!(client.last_check().is_some_and(|checked| checked > seeded));

    let query = api.queries()[0].clone();
    assert!(query.contains("limit=10"));
    assert!(query.contains("sortBy=publishedAt"));

    let again = client.poll_once().await.unwrap();
    assert!(again.is_empty());
    assert_eq!(client.history().len(), 1);
    client.cleanup();
}
