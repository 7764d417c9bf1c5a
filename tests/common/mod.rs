//! Common Test Utilities
//!
//! Shared helpers, fixtures, and test infrastructure.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{RawQuery, State},
    http::Request,
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

use blog_notifier::application::services::Role;
use blog_notifier::client::{NativeNotification, NotificationPlatform, Permission, StatusNotice, Toast};
use blog_notifier::config::{
    CorsSettings, JwtSettings, ServerSettings, Settings, WebSocketSettings,
};
use blog_notifier::domain::BlogSummary;
use blog_notifier::shared::clock::{Clock, FixedClock};
use blog_notifier::startup::{build_router, AppState, Application};

pub const TEST_SECRET: &str = "integration-test-secret-with-enough-length";
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

pub fn test_settings() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".into(),
            port: 0,
        },
        jwt: JwtSettings {
            secret: TEST_SECRET.into(),
            access_token_expiry_minutes: 60,
        },
        cors: CorsSettings {
            allowed_origins: vec!["http://localhost:5173".into()],
        },
        websocket: WebSocketSettings {
            path: "/ws/notifications".into(),
            heartbeat_interval_secs: 30,
            max_message_size: 65536,
        },
        environment: "test".into(),
    }
}

/// Local noon, outside any default quiet hours.
pub fn noon() -> Arc<dyn Clock> {
    Arc::new(FixedClock::at(12, 0))
}

pub fn blog(id: &str, category: &str) -> BlogSummary {
    BlogSummary {
        id: id.into(),
        title: format!("Post {}", id),
        excerpt: "An excerpt".into(),
        slug: format!("post-{}", id),
        category: category.into(),
        featured_image: None,
        published_at: Some(chrono::Utc::now()),
        updated_at: None,
        tags: vec!["rust".into()],
    }
}

/// Poll `condition` until it holds or five seconds pass.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + RECV_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

/// Test application driven through the router without a socket
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::with_clock(test_settings(), noon());
        Self {
            router: build_router(state.clone()),
            state,
        }
    }

    pub fn admin_token(&self) -> String {
        self.state.tokens.issue("admin-1", Role::Admin).unwrap()
    }

    pub fn user_token(&self) -> String {
        self.state.tokens.issue("reader-1", Role::User).unwrap()
    }

    /// Make a GET request to the application
    pub async fn get(&self, uri: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Make a POST request with JSON body
    pub async fn post_json(&self, uri: &str, body: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    /// Make an authenticated POST request with JSON body
    pub async fn post_json_auth(
        &self,
        uri: &str,
        body: &str,
        token: &str,
    ) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Server listening on an ephemeral port
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        Self::spawn_with(test_settings(), noon()).await
    }

    pub async fn spawn_with(settings: Settings, clock: Arc<dyn Clock>) -> Self {
        let app = Application::build_with_state(AppState::with_clock(settings, clock))
            .await
            .unwrap();
        let addr = app.local_addr().unwrap();
        let state = app.state().clone();

        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(app.run_with_shutdown(async move {
            let _ = rx.await;
        }));

        Self {
            addr,
            state,
            shutdown: Some(tx),
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}{}", self.addr, self.state.settings.websocket.path)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn admin_token(&self) -> String {
        self.state.tokens.issue("admin-1", Role::Admin).unwrap()
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Raw protocol client
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Connect and consume the `connected` greeting.
    pub async fn connect(url: &str) -> Self {
        let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        let mut client = Self { stream };
        let greeting = client.recv_json().await;
        assert_eq!(greeting["type"], "connected");
        client
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::Text(text.to_string().into()))
            .await
            .unwrap();
    }

    pub async fn send_json(&mut self, value: Value) {
        self.send_raw(&value.to_string()).await;
    }

    /// Next text frame as JSON.
    pub async fn recv_json(&mut self) -> Value {
        self.try_recv_json(RECV_TIMEOUT)
            .await
            .expect("expected a message from the server")
    }

    /// Next text frame within `wait`, if any.
    pub async fn try_recv_json(&mut self, wait: Duration) -> Option<Value> {
        let next = tokio::time::timeout(wait, async {
            while let Some(frame) = self.stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => return serde_json::from_str(text.as_str()).ok(),
                    Ok(Message::Close(_)) | Err(_) => return None,
                    Ok(_) => continue,
                }
            }
            None
        });
        next.await.ok().flatten()
    }

    /// Whether the server closed the socket within `wait`.
    pub async fn closed_within(&mut self, wait: Duration) -> bool {
        let closed = tokio::time::timeout(wait, async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    Some(Ok(_)) => continue,
                }
            }
        });
        closed.await.is_ok()
    }

    pub async fn identify(&mut self, user_id: &str, preferences: Value) -> Value {
        self.send_json(serde_json::json!({
            "type": "identify",
            "userId": user_id,
            "preferences": preferences,
        }))
        .await;
        self.recv_json().await
    }
}

/// Platform that records everything it is asked to show
#[derive(Default)]
pub struct RecordingPlatform {
    pub natives: Mutex<Vec<NativeNotification>>,
    pub toasts: Mutex<Vec<Toast>>,
    pub notices: Mutex<Vec<StatusNotice>>,
}

impl RecordingPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl NotificationPlatform for RecordingPlatform {
    fn is_supported(&self) -> bool {
        true
    }

    fn permission(&self) -> Permission {
        Permission::Granted
    }

    async fn request_permission(&self) -> Permission {
        Permission::Granted
    }

    fn show_native(&self, notification: &NativeNotification) {
        self.natives.lock().push(notification.clone());
    }

    fn show_toast(&self, toast: &Toast) {
        self.toasts.lock().push(toast.clone());
    }

    fn notice(&self, notice: StatusNotice) {
        self.notices.lock().push(notice);
    }
}

#[derive(Default)]
struct BlogApiState {
    blogs: Mutex<Vec<BlogSummary>>,
    queries: Mutex<Vec<String>>,
    hits: AtomicUsize,
}

/// Stand-in for the blog listing API
pub struct StubBlogApi {
    pub addr: SocketAddr,
    state: Arc<BlogApiState>,
}

impl StubBlogApi {
    pub async fn spawn(blogs: Vec<BlogSummary>) -> Self {
        let state = Arc::new(BlogApiState::default());
        *state.blogs.lock() = blogs;

        let router = Router::new()
            .route("/api/blogs", get(list_blogs))
            .with_state(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router).await });

        Self { addr, state }
    }

    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<String> {
        self.state.queries.lock().clone()
    }
}

/// Responds in the listing endpoint's wire shape: Mongoose documents with
/// their bookkeeping fields, and `currentPage` echoed as the query string.
async fn list_blogs(
    State(state): State<Arc<BlogApiState>>,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let query = query.unwrap_or_default();
    let page = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("page="))
        .unwrap_or("1")
        .to_string();
    state.queries.lock().push(query);

    let blogs: Vec<Value> = state.blogs.lock().iter().map(mongoose_document).collect();
    let total = blogs.len();
    Json(json!({
        "blogs": blogs,
        "totalPages": total.div_ceil(10),
        "currentPage": page,
        "total": total,
    }))
}

pub fn mongoose_document(blog: &BlogSummary) -> Value {
    let mut doc = serde_json::to_value(blog).unwrap();
    let extras = json!({
        "isPublished": true,
        "readTime": 5,
        "likes": 0,
        "likedBy": [],
        "createdAt": blog.published_at,
        "updatedAt": blog.updated_at.or(blog.published_at),
        "featuredImage": blog.featured_image,
        "__v": 0,
    });
    if let (Some(doc), Value::Object(extras)) = (doc.as_object_mut(), extras) {
        doc.extend(extras);
    }
    doc
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}
