use chrono::{DateTime, Utc};

/// Client library error type
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("This platform does not support notifications")]
    Unsupported,

    #[error("Notification permission denied")]
    PermissionDenied,

    #[error("Notification permission was recently denied; not asking again before {retry_after}")]
    PermissionThrottled { retry_after: DateTime<Utc> },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
