//! WebSocket Connection Handler
//!
//! Bridges one upgraded socket to the notification service: a writer task
//! drains the connection's outbound queue while the reader loop feeds inbound
//! frames to the service.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::infrastructure::realtime::{Connection, Outbound};
use crate::startup::AppState;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max_message_size = state.settings.websocket.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let service = Arc::clone(&state.notifications);

    // Split socket for concurrent read/write
    let (mut sender, mut receiver) = socket.split();

    // Create channel for outgoing frames
    let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();
    let connection = Arc::new(Connection::new(tx));

    // Spawn task to forward frames from channel to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                Outbound::Text(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Outbound::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    service.on_open(&connection);

    let reader = Arc::clone(&connection);
    let reader_service = Arc::clone(&service);
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => reader_service.handle_text(&reader, text.as_str()),
                Ok(Message::Binary(bytes)) => {
                    reader_service.handle_text(&reader, &String::from_utf8_lossy(&bytes))
                }
                // Protocol-level pong counts as a heartbeat reply too
                Ok(Message::Pong(_)) => reader.mark_alive(),
                Ok(Message::Ping(_)) => reader.mark_alive(),
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    tracing::debug!(connection_id = %reader.id(), error = %e, "WebSocket read error");
                    break;
                }
            }
        }
    });

    // Whichever side finishes first tears down the other
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    service.on_close(&connection);
}
