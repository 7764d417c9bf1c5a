//! Presentation Layer
//!
//! HTTP routes and the notification WebSocket handler.

pub mod http;
pub mod middleware;
pub mod websocket;
