//! Notification WebSocket
//!
//! Socket plumbing only; protocol handling lives in
//! [`crate::application::services::NotificationService`].

pub mod handler;

pub use handler::ws_handler;
