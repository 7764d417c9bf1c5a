//! Application Layer
//!
//! The notification service that owns the connection registry, the token
//! service, and the DTOs exchanged with clients.

pub mod dto;
pub mod services;
