//! Application Services
//!
//! ## Available Services
//!
//! - **NotificationService**: connection lifecycle, message dispatch,
//!   preference-gated broadcast and heartbeat eviction
//! - **TokenService**: JWT issuance and verification

pub mod notification_service;
pub mod token_service;

pub use notification_service::{HeartbeatReport, NotificationService};
pub use token_service::{Claims, Role, TokenService};
