//! Data Transfer Objects
//!
//! WebSocket protocol envelopes and HTTP response bodies.

pub mod messages;
pub mod response;

pub use messages::{ClientMessage, ProtocolError, ServerMessage};
pub use response::{BroadcastResponse, ConnectionStats, DirectDeliveryResponse, StatsResponse};
