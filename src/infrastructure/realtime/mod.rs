//! Realtime connection state.
//!
//! Process-local: nothing here is persisted or shared between instances.

pub mod connection;
pub mod registry;

pub use connection::{Connection, ConnectionState, Outbound, SendError};
pub use registry::ConnectionRegistry;
