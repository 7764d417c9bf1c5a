//! # Blog Notifier Library
//!
//! This crate provides the "new blog post" notification subsystem of the
//! portfolio site:
//! - WebSocket fan-out server with per-connection preference filtering
//! - Heartbeat-based dead peer eviction
//! - Admin HTTP hooks that trigger broadcasts, plus an operational stats endpoint
//! - A client library with persisted preferences, reconnect/backoff and a
//!   polling fallback
//!
//! ## Architecture
//!
//! - **Domain Layer**: blog summaries, notification preferences, quiet hours
//! - **Application Layer**: wire protocol DTOs and the notification service
//! - **Infrastructure Layer**: in-memory connection registry and metrics
//! - **Presentation Layer**: HTTP handlers, middleware and the WebSocket endpoint
//! - **Client**: subscriber side of the protocol
//!
//! ## Module Structure
//!
//! ```text
//! blog_notifier/
//! +-- config/         Configuration management
//! +-- domain/         Blog summaries and preference filtering
//! +-- application/    Protocol DTOs and services
//! +-- infrastructure/ Connection registry and Prometheus metrics
//! +-- presentation/   HTTP routes, middleware and WebSocket handler
//! +-- client/         Notification client (storage, channel, polling)
//! +-- shared/         Common utilities (errors, clock)
//! ```

// Configuration module
pub mod config;

// Domain layer - Core business logic
pub mod domain;

// Application layer - Business services
pub mod application;

// Infrastructure layer - In-memory state and metrics
pub mod infrastructure;

// Presentation layer - HTTP and WebSocket handlers
pub mod presentation;

// Subscriber side of the notification protocol
pub mod client;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
