//! # Configuration Module
//!
//! This module handles application configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__ for the server, NOTIFY__ for the client)
//! - Configuration files (config/default.toml, config/{environment}.toml, config/client.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use blog_notifier::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Server will listen on {}:{}", settings.server.host, settings.server.port);
//! ```

mod client;
mod settings;

pub use client::*;
pub use settings::*;
