//! Fingerprint Bridge Core Library
//!
//! Shared types, wire models, and configuration for the fingerprint attendance
//! bridge. This crate is used by both the daemon and CLI components.

pub mod api;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{default_cli_config_path, default_config_path, StaticConfig};
pub use error::*;
pub use types::*;
