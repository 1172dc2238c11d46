//! Configuration types for the fingerprint bridge
//!
//! [`StaticConfig`] holds server, serial, and broadcast settings. It is loaded
//! once at startup from a TOML file; every field has a default so partial
//! files are accepted.

mod paths;
mod static_config;

pub use paths::{default_cli_config_path, default_config_path, APP_DIR};
pub use static_config::{BroadcastConfig, SerialConfig, ServerConfig, StaticConfig};
