//! Static configuration loaded once at startup
//!
//! This configuration is read-only after the daemon starts.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::types::DEFAULT_BAUD_RATE;

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub bind: String,
    /// Server port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Serial link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Baud rate used when a connect request does not name one
    pub default_baud_rate: u32,
    /// Upper bound on opening the device, in milliseconds (0 = no limit)
    pub open_timeout_ms: u64,
    /// Upper bound on writing one command, in milliseconds
    pub write_timeout_ms: u64,
    /// Device to connect to at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_connect: Option<String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_baud_rate: DEFAULT_BAUD_RATE,
            open_timeout_ms: 5000,
            write_timeout_ms: 1000,
            auto_connect: None,
        }
    }
}

/// Push-channel fan-out configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Capacity of the connection manager's event channel
    pub event_capacity: usize,
    /// Outbound queue length per subscriber
    pub subscriber_queue: usize,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1024,
            subscriber_queue: 256,
        }
    }
}

/// Static configuration for the bridge daemon.
///
/// Located at `~/.config/fingerprintd/config.toml` by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    pub server: ServerConfig,
    pub serial: SerialConfig,
    pub broadcast: BroadcastConfig,
}

impl StaticConfig {
    /// Parse StaticConfig from TOML string.
    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Serialize StaticConfig to TOML string.
    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Reject values the daemon cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(BridgeError::Config(
                "server.port must be greater than 0".to_string(),
            ));
        }
        if self.serial.default_baud_rate == 0 {
            return Err(BridgeError::Config(
                "serial.default_baud_rate must be greater than 0".to_string(),
            ));
        }
        if self.serial.write_timeout_ms == 0 {
            return Err(BridgeError::Config(
                "serial.write_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.broadcast.event_capacity == 0 || self.broadcast.subscriber_queue == 0 {
            return Err(BridgeError::Config(
                "broadcast capacities must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
