//! Configuration loading for the daemon
//!
//! Reads the static TOML configuration, creating it with defaults on first
//! run.

use fingerprint_core::{BridgeError, Result, StaticConfig};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "FINGERPRINTD_CONFIG";

/// Resolve the config path: CLI flag > env var > default
pub fn resolve_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| {
        std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| fingerprint_core::default_config_path())
    })
}

/// Load the static config from `path`, writing defaults if it is missing.
pub async fn load_static_config(path: &Path) -> Result<StaticConfig> {
    if !path.exists() {
        info!(
            "Static config not found at {}. Creating with defaults.",
            path.display()
        );

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                BridgeError::Config(format!(
                    "Failed to create config directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let config = StaticConfig::default();
        let toml_str = config
            .to_toml()
            .map_err(|e| BridgeError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, &toml_str)
            .await
            .map_err(|e| BridgeError::Config(format!("Failed to write config file: {}", e)))?;

        return Ok(config);
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| BridgeError::Config(format!("Failed to read config file: {}", e)))?;

    let config = StaticConfig::from_toml(&content)
        .map_err(|e| BridgeError::Config(format!("Failed to parse config file: {}", e)))?;
    config.validate()?;

    debug!("--- Server Config ---");
    debug!("  Bind: {}:{}", config.server.bind, config.server.port);
    debug!("--- Serial Config ---");
    debug!("  Default baud rate: {}", config.serial.default_baud_rate);
    debug!("  Open timeout: {}ms", config.serial.open_timeout_ms);
    debug!("  Write timeout: {}ms", config.serial.write_timeout_ms);

    Ok(config)
}
