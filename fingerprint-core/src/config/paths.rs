//! Default path resolution for configuration files
//!
//! Uses XDG Base Directory specification when available, with sensible fallbacks.

use std::path::PathBuf;

/// Directory name shared by the daemon and the CLI
pub const APP_DIR: &str = "fingerprintd";

/// Returns the default path for the static configuration file.
///
/// Uses XDG config directory if available:
/// - Linux/macOS: `~/.config/fingerprintd/config.toml`
/// - Fallback: `/etc/fingerprintd/config.toml`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join(APP_DIR)
        .join("config.toml")
}

/// Returns the default path for the CLI configuration file.
pub fn default_cli_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("/etc"))
        .join(APP_DIR)
        .join("cli.toml")
}
