//! Fingerprint Bridge CLI Library
//!
//! This library provides the core functionality for the `fingerprintctl` tool.
//!
//! # Public API
//!
//! The primary public API is the [`client::BridgeClient`] which provides
//! programmatic access to the bridge daemon, including its live push channel.
//! Configuration types are also available via [`config::CliConfig`] and
//! [`config::ConfigBuilder`].
//!
//! ```no_run
//! use fingerprintctl::client::BridgeClient;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = BridgeClient::with_config(
//!     "http://localhost:5000".to_string(),
//!     10,  // timeout in seconds
//!     3,   // max retries
//!     Duration::from_millis(500),  // initial retry delay
//! )?;
//!
//! client.connect("/dev/ttyACM0", Some(9600)).await?;
//! client.register().await?;
//!
//! let mut push = client.subscribe().await?;
//! while let Some(message) = push.next_message().await {
//!     println!("{:?}", message?);
//! }
//! # Ok(())
//! # }
//! ```

// Internal CLI implementation - not part of public API
#[doc(hidden)]
pub mod cli;

/// HTTP and push-channel client for the bridge daemon.
pub mod client;

/// Configuration types for the CLI tool.
pub mod config;

// Internal formatting functions - not part of public API
#[doc(hidden)]
pub mod format;

#[cfg(test)]
pub mod test_utils;
