//! Error types for the fingerprint bridge

use thiserror::Error;

/// Core error type for bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A connection is already open (or being opened)
    #[error("Already connected to a port")]
    AlreadyConnected,

    /// Opening the serial device failed
    #[error("Failed to connect: {0}")]
    ConnectFailed(String),

    /// Operation requires an open connection
    #[error("Not connected to any port")]
    NotConnected,

    /// Writing a command to the device failed
    #[error("Failed to send command: {0}")]
    WriteFailed(String),

    /// Invalid input or arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Serial port enumeration failed
    #[error("Port discovery failed: {0}")]
    DiscoveryFailed(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}
