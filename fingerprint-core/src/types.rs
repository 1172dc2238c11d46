//! Core types and data structures for the fingerprint bridge

use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Baud rate used when a connect request does not specify one
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Snapshot of the serial connection, as reported to clients
///
/// `port` is `Some` exactly when `connected` is true. `baud_rate` keeps the
/// last used rate after a disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    /// Whether a device link is currently open
    pub connected: bool,
    /// Platform device path of the open link
    pub port: Option<String>,
    /// Baud rate of the current (or last) link
    pub baud_rate: u32,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            connected: false,
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Connection manager state machine
///
/// `Disconnected → Connecting → Connected → (Disconnecting | Faulted) → Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// No device link
    Disconnected,
    /// Device open in progress
    Connecting,
    /// Device link is open and the reader is running
    Connected,
    /// Explicit disconnect in progress
    Disconnecting,
    /// The device closed the link on its own (unplug, reboot)
    Faulted,
}

impl LinkState {
    /// Get a string representation for API responses
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Disconnecting => "disconnecting",
            LinkState::Faulted => "faulted",
        }
    }

    /// States in which a new connect attempt must be rejected
    pub fn is_busy(&self) -> bool {
        matches!(self, LinkState::Connecting | LinkState::Connected)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One non-empty line received from the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialMessage {
    /// Capture time, local date-time with second precision
    pub timestamp: String,
    /// Trimmed line text, opaque to the bridge
    pub message: String,
}

/// Events produced by the connection manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialEvent {
    /// A line arrived from the device
    DataReceived(SerialMessage),
    /// A device link was opened
    Connected { port: String, baud_rate: u32 },
    /// The device link was closed (explicitly or by the device)
    Disconnected,
    /// Advisory fault report; never closes the push channel
    Error { message: String },
    /// A command was written to the device
    CommandSent { command: String },
}

impl SerialEvent {
    /// Short name used in log lines
    pub fn kind(&self) -> &'static str {
        match self {
            SerialEvent::DataReceived(_) => "data",
            SerialEvent::Connected { .. } => "connected",
            SerialEvent::Disconnected => "disconnected",
            SerialEvent::Error { .. } => "error",
            SerialEvent::CommandSent { .. } => "command-sent",
        }
    }
}

/// Fingerprint template handle assigned by the device firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintId(u32);

impl FingerprintId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FingerprintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FingerprintId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl FromStr for FingerprintId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BridgeError::InvalidArgument(format!(
                "Invalid ID '{}': must be a non-negative integer",
                s
            )));
        }

        trimmed.parse::<u32>().map(Self).map_err(|_| {
            BridgeError::InvalidArgument(format!("Invalid ID '{}': out of range", s))
        })
    }
}

impl TryFrom<i64> for FingerprintId {
    type Error = BridgeError;

    fn try_from(id: i64) -> Result<Self> {
        u32::try_from(id).map(Self).map_err(|_| {
            BridgeError::InvalidArgument(format!(
                "Invalid ID {}: must be between 0 and {}",
                id,
                u32::MAX
            ))
        })
    }
}

/// Command understood by the device firmware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Begin fingerprint enrollment
    Register,
    /// Begin fingerprint verification
    Verify,
    /// Delete one fingerprint template
    DeleteOne(FingerprintId),
    /// Delete all fingerprint templates
    DeleteAll,
    /// Stop the current mode
    Stop,
    /// Arbitrary passthrough text
    Raw(String),
}

impl Command {
    /// Build a raw passthrough command.
    ///
    /// The text must contain something besides whitespace and may not carry
    /// its own line breaks, since the firmware treats every line as a command.
    pub fn raw(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(BridgeError::InvalidArgument(
                "Command is required".to_string(),
            ));
        }
        if text.contains(|c: char| c == '\r' || c == '\n') {
            return Err(BridgeError::InvalidArgument(
                "Command must be a single line".to_string(),
            ));
        }
        Ok(Command::Raw(text))
    }

    /// Wire token, without the line terminator
    pub fn token(&self) -> String {
        match self {
            Command::Register => "R".to_string(),
            Command::Verify => "V".to_string(),
            Command::DeleteOne(id) => format!("D {}", id),
            Command::DeleteAll => "X".to_string(),
            Command::Stop => "S".to_string(),
            Command::Raw(text) => text.clone(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status() {
        let status = ConnectionStatus::default();
        assert!(!status.connected);
        assert!(status.port.is_none());
        assert_eq!(status.baud_rate, DEFAULT_BAUD_RATE);
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = ConnectionStatus {
            connected: true,
            port: Some("COM3".to_string()),
            baud_rate: 9600,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["connected"], true);
        assert_eq!(json["port"], "COM3");
        assert_eq!(json["baudRate"], 9600);
    }

    #[test]
    fn test_disconnected_status_has_null_port() {
        let json = serde_json::to_string(&ConnectionStatus::default()).unwrap();
        assert!(json.contains("\"port\":null"));
    }

    #[test]
    fn test_link_state_as_str() {
        assert_eq!(LinkState::Disconnected.as_str(), "disconnected");
        assert_eq!(LinkState::Connecting.as_str(), "connecting");
        assert_eq!(LinkState::Connected.as_str(), "connected");
        assert_eq!(LinkState::Disconnecting.as_str(), "disconnecting");
        assert_eq!(LinkState::Faulted.as_str(), "faulted");
    }

    #[test]
    fn test_link_state_busy() {
        assert!(LinkState::Connecting.is_busy());
        assert!(LinkState::Connected.is_busy());
        assert!(!LinkState::Disconnected.is_busy());
        assert!(!LinkState::Disconnecting.is_busy());
        assert!(!LinkState::Faulted.is_busy());
    }

    #[test]
    fn test_fixed_command_tokens() {
        assert_eq!(Command::Register.token(), "R");
        assert_eq!(Command::Verify.token(), "V");
        assert_eq!(Command::DeleteOne(FingerprintId::new(14)).token(), "D 14");
        assert_eq!(Command::DeleteAll.token(), "X");
        assert_eq!(Command::Stop.token(), "S");
    }

    #[test]
    fn test_raw_command_passthrough() {
        let cmd = Command::raw("ENROLL 3").unwrap();
        assert_eq!(cmd.token(), "ENROLL 3");
    }

    #[test]
    fn test_raw_command_rejects_blank() {
        assert!(matches!(
            Command::raw(""),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(matches!(
            Command::raw("   "),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_raw_command_rejects_line_breaks() {
        assert!(matches!(
            Command::raw("R\r\nX"),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(matches!(
            Command::raw("V\n"),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_fingerprint_id_parse() {
        assert_eq!("14".parse::<FingerprintId>().unwrap().value(), 14);
        assert_eq!("0".parse::<FingerprintId>().unwrap().value(), 0);
        assert_eq!(" 7 ".parse::<FingerprintId>().unwrap().value(), 7);
    }

    #[test]
    fn test_fingerprint_id_parse_rejects_malformed() {
        for input in ["abc", "-1", "", "1.5", "+3", "14abc", "99999999999"] {
            assert!(
                matches!(
                    input.parse::<FingerprintId>(),
                    Err(BridgeError::InvalidArgument(_))
                ),
                "expected {:?} to be rejected",
                input
            );
        }
    }

    #[test]
    fn test_fingerprint_id_try_from_i64() {
        assert_eq!(FingerprintId::try_from(14i64).unwrap().value(), 14);
        assert!(matches!(
            FingerprintId::try_from(-1i64),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(FingerprintId::try_from(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_event_kind() {
        assert_eq!(SerialEvent::Disconnected.kind(), "disconnected");
        assert_eq!(
            SerialEvent::CommandSent {
                command: "R".to_string()
            }
            .kind(),
            "command-sent"
        );
    }
}
