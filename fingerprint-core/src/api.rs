//! API models for the bridge REST API and push channel
//!
//! This module contains request and response models for the HTTP surface, and
//! the JSON messages pushed to WebSocket subscribers.

use crate::types::{ConnectionStatus, LinkState, SerialEvent};
use serde::{Deserialize, Serialize};

/// Generic API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ApiResponse<T> {
    #[serde(rename = "success")]
    Success { data: T },
    #[serde(rename = "error")]
    Error { error: String },
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn success(data: T) -> Self {
        Self::Success { data }
    }

    /// Create an error response
    pub fn error(error: String) -> Self {
        Self::Error { error }
    }
}

/// Server information response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    /// Server version
    pub version: String,
    /// Server uptime in seconds
    pub uptime: u64,
    /// Current serial connection snapshot
    pub connection: ConnectionStatus,
    /// Connection manager state: "disconnected", "connecting", "connected", ...
    pub link_state: LinkState,
    /// Number of live push-channel subscribers
    pub subscribers: usize,
}

/// Serial port listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortsResponse {
    /// Device paths visible to the host
    pub ports: Vec<String>,
}

/// Kind of serial port reported by discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortKind {
    Usb,
    Pci,
    Bluetooth,
    Unknown,
}

/// Detailed description of one serial port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDetails {
    /// Platform device path
    pub port: String,
    /// Port type
    pub kind: PortKind,
    /// USB vendor ID (USB ports only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vid: Option<u16>,
    /// USB product ID (USB ports only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

/// Detailed serial port listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortDetailsResponse {
    pub ports: Vec<PortDetails>,
}

/// Connect request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectRequest {
    /// Device path to open
    #[serde(default)]
    pub port: Option<String>,
    /// Baud rate (defaults to 9600)
    #[serde(default)]
    pub baud_rate: Option<u32>,
}

/// Raw command request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Text written to the device as one line
    #[serde(default)]
    pub command: Option<String>,
}

/// Plain acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    pub message: String,
}

impl AckResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Connect response: acknowledgement plus the new status fields, side by side
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub message: String,
    #[serde(flatten)]
    pub status: ConnectionStatus,
}

/// Message pushed to every push-channel subscriber
///
/// Serialized as a JSON object tagged by `type`, matching what the dashboard
/// consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PushMessage {
    /// Line received from the device
    #[serde(rename = "serial-data")]
    SerialData { timestamp: String, message: String },

    /// Device link opened
    #[serde(rename = "serial-connected", rename_all = "camelCase")]
    SerialConnected { port: String, baud_rate: u32 },

    /// Device link closed
    #[serde(rename = "serial-disconnected")]
    SerialDisconnected,

    /// Advisory error
    #[serde(rename = "serial-error")]
    SerialError { message: String },

    /// Command written to the device
    #[serde(rename = "command-sent")]
    CommandSent { command: String },

    /// Status snapshot sent when a subscriber joins
    #[serde(rename = "serial-status", rename_all = "camelCase")]
    SerialStatus {
        connected: bool,
        port: Option<String>,
        baud_rate: u32,
    },
}

impl PushMessage {
    /// Serialize to the JSON text sent over the socket
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<SerialEvent> for PushMessage {
    fn from(event: SerialEvent) -> Self {
        match event {
            SerialEvent::DataReceived(msg) => PushMessage::SerialData {
                timestamp: msg.timestamp,
                message: msg.message,
            },
            SerialEvent::Connected { port, baud_rate } => {
                PushMessage::SerialConnected { port, baud_rate }
            }
            SerialEvent::Disconnected => PushMessage::SerialDisconnected,
            SerialEvent::Error { message } => PushMessage::SerialError { message },
            SerialEvent::CommandSent { command } => PushMessage::CommandSent { command },
        }
    }
}

impl From<ConnectionStatus> for PushMessage {
    fn from(status: ConnectionStatus) -> Self {
        PushMessage::SerialStatus {
            connected: status.connected,
            port: status.port,
            baud_rate: status.baud_rate,
        }
    }
}
