//! Serial driver for low-level device communication
//!
//! Opens the serial device and hands it out as a plain async byte stream. The
//! connection manager only ever sees [`DeviceIo`], which lets tests substitute
//! an in-memory pipe for real hardware.

use async_trait::async_trait;
use fingerprint_core::{BridgeError, Result};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, error};

/// Bidirectional byte stream to the device
pub trait DeviceIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> DeviceIo for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Opened device link
pub type DeviceLink = Box<dyn DeviceIo>;

/// Trait for serial transport abstraction
///
/// This trait enables testing of the connection manager without real
/// hardware by allowing mock implementations.
#[async_trait]
pub trait PortOpener: Send + Sync {
    /// Open the device at `port` with the given baud rate
    async fn open(&self, port: &str, baud_rate: u32) -> Result<DeviceLink>;
}

/// Opens real serial devices through `tokio-serial`
#[derive(Debug, Clone)]
pub struct SerialPortOpener {
    read_timeout: Duration,
}

impl SerialPortOpener {
    pub fn new() -> Self {
        Self {
            read_timeout: Duration::from_millis(100),
        }
    }
}

impl Default for SerialPortOpener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PortOpener for SerialPortOpener {
    async fn open(&self, port: &str, baud_rate: u32) -> Result<DeviceLink> {
        debug!("Opening serial port: {} @ {} baud", port, baud_rate);

        let stream = tokio_serial::new(port, baud_rate)
            .timeout(self.read_timeout)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| {
                error!("Failed to open serial port {}: {}", port, e);
                BridgeError::ConnectFailed(format!("{}: {}", port, e))
            })?;

        debug!("Serial port opened successfully");
        Ok(Box::new(stream))
    }
}
