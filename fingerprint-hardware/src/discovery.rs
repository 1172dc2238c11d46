//! Serial port discovery
//!
//! Every call queries the host again, so a device plugged in after the
//! dashboard loaded still shows up.

use fingerprint_core::api::{PortDetails, PortKind};
use fingerprint_core::{BridgeError, Result};
use tracing::{debug, warn};

/// Enumerate serial device paths, surfacing enumeration failures
pub fn try_list_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| BridgeError::DiscoveryFailed(e.to_string()))?;

    let names: Vec<String> = ports.into_iter().map(|p| p.port_name).collect();
    debug!("Discovered {} serial port(s)", names.len());
    Ok(names)
}

/// Enumerate serial device paths.
///
/// Enumeration failures are logged and reported as an empty list.
pub fn list_ports() -> Vec<String> {
    try_list_ports().unwrap_or_else(|e| {
        warn!("Error listing ports: {}", e);
        Vec::new()
    })
}

/// Enumerate serial ports with their USB identification, when available
pub fn list_port_details() -> Vec<PortDetails> {
    match tokio_serial::available_ports() {
        Ok(ports) => ports.into_iter().map(to_details).collect(),
        Err(e) => {
            warn!("Error listing ports: {}", e);
            Vec::new()
        }
    }
}

fn to_details(info: tokio_serial::SerialPortInfo) -> PortDetails {
    let mut details = PortDetails {
        port: info.port_name,
        kind: PortKind::Unknown,
        vid: None,
        pid: None,
        manufacturer: None,
        product: None,
        serial_number: None,
    };

    match info.port_type {
        tokio_serial::SerialPortType::UsbPort(usb) => {
            debug!(
                "  USB Device {} - VID:{:04X} PID:{:04X}",
                details.port, usb.vid, usb.pid
            );
            details.kind = PortKind::Usb;
            details.vid = Some(usb.vid);
            details.pid = Some(usb.pid);
            details.manufacturer = usb.manufacturer;
            details.product = usb.product;
            details.serial_number = usb.serial_number;
        }
        tokio_serial::SerialPortType::PciPort => details.kind = PortKind::Pci,
        tokio_serial::SerialPortType::BluetoothPort => details.kind = PortKind::Bluetooth,
        tokio_serial::SerialPortType::Unknown => {}
    }

    details
}
