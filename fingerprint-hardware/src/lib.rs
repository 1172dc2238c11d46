//! fingerprint-hardware
//!
//! Hardware-facing crate for the fingerprint attendance device: the line
//! protocol codec, the serial transport, and host port discovery. The daemon
//! builds its connection manager on top of these pieces.
//
//! Public API:
//! - `protocol::{encode, decode}`: command encoding and device line decoding
//! - `serial_driver::PortOpener`: seam for opening a device link
//! - `serial_driver::SerialPortOpener`: real serial devices via `tokio-serial`
//! - `discovery::list_ports`: host-visible serial device paths

pub mod discovery;
pub mod protocol;
pub mod serial_driver;

pub use discovery::{list_port_details, list_ports, try_list_ports};
pub use protocol::{decode, decode_bytes, encode, LINE_TERMINATOR, MAX_LINE_LEN};
pub use serial_driver::{DeviceIo, DeviceLink, PortOpener, SerialPortOpener};
