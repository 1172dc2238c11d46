//! In-memory device links for bridge tests

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use fingerprint_core::{BridgeError, Result, SerialEvent};
use fingerprint_hardware::{DeviceLink, PortOpener};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::sync::{broadcast, mpsc};

use super::connection_manager::{SequencedEvent, SerialSettings};

/// Device end of a link handed out by [`MockOpener`]
pub(crate) struct MockDevice {
    pub port: String,
    pub baud_rate: u32,
    pub stream: DuplexStream,
}

/// How a [`FaultyLink`] misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    /// Every write fails
    Write,
    /// The first read fails with a non-transient error
    Read,
    /// Flushing fails
    Flush,
    /// Flushing never completes
    StalledFlush,
}

const DEFAULT_CAPACITY: usize = 1024;

enum Behavior {
    Duplex(usize),
    Fail(String),
    /// Hang every open, or only the first one
    Hang { once: bool },
    /// Hand out a faulty link on every open, or only the first one
    Faulty { fault: Fault, once: bool },
}

/// Opens duplex pipes instead of serial ports
pub(crate) struct MockOpener {
    behavior: Behavior,
    devices: Option<mpsc::UnboundedSender<MockDevice>>,
    opens: AtomicUsize,
}

impl MockOpener {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockDevice>) {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Arc<Self>, mpsc::UnboundedReceiver<MockDevice>) {
        Self::with_devices(Behavior::Duplex(capacity))
    }

    pub fn failing(reason: &str) -> Arc<Self> {
        Self::without_devices(Behavior::Fail(reason.to_string()))
    }

    pub fn hanging() -> Arc<Self> {
        Self::without_devices(Behavior::Hang { once: false })
    }

    /// First open never completes; later opens succeed
    pub fn hanging_once() -> (Arc<Self>, mpsc::UnboundedReceiver<MockDevice>) {
        Self::with_devices(Behavior::Hang { once: true })
    }

    /// Every open yields a link that misbehaves per `fault`
    pub fn faulty(fault: Fault) -> Arc<Self> {
        Self::without_devices(Behavior::Faulty { fault, once: false })
    }

    /// First open yields a faulty link; later opens get healthy duplex pipes
    pub fn faulty_once(fault: Fault) -> (Arc<Self>, mpsc::UnboundedReceiver<MockDevice>) {
        Self::with_devices(Behavior::Faulty { fault, once: true })
    }

    fn with_devices(behavior: Behavior) -> (Arc<Self>, mpsc::UnboundedReceiver<MockDevice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let opener = Self {
            behavior,
            devices: Some(tx),
            opens: AtomicUsize::new(0),
        };
        (Arc::new(opener), rx)
    }

    fn without_devices(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            devices: None,
            opens: AtomicUsize::new(0),
        })
    }

    /// Number of open attempts seen
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn duplex(&self, port: &str, baud_rate: u32, capacity: usize) -> DeviceLink {
        let (host, device) = tokio::io::duplex(capacity);
        if let Some(devices) = &self.devices {
            let _ = devices.send(MockDevice {
                port: port.to_string(),
                baud_rate,
                stream: device,
            });
        }
        Box::new(host)
    }
}

#[async_trait]
impl PortOpener for MockOpener {
    async fn open(&self, port: &str, baud_rate: u32) -> Result<DeviceLink> {
        let first = self.opens.fetch_add(1, Ordering::SeqCst) == 0;

        match &self.behavior {
            Behavior::Duplex(capacity) => Ok(self.duplex(port, baud_rate, *capacity)),
            Behavior::Fail(reason) => Err(BridgeError::ConnectFailed(reason.clone())),
            Behavior::Hang { once } if first || !*once => std::future::pending().await,
            Behavior::Faulty { fault, once } if first || !*once => {
                Ok(Box::new(FaultyLink(*fault)))
            }
            Behavior::Hang { .. } | Behavior::Faulty { .. } => {
                Ok(self.duplex(port, baud_rate, DEFAULT_CAPACITY))
            }
        }
    }
}

/// A link with no device behind it that fails in one scripted way
struct FaultyLink(Fault);

impl AsyncRead for FaultyLink {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.0 {
            Fault::Read => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::Other,
                "device reported an I/O error",
            ))),
            _ => Poll::Pending,
        }
    }
}

impl AsyncWrite for FaultyLink {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.0 {
            Fault::Write => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device unplugged",
            ))),
            _ => Poll::Ready(Ok(buf.len())),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.0 {
            Fault::Flush => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device unplugged",
            ))),
            Fault::StalledFlush => Poll::Pending,
            _ => Poll::Ready(Ok(())),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// Settings with short timeouts for tests
pub(crate) fn test_settings() -> SerialSettings {
    SerialSettings {
        open_timeout: Some(Duration::from_secs(2)),
        write_timeout: Duration::from_secs(2),
        event_capacity: 64,
    }
}

/// Next event, failing the test if none arrives promptly
pub(crate) async fn next_event(events: &mut broadcast::Receiver<SequencedEvent>) -> SerialEvent {
    tokio::time::timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
        .event
}
