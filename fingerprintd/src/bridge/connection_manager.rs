//! Serial connection manager
//!
//! Sole owner of the device link. Connect, disconnect and send are serialized
//! by one mutex around the session; the current status lives in a `watch`
//! channel so readers never wait on that mutex. Every state change is
//! published as a [`SerialEvent`] on a broadcast channel.
//!
//! While a session is open a reader task drains the device line by line. If
//! the device goes away on its own (unplug, reboot) the reader tears the
//! session down exactly like an explicit [`ConnectionManager::disconnect`].

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fingerprint_core::{
    BridgeError, Command, ConnectionStatus, LinkState, Result, SerialEvent, StaticConfig,
};
use fingerprint_hardware::{protocol, DeviceLink, PortOpener};
use tokio::io::{AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::sync::{broadcast, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Tunables for the serial link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    /// Upper bound on opening the device (`None` waits for the transport)
    pub open_timeout: Option<Duration>,
    /// Upper bound on writing and flushing one command
    pub write_timeout: Duration,
    /// Capacity of the event channel
    pub event_capacity: usize,
}

impl SerialSettings {
    pub fn from_config(config: &StaticConfig) -> Self {
        let open_timeout = match config.serial.open_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };

        Self {
            open_timeout,
            write_timeout: Duration::from_millis(config.serial.write_timeout_ms),
            event_capacity: config.broadcast.event_capacity,
        }
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self::from_config(&StaticConfig::default())
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    state: LinkState,
    status: ConnectionStatus,
    /// Sequence number of the last emitted event
    last_event: u64,
}

/// A [`SerialEvent`] numbered in emission order, starting at 1
#[derive(Debug, Clone, PartialEq)]
pub struct SequencedEvent {
    pub seq: u64,
    pub event: SerialEvent,
}

/// An open device link
struct Session {
    id: u64,
    port: String,
    writer: WriteHalf<DeviceLink>,
    shutdown: Option<oneshot::Sender<()>>,
    reader: JoinHandle<()>,
}

/// State shared between the manager and its reader task
struct Shared {
    session: Mutex<Option<Session>>,
    snapshot: watch::Sender<Snapshot>,
    events: broadcast::Sender<SequencedEvent>,
}

impl Shared {
    fn emit(&self, event: SerialEvent) {
        debug!("Event: {}", event.kind());
        // Numbered and sent under the snapshot lock, so sequence order is
        // channel order. No receivers is fine; events are advisory.
        self.snapshot.send_modify(|snap| {
            snap.last_event += 1;
            let _ = self.events.send(SequencedEvent {
                seq: snap.last_event,
                event,
            });
        });
    }

    fn set_state(&self, state: LinkState) {
        self.snapshot.send_modify(|snap| snap.state = state);
    }

    fn mark_connected(&self, port: &str, baud_rate: u32) {
        self.snapshot.send_modify(|snap| {
            snap.state = LinkState::Connected;
            snap.status = ConnectionStatus {
                connected: true,
                port: Some(port.to_string()),
                baud_rate,
            };
        });
    }

    /// Clear the port but keep the last baud rate
    fn mark_disconnected(&self) {
        self.snapshot.send_modify(|snap| {
            snap.state = LinkState::Disconnected;
            snap.status.connected = false;
            snap.status.port = None;
        });
    }

    /// Tear down session `id` after the device closed the link.
    ///
    /// Gives way to an explicit disconnect that already owns the teardown.
    async fn handle_device_closed(
        &self,
        id: u64,
        fault: Option<io::Error>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut guard = tokio::select! {
            biased;
            _ = &mut shutdown => return,
            guard = self.session.lock() => guard,
        };

        if guard.as_ref().map(|s| s.id) != Some(id) {
            debug!("Reader for stale session {} exiting", id);
            return;
        }
        let Some(session) = guard.take() else {
            return;
        };

        self.set_state(LinkState::Faulted);
        match fault {
            Some(e) => {
                error!("Serial port {} failed: {}", session.port, e);
                self.emit(SerialEvent::Error {
                    message: format!("Serial port error: {}", e),
                });
            }
            None => warn!("Device on {} closed the connection", session.port),
        }

        drop(session);
        self.mark_disconnected();
        self.emit(SerialEvent::Disconnected);
    }
}

/// Puts the link back to `Disconnected` if a connect or disconnect future is
/// dropped before it finishes
struct ResetOnDrop<'a> {
    shared: &'a Shared,
    /// Emit `Disconnected` too; set once a session has been torn down
    announce: bool,
    armed: bool,
}

impl<'a> ResetOnDrop<'a> {
    fn new(shared: &'a Shared, announce: bool) -> Self {
        Self {
            shared,
            announce,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Link operation cancelled; link reset to disconnected");
        self.shared.mark_disconnected();
        if self.announce {
            self.shared.emit(SerialEvent::Disconnected);
        }
    }
}

/// Owns the single serial connection to the fingerprint device
pub struct ConnectionManager {
    shared: Arc<Shared>,
    opener: Arc<dyn PortOpener>,
    settings: SerialSettings,
    next_session: AtomicU64,
}

impl ConnectionManager {
    pub fn new(opener: Arc<dyn PortOpener>, settings: SerialSettings) -> Self {
        let (snapshot, _) = watch::channel(Snapshot {
            state: LinkState::Disconnected,
            status: ConnectionStatus::default(),
            last_event: 0,
        });
        let (events, _) = broadcast::channel(settings.event_capacity.max(1));

        Self {
            shared: Arc::new(Shared {
                session: Mutex::new(None),
                snapshot,
                events,
            }),
            opener,
            settings,
            next_session: AtomicU64::new(0),
        }
    }

    /// Current connection snapshot; never waits on an in-flight operation
    pub fn status(&self) -> ConnectionStatus {
        self.shared.snapshot.borrow().status.clone()
    }

    /// Current state machine position
    pub fn link_state(&self) -> LinkState {
        self.shared.snapshot.borrow().state
    }

    /// Current status and the sequence number of the last event it reflects
    pub fn status_at_event(&self) -> (ConnectionStatus, u64) {
        let snap = self.shared.snapshot.borrow();
        (snap.status.clone(), snap.last_event)
    }

    /// Receive every event emitted from now on
    pub fn subscribe_events(&self) -> broadcast::Receiver<SequencedEvent> {
        self.shared.events.subscribe()
    }

    /// Open `port` at `baud_rate` and start the reader.
    ///
    /// Rejected with `AlreadyConnected` while a link is open or opening.
    pub async fn connect(&self, port: &str, baud_rate: u32) -> Result<ConnectionStatus> {
        if self.link_state().is_busy() {
            warn!("Connect to {} rejected: already connected", port);
            return Err(BridgeError::AlreadyConnected);
        }

        let mut guard = self.shared.session.lock().await;
        if guard.is_some() || self.link_state().is_busy() {
            warn!("Connect to {} rejected: already connected", port);
            return Err(BridgeError::AlreadyConnected);
        }

        self.shared.set_state(LinkState::Connecting);
        let reset = ResetOnDrop::new(&self.shared, false);
        info!("Connecting to {} at {} baud", port, baud_rate);

        let opened = match self.settings.open_timeout {
            Some(limit) => match timeout(limit, self.opener.open(port, baud_rate)).await {
                Ok(result) => result,
                Err(_) => Err(BridgeError::ConnectFailed(format!(
                    "timed out after {}ms opening {}",
                    limit.as_millis(),
                    port
                ))),
            },
            None => self.opener.open(port, baud_rate).await,
        };

        let link = match opened {
            Ok(link) => link,
            Err(e) => {
                let reason = match e {
                    BridgeError::ConnectFailed(reason) => reason,
                    other => other.to_string(),
                };
                error!("Error opening port {}: {}", port, reason);
                reset.disarm();
                self.shared.mark_disconnected();
                self.shared.emit(SerialEvent::Error {
                    message: format!("Error opening port: {}", reason),
                });
                return Err(BridgeError::ConnectFailed(reason));
            }
        };

        let id = self.next_session.fetch_add(1, Ordering::Relaxed) + 1;
        let (read_half, writer) = tokio::io::split(link);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        // Connected goes out before the reader can produce any data
        self.shared.mark_connected(port, baud_rate);
        reset.disarm();
        self.shared.emit(SerialEvent::Connected {
            port: port.to_string(),
            baud_rate,
        });

        let reader = tokio::spawn(read_loop(
            Arc::clone(&self.shared),
            id,
            read_half,
            shutdown_rx,
        ));

        *guard = Some(Session {
            id,
            port: port.to_string(),
            writer,
            shutdown: Some(shutdown_tx),
            reader,
        });

        info!("Connected to {} (session {})", port, id);
        Ok(self.status())
    }

    /// Close the link. Succeeds without doing anything when not connected.
    pub async fn disconnect(&self) -> Result<()> {
        let mut guard = self.shared.session.lock().await;
        let Some(mut session) = guard.take() else {
            debug!("Disconnect requested while not connected");
            return Ok(());
        };

        self.shared.set_state(LinkState::Disconnecting);
        let reset = ResetOnDrop::new(&self.shared, true);
        info!("Disconnecting from {}", session.port);

        if let Some(shutdown) = session.shutdown.take() {
            let _ = shutdown.send(());
        }

        if let Err(e) = session.writer.flush().await {
            warn!("Error closing port {}: {}", session.port, e);
            self.shared.emit(SerialEvent::Error {
                message: format!("Error closing port: {}", e),
            });
        }

        if let Err(e) = (&mut session.reader).await {
            warn!("Reader task for {} ended abnormally: {}", session.port, e);
        }

        // Both halves are gone once the session drops, closing the device
        drop(session);
        reset.disarm();
        self.shared.mark_disconnected();
        self.shared.emit(SerialEvent::Disconnected);
        Ok(())
    }

    /// Encode and write one command
    pub async fn send(&self, command: &Command) -> Result<()> {
        let mut guard = self.shared.session.lock().await;
        let Some(session) = guard.as_mut() else {
            return Err(BridgeError::NotConnected);
        };

        let token = command.token();
        let bytes = protocol::encode(command);
        debug!("TX {}: {:?}", session.port, token);

        let write = async {
            session.writer.write_all(&bytes).await?;
            session.writer.flush().await
        };

        let reason = match timeout(self.settings.write_timeout, write).await {
            Ok(Ok(())) => {
                self.shared.emit(SerialEvent::CommandSent { command: token });
                return Ok(());
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!(
                "timed out after {}ms",
                self.settings.write_timeout.as_millis()
            ),
        };

        error!("Error sending {:?}: {}", token, reason);
        self.shared.emit(SerialEvent::Error {
            message: format!("Error sending command: {}", reason),
        });
        Err(BridgeError::WriteFailed(reason))
    }
}

/// Drain device lines until EOF, a read fault, or an explicit disconnect
async fn read_loop(
    shared: Arc<Shared>,
    id: u64,
    read_half: ReadHalf<DeviceLink>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut reader = BufReader::new(read_half);
    let mut buf = Vec::with_capacity(256);

    let fault = loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("Reader for session {} stopped", id);
                return;
            }
            result = protocol::read_line(&mut reader, &mut buf) => match result {
                Ok(0) => break None,
                Ok(_) => {
                    if let Some(event) = protocol::decode_bytes(&buf) {
                        if let SerialEvent::DataReceived(msg) = &event {
                            debug!("RX: {}", msg.message);
                        }
                        shared.emit(event);
                    }
                }
                Err(e) if is_transient(&e) => continue,
                Err(e) => break Some(e),
            }
        }
    };

    shared.handle_device_closed(id, fault, shutdown).await;
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
