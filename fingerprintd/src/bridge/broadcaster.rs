//! Event broadcaster
//!
//! Fans connection manager events out to every push-channel subscriber. Each
//! subscriber owns a bounded queue; delivery uses `try_send`, so a slow
//! subscriber loses messages instead of stalling the others or the device
//! reader.
//!
//! A new subscriber starts from a status snapshot. Events the snapshot already
//! reflects are skipped for it, even when they are still queued for the pump,
//! so joining never replays history.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fingerprint_core::api::PushMessage;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ConnectionManager, SequencedEvent};

pub type SubscriberId = u64;

/// A registered subscriber's end of the fan-out
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::Receiver<PushMessage>,
}

struct Subscriber {
    tx: mpsc::Sender<PushMessage>,
    /// Last event folded into this subscriber's snapshot
    since: u64,
}

pub struct Broadcaster {
    manager: Arc<ConnectionManager>,
    subscribers: Mutex<HashMap<SubscriberId, Subscriber>>,
    next_id: AtomicU64,
    queue_len: usize,
}

impl Broadcaster {
    pub fn new(manager: Arc<ConnectionManager>, queue_len: usize) -> Self {
        Self {
            manager,
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            queue_len: queue_len.max(1),
        }
    }

    /// Register a subscriber. Its first message is a status snapshot.
    pub async fn subscribe(&self) -> Subscription {
        let (tx, receiver) = mpsc::channel(self.queue_len);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        // Held across the snapshot so no event can slip in ahead of it
        let mut subscribers = self.subscribers.lock().await;
        let (status, since) = self.manager.status_at_event();
        // Fresh queue with room for at least one message
        let _ = tx.try_send(PushMessage::from(status));
        subscribers.insert(id, Subscriber { tx, since });

        info!("Subscriber {} joined ({} total)", id, subscribers.len());
        Subscription { id, receiver }
    }

    pub async fn unsubscribe(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.lock().await;
        if subscribers.remove(&id).is_some() {
            info!("Subscriber {} left ({} remaining)", id, subscribers.len());
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Push one event to every subscriber whose snapshot predates it
    pub async fn dispatch(&self, event: SequencedEvent) {
        let SequencedEvent { seq, event } = event;
        let message = PushMessage::from(event);
        let mut subscribers = self.subscribers.lock().await;

        subscribers.retain(|id, sub| {
            if sub.since >= seq {
                return true;
            }
            match sub.tx.try_send(message.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    warn!("Subscriber {} is not keeping up; message dropped", id);
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Subscriber {} is gone", id);
                    false
                }
            }
        });
    }

    /// Forward events until the source closes
    pub async fn run(&self, mut events: broadcast::Receiver<SequencedEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.dispatch(event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Broadcaster fell behind; {} event(s) skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Event source closed; broadcaster stopping");
    }

    /// Start the pump task. Events emitted after this returns are delivered.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let events = self.manager.subscribe_events();
        let broadcaster = Arc::clone(self);
        tokio::spawn(async move { broadcaster.run(events).await })
    }
}
