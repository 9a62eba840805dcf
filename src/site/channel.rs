//! Realtime fan-out of site-state changes.
//!
//! - Single writer, many readers
//! - Every subscription starts with a `state` snapshot
//! - Delivery is best-effort: a failed send to one subscriber is logged
//!   and skipped, never raised, and never removes the subscriber
//! - A subscription unregisters itself when dropped

use super::state::{Broadcast, LockdownState};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

/// Message pushed to realtime subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SiteEvent {
    /// Full snapshot, sent once when a subscription opens.
    State {
        lockdown: LockdownState,
        broadcast: Option<Broadcast>,
    },
    /// A broadcast was published (or cleared, when `None`).
    Broadcast { broadcast: Option<Broadcast> },
    /// Site lockdown changed.
    Lockdown {
        enabled: bool,
        #[serde(rename = "updatedAt")]
        updated_at: u64,
    },
}

impl SiteEvent {
    /// JSON text frame for the wire.
    pub fn to_json(&self) -> String {
        // Serializing plain structs of strings/ints/bools cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

type SubscriberId = u64;

struct Registry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriberId, mpsc::UnboundedSender<SiteEvent>>>,
}

impl Registry {
    fn remove(&self, id: SubscriberId) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers.remove(&id);
    }
}

/// Registry of open subscriptions plus `publish`.
#[derive(Clone)]
pub struct BroadcastChannel {
    registry: Arc<Registry>,
}

impl BroadcastChannel {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Open a subscription whose first item is `snapshot`.
    pub fn subscribe(&self, snapshot: SiteEvent) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);

        // The receiver is alive, so queueing the snapshot cannot fail
        let _ = sender.send(snapshot);

        let mut subscribers = self
            .registry
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        subscribers.insert(id, sender);
        debug!(subscriber = id, total = subscribers.len(), "realtime subscriber added");

        Subscription {
            id,
            receiver,
            registry: Arc::clone(&self.registry),
        }
    }

    /// Push `event` to every open subscription. Returns how many accepted it.
    pub fn publish(&self, event: &SiteEvent) -> usize {
        // Snapshot the senders so the registry lock is not held while sending
        let senders: Vec<(SubscriberId, mpsc::UnboundedSender<SiteEvent>)> = {
            let subscribers = self
                .registry
                .subscribers
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            subscribers
                .iter()
                .map(|(id, sender)| (*id, sender.clone()))
                .collect()
        };

        let mut delivered = 0;
        for (id, sender) in senders {
            match sender.send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => debug!(subscriber = id, "realtime send failed, skipping"),
            }
        }
        delivered
    }

    /// Number of open subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// One realtime subscriber's event stream.
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<SiteEvent>,
    registry: Arc<Registry>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next event, or `None` once the channel is gone.
    pub async fn recv(&mut self) -> Option<SiteEvent> {
        self.receiver.recv().await
    }
}

impl Stream for Subscription {
    type Item = SiteEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.remove(self.id);
        debug!(subscriber = self.id, "realtime subscriber removed");
    }
}
