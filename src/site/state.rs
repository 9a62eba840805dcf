//! Site-wide state: the site lockdown flag and at most one broadcast.
//!
//! ## Lazy expiry
//!
//! There is no background timer. Every operation that reads or exposes
//! the state first drops a broadcast whose `expiresAt` has passed and
//! persists that change, so readers never observe an expired broadcast.
//!
//! ## Fan-out
//!
//! Mutations persist under the lock, release it, then publish to the
//! [`BroadcastChannel`]. A second lock, taken before the state lock is
//! released, keeps fan-out in persist order. Subscribing takes the snapshot and registers
//! under the lock so no mutation can slip between the two.

use super::channel::{BroadcastChannel, SiteEvent, Subscription};
use crate::access::types::truncate_chars;
use crate::clock::Clock;
use crate::persistence::{load_or_default, save_or_warn, Document, PersistencePort};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// Broadcast lifetime: 24 hours.
pub const BROADCAST_TTL_MS: u64 = 24 * 60 * 60 * 1000;

/// Maximum broadcast message length (chars).
pub const MAX_BROADCAST_MESSAGE: usize = 1000;

/// Site lockdown flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LockdownState {
    pub enabled: bool,
    pub updated_at: u64,
}

/// A time-limited site-wide message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Broadcast {
    pub id: String,
    pub message: String,
    pub created_at: u64,
    pub expires_at: u64,
}

impl Broadcast {
    pub fn new(message: String, now: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            message,
            created_at: now,
            expires_at: now + BROADCAST_TTL_MS,
        }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at
    }
}

/// The site aggregate as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteState {
    pub lockdown: LockdownState,
    pub broadcast: Option<Broadcast>,
}

impl SiteState {
    /// Drop an expired broadcast. Returns whether one was dropped.
    pub fn prune_expired(&mut self, now: u64) -> bool {
        if self.broadcast.as_ref().is_some_and(|b| b.is_expired(now)) {
            self.broadcast = None;
            true
        } else {
            false
        }
    }

    fn snapshot_event(&self) -> SiteEvent {
        SiteEvent::State {
            lockdown: self.lockdown,
            broadcast: self.broadcast.clone(),
        }
    }
}

/// Site-state errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SiteError {
    #[error("Broadcast message is empty")]
    EmptyMessage,
}

/// Process-wide owner of [`SiteState`].
pub struct SiteStateStore {
    state: Mutex<SiteState>,
    /// Taken before `state` is released and held until fan-out is done, so
    /// events go out in the same order as their persists.
    publish_order: Mutex<()>,
    port: Arc<dyn PersistencePort>,
    clock: Arc<dyn Clock>,
    channel: BroadcastChannel,
}

impl SiteStateStore {
    /// Load from `port`, starting empty if missing or unusable.
    pub fn load(
        port: Arc<dyn PersistencePort>,
        clock: Arc<dyn Clock>,
        channel: BroadcastChannel,
    ) -> Self {
        let state: SiteState = load_or_default(port.as_ref(), Document::SiteState);
        info!(
            lockdown = state.lockdown.enabled,
            broadcast = state.broadcast.is_some(),
            "site state loaded"
        );
        Self {
            state: Mutex::new(state),
            publish_order: Mutex::new(()),
            port,
            clock,
            channel,
        }
    }

    /// Lock the state with any expired broadcast already pruned and persisted.
    fn lock_fresh(&self) -> (MutexGuard<'_, SiteState>, u64) {
        let now = self.clock.now_ms();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.prune_expired(now) {
            info!("broadcast expired");
            self.persist(&state);
        }
        (state, now)
    }

    fn lock_publish_order(&self) -> MutexGuard<'_, ()> {
        self.publish_order.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, state: &SiteState) {
        save_or_warn(self.port.as_ref(), Document::SiteState, state);
    }

    /// Current state with expired broadcasts removed.
    pub fn snapshot(&self) -> SiteState {
        let (state, _) = self.lock_fresh();
        state.clone()
    }

    /// Open a realtime subscription, starting with a `state` snapshot.
    pub fn subscribe(&self) -> Subscription {
        let (state, _) = self.lock_fresh();
        self.channel.subscribe(state.snapshot_event())
    }

    /// Publish a new broadcast, replacing any previous one.
    pub fn set_broadcast(&self, message: &str) -> Result<Broadcast, SiteError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SiteError::EmptyMessage);
        }
        let message = truncate_chars(message, MAX_BROADCAST_MESSAGE);

        let (broadcast, _order) = {
            let (mut state, now) = self.lock_fresh();
            let broadcast = Broadcast::new(message, now);
            state.broadcast = Some(broadcast.clone());
            self.persist(&state);
            (broadcast, self.lock_publish_order())
        };
        info!(id = %broadcast.id, expires_at = broadcast.expires_at, "broadcast published");

        self.channel.publish(&SiteEvent::Broadcast {
            broadcast: Some(broadcast.clone()),
        });
        Ok(broadcast)
    }

    /// Remove the active broadcast. Returns the removed one, if any.
    pub fn clear_broadcast(&self) -> Option<Broadcast> {
        let (previous, _order) = {
            let (mut state, _) = self.lock_fresh();
            let previous = state.broadcast.take();
            if previous.is_some() {
                self.persist(&state);
            }
            (previous, self.lock_publish_order())
        };

        if previous.is_some() {
            info!("broadcast cleared");
            self.channel
                .publish(&SiteEvent::Broadcast { broadcast: None });
        }
        previous
    }

    /// Set the site lockdown flag.
    pub fn set_lockdown(&self, enabled: bool) -> LockdownState {
        let (lockdown, _order) = {
            let (mut state, now) = self.lock_fresh();
            state.lockdown = LockdownState {
                enabled,
                updated_at: now,
            };
            self.persist(&state);
            (state.lockdown, self.lock_publish_order())
        };
        info!(enabled, "site lockdown set");

        self.channel.publish(&SiteEvent::Lockdown {
            enabled: lockdown.enabled,
            updated_at: lockdown.updated_at,
        });
        lockdown
    }

    /// The channel this store publishes to.
    pub fn channel(&self) -> &BroadcastChannel {
        &self.channel
    }
}
