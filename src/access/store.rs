//! Access store: client records, IP bans and the access-lockdown flag.
//!
//! One mutex guards the whole aggregate and is held across
//! read-decide-mutate-persist, so concurrent requests never lose updates.
//! Every mutation persists the full aggregate before returning. A failed
//! persist is logged and the in-memory state stays authoritative.
//!
//! ## Status transitions
//!
//! | From | To | Via |
//! |------|----|-----|
//! | unverified | verified | [`AccessStore::self_verify`], [`AccessStore::verify`] |
//! | unverified | suspicious | heuristic, [`AccessStore::mark_suspicious`] |
//! | suspicious | unverified | [`AccessStore::clear_suspicious`] |
//! | any | banned | [`AccessStore::ban`] |
//! | banned | unverified | [`AccessStore::unban`], [`AccessStore::self_unban`] |

use super::types::{
    truncate_chars, AccessState, ClientRecord, ClientStatus, IpBanRecord, MAX_BAN_MESSAGE,
};
use crate::clock::Clock;
use crate::persistence::{load_or_default, save_or_warn, Document, PersistencePort};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Extra data carried by a status change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    /// Message shown to a banned client. Only used when banning.
    pub ban_message: Option<String>,
}

impl StatusUpdate {
    pub fn with_ban_message(message: impl Into<String>) -> Self {
        Self {
            ban_message: Some(message.into()),
        }
    }
}

/// Process-wide access repository.
pub struct AccessStore {
    state: Mutex<AccessState>,
    port: Arc<dyn PersistencePort>,
    clock: Arc<dyn Clock>,
}

impl AccessStore {
    /// Load the aggregate from `port`, starting empty if it is missing or unusable.
    pub fn load(port: Arc<dyn PersistencePort>, clock: Arc<dyn Clock>) -> Self {
        let state: AccessState = load_or_default(port.as_ref(), Document::AccessStore);
        info!(
            clients = state.clients.len(),
            ip_bans = state.ip_bans.len(),
            lockdown = state.lockdown,
            "access store loaded"
        );
        Self {
            state: Mutex::new(state),
            port,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, AccessState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, state: &AccessState) {
        save_or_warn(self.port.as_ref(), Document::AccessStore, state);
    }

    /// Run `f` under the store lock. `f` returns its result and whether it
    /// mutated the aggregate; mutations are persisted before the lock drops.
    pub(crate) fn apply<R>(&self, f: impl FnOnce(&mut AccessState, u64) -> (R, bool)) -> R {
        let now = self.clock.now_ms();
        let mut state = self.lock();
        let (result, mutated) = f(&mut state, now);
        if mutated {
            self.persist(&state);
        }
        result
    }

    /// Current time according to the store's clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Get or create the record for `token`.
    ///
    /// Creation persists; refreshing `lastSeenAt` on a known record does not.
    pub fn ensure_client(&self, token: &str) -> ClientRecord {
        self.upsert_client(token, |_, _| false)
    }

    /// Get or create the record for `token`, then apply `f` to it.
    ///
    /// `f` returns whether it changed anything worth persisting. The record
    /// is persisted when it was created or when `f` reports a change.
    pub fn upsert_client(
        &self,
        token: &str,
        f: impl FnOnce(&mut ClientRecord, u64) -> bool,
    ) -> ClientRecord {
        self.apply(|state, now| {
            let mut created = false;
            let record = state.clients.entry(token.to_string()).or_insert_with(|| {
                created = true;
                ClientRecord::first_seen(now)
            });
            record.last_seen_at = now;
            let changed = f(record, now);
            if created {
                debug!(client = %token, "new client");
            }
            (record.clone(), created || changed)
        })
    }

    /// Apply `f` to an existing record. Returns `None` for unknown tokens.
    pub fn update_client(
        &self,
        token: &str,
        f: impl FnOnce(&mut ClientRecord, u64) -> bool,
    ) -> Option<ClientRecord> {
        self.apply(|state, now| match state.clients.get_mut(token) {
            Some(record) => {
                let changed = f(record, now);
                (Some(record.clone()), changed)
            }
            None => (None, false),
        })
    }

    /// Look up a record without touching it.
    pub fn client(&self, token: &str) -> Option<ClientRecord> {
        self.lock().clients.get(token).cloned()
    }

    /// Unconditionally set a client's status, creating the record if needed.
    ///
    /// Entering `verified`, `suspicious` or `banned` stamps the matching
    /// timestamp. Banning stores `update.ban_message` (overwriting any
    /// previous message); every other status clears it.
    pub fn set_client_status(
        &self,
        token: &str,
        status: ClientStatus,
        update: StatusUpdate,
    ) -> ClientRecord {
        let record = self.upsert_client(token, |record, now| {
            apply_status(record, status, update, now);
            true
        });
        info!(client = %token, status = %record.status, "client status set");
        record
    }

    /// Operator verify. Works from any status.
    pub fn verify(&self, token: &str) -> ClientRecord {
        self.set_client_status(token, ClientStatus::Verified, StatusUpdate::default())
    }

    /// Operator quarantine. Works from any status.
    pub fn mark_suspicious(&self, token: &str) -> ClientRecord {
        self.set_client_status(token, ClientStatus::Suspicious, StatusUpdate::default())
    }

    /// Operator clear of the suspicious flag. No-op unless currently suspicious.
    pub fn clear_suspicious(&self, token: &str) -> ClientRecord {
        self.transition(token, ClientStatus::Suspicious, ClientStatus::Unverified)
    }

    /// Operator ban. Re-banning overwrites the message.
    pub fn ban(&self, token: &str, message: Option<&str>) -> ClientRecord {
        let update = StatusUpdate {
            ban_message: message.map(str::to_string),
        };
        self.set_client_status(token, ClientStatus::Banned, update)
    }

    /// Operator unban. Always lands on `unverified`; no-op unless banned.
    pub fn unban(&self, token: &str) -> ClientRecord {
        self.transition(token, ClientStatus::Banned, ClientStatus::Unverified)
    }

    /// Successful PIN at the auth gate.
    ///
    /// Only promotes `unverified` records (creating one for an unseen
    /// token). Suspicious and banned clients are left untouched.
    pub fn self_verify(&self, token: &str) -> ClientRecord {
        self.transition(token, ClientStatus::Unverified, ClientStatus::Verified)
    }

    /// Successful self-service unban. Unknown tokens stay unknown.
    pub fn self_unban(&self, token: &str) -> Option<ClientRecord> {
        self.update_client(token, |record, now| {
            if record.status != ClientStatus::Banned {
                return false;
            }
            apply_status(record, ClientStatus::Unverified, StatusUpdate::default(), now);
            true
        })
    }

    /// Move `from` -> `to`, leaving any other status as it is.
    fn transition(&self, token: &str, from: ClientStatus, to: ClientStatus) -> ClientRecord {
        let record = self.upsert_client(token, |record, now| {
            if record.status != from {
                return false;
            }
            apply_status(record, to, StatusUpdate::default(), now);
            true
        });
        debug!(client = %token, from = %from, status = %record.status, "status transition");
        record
    }

    /// Ban a source address. Re-banning keeps `createdAt` and overwrites the message.
    pub fn ban_ip(&self, address: &str, message: Option<&str>) -> IpBanRecord {
        let message = truncate_chars(message.unwrap_or("").trim(), MAX_BAN_MESSAGE);
        let record = self.apply(|state, now| {
            let record = state
                .ip_bans
                .entry(address.to_string())
                .or_insert_with(|| IpBanRecord {
                    created_at: now,
                    ..IpBanRecord::default()
                });
            record.message = message;
            record.updated_at = now;
            (record.clone(), true)
        });
        info!(ip = %address, "ip banned");
        record
    }

    /// Lift an address ban. Returns whether a ban existed.
    pub fn unban_ip(&self, address: &str) -> bool {
        let removed = self.apply(|state, _| {
            let removed = state.ip_bans.remove(address).is_some();
            (removed, removed)
        });
        if removed {
            info!(ip = %address, "ip unbanned");
        }
        removed
    }

    /// Ban record for an address, if any.
    pub fn ip_ban(&self, address: &str) -> Option<IpBanRecord> {
        self.lock().ip_bans.get(address).cloned()
    }

    /// Set the access-lockdown flag.
    pub fn set_lockdown(&self, enabled: bool) -> bool {
        self.apply(|state, _| {
            let changed = state.lockdown != enabled;
            state.lockdown = enabled;
            (enabled, changed)
        });
        info!(enabled, "access lockdown set");
        enabled
    }

    /// Whether access-lockdown is on.
    pub fn lockdown(&self) -> bool {
        self.lock().lockdown
    }

    /// All client records, most recently seen first.
    pub fn list_clients(&self) -> Vec<(String, ClientRecord)> {
        let mut clients: Vec<_> = self
            .lock()
            .clients
            .iter()
            .map(|(token, record)| (token.clone(), record.clone()))
            .collect();
        clients.sort_by(|a, b| b.1.last_seen_at.cmp(&a.1.last_seen_at).then(a.0.cmp(&b.0)));
        clients
    }

    /// All IP bans, ordered by address.
    pub fn list_ip_bans(&self) -> Vec<(String, IpBanRecord)> {
        self.lock()
            .ip_bans
            .iter()
            .map(|(address, record)| (address.clone(), record.clone()))
            .collect()
    }

    /// Copy of the whole aggregate.
    pub fn snapshot(&self) -> AccessState {
        self.lock().clone()
    }
}

/// Set `status` on `record`, maintaining timestamps and the ban message.
fn apply_status(record: &mut ClientRecord, status: ClientStatus, update: StatusUpdate, now: u64) {
    let entering = record.status != status;
    match status {
        ClientStatus::Verified if entering => record.verified_at = now,
        ClientStatus::Suspicious if entering => record.suspicious_at = now,
        ClientStatus::Banned if entering => record.banned_at = now,
        _ => {}
    }
    record.ban_message = if status == ClientStatus::Banned {
        truncate_chars(update.ban_message.as_deref().unwrap_or("").trim(), MAX_BAN_MESSAGE)
    } else {
        String::new()
    };
    record.status = status;
}
