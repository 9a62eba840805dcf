//! Access decision engine.
//!
//! Evaluation order is a hard contract; the first matching rule wins:
//!
//! 1. IP ban (overrides everything, including a verified client)
//! 2. Missing client token (allowed unless access-lockdown)
//! 3. Banned client
//! 4. Suspicious client (allowed, surfaced; stops evaluation)
//! 5. Heuristic reclassification of `unverified` clients
//! 6. Access-lockdown (only `verified` gets through)
//! 7. Default allow
//!
//! Evaluation is NOT read-only: step 5 flips a matching `unverified`
//! record to `suspicious` and persists it. The flip is sticky; nothing in
//! this module ever moves a record out of `suspicious`.

use super::heuristic::DeviceHeuristic;
use super::store::AccessStore;
use super::types::{ClientStatus, Decision, DecisionReason};
use std::sync::Arc;
use tracing::info;

/// Decides, per request, whether a client may proceed.
#[derive(Clone)]
pub struct DecisionEngine {
    store: Arc<AccessStore>,
    heuristic: Arc<dyn DeviceHeuristic>,
}

impl DecisionEngine {
    pub fn new(store: Arc<AccessStore>, heuristic: Arc<dyn DeviceHeuristic>) -> Self {
        Self { store, heuristic }
    }

    /// Evaluate a request and apply heuristic reclassification.
    ///
    /// `token` and `source_address` must already be normalized (see
    /// [`normalize_token`](super::types::normalize_token) and
    /// [`normalize_address`](super::types::normalize_address)).
    ///
    /// Side effect: an `unverified` client whose telemetry trips the
    /// heuristic becomes `suspicious`, with `suspiciousAt` stamped and the
    /// store persisted, before the decision is returned.
    pub fn evaluate_and_reclassify(
        &self,
        token: Option<&str>,
        source_address: Option<&str>,
    ) -> Decision {
        let heuristic = self.heuristic.as_ref();

        self.store.apply(|state, now| {
            if let Some(ban) = source_address.and_then(|addr| state.ip_bans.get(addr)) {
                let status = token
                    .and_then(|t| state.clients.get(t))
                    .map(|r| r.status)
                    .unwrap_or_default();
                let message = (!ban.message.is_empty()).then(|| ban.message.clone());
                return (
                    Decision::banned(status, DecisionReason::IpBan, message),
                    false,
                );
            }

            let lockdown = state.lockdown;

            let Some(token) = token else {
                let decision = if lockdown {
                    Decision::deny(
                        ClientStatus::Unverified,
                        DecisionReason::MissingClientIdLockdown,
                    )
                } else {
                    Decision::allow(ClientStatus::Unverified, DecisionReason::MissingClientId)
                };
                return (decision, false);
            };

            let Some(record) = state.clients.get_mut(token) else {
                let decision = if lockdown {
                    Decision::deny(ClientStatus::Unverified, DecisionReason::LockdownUnknown)
                } else {
                    Decision::allow(ClientStatus::Unverified, DecisionReason::UnknownAllowed)
                };
                return (decision, false);
            };

            let current = record.status;
            match current {
                ClientStatus::Banned => {
                    let message = record.ban_message().map(str::to_string);
                    return (
                        Decision::banned(
                            ClientStatus::Banned,
                            DecisionReason::ClientBanned,
                            message,
                        ),
                        false,
                    );
                }
                ClientStatus::Suspicious => {
                    return (
                        Decision::allow(ClientStatus::Suspicious, DecisionReason::Suspicious),
                        false,
                    );
                }
                ClientStatus::Unverified if heuristic.is_suspicious(record) => {
                    record.status = ClientStatus::Suspicious;
                    record.suspicious_at = now;
                    info!(client = %token, platform = %record.platform, "client reclassified as suspicious");
                    return (
                        Decision::allow(ClientStatus::Suspicious, DecisionReason::Suspicious),
                        true,
                    );
                }
                _ => {}
            }

            let status = record.status;
            let decision = match (lockdown, status) {
                (true, ClientStatus::Verified) => {
                    Decision::allow(status, DecisionReason::LockdownVerified)
                }
                (true, _) => Decision::deny(status, DecisionReason::LockdownNotVerified),
                (false, _) => Decision::allow(status, DecisionReason::KnownAllowed),
            };
            (decision, false)
        })
    }

    /// Alias of [`evaluate_and_reclassify`](Self::evaluate_and_reclassify).
    /// Mutates the store the same way.
    pub fn evaluate(&self, token: Option<&str>, source_address: Option<&str>) -> Decision {
        self.evaluate_and_reclassify(token, source_address)
    }
}
