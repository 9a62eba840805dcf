//! Access-control data model.
//!
//! Client records are keyed by a self-reported client token; IP bans are
//! keyed by normalized source address. Both live in one aggregate
//! ([`AccessState`]) that is persisted as a single document.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Maximum lengths (in chars) of free-form fields.
pub const MAX_USER_AGENT: usize = 300;
pub const MAX_PLATFORM: usize = 80;
pub const MAX_LANGUAGE: usize = 40;
pub const MAX_TIMEZONE: usize = 64;
pub const MAX_SCREEN: usize = 32;
pub const MAX_BAN_MESSAGE: usize = 500;

/// Per-client access status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    /// Initial status; allowed unless access-lockdown is on.
    #[default]
    Unverified,
    /// Passed the PIN gate or verified by an operator.
    Verified,
    /// Soft quarantine. Allowed, but surfaced so the client app can redirect.
    Suspicious,
    /// Denied with an operator-supplied message.
    Banned,
}

impl ClientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Unverified => "unverified",
            ClientStatus::Verified => "verified",
            ClientStatus::Suspicious => "suspicious",
            ClientStatus::Banned => "banned",
        }
    }

    /// Parse a persisted status string.
    ///
    /// Legacy `"unbanned"` and anything unrecognised map to `Unverified`.
    pub fn from_persisted(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "verified" => ClientStatus::Verified,
            "suspicious" => ClientStatus::Suspicious,
            "banned" => ClientStatus::Banned,
            _ => ClientStatus::Unverified,
        }
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything known about one client token.
///
/// Timestamps are Unix milliseconds, 0 meaning never. Empty strings mean
/// the field was never reported.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientRecord {
    pub status: ClientStatus,
    pub first_seen_at: u64,
    pub last_seen_at: u64,
    pub verified_at: u64,
    pub suspicious_at: u64,
    pub banned_at: u64,

    pub user_agent: String,
    pub platform: String,
    pub language: String,
    pub timezone: String,
    pub screen: String,

    pub ip_first: String,
    pub ip_last: String,
    pub ip_last_seen_at: u64,

    pub ban_message: String,
}

impl ClientRecord {
    /// Fresh record for a token seen for the first time at `now`.
    pub fn first_seen(now: u64) -> Self {
        Self {
            first_seen_at: now,
            last_seen_at: now,
            ..Self::default()
        }
    }

    /// Record an observation from `address`.
    pub fn observe_ip(&mut self, address: &str, now: u64) {
        if address.is_empty() {
            return;
        }
        if self.ip_first.is_empty() {
            self.ip_first = address.to_string();
        }
        self.ip_last = address.to_string();
        self.ip_last_seen_at = now;
    }

    /// Ban message, if one is set.
    pub fn ban_message(&self) -> Option<&str> {
        if self.ban_message.is_empty() {
            None
        } else {
            Some(&self.ban_message)
        }
    }
}

/// Address-level ban.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IpBanRecord {
    pub message: String,
    pub created_at: u64,
    pub updated_at: u64,
}

/// The access aggregate as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccessState {
    /// Access-lockdown: only verified clients get through.
    pub lockdown: bool,
    pub clients: BTreeMap<String, ClientRecord>,
    pub ip_bans: BTreeMap<String, IpBanRecord>,
}

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    IpBan,
    MissingClientId,
    MissingClientIdLockdown,
    ClientBanned,
    Suspicious,
    LockdownUnknown,
    LockdownVerified,
    LockdownNotVerified,
    UnknownAllowed,
    KnownAllowed,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::IpBan => "ip_ban",
            DecisionReason::MissingClientId => "missing_client_id",
            DecisionReason::MissingClientIdLockdown => "missing_client_id_lockdown",
            DecisionReason::ClientBanned => "client_banned",
            DecisionReason::Suspicious => "suspicious",
            DecisionReason::LockdownUnknown => "lockdown_unknown",
            DecisionReason::LockdownVerified => "lockdown_verified",
            DecisionReason::LockdownNotVerified => "lockdown_not_verified",
            DecisionReason::UnknownAllowed => "unknown_allowed",
            DecisionReason::KnownAllowed => "known_allowed",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub allowed: bool,
    pub banned: bool,
    pub status: ClientStatus,
    pub reason: DecisionReason,
    pub ban_message: Option<String>,
}

impl Decision {
    pub(crate) fn allow(status: ClientStatus, reason: DecisionReason) -> Self {
        Self {
            allowed: true,
            banned: false,
            status,
            reason,
            ban_message: None,
        }
    }

    pub(crate) fn deny(status: ClientStatus, reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            banned: false,
            status,
            reason,
            ban_message: None,
        }
    }

    pub(crate) fn banned(
        status: ClientStatus,
        reason: DecisionReason,
        ban_message: Option<String>,
    ) -> Self {
        Self {
            allowed: false,
            banned: true,
            status,
            reason,
            ban_message,
        }
    }
}

/// Truncate `value` to at most `max` chars, never splitting a char.
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Trim a client token; empty tokens count as missing.
pub fn normalize_token(token: &str) -> Option<String> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Canonical form of a source address.
///
/// IPv4-mapped IPv6 addresses collapse to their IPv4 form so a ban on
/// `1.2.3.4` matches a request arriving as `::ffff:1.2.3.4`. Strings that
/// do not parse as an IP are kept verbatim (trimmed).
pub fn normalize_address(address: &str) -> Option<String> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<IpAddr>() {
        Ok(ip) => Some(ip.to_canonical().to_string()),
        Err(_) => Some(trimmed.to_string()),
    }
}
