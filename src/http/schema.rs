//! Request and response bodies.
//!
//! Requests are strict: unknown fields are rejected. Required identifiers
//! are `Option` so a missing or blank value yields a specific error rather
//! than a generic parse failure.

use crate::access::{ClientRecord, ClientStatus, DecisionReason, DeviceTelemetry, IpBanRecord};
use crate::site::{Broadcast, LockdownState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HelloRequest {
    #[serde(rename = "clientID")]
    pub client_id: Option<String>,
    pub device: Option<DeviceTelemetry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinRequest {
    #[serde(rename = "clientID")]
    pub client_id: Option<String>,
    #[serde(rename = "pinAttempt")]
    pub pin_attempt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckRequest {
    #[serde(rename = "clientID")]
    pub client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientRequest {
    #[serde(rename = "clientID")]
    pub client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BanRequest {
    #[serde(rename = "clientID")]
    pub client_id: Option<String>,
    #[serde(rename = "banMessage")]
    pub ban_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IpBanRequest {
    pub ip: Option<String>,
    #[serde(rename = "banMessage")]
    pub ban_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IpRequest {
    pub ip: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessLockdownRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BroadcastRequest {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub ok: bool,
    pub lockdown: LockdownState,
    pub broadcast: Option<Broadcast>,
}

#[derive(Debug, Serialize)]
pub struct HelloResponse {
    pub ok: bool,
    #[serde(rename = "clientID")]
    pub client_id: String,
    pub status: ClientStatus,
}

#[derive(Debug, Serialize)]
pub struct AllowedResponse {
    pub ok: bool,
    pub allowed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub ok: bool,
    pub banned: bool,
    pub allowed: bool,
    /// Access-lockdown flag.
    pub lockdown: bool,
    pub status: ClientStatus,
    pub reason: DecisionReason,
    pub ban_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub ok: bool,
    pub status: ClientStatus,
}

#[derive(Debug, Serialize)]
pub struct IpBanResponse {
    pub ok: bool,
    pub ip: String,
    pub banned: bool,
}

#[derive(Debug, Serialize)]
pub struct AccessLockdownResponse {
    pub ok: bool,
    pub lockdown: bool,
}

#[derive(Debug, Serialize)]
pub struct SiteLockdownResponse {
    pub ok: bool,
    pub lockdown: LockdownState,
}

#[derive(Debug, Serialize)]
pub struct BroadcastResponse {
    pub ok: bool,
    pub broadcast: Option<Broadcast>,
}

#[derive(Debug, Serialize)]
pub struct ClientEntry {
    #[serde(rename = "clientID")]
    pub client_id: String,
    #[serde(flatten)]
    pub record: ClientRecord,
}

#[derive(Debug, Serialize)]
pub struct IpBanEntry {
    pub ip: String,
    #[serde(flatten)]
    pub record: IpBanRecord,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminListResponse {
    pub ok: bool,
    /// Access-lockdown flag.
    pub lockdown: bool,
    pub clients: Vec<ClientEntry>,
    pub ip_bans: Vec<IpBanEntry>,
}
