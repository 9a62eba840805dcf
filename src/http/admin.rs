//! Operator endpoints. Every handler takes [`AdminAuth`] first so the PIN
//! is checked before the body is parsed.

use super::error::ApiError;
use super::extract::{AdminAuth, ApiJson};
use super::schema::*;
use super::AppState;
use crate::access::{normalize_address, normalize_token, ClientRecord};
use axum::extract::State;
use axum::Json;

fn require_token(client_id: Option<&str>) -> Result<String, ApiError> {
    client_id
        .and_then(normalize_token)
        .ok_or(ApiError::MissingClientId)
}

fn require_ip(ip: Option<&str>) -> Result<String, ApiError> {
    ip.and_then(normalize_address).ok_or(ApiError::MissingIp)
}

fn status_response(record: ClientRecord) -> Json<StatusResponse> {
    Json(StatusResponse {
        ok: true,
        status: record.status,
    })
}

/// `GET /api/admin/list`
pub async fn list(_: AdminAuth, State(state): State<AppState>) -> Json<AdminListResponse> {
    let clients = state
        .access
        .list_clients()
        .into_iter()
        .map(|(client_id, record)| ClientEntry { client_id, record })
        .collect();
    let ip_bans = state
        .access
        .list_ip_bans()
        .into_iter()
        .map(|(ip, record)| IpBanEntry { ip, record })
        .collect();

    Json(AdminListResponse {
        ok: true,
        lockdown: state.access.lockdown(),
        clients,
        ip_bans,
    })
}

/// `POST /api/admin/verify`
pub async fn verify(
    _: AdminAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ClientRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let token = require_token(request.client_id.as_deref())?;
    Ok(status_response(state.access.verify(&token)))
}

/// `POST /api/admin/suspicious`
pub async fn suspicious(
    _: AdminAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ClientRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let token = require_token(request.client_id.as_deref())?;
    Ok(status_response(state.access.mark_suspicious(&token)))
}

/// `POST /api/admin/clear-suspicious`
pub async fn clear_suspicious(
    _: AdminAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ClientRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let token = require_token(request.client_id.as_deref())?;
    Ok(status_response(state.access.clear_suspicious(&token)))
}

/// `POST /api/admin/ban`
pub async fn ban(
    _: AdminAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BanRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let token = require_token(request.client_id.as_deref())?;
    let record = state.access.ban(&token, request.ban_message.as_deref());
    Ok(status_response(record))
}

/// `POST /api/admin/unban`
pub async fn unban(
    _: AdminAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ClientRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let token = require_token(request.client_id.as_deref())?;
    Ok(status_response(state.access.unban(&token)))
}

/// `POST /api/admin/ban-ip`
pub async fn ban_ip(
    _: AdminAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IpBanRequest>,
) -> Result<Json<IpBanResponse>, ApiError> {
    let ip = require_ip(request.ip.as_deref())?;
    state.access.ban_ip(&ip, request.ban_message.as_deref());
    Ok(Json(IpBanResponse {
        ok: true,
        ip,
        banned: true,
    }))
}

/// `POST /api/admin/unban-ip`
pub async fn unban_ip(
    _: AdminAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<IpRequest>,
) -> Result<Json<IpBanResponse>, ApiError> {
    let ip = require_ip(request.ip.as_deref())?;
    state.access.unban_ip(&ip);
    Ok(Json(IpBanResponse {
        ok: true,
        ip,
        banned: false,
    }))
}

/// `POST /api/admin/lockdown`: access-lockdown (not site lockdown).
pub async fn access_lockdown(
    _: AdminAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AccessLockdownRequest>,
) -> Json<AccessLockdownResponse> {
    let lockdown = state.access.set_lockdown(request.enabled);
    Json(AccessLockdownResponse { ok: true, lockdown })
}

/// `POST /api/broadcast`
pub async fn broadcast(
    _: AdminAuth,
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BroadcastRequest>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    let broadcast = state.site.set_broadcast(&request.message)?;
    Ok(Json(BroadcastResponse {
        ok: true,
        broadcast: Some(broadcast),
    }))
}

/// `POST /api/clear-broadcast`
pub async fn clear_broadcast(_: AdminAuth, State(state): State<AppState>) -> Json<BroadcastResponse> {
    state.site.clear_broadcast();
    Json(BroadcastResponse {
        ok: true,
        broadcast: None,
    })
}

/// `POST /api/lockdown`: site lockdown on.
pub async fn site_lockdown(_: AdminAuth, State(state): State<AppState>) -> Json<SiteLockdownResponse> {
    Json(SiteLockdownResponse {
        ok: true,
        lockdown: state.site.set_lockdown(true),
    })
}

/// `POST /api/clear-lockdown`: site lockdown off.
pub async fn clear_site_lockdown(
    _: AdminAuth,
    State(state): State<AppState>,
) -> Json<SiteLockdownResponse> {
    Json(SiteLockdownResponse {
        ok: true,
        lockdown: state.site.set_lockdown(false),
    })
}
