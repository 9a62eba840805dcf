//! Unauthenticated endpoints used by the client app.

use super::error::ApiError;
use super::extract::{ApiJson, SourceAddr};
use super::schema::*;
use super::AppState;
use crate::access::{normalize_token, ClientStatus};
use axum::extract::State;
use axum::Json;
use tracing::{info, warn};

fn require_token(client_id: Option<&str>) -> Result<String, ApiError> {
    client_id
        .and_then(normalize_token)
        .ok_or(ApiError::MissingClientId)
}

/// `GET /health`
pub async fn health() -> Json<OkResponse> {
    Json(OkResponse { ok: true })
}

/// `GET /api/state`
pub async fn site_state(State(state): State<AppState>) -> Json<StateResponse> {
    let site = state.site.snapshot();
    Json(StateResponse {
        ok: true,
        lockdown: site.lockdown,
        broadcast: site.broadcast,
    })
}

/// `POST /api/hello`: record telemetry, creating the client on first sight.
pub async fn hello(
    State(state): State<AppState>,
    source: SourceAddr,
    ApiJson(request): ApiJson<HelloRequest>,
) -> Result<Json<HelloResponse>, ApiError> {
    let token = require_token(request.client_id.as_deref())?;
    let record = state
        .presence
        .hello(&token, request.device.as_ref(), source.as_deref());

    Ok(Json(HelloResponse {
        ok: true,
        client_id: token,
        status: record.status,
    }))
}

/// `POST /api/auth`: PIN gate. A match verifies an `unverified` client.
pub async fn auth(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PinRequest>,
) -> Result<Json<AllowedResponse>, ApiError> {
    let token = require_token(request.client_id.as_deref())?;

    if !state.secrets.auth_matches(request.pin_attempt.as_deref()) {
        warn!(client = %token, "auth gate PIN rejected");
        return Ok(Json(AllowedResponse {
            ok: true,
            allowed: false,
        }));
    }

    let record = state.access.self_verify(&token);
    let allowed = record.status == ClientStatus::Verified;
    info!(client = %token, allowed, "auth gate PIN accepted");
    Ok(Json(AllowedResponse { ok: true, allowed }))
}

/// `POST /api/check`: run the decision engine.
pub async fn check(
    State(state): State<AppState>,
    source: SourceAddr,
    ApiJson(request): ApiJson<CheckRequest>,
) -> Json<CheckResponse> {
    let token = request.client_id.as_deref().and_then(normalize_token);

    if let Some(token) = token.as_deref() {
        state.presence.observe(token, source.as_deref());
    }
    let decision = state
        .engine
        .evaluate_and_reclassify(token.as_deref(), source.as_deref());

    Json(CheckResponse {
        ok: true,
        banned: decision.banned,
        allowed: decision.allowed,
        lockdown: state.access.lockdown(),
        status: decision.status,
        reason: decision.reason,
        ban_message: decision.ban_message,
    })
}

/// `POST /api/unban`: self-service unban with its own PIN.
pub async fn self_unban(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<PinRequest>,
) -> Result<Json<AllowedResponse>, ApiError> {
    let token = require_token(request.client_id.as_deref())?;

    if !state.secrets.unban_matches(request.pin_attempt.as_deref()) {
        warn!(client = %token, "self-unban PIN rejected");
        return Ok(Json(AllowedResponse {
            ok: true,
            allowed: false,
        }));
    }

    state.access.self_unban(&token);
    info!(client = %token, "self-unban PIN accepted");
    Ok(Json(AllowedResponse {
        ok: true,
        allowed: true,
    }))
}
