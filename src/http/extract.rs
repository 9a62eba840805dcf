//! Request extractors: strict JSON bodies, the admin gate and the source address.

use super::auth::ADMIN_PIN_HEADER;
use super::error::ApiError;
use super::AppState;
use crate::access::normalize_address;
use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequest, FromRequestParts};
use axum::http::request::Parts;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

/// JSON body whose rejections render as `{ok:false, error}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Proof that the request carried the admin PIN.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let attempt = parts
            .headers
            .get(ADMIN_PIN_HEADER)
            .and_then(|v| v.to_str().ok());

        if state.secrets.admin_matches(attempt) {
            Ok(AdminAuth)
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

/// The address treated as the request's source for IP bans.
///
/// With `trust_proxy` on, the first `X-Forwarded-For` entry wins if it is an
/// IP address; otherwise the peer socket address is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAddr(pub Option<String>);

impl SourceAddr {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl FromRequestParts<AppState> for SourceAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(SourceAddr(source_address(parts, state.trust_proxy)))
    }
}

fn source_address(parts: &Parts, trust_proxy: bool) -> Option<String> {
    if trust_proxy {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|entry| entry.trim().parse::<IpAddr>().ok())
            .map(|ip| ip.to_canonical().to_string());
        if forwarded.is_some() {
            return forwarded;
        }
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .and_then(|ConnectInfo(addr)| normalize_address(&addr.ip().to_string()))
}
