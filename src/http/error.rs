//! Error type for the HTTP boundary.

use crate::site::SiteError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Errors returned to HTTP callers as `{ok:false, error}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Admin secret missing, wrong, or not configured. Deliberately one
    /// variant so responses never reveal which.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Missing clientID")]
    MissingClientId,

    #[error("Missing ip")]
    MissingIp,

    /// Body failed to parse or violated the request schema.
    #[error("Invalid request: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Site(#[from] SiteError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MissingClientId | Self::MissingIp | Self::InvalidBody(_) | Self::Site(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    ok: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            ok: false,
            error: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidBody(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ApiError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::MissingClientId.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::MissingIp.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidBody("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Site(SiteError::EmptyMessage).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ApiError::Unauthorized.to_string(), "Unauthorized");
        assert_eq!(ApiError::MissingClientId.to_string(), "Missing clientID");
        assert_eq!(
            ApiError::Site(SiteError::EmptyMessage).to_string(),
            "Broadcast message is empty"
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
