//! JSON error responses.
//!
//! Every failure is reported as `{"ok": false, "error": "<message>"}` with a
//! status code chosen from the underlying error.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::auth::AuthError;
use crate::lookup::LookupError;
use crate::reconcile::ReconcileError;
use crate::twitch::ProviderError;
use crate::twitch::tokens::TokenError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
}

/// Acknowledgement body for mutations without other output.
#[derive(Debug, Serialize, Deserialize)]
pub struct OkBody {
    pub ok: bool,
}

impl OkBody {
    pub const fn ok() -> Json<Self> {
        Json(Self { ok: true })
    }
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    fn internal(context: &str, err: &dyn std::fmt::Display) -> Self {
        error!(error = %err, "{context}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, format!("{context}: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                ok: false,
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UserNotFound | AuthError::InvalidCredential => {
                Self::unauthorized("invalid credentials")
            }
            AuthError::TokenExpired => Self::unauthorized("authentication required"),
            AuthError::TokenMalformed => Self::bad_request("invalid token"),
            AuthError::InvalidInput(msg) => Self::bad_request(msg),
            other => Self::internal("server error", &other),
        }
    }
}

impl From<&ProviderError> for ApiError {
    fn from(err: &ProviderError) -> Self {
        error!(error = %err, "Twitch request failed");
        Self::new(StatusCode::BAD_GATEWAY, format!("twitch request failed: {err}"))
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        Self::from(&err)
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::NotLinked(_) => {
                Self::new(StatusCode::FAILED_DEPENDENCY, "twitch account not linked")
            }
            TokenError::Provider(e) => e.into(),
            TokenError::Kv(e) => Self::internal("failed reading twitch tokens", &e),
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            LookupError::Provider(e) => e.as_ref().into(),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        Self::internal("subscription update failed", &err)
    }
}
