//! Bearer session extractors.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::response::ApiError;
use super::state::AppState;
use crate::auth::SessionClaims;

/// Claims of a request carrying a valid `Authorization: Bearer` token.
#[derive(Debug, Clone)]
pub struct Session(pub SessionClaims);

/// Like [`Session`], but only for admin-level users.
#[derive(Debug, Clone)]
pub struct AdminSession(pub SessionClaims);

/// Extract the token from an `Authorization` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let mut parts = value.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

impl FromRequestParts<AppState> for Session {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::unauthorized("authorization required"))?;

        let claims = state.credentials.verify(token).await?;
        Ok(Self(claims))
    }
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Session(claims) = Session::from_request_parts(parts, state).await?;
        if !claims.level.is_admin() {
            return Err(ApiError::forbidden("admin access required"));
        }
        Ok(Self(claims))
    }
}
