//! `POST /api/auth` and user administration routes.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::extract::AdminSession;
use super::response::{ApiError, OkBody};
use super::state::AppState;
use crate::auth::{UserLevel, UserSummary};

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthRequest {
    pub user: String,
    pub key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub ok: bool,
    pub user: String,
    pub level: UserLevel,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddUserRequest {
    pub user: String,
    pub key: String,
    #[serde(default = "default_level")]
    pub level: UserLevel,
}

const fn default_level() -> UserLevel {
    UserLevel::Streamer
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::bad_request(format!("invalid json body: {}", e.body_text())))
}

/// Exchange a username and shared secret for a session token.
pub async fn authenticate(
    State(state): State<AppState>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let req = json_body(payload)?;
    let (claims, token) = state
        .credentials
        .authenticate(&req.user, &req.key, state.session_lifetime)
        .await?;

    Ok(Json(AuthResponse {
        ok: true,
        user: claims.user,
        level: claims.level,
        token,
    }))
}

pub async fn list_users(
    AdminSession(_): AdminSession,
    State(state): State<AppState>,
) -> Json<Vec<UserSummary>> {
    Json(state.credentials.list_users().await)
}

pub async fn add_user(
    AdminSession(admin): AdminSession,
    State(state): State<AppState>,
    payload: Result<Json<AddUserRequest>, JsonRejection>,
) -> Result<Json<OkBody>, ApiError> {
    let req = json_body(payload)?;
    state
        .credentials
        .add_user(&req.user, &req.key, req.level)
        .await?;
    info!(admin = %admin.user, user = %req.user, "User added through API");
    Ok(OkBody::ok())
}

pub async fn delete_user(
    AdminSession(admin): AdminSession,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<OkBody>, ApiError> {
    state.credentials.delete_user(&name).await?;
    info!(admin = %admin.user, user = %name, "User removed through API");
    Ok(OkBody::ok())
}

/// Rotate the session signing secret. The caller's own token stops working.
pub async fn regenerate_secret(
    AdminSession(admin): AdminSession,
    State(state): State<AppState>,
) -> Result<Json<OkBody>, ApiError> {
    state.credentials.regenerate_secret().await?;
    info!(admin = %admin.user, "Session secret regenerated through API");
    Ok(OkBody::ok())
}
