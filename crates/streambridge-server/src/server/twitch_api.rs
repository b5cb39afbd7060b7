//! Twitch account linking and subscription management routes.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::extract::{AdminSession, Session};
use super::response::ApiError;
use super::state::AppState;
use crate::twitch::tokens::{store_tokens, user_token};
use crate::twitch::{Subscription, TwitchUser};

const LINKED_PAGE: &str = "<html><body><h2>All done, you can close me now!</h2>\
<script>window.close();</script></body></html>";

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizeResponse {
    pub auth_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub ok: bool,
    pub cost: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub ok: bool,
    pub deleted: usize,
}

/// `GET /api/twitch/authorize`: URL the caller visits to link their account.
pub async fn authorize(Session(claims): Session, State(state): State<AppState>) -> Json<AuthorizeResponse> {
    Json(AuthorizeResponse {
        auth_url: state.twitch.authorization_url(&claims.user),
    })
}

/// `GET /callback`: OAuth redirect target.
///
/// Stores the token pair for the user named in `state`, resolves their
/// Twitch id and reconciles their subscriptions.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<&'static str>, ApiError> {
    if params.code.is_empty() {
        return Err(ApiError::bad_request("missing code"));
    }
    let user = params.state;
    if state.credentials.get_user(&user).await.is_none() {
        return Err(ApiError::bad_request("unknown user in state"));
    }

    let pair = state.twitch.exchange_code(&params.code).await?;
    store_tokens(&state.kv, &user, &pair)
        .await
        .map_err(|e| {
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("error saving auth data for user: {e}"),
            )
        })?;

    let twitch_user = state.twitch.current_user(&pair.access_token).await?;
    state.reconciler.reconcile(&twitch_user.id, &user).await?;
    info!(user = %user, twitch_id = %twitch_user.id, login = %twitch_user.login, "Twitch account linked");

    Ok(Html(LINKED_PAGE))
}

async fn linked_user(state: &AppState, user: &str) -> Result<TwitchUser, ApiError> {
    let token = user_token(&state.kv, state.twitch.as_ref(), user).await?;
    Ok(state.twitch.current_user(&token).await?)
}

/// `GET /api/twitch/user`: the caller's linked Twitch user.
pub async fn current_user(
    Session(claims): Session,
    State(state): State<AppState>,
) -> Result<Json<TwitchUser>, ApiError> {
    Ok(Json(linked_user(&state, &claims.user).await?))
}

/// `POST /api/twitch/subscriptions/reconcile`
pub async fn reconcile(
    Session(claims): Session,
    State(state): State<AppState>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let twitch_user = linked_user(&state, &claims.user).await?;
    let cost = state
        .reconciler
        .reconcile(&twitch_user.id, &claims.user)
        .await?;
    Ok(Json(ReconcileResponse { ok: true, cost }))
}

/// `GET /api/twitch/subscriptions` (admin): every subscription of the app.
pub async fn list_subscriptions(
    AdminSession(_): AdminSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<Subscription>>, ApiError> {
    let list = state.twitch.list_subscriptions().await?;
    Ok(Json(list.data))
}

/// `DELETE /api/twitch/subscriptions` (admin): clear the caller's subscriptions.
pub async fn clear_subscriptions(
    AdminSession(claims): AdminSession,
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, ApiError> {
    let deleted = state.reconciler.clear_subscriptions(&claims.user).await?;
    Ok(Json(ClearResponse { ok: true, deleted }))
}
