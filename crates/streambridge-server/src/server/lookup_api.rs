//! Identity lookups through the shared cache.

use axum::Json;
use axum::extract::{Path, State};

use super::response::ApiError;
use super::state::AppState;
use crate::twitch::{Identity, LookupKind};

/// `GET /api/lookup/user/{id}`
pub async fn user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Identity>, ApiError> {
    Ok(Json(state.lookups.resolve(LookupKind::User, &id).await?))
}

/// `GET /api/lookup/channel/{id}`
pub async fn channel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Identity>, ApiError> {
    Ok(Json(state.lookups.resolve(LookupKind::Channel, &id).await?))
}
