//! `POST /webhook/{tenant}`: EventSub delivery endpoint.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};

use super::state::AppState;
use crate::webhook::DeliveryOutcome;

/// Every delivery is acknowledged with `200`; only a verification
/// challenge gets a body.
pub async fn receive(
    State(state): State<AppState>,
    Path(tenant): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match state.webhooks.handle_delivery(&tenant, &headers, &body).await {
        DeliveryOutcome::Challenge(challenge) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain")],
            challenge,
        )
            .into_response(),
        DeliveryOutcome::Accepted
        | DeliveryOutcome::Duplicate
        | DeliveryOutcome::Rejected
        | DeliveryOutcome::Malformed
        | DeliveryOutcome::PersistFailed => StatusCode::OK.into_response(),
    }
}
