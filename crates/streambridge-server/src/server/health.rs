//! Liveness endpoint.

use axum::Json;

use super::response::OkBody;

/// `GET /health`. If this handler runs, the server is accepting requests.
pub async fn health() -> Json<OkBody> {
    OkBody::ok()
}
