//! Router assembly.

use axum::Router;
use axum::http::Method;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::state::AppState;
use super::{auth_api, health, lookup_api, twitch_api, webhook_api};

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    let api = Router::new()
        .route("/auth", post(auth_api::authenticate))
        .route("/users", get(auth_api::list_users).post(auth_api::add_user))
        .route("/users/{name}", delete(auth_api::delete_user))
        .route("/admin/regenerate-secret", post(auth_api::regenerate_secret))
        .route("/twitch/authorize", get(twitch_api::authorize))
        .route("/twitch/user", get(twitch_api::current_user))
        .route(
            "/twitch/subscriptions",
            get(twitch_api::list_subscriptions).delete(twitch_api::clear_subscriptions),
        )
        .route("/twitch/subscriptions/reconcile", post(twitch_api::reconcile))
        .route("/lookup/user/{id}", get(lookup_api::user))
        .route("/lookup/channel/{id}", get(lookup_api::channel));

    Router::new()
        .nest("/api", api)
        .route("/callback", get(twitch_api::callback))
        .route("/webhook/{tenant}", post(webhook_api::receive))
        .route("/health", get(health::health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
