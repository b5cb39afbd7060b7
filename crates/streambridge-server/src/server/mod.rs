//! HTTP boundary: axum routes over the core subsystems.

pub mod auth_api;
pub mod extract;
pub mod health;
pub mod lookup_api;
pub mod response;
pub mod routes;
pub mod state;
pub mod twitch_api;
pub mod webhook_api;


pub use routes::build_router;
pub use state::AppState;
