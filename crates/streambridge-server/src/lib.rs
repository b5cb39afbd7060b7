//! Streambridge Server Library
//!
//! Core functionality for the Streambridge server:
//! - Credential store with argon2-hashed secrets and JWT sessions
//! - Twitch Helix client and per-user OAuth tokens
//! - EventSub subscription reconciliation
//! - Idempotent webhook ingestion into per-user storage
//! - Cached id → identity lookups
//! - axum HTTP routes

pub mod auth;
pub mod lookup;
pub mod reconcile;
pub mod server;
pub mod twitch;
pub mod webhook;
