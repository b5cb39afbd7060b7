//! `Streambridge` Core Library
//!
//! Shared functionality for `Streambridge` components:
//! - Configuration resolution and validation
//! - `SQLite` pool helpers and the namespaced key-value store
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod kv;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
pub use kv::{KvError, KvStore, user_namespace};
