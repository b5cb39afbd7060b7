//! Error types for `Streambridge` core library.

use thiserror::Error;

/// Result type alias using `Streambridge` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `Streambridge` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
