//! Authentication module for the Streambridge server.
//!
//! Provides the credential & session store, session token management and
//! secret hashing.

pub mod claims;
pub mod jwt;
pub mod password;
pub mod store;


pub use claims::{SessionClaims, UserLevel};
pub use jwt::JwtManager;
pub use store::{CredentialStore, UserSummary};

use streambridge_core::KvError;

/// Errors returned by the credential & session store.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("user not found")]
    UserNotFound,

    #[error("invalid credentials")]
    InvalidCredential,

    #[error("token expired")]
    TokenExpired,

    #[error("malformed or unverifiable token")]
    TokenMalformed,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("secret hashing failed: {0}")]
    Hashing(String),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("auth persistence failed: {0}")]
    Persistence(#[from] KvError),
}
