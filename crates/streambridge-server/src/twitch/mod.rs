//! Twitch Helix integration.
//!
//! Provides the [`TwitchApi`] seam used by the reconciler, the lookup cache
//! and the OAuth flow, a reqwest-based implementation of it, and webhook
//! signature verification.

mod client;
pub mod signature;
pub mod tokens;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;
#[cfg(test)]
mod tests;

use async_trait::async_trait;
use thiserror::Error;

pub use client::TwitchClient;
pub use types::{
    Condition, CreateSubscription, Identity, LookupKind, Subscription, SubscriptionList,
    TokenPair, Transport, TwitchUser,
};

/// Scopes requested when a streamer links their account.
pub const USER_SCOPES: &[&str] = &[
    "bits:read",
    "channel:read:subscriptions",
    "channel:read:redemptions",
    "channel:read:polls",
    "channel:read:predictions",
    "channel:read:hype_train",
];

/// Provider client errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Twitch API error ({status}): {error}: {message}")]
    Api {
        status: u16,
        error: String,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected response: {0}")]
    Response(String),
}

/// Operations this service needs from the provider.
///
/// All calls are independent requests; no retry is attempted on failure.
#[async_trait]
pub trait TwitchApi: Send + Sync {
    /// First page of the app's EventSub subscriptions.
    async fn list_subscriptions(&self) -> Result<SubscriptionList, ProviderError>;

    /// Create a subscription. The returned list carries the new cost totals.
    async fn create_subscription(
        &self,
        request: &CreateSubscription,
    ) -> Result<SubscriptionList, ProviderError>;

    async fn remove_subscription(&self, id: &str) -> Result<(), ProviderError>;

    /// Resolve an external id. An empty result means the id is unknown.
    async fn lookup(&self, kind: LookupKind, id: &str) -> Result<Vec<Identity>, ProviderError>;

    /// The user owning `user_token`.
    async fn current_user(&self, user_token: &str) -> Result<TwitchUser, ProviderError>;

    async fn exchange_code(&self, code: &str) -> Result<TokenPair, ProviderError>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, ProviderError>;

    /// URL the streamer visits to grant access; `state` comes back on the callback.
    fn authorization_url(&self, state: &str) -> String;
}
