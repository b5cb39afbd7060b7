//! Per-user OAuth token pairs.
//!
//! Pairs obtained through the authorization-code flow are stored under
//! `@twitch-auth/<user>` and refreshed lazily when read after expiry.

use thiserror::Error;
use tracing::{info, instrument};

use streambridge_core::db::unix_timestamp;
use streambridge_core::{KvError, KvStore};

use super::types::TokenPair;
use super::{ProviderError, TwitchApi};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("user {0} has not linked a Twitch account")]
    NotLinked(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Kv(#[from] KvError),
}

/// Storage key of a user's token pair.
pub fn token_key(user: &str) -> String {
    format!("@twitch-auth/{user}")
}

pub async fn store_tokens(kv: &KvStore, user: &str, pair: &TokenPair) -> Result<(), KvError> {
    kv.put_json(&token_key(user), pair).await
}

pub async fn load_tokens(kv: &KvStore, user: &str) -> Result<Option<TokenPair>, KvError> {
    kv.get_json_opt(&token_key(user)).await
}

/// Return a usable access token for `user`, refreshing it if it expired.
pub async fn user_token(kv: &KvStore, api: &dyn TwitchApi, user: &str) -> Result<String, TokenError> {
    user_token_at(kv, api, user, unix_timestamp()).await
}

#[instrument(skip(kv, api))]
pub async fn user_token_at(
    kv: &KvStore,
    api: &dyn TwitchApi,
    user: &str,
    now: i64,
) -> Result<String, TokenError> {
    let Some(pair) = load_tokens(kv, user).await? else {
        return Err(TokenError::NotLinked(user.to_string()));
    };
    if !pair.is_expired_at(now) {
        return Ok(pair.access_token);
    }

    let mut refreshed = api.refresh_token(&pair.refresh_token).await?;
    if refreshed.refresh_token.is_empty() {
        refreshed.refresh_token = pair.refresh_token;
    }
    if refreshed.expires_in == 0 {
        refreshed.expires_in = pair.expires_in;
    }
    refreshed.obtained_at = now;
    store_tokens(kv, user, &refreshed).await?;
    info!(user = %user, "Refreshed Twitch user token");
    Ok(refreshed.access_token)
}
