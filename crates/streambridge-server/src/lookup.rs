//! Memoized external-id lookups.
//!
//! One bounded `moka` cache per [`LookupKind`]. A hit never reaches the
//! provider; a miss calls it exactly once and caches a successful result.
//! Concurrent misses for the same id share that one call.
//! Entries are never invalidated, so provider-side renames are only seen
//! once the entry has been evicted.

use std::sync::Arc;

use moka::future::Cache;
use thiserror::Error;
use tracing::debug;

use crate::twitch::{Identity, LookupKind, ProviderError, TwitchApi};

/// Default number of entries kept per lookup kind.
pub const DEFAULT_CAPACITY: u64 = 128;

#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("no {kind} found with id {id}")]
    NotFound { kind: &'static str, id: String },

    /// Shared between every caller that was waiting on the failed lookup.
    #[error(transparent)]
    Provider(Arc<ProviderError>),
}

impl From<ProviderError> for LookupError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(Arc::new(err))
    }
}

#[derive(Clone)]
pub struct LookupCache {
    api: Arc<dyn TwitchApi>,
    users: Cache<String, Identity>,
    channels: Cache<String, Identity>,
}

impl LookupCache {
    #[must_use]
    pub fn new(api: Arc<dyn TwitchApi>, capacity: u64) -> Self {
        Self {
            api,
            users: Cache::builder().max_capacity(capacity).build(),
            channels: Cache::builder().max_capacity(capacity).build(),
        }
    }

    const fn cache(&self, kind: LookupKind) -> &Cache<String, Identity> {
        match kind {
            LookupKind::User => &self.users,
            LookupKind::Channel => &self.channels,
        }
    }

    /// Resolve `id` to a display identity.
    pub async fn resolve(&self, kind: LookupKind, id: &str) -> Result<Identity, LookupError> {
        self.cache(kind)
            .try_get_with_by_ref(id, self.fetch(kind, id))
            .await
            .map_err(|e| LookupError::clone(&e))
    }

    async fn fetch(&self, kind: LookupKind, id: &str) -> Result<Identity, LookupError> {
        debug!(kind = kind.as_str(), id = %id, "Lookup cache miss");
        self.api
            .lookup(kind, id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| LookupError::NotFound {
                kind: kind.as_str(),
                id: id.to_string(),
            })
    }

    #[cfg(test)]
    async fn entry_count(&self, kind: LookupKind) -> u64 {
        let cache = self.cache(kind);
        cache.run_pending_tasks().await;
        cache.entry_count()
    }
}
