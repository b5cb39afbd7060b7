//! Shared application state handed to every route.

use std::sync::Arc;
use std::time::Duration;

use streambridge_core::{Config, KvStore};

use crate::auth::CredentialStore;
use crate::lookup::LookupCache;
use crate::reconcile::SubscriptionReconciler;
use crate::twitch::TwitchApi;
use crate::webhook::WebhookIngestor;

#[derive(Clone)]
pub struct AppState {
    pub kv: KvStore,
    pub credentials: Arc<CredentialStore>,
    pub twitch: Arc<dyn TwitchApi>,
    pub lookups: LookupCache,
    pub reconciler: Arc<SubscriptionReconciler>,
    pub webhooks: Arc<WebhookIngestor>,
    pub session_lifetime: Duration,
}

impl AppState {
    /// Wire the subsystems together from `config`.
    pub fn new(
        config: &Config,
        kv: KvStore,
        credentials: CredentialStore,
        twitch: Arc<dyn TwitchApi>,
    ) -> Self {
        let reconciler = SubscriptionReconciler::new(
            Arc::clone(&twitch),
            &config.twitch.webhook_url,
            &config.twitch.webhook_secret,
        );
        let webhooks = WebhookIngestor::new(
            kv.clone(),
            &config.twitch.webhook_secret,
            config.webhook.history_limit,
            config.webhook.dedup_capacity,
        );
        Self {
            lookups: LookupCache::new(Arc::clone(&twitch), config.cache.lookup_capacity),
            reconciler: Arc::new(reconciler),
            webhooks: Arc::new(webhooks),
            credentials: Arc::new(credentials),
            session_lifetime: Duration::from_secs(config.sessions.lifetime_secs),
            kv,
            twitch,
        }
    }
}
