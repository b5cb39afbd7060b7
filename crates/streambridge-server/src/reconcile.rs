//! EventSub subscription reconciliation.
//!
//! Converges the provider's webhook subscriptions for a tenant onto
//! [`DESIRED_TOPICS`]. Only subscriptions whose callback is exactly the
//! tenant's callback URL are considered. Removing a disabled subscription
//! is best effort; a failed creation aborts the run without rolling back
//! earlier creations. Running again only attempts what is still missing.
//!
//! Only the first page of the provider's subscription list is read.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::twitch::{Condition, CreateSubscription, ProviderError, Transport, TwitchApi};

/// Topics every tenant is subscribed to, with their EventSub versions.
pub const DESIRED_TOPICS: &[(&str, &str)] = &[
    ("channel.update", "1"),
    ("channel.follow", "1"),
    ("channel.subscribe", "1"),
    ("channel.subscription.gift", "1"),
    ("channel.subscription.message", "1"),
    ("channel.cheer", "1"),
    ("channel.raid", "1"),
    ("channel.poll.begin", "1"),
    ("channel.poll.progress", "1"),
    ("channel.poll.end", "1"),
    ("channel.prediction.begin", "1"),
    ("channel.prediction.progress", "1"),
    ("channel.prediction.lock", "1"),
    ("channel.prediction.end", "1"),
    ("channel.hype_train.begin", "1"),
    ("channel.hype_train.progress", "1"),
    ("channel.hype_train.end", "1"),
    ("channel.channel_points_custom_reward.add", "1"),
    ("channel.channel_points_custom_reward.update", "1"),
    ("channel.channel_points_custom_reward.remove", "1"),
    ("channel.channel_points_custom_reward_redemption.add", "1"),
    ("channel.channel_points_custom_reward_redemption.update", "1"),
    ("stream.online", "1"),
    ("stream.offline", "1"),
];

/// Topic whose condition targets the tenant as the raid destination.
const RAID_TOPIC: &str = "channel.raid";

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed listing subscriptions: {0}")]
    List(#[source] ProviderError),

    #[error("failed creating {topic} subscription: {source}")]
    Create {
        topic: String,
        #[source]
        source: ProviderError,
    },

    #[error("failed removing subscription {id} after {deleted} removals: {source}")]
    Remove {
        id: String,
        deleted: usize,
        #[source]
        source: ProviderError,
    },
}

/// Condition for `topic` targeting `broadcaster_id`.
pub fn condition_for(topic: &str, broadcaster_id: &str) -> Condition {
    if topic == RAID_TOPIC {
        Condition {
            broadcaster_user_id: None,
            to_broadcaster_user_id: Some(broadcaster_id.to_string()),
        }
    } else {
        Condition {
            broadcaster_user_id: Some(broadcaster_id.to_string()),
            to_broadcaster_user_id: None,
        }
    }
}

pub struct SubscriptionReconciler {
    api: Arc<dyn TwitchApi>,
    webhook_base: String,
    webhook_secret: String,
}

impl SubscriptionReconciler {
    pub fn new(api: Arc<dyn TwitchApi>, webhook_base: &str, webhook_secret: &str) -> Self {
        Self {
            api,
            webhook_base: webhook_base.trim_end_matches('/').to_string(),
            webhook_secret: webhook_secret.to_string(),
        }
    }

    /// Callback URL deliveries for `tenant` are sent to.
    pub fn callback_for(&self, tenant: &str) -> String {
        format!("{}/{}", self.webhook_base, tenant)
    }

    /// Bring `tenant`'s subscriptions in line with [`DESIRED_TOPICS`].
    ///
    /// `broadcaster_id` is the tenant's provider user id. Returns the total
    /// cost reported by the last successful creation, or 0 if nothing was
    /// created.
    #[instrument(skip(self))]
    pub async fn reconcile(&self, broadcaster_id: &str, tenant: &str) -> Result<i64, ReconcileError> {
        let callback = self.callback_for(tenant);
        let subscriptions = self
            .api
            .list_subscriptions()
            .await
            .map_err(ReconcileError::List)?;

        let mut active: HashSet<String> = HashSet::new();
        for sub in subscriptions
            .data
            .iter()
            .filter(|s| s.transport.callback == callback)
        {
            if sub.is_enabled() {
                active.insert(sub.topic.clone());
                continue;
            }
            // Revoked or failed verification; drop it so it can be recreated.
            if let Err(e) = self.api.remove_subscription(&sub.id).await {
                warn!(id = %sub.id, topic = %sub.topic, status = %sub.status, error = %e,
                    "Failed to remove inactive subscription");
            }
        }

        let mut cost = 0;
        let mut created = 0usize;
        for &(topic, version) in DESIRED_TOPICS {
            if active.contains(topic) {
                continue;
            }
            let request = CreateSubscription {
                topic: topic.to_string(),
                version: version.to_string(),
                condition: condition_for(topic, broadcaster_id),
                transport: Transport::webhook(callback.clone(), self.webhook_secret.clone()),
            };
            match self.api.create_subscription(&request).await {
                Ok(list) => {
                    cost = list.total_cost;
                    created += 1;
                }
                Err(e) => {
                    match &e {
                        ProviderError::Api { error: err, message, .. } => {
                            error!(topic, err = %err, errmsg = %message, "Subscription error");
                        }
                        other => error!(topic, error = %other, "Subscription error"),
                    }
                    return Err(ReconcileError::Create {
                        topic: topic.to_string(),
                        source: e,
                    });
                }
            }
        }

        info!(created, cost, "Subscriptions reconciled");
        Ok(cost)
    }

    /// Remove every subscription whose callback's last path segment is
    /// `tenant`, whatever webhook base it was registered under.
    ///
    /// Stops at the first failed removal; the error carries how many
    /// subscriptions were removed before it.
    #[instrument(skip(self))]
    pub async fn clear_subscriptions(&self, tenant: &str) -> Result<usize, ReconcileError> {
        let subscriptions = self
            .api
            .list_subscriptions()
            .await
            .map_err(ReconcileError::List)?;

        let suffix = format!("/{tenant}");
        let mut deleted = 0;
        for sub in subscriptions
            .data
            .iter()
            .filter(|s| s.transport.callback.ends_with(&suffix))
        {
            self.api
                .remove_subscription(&sub.id)
                .await
                .map_err(|source| ReconcileError::Remove {
                    id: sub.id.clone(),
                    deleted,
                    source,
                })?;
            deleted += 1;
        }

        info!(deleted, "Subscriptions cleared");
        Ok(deleted)
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
