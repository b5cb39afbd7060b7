use axum::http::HeaderMap;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use streambridge_core::{KvError, KvStore, user_namespace};

use crate::twitch::signature::{self, HEADER_MESSAGE_ID, HEADER_TIMESTAMP};

/// Key of the most recent event for `tenant`.
pub fn latest_event_key(tenant: &str) -> String {
    format!("{}twitch/eventsub-event", user_namespace(tenant))
}

/// Key of the bounded event history for `tenant`.
pub fn history_key(tenant: &str) -> String {
    format!("{}twitch/eventsub-history", user_namespace(tenant))
}

/// Notification body as sent by the provider.
#[derive(Debug, Deserialize)]
struct Notification {
    #[serde(default)]
    subscription: Value,
    #[serde(default)]
    challenge: String,
    #[serde(default)]
    event: Value,
}

/// Event as stored in the tenant namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub subscription: Value,
    pub event: Value,
}

/// What happened to a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Signature missing or invalid.
    Rejected,
    /// Message id seen before; nothing was done.
    Duplicate,
    /// Body could not be decoded.
    Malformed,
    /// Verification handshake; the challenge must be echoed back.
    Challenge(String),
    /// Event archived.
    Accepted,
    /// Event could not be archived. Still acknowledged to the provider.
    PersistFailed,
}

pub struct WebhookIngestor {
    kv: KvStore,
    secret: Vec<u8>,
    history_limit: usize,
    /// message id → delivery timestamp.
    dedup: Cache<String, String>,
    /// Guards the archive read-modify-write for every tenant at once.
    // TODO: shard per tenant once archive writes show up as contention.
    archive_lock: Mutex<()>,
}

impl WebhookIngestor {
    pub fn new(kv: KvStore, secret: &str, history_limit: usize, dedup_capacity: u64) -> Self {
        Self {
            kv,
            secret: secret.as_bytes().to_vec(),
            history_limit,
            dedup: Cache::builder().max_capacity(dedup_capacity).build(),
            archive_lock: Mutex::new(()),
        }
    }

    /// Process one delivery for `tenant`.
    #[instrument(skip(self, headers, body), fields(len = body.len()))]
    pub async fn handle_delivery(&self, tenant: &str, headers: &HeaderMap, body: &[u8]) -> DeliveryOutcome {
        if !signature::verify_delivery(&self.secret, headers, body) {
            warn!("Received webhook with invalid signature");
            return DeliveryOutcome::Rejected;
        }

        let message_id = signature::header(headers, HEADER_MESSAGE_ID).map(str::to_string);
        let timestamp = signature::header(headers, HEADER_TIMESTAMP).map(str::to_string);

        if self.seen(message_id.as_deref()) {
            debug!(message_id = ?message_id, "Duplicate delivery ignored");
            return DeliveryOutcome::Duplicate;
        }

        let notification: Notification = match serde_json::from_slice(body) {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "Failed to decode webhook body");
                return DeliveryOutcome::Malformed;
            }
        };

        if !notification.challenge.is_empty() {
            info!("Answering subscription verification challenge");
            return DeliveryOutcome::Challenge(notification.challenge);
        }

        let archived = ArchivedEvent {
            message_id: message_id.clone(),
            timestamp: timestamp.clone(),
            subscription: notification.subscription,
            event: notification.event,
        };

        let _guard = self.archive_lock.lock().await;
        // A concurrent copy of this delivery may have been archived while we waited.
        if self.seen(message_id.as_deref()) {
            debug!(message_id = ?message_id, "Duplicate delivery ignored");
            return DeliveryOutcome::Duplicate;
        }

        let outcome = match self.archive(tenant, &archived).await {
            Ok(()) => DeliveryOutcome::Accepted,
            Err(e) => {
                error!(error = %e, "Failed to persist webhook event");
                DeliveryOutcome::PersistFailed
            }
        };

        if let Some(id) = message_id {
            self.dedup.insert(id, timestamp.unwrap_or_default()).await;
        }
        outcome
    }

    fn seen(&self, message_id: Option<&str>) -> bool {
        message_id.is_some_and(|id| self.dedup.contains_key(id))
    }

    /// Overwrite the latest event and append to the bounded history.
    /// Caller must hold `archive_lock`.
    async fn archive(&self, tenant: &str, event: &ArchivedEvent) -> Result<(), KvError> {
        self.kv.put_json(&latest_event_key(tenant), event).await?;

        let key = history_key(tenant);
        let mut history: Vec<ArchivedEvent> = self.kv.get_json_opt(&key).await?.unwrap_or_default();
        history.push(event.clone());
        if history.len() > self.history_limit {
            let excess = history.len() - self.history_limit;
            history.drain(..excess);
        }
        self.kv.put_json(&key, &history).await
    }
}
