//! Twitch Helix API data types.
//!
//! Only the fields this service reads are modeled; unknown fields are
//! ignored on deserialization.

use serde::{Deserialize, Serialize};

/// Subscription status meaning the provider is actively delivering events.
pub const STATUS_ENABLED: &str = "enabled";

/// An EventSub subscription as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub status: String,
    #[serde(rename = "type")]
    pub topic: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub condition: Condition,
    pub transport: Transport,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub cost: i64,
}

impl Subscription {
    pub fn is_enabled(&self) -> bool {
        self.status == STATUS_ENABLED
    }
}

/// Subscription condition. Exactly one of the fields is set for the topics
/// this service uses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcaster_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_broadcaster_user_id: Option<String>,
}

/// Delivery transport of a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transport {
    pub method: String,
    #[serde(default)]
    pub callback: String,
    /// Only sent on creation; never echoed back by the provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl Transport {
    pub fn webhook(callback: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            method: "webhook".to_string(),
            callback: callback.into(),
            secret: Some(secret.into()),
        }
    }
}

/// Body of a subscription creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateSubscription {
    #[serde(rename = "type")]
    pub topic: String,
    pub version: String,
    pub condition: Condition,
    pub transport: Transport,
}

/// Subscription list returned by both the list and create endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionList {
    pub data: Vec<Subscription>,
    pub total: i64,
    pub total_cost: i64,
    pub max_total_cost: i64,
}

/// Generic `{"data": [...]}` envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// A Twitch user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitchUser {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(rename = "type")]
    pub user_type: String,
    pub broadcaster_type: String,
    pub description: String,
    pub profile_image_url: String,
    pub created_at: String,
}

/// Channel information as returned by `GET /channels`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ChannelInformation {
    pub broadcaster_id: String,
    pub broadcaster_login: String,
    pub broadcaster_name: String,
}

/// What kind of external id is being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupKind {
    User,
    Channel,
}

impl LookupKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Channel => "channel",
        }
    }
}

/// Display identity resolved from a numeric id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub login: String,
    pub display_name: String,
}

impl From<TwitchUser> for Identity {
    fn from(user: TwitchUser) -> Self {
        Self {
            id: user.id,
            login: user.login,
            display_name: user.display_name,
        }
    }
}

impl From<ChannelInformation> for Identity {
    fn from(channel: ChannelInformation) -> Self {
        Self {
            id: channel.broadcaster_id,
            login: channel.broadcaster_login,
            display_name: channel.broadcaster_name,
        }
    }
}

/// OAuth token pair for a user who linked their Twitch account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: String,
    /// Lifetime of the access token in seconds.
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Vec<String>,
    /// When the pair was obtained (unix seconds). Set locally.
    #[serde(default)]
    pub obtained_at: i64,
}

impl TokenPair {
    pub const fn is_expired_at(&self, now: i64) -> bool {
        now > self.obtained_at.saturating_add(self.expires_in)
    }
}

/// App access token from the client-credentials grant.
#[derive(Debug, Deserialize)]
pub(crate) struct AppToken {
    pub access_token: String,
}

/// Error body returned by Helix and the identity endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ApiErrorBody {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn subscription_from_provider_json() {
        let json = r#"{
            "id": "f1c2a387",
            "status": "webhook_callback_verification_failed",
            "type": "channel.follow",
            "version": "1",
            "condition": {"broadcaster_user_id": "1234"},
            "created_at": "2021-03-10T15:34:02Z",
            "transport": {"method": "webhook", "callback": "https://example.com/webhook/alice"},
            "cost": 1
        }"#;
        let sub: Subscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.topic, "channel.follow");
        assert!(!sub.is_enabled());
        assert_eq!(sub.condition.broadcaster_user_id.as_deref(), Some("1234"));
        assert!(sub.transport.secret.is_none());
    }

    #[test]
    fn create_request_omits_unset_condition_fields() {
        let req = CreateSubscription {
            topic: "channel.raid".into(),
            version: "1".into(),
            condition: Condition {
                broadcaster_user_id: None,
                to_broadcaster_user_id: Some("42".into()),
            },
            transport: Transport::webhook("https://example.com/webhook/alice", "secretsecret"),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["type"], "channel.raid");
        assert_eq!(value["condition"], serde_json::json!({"to_broadcaster_user_id": "42"}));
        assert_eq!(value["transport"]["secret"], "secretsecret");
    }

    #[test]
    fn channel_identity_uses_broadcaster_login() {
        let identity = Identity::from(ChannelInformation {
            broadcaster_id: "7".into(),
            broadcaster_login: "ramuramu".into(),
            broadcaster_name: "ラムラム".into(),
        });
        assert_eq!(identity.id, "7");
        assert_eq!(identity.login, "ramuramu");
        assert_eq!(identity.display_name, "ラムラム");
    }

    #[test]
    fn token_pair_expiry() {
        let pair = TokenPair {
            access_token: "a".into(),
            refresh_token: "r".into(),
            token_type: "bearer".into(),
            expires_in: 100,
            scope: vec![],
            obtained_at: 1000,
        };
        assert!(!pair.is_expired_at(1100));
        assert!(pair.is_expired_at(1101));
    }
}
