//! Tests for the Twitch Helix client.

#![allow(clippy::unwrap_used)]

use streambridge_core::config::TwitchConfig;

use super::client::TwitchClient;
use super::{ProviderError, TwitchApi};

fn config() -> TwitchConfig {
    TwitchConfig {
        client_id: "cid".into(),
        client_secret: "csecret".into(),
        webhook_secret: "0123456789abcdef".into(),
        webhook_url: "https://bridge.example.com/webhook".into(),
        redirect_url: "https://bridge.example.com/callback".into(),
        ..TwitchConfig::default()
    }
}

// =============================================================================
// Client construction tests
// =============================================================================

#[test]
fn empty_client_id_returns_config_error() {
    let mut cfg = config();
    cfg.client_id.clear();
    let err = TwitchClient::new(&cfg).unwrap_err();
    assert!(matches!(err, ProviderError::Config(_)));
}

#[test]
fn empty_client_secret_returns_config_error() {
    let mut cfg = config();
    cfg.client_secret.clear();
    let err = TwitchClient::new(&cfg).unwrap_err();
    assert!(matches!(err, ProviderError::Config(_)));
}

#[test]
fn client_id_with_newline_rejected() {
    let mut cfg = config();
    cfg.client_id = "bad\nid".into();
    assert!(matches!(
        TwitchClient::new(&cfg),
        Err(ProviderError::Config(_))
    ));
}

#[test]
fn valid_config_creates_client() {
    assert!(TwitchClient::new(&config()).is_ok());
}

// =============================================================================
// URL construction tests
// =============================================================================

#[test]
fn api_url_constructed_correctly() {
    let client = TwitchClient::new(&config()).unwrap();
    assert_eq!(
        client.api_url("/eventsub/subscriptions"),
        "https://api.twitch.tv/helix/eventsub/subscriptions"
    );
    assert_eq!(client.id_url("/token"), "https://id.twitch.tv/oauth2/token");
}

#[test]
fn trailing_slash_stripped_from_base_urls() {
    let mut cfg = config();
    cfg.api_base_url = "http://localhost:8080/mock/".into();
    cfg.id_base_url = "http://localhost:8080/auth/".into();
    let client = TwitchClient::new(&cfg).unwrap();
    assert_eq!(client.api_url("/users"), "http://localhost:8080/mock/users");
    assert_eq!(client.id_url("/token"), "http://localhost:8080/auth/token");
}

#[test]
fn authorization_url_carries_state_and_scopes() {
    let client = TwitchClient::new(&config()).unwrap();
    let url = url::Url::parse(&client.authorization_url("alice")).unwrap();

    assert_eq!(url.path(), "/oauth2/authorize");
    let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
    assert_eq!(params["client_id"], "cid");
    assert_eq!(params["state"], "alice");
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["redirect_uri"], "https://bridge.example.com/callback");
    assert!(params["scope"].contains("channel:read:redemptions"));
    assert!(params["scope"].contains("bits:read"));
}

#[tokio::test]
async fn calls_without_app_token_fail_before_sending() {
    let client = TwitchClient::new(&config()).unwrap();
    let err = client.list_subscriptions().await.unwrap_err();
    assert!(matches!(err, ProviderError::Config(_)));
}
