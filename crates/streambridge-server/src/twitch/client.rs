//! Twitch Helix REST client.
//!
//! Uses reqwest to call the EventSub, users, channels and OAuth endpoints.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, info};

use streambridge_core::config::TwitchConfig;
use streambridge_core::db::unix_timestamp;

use super::types::{
    ApiErrorBody, AppToken, ChannelInformation, CreateSubscription, DataEnvelope, Identity,
    LookupKind, SubscriptionList, TokenPair, TwitchUser,
};
use super::{ProviderError, TwitchApi, USER_SCOPES};

/// Twitch Helix REST client authenticated with an app access token.
#[derive(Debug)]
pub struct TwitchClient {
    http: reqwest::Client,
    api_base: String,
    id_base: String,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    app_token: Option<String>,
}

impl TwitchClient {
    /// Create a client without an app access token.
    pub fn new(config: &TwitchConfig) -> Result<Self, ProviderError> {
        if config.client_id.is_empty() {
            return Err(ProviderError::Config("client_id is empty".into()));
        }
        if config.client_secret.is_empty() {
            return Err(ProviderError::Config("client_secret is empty".into()));
        }

        let mut headers = HeaderMap::new();
        let client_id = HeaderValue::from_str(&config.client_id)
            .map_err(|_| ProviderError::Config("Invalid client_id format".into()))?;
        headers.insert("Client-Id", client_id);

        // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
        // The `Err` case just means it was already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base_url.trim_end_matches('/').to_string(),
            id_base: config.id_base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
            app_token: None,
        })
    }

    /// Create a client and obtain an app access token.
    pub async fn connect(config: &TwitchConfig) -> Result<Self, ProviderError> {
        let mut client = Self::new(config)?;
        let token = client.request_app_token().await?;
        client.app_token = Some(token);
        info!("Helix API access authorized");
        Ok(client)
    }

    /// Build the Helix URL for a given path.
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Build the identity (OAuth) URL for a given path.
    pub(crate) fn id_url(&self, path: &str) -> String {
        format!("{}{}", self.id_base, path)
    }

    fn app_bearer(&self) -> Result<&str, ProviderError> {
        self.app_token
            .as_deref()
            .ok_or_else(|| ProviderError::Config("app access token not acquired".into()))
    }

    /// Turn a non-success response into a provider-reported error.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
        Err(ProviderError::Api {
            status: status.as_u16(),
            error: if parsed.error.is_empty() {
                status.canonical_reason().unwrap_or("Unknown").to_string()
            } else {
                parsed.error
            },
            message: parsed.message,
        })
    }

    async fn request_app_token(&self) -> Result<String, ProviderError> {
        let resp = self
            .http
            .post(self.id_url("/token"))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;
        let token: AppToken = Self::check(resp).await?.json().await?;
        Ok(token.access_token)
    }

    async fn token_grant(&self, params: &[(&str, &str)]) -> Result<TokenPair, ProviderError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(params);
        let resp = self.http.post(self.id_url("/token")).form(&form).send().await?;
        let mut pair: TokenPair = Self::check(resp).await?.json().await?;
        pair.obtained_at = unix_timestamp();
        Ok(pair)
    }
}

#[async_trait]
impl TwitchApi for TwitchClient {
    async fn list_subscriptions(&self) -> Result<SubscriptionList, ProviderError> {
        let resp = self
            .http
            .get(self.api_url("/eventsub/subscriptions"))
            .bearer_auth(self.app_bearer()?)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn create_subscription(
        &self,
        request: &CreateSubscription,
    ) -> Result<SubscriptionList, ProviderError> {
        debug!(topic = %request.topic, "Creating EventSub subscription");
        let resp = self
            .http
            .post(self.api_url("/eventsub/subscriptions"))
            .bearer_auth(self.app_bearer()?)
            .json(request)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn remove_subscription(&self, id: &str) -> Result<(), ProviderError> {
        let resp = self
            .http
            .delete(self.api_url("/eventsub/subscriptions"))
            .query(&[("id", id)])
            .bearer_auth(self.app_bearer()?)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn lookup(&self, kind: LookupKind, id: &str) -> Result<Vec<Identity>, ProviderError> {
        let bearer = self.app_bearer()?;
        match kind {
            LookupKind::User => {
                let resp = self
                    .http
                    .get(self.api_url("/users"))
                    .query(&[("id", id)])
                    .bearer_auth(bearer)
                    .send()
                    .await?;
                let users: DataEnvelope<TwitchUser> = Self::check(resp).await?.json().await?;
                Ok(users.data.into_iter().map(Identity::from).collect())
            }
            LookupKind::Channel => {
                let resp = self
                    .http
                    .get(self.api_url("/channels"))
                    .query(&[("broadcaster_id", id)])
                    .bearer_auth(bearer)
                    .send()
                    .await?;
                let channels: DataEnvelope<ChannelInformation> =
                    Self::check(resp).await?.json().await?;
                Ok(channels.data.into_iter().map(Identity::from).collect())
            }
        }
    }

    async fn current_user(&self, user_token: &str) -> Result<TwitchUser, ProviderError> {
        let resp = self
            .http
            .get(self.api_url("/users"))
            .bearer_auth(user_token)
            .send()
            .await?;
        let users: DataEnvelope<TwitchUser> = Self::check(resp).await?.json().await?;
        users
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Response("token owner not returned".into()))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenPair, ProviderError> {
        self.token_grant(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_url.as_str()),
        ])
        .await
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, ProviderError> {
        self.token_grant(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    fn authorization_url(&self, state: &str) -> String {
        let scopes = USER_SCOPES.join(" ");
        let base = self.id_url("/authorize");
        match url::Url::parse_with_params(
            &base,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", scopes.as_str()),
                ("state", state),
            ],
        ) {
            Ok(url) => url.into(),
            Err(_) => base,
        }
    }
}
