//! In-process [`TwitchApi`] fake for tests.
//!
//! Keeps a mutable subscription list, records every mutating call and can
//! be told to fail specific operations.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{
    CreateSubscription, Identity, LookupKind, STATUS_ENABLED, Subscription, SubscriptionList,
    TokenPair, Transport, TwitchUser,
};
use super::{ProviderError, TwitchApi};

#[derive(Default)]
struct FakeState {
    subscriptions: Vec<Subscription>,
    created: Vec<CreateSubscription>,
    removed: Vec<String>,
    identities: HashMap<(LookupKind, String), Identity>,
    lookup_calls: usize,
    lookup_delay: Option<Duration>,
    refresh_calls: usize,
    next_id: usize,
    fail_list: bool,
    /// Number of creations that succeed before every further one fails.
    fail_creation_after: Option<usize>,
    fail_removal: HashSet<String>,
    current_user: Option<TwitchUser>,
}

#[derive(Default)]
pub struct FakeTwitch {
    state: Mutex<FakeState>,
}

impl FakeTwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a subscription the provider already knows about.
    pub fn add_subscription(&self, topic: &str, status: &str, callback: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("seed-{}", state.next_id);
        state.subscriptions.push(Subscription {
            id: id.clone(),
            status: status.to_string(),
            topic: topic.to_string(),
            version: "1".to_string(),
            condition: super::Condition::default(),
            transport: Transport {
                method: "webhook".to_string(),
                callback: callback.to_string(),
                secret: None,
            },
            created_at: String::new(),
            cost: 1,
        });
        id
    }

    pub fn set_identity(&self, kind: LookupKind, identity: Identity) {
        self.state
            .lock()
            .unwrap()
            .identities
            .insert((kind, identity.id.clone()), identity);
    }

    pub fn set_current_user(&self, user: TwitchUser) {
        self.state.lock().unwrap().current_user = Some(user);
    }

    pub fn fail_list(&self) {
        self.state.lock().unwrap().fail_list = true;
    }

    pub fn fail_creation_after(&self, successes: usize) {
        self.state.lock().unwrap().fail_creation_after = Some(successes);
    }

    pub fn fail_removal(&self, id: &str) {
        self.state.lock().unwrap().fail_removal.insert(id.to_string());
    }

    pub fn created(&self) -> Vec<CreateSubscription> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.state.lock().unwrap().removed.clone()
    }

    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    /// Make every lookup take `delay` before answering.
    pub fn set_lookup_delay(&self, delay: Duration) {
        self.state.lock().unwrap().lookup_delay = Some(delay);
    }

    pub fn lookup_calls(&self) -> usize {
        self.state.lock().unwrap().lookup_calls
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.lock().unwrap().refresh_calls
    }
}

fn list_of(subscriptions: Vec<Subscription>, all: &[Subscription]) -> SubscriptionList {
    let total_cost = all.iter().map(|s| s.cost).sum();
    SubscriptionList {
        data: subscriptions,
        total: i64::try_from(all.len()).unwrap(),
        total_cost,
        max_total_cost: 10_000,
    }
}

#[async_trait]
impl TwitchApi for FakeTwitch {
    async fn list_subscriptions(&self) -> Result<SubscriptionList, ProviderError> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(ProviderError::Api {
                status: 503,
                error: "Service Unavailable".into(),
                message: String::new(),
            });
        }
        Ok(list_of(state.subscriptions.clone(), &state.subscriptions))
    }

    async fn create_subscription(
        &self,
        request: &CreateSubscription,
    ) -> Result<SubscriptionList, ProviderError> {
        let mut state = self.state.lock().unwrap();
        if state
            .fail_creation_after
            .is_some_and(|limit| state.created.len() >= limit)
        {
            return Err(ProviderError::Api {
                status: 409,
                error: "Conflict".into(),
                message: "subscription already exists".into(),
            });
        }
        state.created.push(request.clone());
        state.next_id += 1;
        let sub = Subscription {
            id: format!("created-{}", state.next_id),
            status: STATUS_ENABLED.to_string(),
            topic: request.topic.clone(),
            version: request.version.clone(),
            condition: request.condition.clone(),
            transport: Transport {
                method: request.transport.method.clone(),
                callback: request.transport.callback.clone(),
                secret: None,
            },
            created_at: String::new(),
            cost: 1,
        };
        state.subscriptions.push(sub.clone());
        Ok(list_of(vec![sub], &state.subscriptions))
    }

    async fn remove_subscription(&self, id: &str) -> Result<(), ProviderError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_removal.contains(id) {
            return Err(ProviderError::Api {
                status: 500,
                error: "Internal Server Error".into(),
                message: String::new(),
            });
        }
        state.subscriptions.retain(|s| s.id != id);
        state.removed.push(id.to_string());
        Ok(())
    }

    async fn lookup(&self, kind: LookupKind, id: &str) -> Result<Vec<Identity>, ProviderError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.lookup_calls += 1;
            state.lookup_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .identities
            .get(&(kind, id.to_string()))
            .cloned()
            .into_iter()
            .collect())
    }

    async fn current_user(&self, _user_token: &str) -> Result<TwitchUser, ProviderError> {
        self.state
            .lock()
            .unwrap()
            .current_user
            .clone()
            .ok_or_else(|| ProviderError::Response("token owner not returned".into()))
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenPair, ProviderError> {
        Ok(TokenPair {
            access_token: format!("access-{code}"),
            refresh_token: format!("refresh-{code}"),
            token_type: "bearer".into(),
            expires_in: 3600,
            scope: super::USER_SCOPES.iter().map(ToString::to_string).collect(),
            obtained_at: streambridge_core::db::unix_timestamp(),
        })
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<TokenPair, ProviderError> {
        self.state.lock().unwrap().refresh_calls += 1;
        // The refresh grant omits the lifetime and sometimes the new refresh token.
        Ok(TokenPair {
            access_token: format!("refreshed-{refresh_token}"),
            refresh_token: String::new(),
            token_type: "bearer".into(),
            expires_in: 0,
            scope: Vec::new(),
            obtained_at: 0,
        })
    }

    fn authorization_url(&self, state: &str) -> String {
        format!("https://id.twitch.test/oauth2/authorize?state={state}")
    }
}
