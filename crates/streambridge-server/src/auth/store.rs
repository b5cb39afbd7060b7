//! Credential & session store.
//!
//! Owns the user mapping and the session signing secret. Both are loaded
//! from the key-value store at startup and rewritten wholesale on every
//! mutation. Readers work on an immutable snapshot that is swapped in only
//! after the new state has been persisted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};

use streambridge_core::KvStore;
use streambridge_core::db::unix_timestamp;

use super::AuthError;
use super::claims::{SessionClaims, UserLevel};
use super::jwt::JwtManager;
use super::password;

/// Key holding the username → record mapping.
pub const USERS_KEY: &str = "streambridge-auth/users";
/// Key holding the raw signing secret.
pub const SECRET_KEY: &str = "streambridge-auth/secret";

const SECRET_LEN: usize = 32;

/// Usernames double as webhook callback path segments, so they are limited
/// to characters that need no escaping in a URL path.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'))
        && username != "."
        && username != ".."
}

/// Persisted user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user: String,
    /// argon2id PHC string of the user's shared secret.
    pub auth_hash: String,
    pub level: UserLevel,
}

/// Public view of a user record, without the credential hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub user: String,
    pub level: UserLevel,
}

impl From<&UserRecord> for UserSummary {
    fn from(record: &UserRecord) -> Self {
        Self {
            user: record.user.clone(),
            level: record.level,
        }
    }
}

type UserMap = HashMap<String, UserRecord>;

/// Immutable snapshot of everything verification needs.
struct AuthState {
    users: Arc<UserMap>,
    jwt: JwtManager,
}

pub struct CredentialStore {
    kv: KvStore,
    state: RwLock<Arc<AuthState>>,
    /// Serializes mutations so each one persists a complete mapping.
    write_gate: Mutex<()>,
    /// Verified against on unknown usernames so both failure paths cost one
    /// argon2 run.
    decoy_hash: String,
}

impl CredentialStore {
    /// Load users and the signing secret, creating a secret if none exists
    /// or `force_regenerate` is set.
    pub async fn init(kv: KvStore, force_regenerate: bool) -> Result<Self, AuthError> {
        let users = match kv.get_json_opt::<UserMap>(USERS_KEY).await? {
            Some(users) => users,
            None => {
                warn!("User storage not found, initializing new one");
                UserMap::new()
            }
        };

        let secret = if force_regenerate {
            None
        } else {
            match kv.get_key(SECRET_KEY).await {
                Ok(secret) if !secret.is_empty() => Some(secret),
                Ok(_) => None,
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e.into()),
            }
        };
        let secret = match secret {
            Some(secret) => secret,
            None => generate_and_store_secret(&kv).await?,
        };

        let mut decoy = [0u8; SECRET_LEN];
        OsRng.fill_bytes(&mut decoy);
        let decoy_hash = password::hash_secret(&hex::encode(decoy))
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        info!(users = users.len(), "Credential store loaded");

        Ok(Self {
            kv,
            state: RwLock::new(Arc::new(AuthState {
                users: Arc::new(users),
                jwt: JwtManager::new(&secret),
            })),
            write_gate: Mutex::new(()),
            decoy_hash,
        })
    }

    async fn snapshot(&self) -> Arc<AuthState> {
        Arc::clone(&*self.state.read().await)
    }

    /// Create or overwrite a user.
    #[instrument(skip(self, secret))]
    pub async fn add_user(
        &self,
        username: &str,
        secret: &str,
        level: UserLevel,
    ) -> Result<(), AuthError> {
        if username.is_empty() {
            return Err(AuthError::InvalidInput("username must not be empty".into()));
        }
        if !is_valid_username(username) {
            return Err(AuthError::InvalidInput(
                "username may only contain letters, digits, '_', '.' and '-'".into(),
            ));
        }
        if secret.is_empty() {
            return Err(AuthError::InvalidInput("secret must not be empty".into()));
        }
        let auth_hash =
            password::hash_secret(secret).map_err(|e| AuthError::Hashing(e.to_string()))?;

        let _gate = self.write_gate.lock().await;
        let current = self.snapshot().await;
        let mut users = UserMap::clone(&current.users);
        users.insert(
            username.to_string(),
            UserRecord {
                user: username.to_string(),
                auth_hash,
                level,
            },
        );
        self.kv.put_json(USERS_KEY, &users).await?;
        self.swap_users(users).await;

        info!(user = %username, level = %level, "User saved");
        Ok(())
    }

    /// Remove a user. Removing an unknown user is not an error.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, username: &str) -> Result<(), AuthError> {
        let _gate = self.write_gate.lock().await;
        let current = self.snapshot().await;
        let mut users = UserMap::clone(&current.users);
        let existed = users.remove(username).is_some();
        self.kv.put_json(USERS_KEY, &users).await?;
        self.swap_users(users).await;

        info!(user = %username, existed, "User deleted");
        Ok(())
    }

    async fn swap_users(&self, users: UserMap) {
        let mut state = self.state.write().await;
        let jwt = state.jwt.clone();
        *state = Arc::new(AuthState {
            users: Arc::new(users),
            jwt,
        });
    }

    pub async fn get_user(&self, username: &str) -> Option<UserSummary> {
        self.snapshot().await.users.get(username).map(UserSummary::from)
    }

    pub async fn count_users(&self) -> usize {
        self.snapshot().await.users.len()
    }

    /// All users sorted by name.
    pub async fn list_users(&self) -> Vec<UserSummary> {
        let state = self.snapshot().await;
        let mut users: Vec<UserSummary> = state.users.values().map(UserSummary::from).collect();
        users.sort_by(|a, b| a.user.cmp(&b.user));
        users
    }

    /// Check a user's secret and issue a session valid for `lifetime`.
    #[instrument(skip(self, secret))]
    pub async fn authenticate(
        &self,
        username: &str,
        secret: &str,
        lifetime: Duration,
    ) -> Result<(SessionClaims, String), AuthError> {
        let state = self.snapshot().await;
        let Some(record) = state.users.get(username) else {
            let _ = password::verify_secret(secret, &self.decoy_hash);
            return Err(AuthError::UserNotFound);
        };

        let valid = password::verify_secret(secret, &record.auth_hash)
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        if !valid {
            warn!(user = %username, "Failed authentication attempt");
            return Err(AuthError::InvalidCredential);
        }

        let lifetime_secs = i64::try_from(lifetime.as_secs()).unwrap_or(i64::MAX);
        state
            .jwt
            .issue(&record.user, record.level, lifetime_secs, unix_timestamp())
    }

    /// Verify a session token against the current secret.
    pub async fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        self.verify_at(token, unix_timestamp()).await
    }

    /// Verify a session token as of `now` (unix seconds).
    pub async fn verify_at(&self, token: &str, now: i64) -> Result<SessionClaims, AuthError> {
        self.snapshot().await.jwt.validate_at(token, now)
    }

    /// Replace the signing secret, invalidating every issued token.
    #[instrument(skip(self))]
    pub async fn regenerate_secret(&self) -> Result<(), AuthError> {
        let _gate = self.write_gate.lock().await;
        let secret = generate_and_store_secret(&self.kv).await?;
        let mut state = self.state.write().await;
        let users = Arc::clone(&state.users);
        *state = Arc::new(AuthState {
            users,
            jwt: JwtManager::new(&secret),
        });
        Ok(())
    }
}

async fn generate_and_store_secret(kv: &KvStore) -> Result<Vec<u8>, AuthError> {
    warn!("Generating new session signing secret, previously issued sessions become invalid");
    let mut secret = vec![0u8; SECRET_LEN];
    OsRng.fill_bytes(&mut secret);
    kv.put_key(SECRET_KEY, &secret).await?;
    info!("Generated session signing secret");
    Ok(secret)
}
