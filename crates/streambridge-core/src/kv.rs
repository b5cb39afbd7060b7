//! Namespaced key-value store backed by `SQLite`.
//!
//! Keys are opaque strings. Callers that store per-tenant data are
//! responsible for prefixing keys with [`user_namespace`].

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::db::{self, DatabaseError, unix_timestamp};

/// Key-value store errors.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Database(#[from] DatabaseError),

    #[error("JSON error for key {key}: {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<sqlx::Error> for KvError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(DatabaseError::from(e))
    }
}

impl KvError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Deterministic key prefix isolating one tenant's data.
pub fn user_namespace(user: &str) -> String {
    format!("@userdata/{user}/")
}

#[derive(Clone)]
pub struct KvStore {
    pool: Pool<Sqlite>,
}

impl KvStore {
    /// Open or create a store at the given path.
    pub async fn open(path: &Path) -> Result<Self, KvError> {
        let pool = db::open_pool(path).await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub async fn open_in_memory() -> Result<Self, KvError> {
        let pool = db::open_pool_in_memory().await?;
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;

        info!("Key-value store migrations complete");
        Ok(())
    }

    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Read the raw bytes stored under `key`.
    pub async fn get_key(&self, key: &str) -> Result<Vec<u8>, KvError> {
        sqlx::query_scalar::<_, Vec<u8>>("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| KvError::NotFound(key.to_string()))
    }

    /// Store raw bytes under `key`, replacing any previous value.
    pub async fn put_key(&self, key: &str, value: &[u8]) -> Result<(), KvError> {
        sqlx::query(
            "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Read and decode the JSON document stored under `key`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, KvError> {
        let raw = self.get_key(key).await?;
        serde_json::from_slice(&raw).map_err(|source| KvError::Json {
            key: key.to_string(),
            source,
        })
    }

    /// Like [`Self::get_json`], but maps a missing key to `None`.
    pub async fn get_json_opt<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, KvError> {
        match self.get_json(key).await {
            Ok(value) => Ok(Some(value)),
            Err(KvError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Encode `value` as JSON and store it under `key`.
    pub async fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), KvError> {
        let raw = serde_json::to_vec(value).map_err(|source| KvError::Json {
            key: key.to_string(),
            source,
        })?;
        self.put_key(key, &raw).await
    }

    /// Delete `key`. Returns whether a value was present.
    pub async fn delete_key(&self, key: &str) -> Result<bool, KvError> {
        let result = sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// List every key starting with `prefix`, sorted.
    pub async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, KvError> {
        let keys = sqlx::query_scalar::<_, String>(
            "SELECT key FROM kv WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )
        .bind(prefix)
        .fetch_all(self.pool())
        .await?;
        Ok(keys)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn test_store() -> KvStore {
        KvStore::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let kv = test_store().await;
        let err = kv.get_key("nope").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(kv.get_json_opt::<String>("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_key_overwrites() {
        let kv = test_store().await;
        kv.put_key("k", b"one").await.unwrap();
        kv.put_key("k", b"two").await.unwrap();
        assert_eq!(kv.get_key("k").await.unwrap(), b"two");
    }

    #[tokio::test]
    async fn json_values_are_stored_as_documents() {
        let kv = test_store().await;
        kv.put_json("doc", &vec![1, 2, 3]).await.unwrap();
        let back: Vec<i32> = kv.get_json("doc").await.unwrap();
        assert_eq!(back, vec![1, 2, 3]);
        assert_eq!(kv.get_key("doc").await.unwrap(), b"[1,2,3]");
    }

    #[tokio::test]
    async fn malformed_json_reports_key() {
        let kv = test_store().await;
        kv.put_key("bad", b"{not json").await.unwrap();
        let err = kv.get_json::<Vec<i32>>("bad").await.unwrap_err();
        assert!(matches!(err, KvError::Json { ref key, .. } if key == "bad"));
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let kv = test_store().await;
        kv.put_key("k", b"v").await.unwrap();
        assert!(kv.delete_key("k").await.unwrap());
        assert!(!kv.delete_key("k").await.unwrap());
    }

    #[tokio::test]
    async fn namespaces_isolate_tenants() {
        let kv = test_store().await;
        let alice = user_namespace("alice");
        let bob = user_namespace("bob");
        kv.put_key(&format!("{alice}a"), b"1").await.unwrap();
        kv.put_key(&format!("{alice}b"), b"2").await.unwrap();
        kv.put_key(&format!("{bob}a"), b"3").await.unwrap();

        let keys = kv.list_prefix(&alice).await.unwrap();
        assert_eq!(keys, vec!["@userdata/alice/a", "@userdata/alice/b"]);
    }

    #[tokio::test]
    async fn prefix_listing_treats_wildcards_literally() {
        let kv = test_store().await;
        kv.put_key("a_b", b"1").await.unwrap();
        kv.put_key("axb", b"2").await.unwrap();
        assert_eq!(kv.list_prefix("a_").await.unwrap(), vec!["a_b"]);
    }
}
