//! Configuration resolution for Streambridge.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Config file (JSON, optional)
//! 3. Environment variables
//! 4. CLI arguments (highest priority, applied by the binary)

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Complete Streambridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub twitch: TwitchConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// HTTP server and process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub database_path: Option<PathBuf>,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 9999)),
            database_path: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

/// Twitch application credentials and public callback URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitchConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Shared secret the provider signs webhook deliveries with.
    pub webhook_secret: String,
    /// Public base URL of the webhook endpoint; the tenant name is appended.
    pub webhook_url: String,
    /// OAuth redirect URL registered with the provider.
    pub redirect_url: String,
    pub api_base_url: String,
    pub id_base_url: String,
}

impl Default for TwitchConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            webhook_secret: String::new(),
            webhook_url: String::new(),
            redirect_url: String::new(),
            api_base_url: "https://api.twitch.tv/helix".to_string(),
            id_base_url: "https://id.twitch.tv/oauth2".to_string(),
        }
    }
}

/// Session token configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub lifetime_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: 7 * 24 * 60 * 60, // 7 days
        }
    }
}

/// Webhook ingestion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Maximum number of events kept in each tenant's archive.
    pub history_limit: usize,
    /// Number of recent delivery ids remembered for deduplication.
    pub dedup_capacity: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            dedup_capacity: 1024,
        }
    }
}

/// Lookup cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Entries kept per lookup kind.
    pub lookup_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            lookup_capacity: 128,
        }
    }
}

/// Provider-imposed bounds on the webhook secret length.
const WEBHOOK_SECRET_LEN: std::ops::RangeInclusive<usize> = 10..=100;

impl Config {
    /// Check that the configuration can run a server.
    pub fn validate(&self) -> Result<()> {
        let twitch = &self.twitch;
        if twitch.client_id.is_empty() || twitch.client_secret.is_empty() {
            return Err(Error::Config(
                "TWITCH_CLIENT_ID and TWITCH_CLIENT_SECRET must be set to Twitch application credentials"
                    .into(),
            ));
        }
        if !WEBHOOK_SECRET_LEN.contains(&twitch.webhook_secret.len()) {
            return Err(Error::Config(
                "TWITCH_WEBHOOK_SECRET must be a random string between 10 and 100 characters"
                    .into(),
            ));
        }
        require_http_url("WEBHOOK_URI", &twitch.webhook_url)?;
        require_http_url("REDIRECT_URI", &twitch.redirect_url)?;
        if self.sessions.lifetime_secs == 0 {
            return Err(Error::Config("session lifetime must be positive".into()));
        }
        if self.webhook.history_limit == 0 {
            return Err(Error::Config("webhook history limit must be positive".into()));
        }
        Ok(())
    }
}

fn require_http_url(name: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| Error::Config(format!("{name} must be a valid URL ({value:?}): {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!("{name} must be an http(s) URL")));
    }
    Ok(())
}

/// Load configuration: defaults, then the optional file, then the process
/// environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => load_config_file(path)?,
        None => Config::default(),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    let twitch = &mut config.twitch;
    for (key, slot) in [
        ("TWITCH_CLIENT_ID", &mut twitch.client_id),
        ("TWITCH_CLIENT_SECRET", &mut twitch.client_secret),
        ("TWITCH_WEBHOOK_SECRET", &mut twitch.webhook_secret),
        ("WEBHOOK_URI", &mut twitch.webhook_url),
        ("REDIRECT_URI", &mut twitch.redirect_url),
    ] {
        if let Some(val) = lookup(key).filter(|v| !v.is_empty()) {
            *slot = val;
        }
    }

    if let Some(addr) = lookup("STREAMBRIDGE_BIND").filter(|v| !v.is_empty()) {
        config.server.bind = addr.parse().map_err(|e| {
            Error::Config(format!("Invalid STREAMBRIDGE_BIND address {addr:?}: {e}"))
        })?;
    }
    if let Some(path) = lookup("STREAMBRIDGE_DB_PATH") {
        config.server.database_path = Some(PathBuf::from(path));
    }
    if let Some(level) = lookup("STREAMBRIDGE_LOG_LEVEL") {
        config.server.log_level = level;
    }
    Ok(())
}

/// Default database location (`~/.streambridge/data.db`).
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".streambridge").join("data.db"))
}
