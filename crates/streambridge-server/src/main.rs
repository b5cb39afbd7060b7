//! Streambridge Server
//!
//! Session-authenticated HTTP API that links streamer accounts to Twitch,
//! keeps their EventSub subscriptions in place and archives webhook events.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use streambridge_core::KvStore;
use streambridge_core::config::{default_database_path, load_config};
use streambridge_core::tracing_init::{default_filter, init_tracing};

use streambridge_server::auth::{CredentialStore, UserLevel};
use streambridge_server::server::{AppState, build_router};
use streambridge_server::twitch::TwitchClient;

#[derive(Parser, Debug)]
#[command(name = "streambridge-server")]
#[command(
    version,
    about = "Streambridge server - Twitch EventSub bridge with per-user storage"
)]
struct Args {
    /// JSON config file.
    #[arg(long, env = "STREAMBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// Create or overwrite an admin user, as `user:secret`.
    #[arg(long, value_name = "USER:SECRET")]
    bootstrap: Option<String>,

    /// Generate a new session signing secret, invalidating every session.
    #[arg(long)]
    regen_secret: bool,
}

fn parse_bootstrap(value: &str) -> anyhow::Result<(&str, &str)> {
    match value.split_once(':') {
        Some((user, secret)) if !user.is_empty() && !secret.is_empty() => Ok((user, secret)),
        _ => anyhow::bail!("--bootstrap must be in the form user:secret"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if let Some(path) = args.db_path {
        config.server.database_path = Some(path);
    }
    config.server.log_json |= args.log_json;

    init_tracing(
        &default_filter(env!("CARGO_PKG_NAME"), &config.server.log_level),
        config.server.log_json,
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.bind,
        "Starting streambridge-server"
    );

    config.validate()?;

    let db_path = match config.server.database_path.clone() {
        Some(path) => path,
        None => default_database_path().context("Cannot determine home directory")?,
    };
    info!(path = %db_path.display(), "Opening database");
    let kv = KvStore::open(&db_path).await?;

    let credentials = CredentialStore::init(kv.clone(), args.regen_secret).await?;

    if let Some(bootstrap) = args.bootstrap.as_deref() {
        let (user, secret) = parse_bootstrap(bootstrap)?;
        credentials.add_user(user, secret, UserLevel::Admin).await?;
        info!(user, "Bootstrap admin user saved");
    } else if credentials.count_users().await == 0 {
        warn!("No users exist; start with --bootstrap user:secret to create an admin");
    }

    let twitch = TwitchClient::connect(&config.twitch)
        .await
        .context("Failed to authorize with Twitch")?;

    let state = AppState::new(&config, kv, credentials, Arc::new(twitch));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.server.bind).await?;
    info!(addr = %config.server.bind, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Server stopped");
    Ok(())
}
