//! Shared tracing/logging initialization.
//!
//! The server binary and any auxiliary tools set up `tracing_subscriber`
//! with an env-filter and optional JSON output through this helper.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialise the global tracing subscriber.
///
/// * `default_filter` -- filter used when `RUST_LOG` is not set
///   (e.g. `"streambridge_server=info"`).
/// * `log_json` -- when `true`, emit structured JSON log lines instead of the
///   human-readable format.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
    );
    if log_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Build the default filter string for a crate at the given level.
///
/// Crate names use underscores in targets, so `streambridge-server` becomes
/// `streambridge_server`.
pub fn default_filter(crate_name: &str, level: &str) -> String {
    format!("{}={level}", crate_name.replace('-', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_normalises_crate_name() {
        assert_eq!(
            default_filter("streambridge-server", "debug"),
            "streambridge_server=debug"
        );
    }
}
