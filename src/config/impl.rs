use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;
use crate::errors::{FootprintError, Result};

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Loads `config.toml` on first access if
/// `init_config()` has not been called yet.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::load()))
        .load_full()
}

/// Initialize the global configuration
///
/// Loads configuration from "config.toml" in the current directory.
/// If the file doesn't exist, uses in-memory defaults.
///
/// # Examples
/// ```no_run
/// use footprint::config::init_config;
/// init_config();
/// ```
pub fn init_config() {
    CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::load()));
}

/// Replace the global configuration atomically
///
/// Readers holding an older `Arc` keep seeing the old values.
pub fn update_config(config: StaticConfig) {
    match CONFIG.get() {
        Some(swap) => swap.store(Arc::new(config)),
        None => {
            let _ = CONFIG.set(ArcSwap::from_pointee(config));
        }
    }
}

/// Sanity-check values that would otherwise fail deep inside startup
pub fn validate_config(config: &StaticConfig) -> Result<()> {
    if config.server.port == 0 {
        return Err(FootprintError::validation("server.port must be non-zero"));
    }
    if config.database.database_url.trim().is_empty() {
        return Err(FootprintError::database_config(
            "database.database_url must not be empty",
        ));
    }
    if !matches!(config.logging.format.as_str(), "text" | "json") {
        return Err(FootprintError::validation(format!(
            "logging.format must be 'text' or 'json', got '{}'",
            config.logging.format
        )));
    }
    if config.rate_limit.enabled
        && (config.rate_limit.max_requests == 0 || config.rate_limit.window_secs == 0)
    {
        return Err(FootprintError::validation(
            "rate_limit.max_requests and rate_limit.window_secs must be positive",
        ));
    }
    if config.analytics.min_session_seconds < 0 {
        return Err(FootprintError::validation(
            "analytics.min_session_seconds must not be negative",
        ));
    }
    if config.client.poll_interval_secs == 0 {
        return Err(FootprintError::validation(
            "client.poll_interval_secs must be positive",
        ));
    }
    Ok(())
}
