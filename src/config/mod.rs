//! Configuration module for the meal board.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::time::Duration;

use crate::errors::AppError;
use crate::keys::KeyStrategy;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the realtime database, e.g. `https://example.firebaseio.com`
    pub database_url: Option<String>,
    /// Collection path holding the meal records
    pub collection: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// chrono format used for the default meal date
    pub date_format: String,
    /// Delay before a dropped listener stream is reopened
    pub reconnect_delay: Duration,
    /// Silence on a listener stream after which it is reopened
    pub idle_timeout: Duration,
    /// Strategy for minting keys of new meals
    pub key_strategy: KeyStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            collection: "meals".to_string(),
            log_level: "info".to_string(),
            date_format: "%Y-%m-%d".to_string(),
            reconnect_delay: Duration::from_millis(3000),
            idle_timeout: Duration::from_millis(60_000),
            key_strategy: KeyStrategy::Sortable,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let database_url = env::var("MEALS_DATABASE_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let collection = env::var("MEALS_COLLECTION").unwrap_or(defaults.collection);

        let log_level = env::var("MEALS_LOG_LEVEL").unwrap_or(defaults.log_level);

        let date_format = env::var("MEALS_DATE_FORMAT").unwrap_or(defaults.date_format);

        let reconnect_delay = match env::var("MEALS_RECONNECT_DELAY_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| {
                    AppError::Config(format!("Invalid MEALS_RECONNECT_DELAY_MS: {}", raw))
                })?,
            Err(_) => defaults.reconnect_delay,
        };

        let idle_timeout = match env::var("MEALS_IDLE_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .ok_or_else(|| {
                    AppError::Config(format!("Invalid MEALS_IDLE_TIMEOUT_MS: {}", raw))
                })?,
            Err(_) => defaults.idle_timeout,
        };

        let key_strategy = match env::var("MEALS_KEY_STRATEGY") {
            Ok(raw) => KeyStrategy::from_str(&raw)
                .ok_or_else(|| AppError::Config(format!("Invalid MEALS_KEY_STRATEGY: {}", raw)))?,
            Err(_) => defaults.key_strategy,
        };

        Ok(Self {
            database_url,
            collection,
            log_level,
            date_format,
            reconnect_delay,
            idle_timeout,
            key_strategy,
        })
    }
}
