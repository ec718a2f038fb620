//! Service configuration.

use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;
use pantry_engine::{EngineConfig, RetryConfig};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/pantry").
    pub data_dir: String,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Whether to run the background scheduler (default: true).
    pub scheduler_enabled: bool,

    /// Engine tunables.
    pub engine: EngineConfig,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values are logged and replaced by their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let engine_defaults = defaults.engine.clone();
        let retry_defaults = engine_defaults.retry.clone();

        let retry = RetryConfig {
            max_attempts: env_or("STORAGE_RETRY_ATTEMPTS", retry_defaults.max_attempts),
            initial_delay: Duration::from_millis(env_or(
                "STORAGE_RETRY_BACKOFF_MS",
                100u64,
            )),
            ..retry_defaults
        };

        let engine = EngineConfig {
            daily_tick_time: env_time("DAILY_TICK_TIME", engine_defaults.daily_tick_time),
            reminder_time: env_time("REMINDER_TIME", engine_defaults.reminder_time),
            reestimation_interval_days: env_or(
                "REESTIMATION_INTERVAL_DAYS",
                engine_defaults.reestimation_interval_days,
            ),
            lookback_days: env_or("LOOKBACK_DAYS", engine_defaults.lookback_days),
            observed_rate_weight: env_or(
                "OBSERVED_RATE_WEIGHT",
                engine_defaults.observed_rate_weight,
            ),
            restock_margin_fraction: env_or(
                "RESTOCK_MARGIN_FRACTION",
                engine_defaults.restock_margin_fraction,
            ),
            restock_margin_floor: env_or(
                "RESTOCK_MARGIN_FLOOR",
                engine_defaults.restock_margin_floor,
            ),
            retry,
            max_concurrent_items: env_or(
                "MAX_CONCURRENT_ITEMS",
                engine_defaults.max_concurrent_items,
            ),
        };

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: env_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            scheduler_enabled: env_or("SCHEDULER_ENABLED", defaults.scheduler_enabled),
            engine,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/pantry".into(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 64 * 1024,
            request_timeout_seconds: 30,
            scheduler_enabled: true,
            engine: EngineConfig::default(),
        }
    }
}

/// Read and parse an environment variable, falling back to `default`.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => parse_or(name, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T: FromStr>(name: &str, raw: &str, default: T) -> T {
    raw.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(variable = %name, value = %raw, "invalid value, using default");
        default
    })
}

/// Read an `HH:MM` time of day, falling back to `default`.
fn env_time(name: &str, default: NaiveTime) -> NaiveTime {
    match std::env::var(name) {
        Ok(raw) => parse_time_or(name, &raw, default),
        Err(_) => default,
    }
}

fn parse_time_or(name: &str, raw: &str, default: NaiveTime) -> NaiveTime {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").unwrap_or_else(|_| {
        tracing::warn!(variable = %name, value = %raw, "invalid time of day, using default");
        default
    })
}
