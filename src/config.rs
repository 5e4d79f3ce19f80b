//! Environment configuration and tracing setup.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_RATE_CACHE_CAPACITY: u64 = 10_000;
const DEFAULT_RATE_CACHE_IDLE_SECS: u64 = 60 * 60;
const DEFAULT_LOG_FILTER: &str = "tourops_pricing=info";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Postgres URL; `None` runs the engine on in-memory stores.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub rate_cache_capacity: u64,
    pub rate_cache_idle: Duration,
    /// Filter used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            rate_cache_capacity: DEFAULT_RATE_CACHE_CAPACITY,
            rate_cache_idle: Duration::from_secs(DEFAULT_RATE_CACHE_IDLE_SECS),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl EngineConfig {
    /// Read configuration from the environment, loading `.env` first.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let max_connections = parse_var(
            &lookup,
            "PRICING_DB_MAX_CONNECTIONS",
            DEFAULT_MAX_CONNECTIONS,
        )?;
        let rate_cache_capacity = parse_var(
            &lookup,
            "PRICING_RATE_CACHE_CAPACITY",
            DEFAULT_RATE_CACHE_CAPACITY,
        )?;
        let idle_secs = parse_var(
            &lookup,
            "PRICING_RATE_CACHE_IDLE_SECS",
            DEFAULT_RATE_CACHE_IDLE_SECS,
        )?;
        let log_filter = lookup("PRICING_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            database_url,
            max_connections,
            rate_cache_capacity,
            rate_cache_idle: Duration::from_secs(idle_secs),
            log_filter,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}: '{}'", name, raw)),
        None => Ok(default),
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `config.log_filter`.
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(config: &EngineConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
