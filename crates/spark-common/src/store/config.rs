//! Document store connection configuration

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::retry::{RetryPolicy, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY_MS};

/// Default Elasticsearch endpoint
pub const DEFAULT_ELASTICSEARCH_URL: &str = "http://localhost:9200";

/// Default bound on a single store request, in seconds
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;

/// Which document store implementation to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Elasticsearch,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elasticsearch" | "elastic" | "es" => Ok(StoreBackend::Elasticsearch),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            _ => Err(anyhow::anyhow!("Invalid store backend: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: String,
    pub timeout_secs: u64,
    pub retry_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: DEFAULT_ELASTICSEARCH_URL.to_string(),
            timeout_secs: DEFAULT_STORE_TIMEOUT_SECS,
            retry_max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_ms: DEFAULT_BASE_DELAY_MS,
            retry_max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `STORE_BACKEND`: `elasticsearch` or `memory`
    /// - `ELASTICSEARCH_URL`: Base URL of the Elasticsearch REST API
    /// - `STORE_TIMEOUT_SECS`: Bound on each store request
    /// - `STORE_RETRY_MAX_ATTEMPTS`: Attempts for retryable calls
    /// - `STORE_RETRY_BASE_DELAY_MS`: First backoff delay
    /// - `STORE_RETRY_MAX_DELAY_MS`: Backoff cap
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            backend: match env::var("STORE_BACKEND") {
                Ok(value) => value.parse()?,
                Err(_) => defaults.backend,
            },
            url: env::var("ELASTICSEARCH_URL").unwrap_or(defaults.url),
            timeout_secs: parse_var("STORE_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            retry_max_attempts: parse_var("STORE_RETRY_MAX_ATTEMPTS")
                .unwrap_or(defaults.retry_max_attempts),
            retry_base_delay_ms: parse_var("STORE_RETRY_BASE_DELAY_MS")
                .unwrap_or(defaults.retry_base_delay_ms),
            retry_max_delay_ms: parse_var("STORE_RETRY_MAX_DELAY_MS")
                .unwrap_or(defaults.retry_max_delay_ms),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backend == StoreBackend::Elasticsearch {
            url::Url::parse(&self.url)
                .map_err(|e| anyhow::anyhow!("Invalid ELASTICSEARCH_URL '{}': {}", self.url, e))?;
        }

        if self.timeout_secs == 0 {
            anyhow::bail!("Store timeout must be greater than 0");
        }

        if self.retry_max_attempts == 0 {
            anyhow::bail!("Store retry attempts must be greater than 0");
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.parse().ok())
}
