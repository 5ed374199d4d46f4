//! Configuration management

use serde::{Deserialize, Serialize};
use spark_common::store::{IndexSettings, StoreConfig, DEFAULT_REPLICAS, DEFAULT_SHARDS};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 6060;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Default name of the index holding job records.
pub const DEFAULT_JOBS_INDEX: &str = "spark-jobs";

/// Default CORS allowed origin for local development.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub jobs: JobsConfig,
    pub store: StoreConfig,
    pub cors: CorsConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Where and how job records are stored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    pub index: String,
    pub shards: u32,
    pub replicas: u32,
}

impl JobsConfig {
    pub fn index_settings(&self) -> IndexSettings {
        IndexSettings {
            shards: self.shards,
            replicas: self.replicas,
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allow_credentials: bool,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("SPARK_API_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: env_or("SPARK_API_PORT", DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: env_or(
                    "SPARK_API_SHUTDOWN_TIMEOUT",
                    DEFAULT_SHUTDOWN_TIMEOUT_SECS,
                ),
            },
            jobs: JobsConfig {
                index: std::env::var("JOBS_INDEX").unwrap_or_else(|_| DEFAULT_JOBS_INDEX.to_string()),
                shards: env_or("JOBS_INDEX_SHARDS", DEFAULT_SHARDS),
                replicas: env_or("JOBS_INDEX_REPLICAS", DEFAULT_REPLICAS),
            },
            store: StoreConfig::from_env()?,
            cors: CorsConfig {
                allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| DEFAULT_CORS_ALLOWED_ORIGIN.to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                allow_credentials: env_or("CORS_ALLOW_CREDENTIALS", false),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        // Elasticsearch index names must be lowercase and non-empty
        if self.jobs.index.is_empty() || self.jobs.index != self.jobs.index.to_lowercase() {
            anyhow::bail!("Jobs index name '{}' must be non-empty and lowercase", self.jobs.index);
        }

        if self.jobs.shards == 0 {
            anyhow::bail!("Jobs index needs at least one shard");
        }

        self.store.validate()?;

        if self.cors.allowed_origins.is_empty() {
            tracing::warn!("No CORS origins configured - all origins will be allowed");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            jobs: JobsConfig {
                index: DEFAULT_JOBS_INDEX.to_string(),
                shards: DEFAULT_SHARDS,
                replicas: DEFAULT_REPLICAS,
            },
            store: StoreConfig::default(),
            cors: CorsConfig {
                allowed_origins: vec![DEFAULT_CORS_ALLOWED_ORIGIN.to_string()],
                allow_credentials: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 6060);
        assert_eq!(config.jobs.index, "spark-jobs");
        assert_eq!(config.jobs.index_settings(), IndexSettings { shards: 1, replicas: 0 });
    }

    #[test]
    fn test_rejects_uppercase_index() {
        let mut config = Config::default();
        config.jobs.index = "Spark-Jobs".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_shards() {
        let mut config = Config::default();
        config.jobs.shards = 0;
        assert!(config.validate().is_err());
    }
}
