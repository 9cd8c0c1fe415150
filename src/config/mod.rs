use crate::error::{LimiterError, Result};
use crate::rate_limit::types::RateLimitConfig;
use crate::rate_limit::window::Granularity;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Prefix of environment variables overriding file settings,
/// e.g. `LIMITER__RATE_LIMIT__LIMIT=100`
pub const ENV_PREFIX: &str = "LIMITER";

/// Main limiter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Counter store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Expose Prometheus metrics on `/metrics`
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

/// Counter store backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Shared Redis server
    #[default]
    Redis,
    /// In-process map, not shared between instances
    Memory,
}

/// Counter store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend to use
    #[serde(default)]
    pub backend: StoreBackend,
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// How often the memory backend purges expired counters (in seconds)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_redis_url() -> String {
    "redis://cache:6379".to_string()
}

fn default_cleanup_interval() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            metrics_enabled: default_true(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: default_redis_url(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

impl LimiterConfig {
    /// Load configuration from a YAML file, with `LIMITER__*` environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| LimiterError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_sources(&content, ENV_PREFIX)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| LimiterError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Layer environment variables starting with `env_prefix` over a YAML document
    pub fn from_sources(yaml: &str, env_prefix: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(yaml, ::config::FileFormat::Yaml))
            .add_source(
                ::config::Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize::<Self>()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let rate_limit = &self.rate_limit;
        rate_limit.validate()?;

        if rate_limit.granularity == Granularity::MinuteOfHour && rate_limit.window_ttl_secs >= 3_600
        {
            warn!(
                "minute_of_hour keys repeat every hour; a {}s TTL lets counts carry over into the next hour",
                rate_limit.window_ttl_secs
            );
        }

        match self.store.backend {
            StoreBackend::Redis => {
                if !self.store.url.starts_with("redis://") && !self.store.url.starts_with("rediss://")
                {
                    return Err(LimiterError::Config(format!(
                        "Redis URL must start with redis:// or rediss://, got: {}",
                        self.store.url
                    )));
                }
            }
            StoreBackend::Memory => {
                if self.store.cleanup_interval_secs == 0 {
                    return Err(LimiterError::Config(
                        "Store cleanup interval must be > 0".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}
