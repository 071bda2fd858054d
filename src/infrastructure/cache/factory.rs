//! Cache factory for runtime selection

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{RedisCache, RedisCacheConfig};
use super::result_cache::{CacheBackend, CacheTtl, ResultCache, DEFAULT_TTL_SECS};

/// Supported cache types
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(try_from = "String")]
pub enum CacheType {
    /// In-memory cache using moka
    #[default]
    InMemory,
    /// Redis cache
    Redis,
}

impl std::fmt::Display for CacheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheType::InMemory => write!(f, "in_memory"),
            CacheType::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for CacheType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_memory" | "inmemory" | "memory" => Ok(CacheType::InMemory),
            "redis" => Ok(CacheType::Redis),
            _ => Err(DomainError::configuration(format!(
                "Unknown cache type: {}. Valid types: in_memory, redis",
                s
            ))),
        }
    }
}

impl TryFrom<String> for CacheType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn default_enabled() -> bool {
    true
}

fn default_ttl_secs() -> i64 {
    DEFAULT_TTL_SECS as i64
}

fn default_max_capacity() -> u64 {
    10_000
}

fn default_timeout_ms() -> u64 {
    250
}

fn default_connect_timeout_ms() -> u64 {
    2_000
}

/// Configuration for the search result cache
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Type of cache to create
    #[serde(default, rename = "type")]
    pub cache_type: CacheType,
    /// Redis URL (required for Redis type)
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Key prefix for namespacing
    #[serde(default)]
    pub key_prefix: Option<String>,
    /// Lifetime of cached result lists
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: i64,
    /// Maximum entries (in-memory cache)
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
    /// Bound on every cache call during a search
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Bound on the initial Redis connection
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            cache_type: CacheType::InMemory,
            redis_url: None,
            key_prefix: None,
            ttl_secs: default_ttl_secs(),
            max_capacity: default_max_capacity(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration for in-memory cache
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Creates a new configuration for Redis cache
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            cache_type: CacheType::Redis,
            redis_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Sets the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Sets the result TTL
    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Sets the maximum capacity (in-memory only)
    pub fn with_max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    pub fn ttl(&self) -> Result<CacheTtl, DomainError> {
        CacheTtl::from_secs(self.ttl_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Factory for creating cache instances
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    /// Creates a new cache factory
    pub fn new() -> Self {
        Self
    }

    /// Creates the configured backend.
    ///
    /// An unreachable Redis server disables caching with a warning; only
    /// invalid configuration is an error.
    pub async fn create(&self, config: &CacheConfig) -> Result<CacheBackend, DomainError> {
        config.ttl()?;

        if !config.enabled {
            info!("Search result cache disabled by configuration");
            return Ok(CacheBackend::Disabled);
        }

        match config.cache_type {
            CacheType::InMemory => {
                let in_memory_config =
                    InMemoryCacheConfig::default().with_max_capacity(config.max_capacity);

                info!(max_capacity = config.max_capacity, "Using in-memory result cache");
                Ok(CacheBackend::Active(Arc::new(InMemoryCache::with_config(
                    in_memory_config,
                ))))
            }
            CacheType::Redis => {
                let url = config.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("Redis URL is required for Redis cache type")
                })?;

                let mut redis_config = RedisCacheConfig::new(url).with_connection_timeout(
                    Duration::from_millis(config.connect_timeout_ms),
                );

                if let Some(prefix) = &config.key_prefix {
                    redis_config = redis_config.with_key_prefix(prefix.clone());
                }

                match RedisCache::new(redis_config).await {
                    Ok(cache) => {
                        info!("Connected to Redis result cache");
                        Ok(CacheBackend::Active(Arc::new(cache)))
                    }
                    Err(e) => {
                        warn!(error = %e, "Redis unavailable, search result cache disabled");
                        Ok(CacheBackend::Disabled)
                    }
                }
            }
        }
    }

    /// Creates the backend and wraps it in a [`ResultCache`]
    pub async fn create_result_cache(
        &self,
        config: &CacheConfig,
    ) -> Result<ResultCache, DomainError> {
        let backend = self.create(config).await?;
        Ok(ResultCache::new(backend).with_timeout(config.timeout()))
    }
}
