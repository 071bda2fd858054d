use serde::Deserialize;

use crate::domain::geo::{GeoIndexer, RingStep, RingTable, DEFAULT_RESOLUTION};
use crate::domain::DomainError;
use crate::infrastructure::cache::CacheConfig;
use crate::infrastructure::services::DEFAULT_EMBEDDING_DIMENSIONS;
use crate::infrastructure::storage::StorageConfig;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_resolution() -> u8 {
    DEFAULT_RESOLUTION
}

fn default_ring_table() -> Vec<RingStep> {
    RingTable::default().steps().to_vec()
}

/// Grid resolution and radius to ring-depth table
#[derive(Debug, Clone, Deserialize)]
pub struct GeoConfig {
    #[serde(default = "default_resolution")]
    pub resolution: u8,
    #[serde(default = "default_ring_table")]
    pub ring_table: Vec<RingStep>,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            ring_table: default_ring_table(),
        }
    }
}

impl GeoConfig {
    /// Builds the indexer, rejecting tables that cannot cover their radii
    pub fn indexer(&self) -> Result<GeoIndexer, DomainError> {
        let table = RingTable::new(self.ring_table.clone())?;
        GeoIndexer::new(self.resolution, table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(try_from = "String")]
pub enum EmbeddingProviderType {
    #[default]
    Gemini,
    OpenAi,
    Disabled,
}

impl std::str::FromStr for EmbeddingProviderType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "disabled" | "none" => Ok(Self::Disabled),
            _ => Err(DomainError::configuration(format!(
                "Unknown embedding provider: {}. Valid providers: gemini, openai, disabled",
                s
            ))),
        }
    }
}

impl TryFrom<String> for EmbeddingProviderType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl EmbeddingProviderType {
    /// Environment variable consulted when no key is configured
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Self::Gemini => Some("GEMINI_API_KEY"),
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::Disabled => None,
        }
    }
}

fn default_dimensions() -> usize {
    DEFAULT_EMBEDDING_DIMENSIONS
}

fn default_embedding_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderType,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Provider default when unset
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_embedding_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderType::default(),
            api_key: None,
            model: None,
            dimensions: default_dimensions(),
            base_url: None,
            timeout_ms: default_embedding_timeout_ms(),
        }
    }
}

impl EmbeddingConfig {
    /// Configured key, else the provider's environment variable
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| {
                self.provider
                    .api_key_env()
                    .and_then(|var| std::env::var(var).ok())
            })
            .filter(|key| !key.trim().is_empty())
    }

    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::cache::CacheType;
    use crate::infrastructure::storage::StorageType;

    fn from_toml(toml: &str) -> Result<AppConfig, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }

    #[test]
    fn test_defaults() {
        let config = from_toml("").unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.geo.resolution, 4);
        assert_eq!(config.geo.ring_table.len(), 6);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.cache_type, CacheType::InMemory);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.embedding.provider, EmbeddingProviderType::Gemini);
        assert_eq!(config.embedding.dimensions, 768);
        assert_eq!(config.embedding.timeout_ms, 5_000);
        assert_eq!(config.storage.backend, StorageType::InMemory);
        assert_eq!(config.storage.max_connections, 10);
        assert!(config.geo.indexer().is_ok());
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = from_toml(
            r#"
            [logging]
            format = "json"

            [cache]
            type = "redis"
            redis_url = "redis://cache:6379"
            ttl_secs = 60

            [embedding]
            provider = "openai"
            model = "text-embedding-3-small"
            dimensions = 512

            [storage]
            backend = "postgres"
            database_url = "postgres://db/listings"
            "#,
        )
        .unwrap();

        assert!(matches!(config.logging.format, LogFormat::Json));
        assert_eq!(config.cache.cache_type, CacheType::Redis);
        assert_eq!(config.cache.ttl_secs, 60);
        assert_eq!(config.embedding.provider, EmbeddingProviderType::OpenAi);
        assert_eq!(config.embedding.dimensions, 512);
        assert_eq!(config.storage.backend, StorageType::Postgres);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(from_toml("[embedding]\nprovider = \"cohere\"").is_err());
        assert!(from_toml("[storage]\nbackend = \"sqlite\"").is_err());
    }

    #[test]
    fn test_uncoverable_ring_table_rejected() {
        let config = from_toml(
            r#"
            [geo]
            resolution = 4
            ring_table = [{ max_km = 50.0, rings = 2 }]
            "#,
        )
        .unwrap();

        assert!(matches!(
            config.geo.indexer(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_configured_api_key_wins() {
        let config = EmbeddingConfig {
            api_key: Some("configured".to_string()),
            ..Default::default()
        };

        assert_eq!(config.resolved_api_key().as_deref(), Some("configured"));
    }

    #[test]
    fn test_disabled_provider_has_no_key_env() {
        let config = EmbeddingConfig {
            provider: EmbeddingProviderType::Disabled,
            ..Default::default()
        };

        assert!(config.resolved_api_key().is_none());
    }
}
