//! Storage factory for runtime storage selection

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::domain::listing::ListingRepository;
use crate::domain::DomainError;

use super::in_memory::InMemoryListingRepository;
use super::postgres::{PostgresConfig, PostgresListingRepository};

/// Supported storage types
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(try_from = "String")]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    #[default]
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl std::str::FromStr for StorageType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Ok(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            _ => Err(DomainError::configuration(format!(
                "Unknown storage backend: {}. Valid backends: in_memory, postgres",
                s
            ))),
        }
    }
}

impl TryFrom<String> for StorageType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

fn default_max_connections() -> u32 {
    10
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageType,
    /// Connection URL (required for Postgres)
    #[serde(default)]
    pub database_url: Option<String>,
    /// JSON array of listings loaded into the in-memory backend at startup
    #[serde(default)]
    pub seed_file: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageType::InMemory,
            database_url: None,
            seed_file: None,
            max_connections: default_max_connections(),
        }
    }
}

impl StorageConfig {
    /// Creates an in-memory storage configuration
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Creates a PostgreSQL configuration from a URL
    pub fn postgres_url(url: impl Into<String>) -> Self {
        Self {
            backend: StorageType::Postgres,
            database_url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_seed_file(mut self, path: impl Into<String>) -> Self {
        self.seed_file = Some(path.into());
        self
    }

    fn postgres_config(&self) -> Result<PostgresConfig, DomainError> {
        let url = self.database_url.clone().ok_or_else(|| {
            DomainError::configuration("database_url is required for the postgres backend")
        })?;

        Ok(PostgresConfig::new(url).with_max_connections(self.max_connections))
    }
}

/// Factory for creating listing repositories
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates the configured listing repository
    pub async fn create(
        config: &StorageConfig,
    ) -> Result<Arc<dyn ListingRepository>, DomainError> {
        match config.backend {
            StorageType::InMemory => {
                let repository = match &config.seed_file {
                    Some(path) => InMemoryListingRepository::from_seed_file(path)?,
                    None => InMemoryListingRepository::new(),
                };

                info!(seeded = config.seed_file.is_some(), "Using in-memory listing storage");
                Ok(Arc::new(repository))
            }
            StorageType::Postgres => {
                let repository =
                    PostgresListingRepository::connect(&config.postgres_config()?).await?;
                repository.ensure_schema().await?;

                info!(max_connections = config.max_connections, "Using PostgreSQL listing storage");
                Ok(Arc::new(repository))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!("memory".parse::<StorageType>().unwrap(), StorageType::InMemory);
        assert_eq!("in-memory".parse::<StorageType>().unwrap(), StorageType::InMemory);
        assert_eq!("postgresql".parse::<StorageType>().unwrap(), StorageType::Postgres);
        assert_eq!("pg".parse::<StorageType>().unwrap(), StorageType::Postgres);
        assert!("sqlite".parse::<StorageType>().is_err());
    }

    #[test]
    fn test_storage_config_deserialize() {
        let config: StorageConfig =
            serde_json::from_str(r#"{"backend": "postgres", "database_url": "postgres://db/x"}"#)
                .unwrap();

        assert_eq!(config.backend, StorageType::Postgres);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.postgres_config().unwrap().url, "postgres://db/x");
    }

    #[test]
    fn test_postgres_requires_url() {
        let config = StorageConfig {
            backend: StorageType::Postgres,
            ..Default::default()
        };

        assert!(matches!(
            config.postgres_config(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_in_memory() {
        let repository = StorageFactory::create(&StorageConfig::in_memory()).await.unwrap();

        assert!(repository.get(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_with_missing_seed_file_fails() {
        let config = StorageConfig::in_memory().with_seed_file("/nonexistent/listings.json");

        assert!(StorageFactory::create(&config).await.is_err());
    }
}
