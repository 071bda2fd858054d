//! Nearby Search
//!
//! Location-bounded semantic search over service listings:
//! - Geo cell indexing with a configurable radius to ring-depth table
//! - Embedding-based relevance ranking with graceful degradation
//! - Best-effort result caching (in-memory or Redis)
//! - In-memory or PostgreSQL listing storage

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use crate::config::AppConfig;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{EmbeddingConfig, EmbeddingProviderType};
use crate::domain::EmbeddingProvider;
use crate::infrastructure::cache::CacheFactory;
use crate::infrastructure::embedding::{GeminiEmbeddingProvider, HttpClient, OpenAiEmbeddingProvider};
use crate::infrastructure::services::{
    EmbeddingCapability, EmbeddingService, ListingIndexService, SearchService,
};
use crate::infrastructure::storage::{StorageFactory, StorageType};

/// Services shared by every command
#[derive(Debug, Clone)]
pub struct AppState {
    pub search_service: Arc<SearchService>,
    pub listing_service: Arc<ListingIndexService>,
}

/// Create application state from configuration files and environment
pub async fn create_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::load()?;
    create_app_state_with_config(&config).await
}

/// Create application state with the provided configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let indexer = config.geo.indexer()?;
    info!(
        resolution = indexer.resolution(),
        edge_km = indexer.edge_km(),
        "Geo indexer ready"
    );

    let ttl = config.cache.ttl()?;
    let cache = Arc::new(CacheFactory::new().create_result_cache(&config.cache).await?);
    let listings = StorageFactory::create(&config.storage).await?;
    let embeddings = create_embedding_service(&config.embedding)?;

    let search_service = SearchService::new(
        indexer.clone(),
        listings.clone(),
        embeddings.clone(),
        cache.clone(),
    )
    .with_ttl(ttl);
    let listing_service = ListingIndexService::new(indexer, listings, embeddings, cache);

    // seed files may omit cells; embeddings come from the seed or `backfill`
    if config.storage.backend == StorageType::InMemory && config.storage.seed_file.is_some() {
        let located = listing_service.locate_pending().await?;
        info!(located, "Located seed listings");
    }

    Ok(AppState {
        search_service: Arc::new(search_service),
        listing_service: Arc::new(listing_service),
    })
}

/// Builds the embedding service; a missing API key disables embeddings
pub fn create_embedding_service(config: &EmbeddingConfig) -> anyhow::Result<EmbeddingService> {
    if config.dimensions == 0 {
        anyhow::bail!("Embedding dimensions must be positive");
    }

    let service = |capability| {
        EmbeddingService::new(capability, config.dimensions).with_timeout(config.timeout())
    };

    if config.provider == EmbeddingProviderType::Disabled {
        info!("Embeddings disabled by configuration");
        return Ok(service(EmbeddingCapability::Disabled));
    }

    let Some(api_key) = config.resolved_api_key() else {
        warn!(provider = ?config.provider, "No embedding API key configured, embeddings disabled");
        return Ok(service(EmbeddingCapability::Disabled));
    };

    let client = HttpClient::with_timeout(config.timeout())?;

    let provider: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingProviderType::Gemini => {
            let mut provider = match &config.base_url {
                Some(url) => GeminiEmbeddingProvider::with_base_url(client, api_key, url),
                None => GeminiEmbeddingProvider::new(client, api_key),
            };
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            Arc::new(provider)
        }
        EmbeddingProviderType::OpenAi => {
            let mut provider = match &config.base_url {
                Some(url) => OpenAiEmbeddingProvider::with_base_url(client, api_key, url),
                None => OpenAiEmbeddingProvider::new(client, api_key),
            };
            if let Some(model) = &config.model {
                provider = provider.with_model(model);
            }
            Arc::new(provider)
        }
        EmbeddingProviderType::Disabled => return Ok(service(EmbeddingCapability::Disabled)),
    };

    if let Some(native) = provider.dimensions(provider.model()) {
        if config.dimensions > native {
            anyhow::bail!(
                "Model {} produces {} dimensions, {} configured",
                provider.model(),
                native,
                config.dimensions
            );
        }
    }

    info!(
        provider = provider.provider_name(),
        model = provider.model(),
        dimensions = config.dimensions,
        "Embedding provider ready"
    );

    Ok(service(EmbeddingCapability::Active(provider)))
}
