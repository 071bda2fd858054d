//! Infrastructure services

mod embedding_service;
mod listing_service;
mod search_service;

pub use embedding_service::{
    EmbeddingCapability, EmbeddingService, ModelInfo, ModelStatus, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_EMBEDDING_TIMEOUT,
};
pub use listing_service::{BackfillReport, ListingIndexService};
pub use search_service::{SearchResults, SearchService, SearchStats};
