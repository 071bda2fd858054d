//! Domain layer - Core business logic and entities

pub mod cache;
pub mod embedding;
pub mod error;
pub mod geo;
pub mod listing;
pub mod search;

pub use cache::{Cache, CacheBackendInfo, CacheExt, SearchCacheKey};
pub use embedding::{EmbeddingIntent, EmbeddingProvider};
pub use error::DomainError;
pub use geo::{GeoCell, GeoIndexer, RingStep, RingTable};
pub use listing::{Listing, ListingId, ListingRepository, ListingStatus, ListingUpdate};
pub use search::{Ranker, SearchHit, SearchRequest};
