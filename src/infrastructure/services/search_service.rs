//! Location-bounded semantic search
//!
//! A request runs cache check, geo filter, candidate fetch, ranking, cache
//! write and truncation in that order. Only a storage failure fails the
//! search; cache and embedding faults degrade.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::domain::geo::GeoIndexer;
use crate::domain::listing::ListingRepository;
use crate::domain::search::{Ranker, SearchHit, SearchRequest};
use crate::domain::DomainError;
use crate::infrastructure::cache::{CacheStats, CacheTtl, ResultCache};

use super::embedding_service::{EmbeddingService, ModelInfo};

/// Hits for one search plus how they were produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
    pub from_cache: bool,
    /// Ranking fell back to uniform scores
    pub degraded: bool,
    pub cells_searched: usize,
    pub candidates: usize,
}

impl SearchResults {
    fn cached(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            from_cache: true,
            degraded: false,
            cells_searched: 0,
            candidates: 0,
        }
    }

    fn empty(cells_searched: usize) -> Self {
        Self {
            hits: Vec::new(),
            from_cache: false,
            degraded: false,
            cells_searched,
            candidates: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchStats {
    pub cache: CacheStats,
    pub model: ModelInfo,
}

#[derive(Debug)]
pub struct SearchService {
    indexer: GeoIndexer,
    listings: Arc<dyn ListingRepository>,
    embeddings: EmbeddingService,
    ranker: Ranker,
    cache: Arc<ResultCache>,
    ttl: CacheTtl,
}

impl SearchService {
    pub fn new(
        indexer: GeoIndexer,
        listings: Arc<dyn ListingRepository>,
        embeddings: EmbeddingService,
        cache: Arc<ResultCache>,
    ) -> Self {
        Self {
            indexer,
            listings,
            embeddings,
            ranker: Ranker::new(),
            cache,
            ttl: CacheTtl::default(),
        }
    }

    /// Lifetime of result lists written by this service
    pub fn with_ttl(mut self, ttl: CacheTtl) -> Self {
        self.ttl = ttl;
        self
    }

    #[instrument(skip(self, request), fields(query = %request.query, radius_km = request.radius_km))]
    pub async fn search(&self, request: SearchRequest) -> Result<SearchResults, DomainError> {
        request.check()?;

        let key = ResultCache::key(
            &request.query,
            request.latitude,
            request.longitude,
            request.radius_km,
        );

        if let Some(mut hits) = self.cache.get(&key).await {
            hits.truncate(request.limit);
            return Ok(SearchResults::cached(hits));
        }

        let cells: Vec<_> = self
            .indexer
            .cells_within_radius(
                request.latitude,
                request.longitude,
                f64::from(request.radius_km),
            )?
            .into_iter()
            .collect();

        let candidates = self
            .listings
            .find_active_in_cells(&cells)
            .await
            .map_err(|e| {
                error!(error = %e, cells = cells.len(), "Candidate fetch failed");
                match e {
                    DomainError::DependencyUnavailable { .. } => e,
                    other => DomainError::dependency_unavailable("storage", other.to_string()),
                }
            })?;

        debug!(cells = cells.len(), candidates = candidates.len(), "Fetched candidates");

        if candidates.is_empty() {
            return Ok(SearchResults::empty(cells.len()));
        }

        let candidate_count = candidates.len();
        let query_vector = self.embeddings.embed_query(&request.query).await;
        let ranking = self.ranker.rank(&query_vector, candidates);

        let mut hits: Vec<SearchHit> = ranking
            .candidates
            .into_iter()
            .map(|scored| SearchHit::from_listing(scored.candidate, scored.score))
            .collect();

        self.cache.put(&key, &hits, self.ttl).await;
        hits.truncate(request.limit);

        info!(
            cells = cells.len(),
            candidates = candidate_count,
            returned = hits.len(),
            degraded = ranking.degraded,
            "Search completed"
        );

        Ok(SearchResults {
            hits,
            from_cache: false,
            degraded: ranking.degraded,
            cells_searched: cells.len(),
            candidates: candidate_count,
        })
    }

    /// Removes cached result lists matching a glob pattern
    pub async fn invalidate(&self, pattern: &str) -> usize {
        self.cache.invalidate(pattern).await
    }

    pub async fn stats(&self) -> SearchStats {
        SearchStats {
            cache: self.cache.stats().await,
            model: self.embeddings.model_info(),
        }
    }
}
