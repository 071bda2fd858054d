//! Write-side listing indexing
//!
//! Derives a listing's cell and document embedding when it is stored, so
//! searches only read precomputed facts. Every write invalidates cached
//! search results.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::cache::SearchCacheKey;
use crate::domain::embedding::is_zero_vector;
use crate::domain::geo::GeoIndexer;
use crate::domain::listing::{Listing, ListingId, ListingRepository, ListingUpdate};
use crate::domain::DomainError;
use crate::infrastructure::cache::ResultCache;

use super::embedding_service::EmbeddingService;

/// Counts from one backfill pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    pub scanned: usize,
    pub embedded: usize,
    pub located: usize,
    /// Listings whose embedding or cell still could not be derived
    pub failed: usize,
    pub invalidated: usize,
}

#[derive(Debug)]
pub struct ListingIndexService {
    indexer: GeoIndexer,
    listings: Arc<dyn ListingRepository>,
    embeddings: EmbeddingService,
    cache: Arc<ResultCache>,
}

impl ListingIndexService {
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
            cache,
        }
    }

    /// Document embedding, or `None` when the provider gave nothing usable.
    ///
    /// A zero vector is never stored so that backfill retries the listing.
    async fn document_vector(&self, listing: &Listing) -> Option<Vec<f32>> {
        let vector = self.embeddings.embed_document(&listing.indexable_text()).await;
        (!is_zero_vector(&vector)).then_some(vector)
    }

    fn locate(&self, listing: &mut Listing) -> Result<(), DomainError> {
        if let Some((lat, lng)) = listing.location() {
            listing.cell = Some(self.indexer.cell_of(lat, lng)?);
        }
        Ok(())
    }

    async fn invalidate_searches(&self) -> usize {
        self.cache.invalidate(&SearchCacheKey::all_searches()).await
    }

    /// Stores a listing with its derived cell and embedding
    pub async fn index(&self, mut listing: Listing) -> Result<Listing, DomainError> {
        self.locate(&mut listing)?;
        listing.embedding = self.document_vector(&listing).await;

        let stored = self.listings.upsert(listing).await?;
        let invalidated = self.invalidate_searches().await;

        info!(
            listing_id = stored.id,
            cell = ?stored.cell,
            embedded = stored.embedding.is_some(),
            invalidated,
            "Indexed listing"
        );

        Ok(stored)
    }

    /// Applies descriptive changes, re-embedding only when the text changed
    pub async fn update(
        &self,
        id: ListingId,
        changes: ListingUpdate,
    ) -> Result<Listing, DomainError> {
        let mut listing = self
            .listings
            .get(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("Listing {} not found", id)))?;

        let text_changed = changes.apply(&mut listing);

        if text_changed || listing.needs_embedding() {
            listing.embedding = self.document_vector(&listing).await;
        }

        let stored = self.listings.upsert(listing).await?;
        let invalidated = self.invalidate_searches().await;

        info!(listing_id = id, re_embedded = text_changed, invalidated, "Updated listing");

        Ok(stored)
    }

    /// Assigns cells to stored listings that have coordinates but no cell.
    ///
    /// Embeddings are left for `backfill`; cached results stay valid since
    /// only listings that were unreachable by search gain a cell.
    pub async fn locate_pending(&self) -> Result<usize, DomainError> {
        let pending = self.listings.list_needing_backfill().await?;
        let mut located = 0;

        for listing in pending.iter().filter(|l| l.needs_cell()) {
            let Some((lat, lng)) = listing.location() else {
                continue;
            };

            match self.indexer.cell_of(lat, lng) {
                Ok(cell) => {
                    if self.listings.update_derived(listing.id, Some(cell), None).await? {
                        located += 1;
                    }
                }
                Err(e) => {
                    warn!(listing_id = listing.id, error = %e, "Listing has invalid coordinates")
                }
            }
        }

        Ok(located)
    }

    /// Fills in missing embeddings and cells for stored listings
    pub async fn backfill(&self) -> Result<BackfillReport, DomainError> {
        let pending = self.listings.list_needing_backfill().await?;
        let mut report = BackfillReport {
            scanned: pending.len(),
            ..Default::default()
        };

        if pending.is_empty() {
            return Ok(report);
        }

        let texts: Vec<String> = pending
            .iter()
            .filter(|l| l.needs_embedding())
            .map(Listing::indexable_text)
            .collect();
        let mut vectors = self.embeddings.embed_documents(&texts).await.into_iter();

        for listing in &pending {
            let mut failed = false;

            let embedding = if listing.needs_embedding() {
                match vectors.next() {
                    Some(vector) if !is_zero_vector(&vector) => Some(vector),
                    _ => {
                        failed = true;
                        None
                    }
                }
            } else {
                None
            };

            let cell = match listing.location() {
                Some((lat, lng)) if listing.needs_cell() => match self.indexer.cell_of(lat, lng) {
                    Ok(cell) => Some(cell),
                    Err(e) => {
                        warn!(listing_id = listing.id, error = %e, "Listing has invalid coordinates");
                        failed = true;
                        None
                    }
                },
                _ => None,
            };

            if embedding.is_none() && cell.is_none() {
                report.failed += usize::from(failed);
                continue;
            }

            let embedded = embedding.is_some();
            let located = cell.is_some();

            if self.listings.update_derived(listing.id, cell, embedding).await? {
                report.embedded += usize::from(embedded);
                report.located += usize::from(located);
            }
            report.failed += usize::from(failed);
        }

        if report.embedded + report.located > 0 {
            report.invalidated = self.invalidate_searches().await;
        }

        info!(
            scanned = report.scanned,
            embedded = report.embedded,
            located = report.located,
            failed = report.failed,
            "Backfill completed"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::embedding::MockEmbeddingProvider;
    use crate::domain::listing::{ListingStatus, MockListingRepository};
    use crate::domain::search::SearchHit;
    use crate::infrastructure::cache::{CacheBackend, CacheTtl, InMemoryCache};
    use crate::infrastructure::services::embedding_service::EmbeddingCapability;
    use crate::infrastructure::storage::InMemoryListingRepository;

    struct Fixture {
        service: ListingIndexService,
        repository: Arc<InMemoryListingRepository>,
        provider: Arc<MockEmbeddingProvider>,
        cache: Arc<ResultCache>,
    }

    fn fixture(listings: Vec<Listing>, provider: MockEmbeddingProvider) -> Fixture {
        let repository = Arc::new(InMemoryListingRepository::with_listings(listings));
        let provider = Arc::new(provider);
        let cache = Arc::new(ResultCache::new(CacheBackend::Active(Arc::new(
            InMemoryCache::new(),
        ))));
        let service = ListingIndexService::new(
            GeoIndexer::default(),
            repository.clone(),
            EmbeddingService::new(EmbeddingCapability::Active(provider.clone()), 3),
            cache.clone(),
        );

        Fixture {
            service,
            repository,
            provider,
            cache,
        }
    }

    async fn seed_cached_search(cache: &ResultCache) {
        let key = ResultCache::key("tutor", 12.97, 77.59, 5);
        let hits = vec![SearchHit::from_listing(Listing::new(1, 1, "Tutor"), 0.5)];
        assert!(cache.put(&key, &hits, CacheTtl::default()).await);
    }

    #[tokio::test]
    async fn test_index_derives_cell_and_embedding() {
        let f = fixture(
            vec![],
            MockEmbeddingProvider::new("mock", 3)
                .with_vector("Math Tutor Algebra", vec![1.0, 0.0, 0.0]),
        );
        seed_cached_search(&f.cache).await;

        let listing = Listing::new(1, 7, "Math Tutor")
            .with_description("Algebra")
            .with_location(12.97, 77.59);
        let stored = f.service.index(listing).await.unwrap();

        let expected_cell = GeoIndexer::default().cell_of(12.97, 77.59).unwrap();
        assert_eq!(stored.cell, Some(expected_cell));
        assert_eq!(stored.embedding, Some(vec![1.0, 0.0, 0.0]));
        assert_eq!(f.repository.get(1).await.unwrap(), Some(stored));
        assert_eq!(f.cache.stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_index_rejects_invalid_coordinates() {
        let f = fixture(vec![], MockEmbeddingProvider::new("mock", 3));

        let err = f
            .service
            .index(Listing::new(1, 7, "Tutor").with_location(95.0, 10.0))
            .await
            .unwrap_err();

        assert!(err.is_invalid_input());
        assert!(f.repository.get(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_index_without_embedding_leaves_it_for_backfill() {
        let f = fixture(vec![], MockEmbeddingProvider::new("mock", 3).with_error("quota"));

        let stored = f.service.index(Listing::new(1, 7, "Tutor")).await.unwrap();

        assert!(stored.embedding.is_none());
        assert!(stored.needs_embedding());
    }

    #[tokio::test]
    async fn test_update_re_embeds_only_on_text_change() {
        let existing = Listing::new(1, 7, "Tutor").with_embedding(vec![0.0, 1.0, 0.0]);
        let f = fixture(
            vec![existing],
            MockEmbeddingProvider::new("mock", 3).with_vector("Math Tutor", vec![1.0, 0.0, 0.0]),
        );

        let updated = f
            .service
            .update(1, ListingUpdate::default().with_status(ListingStatus::Inactive))
            .await
            .unwrap();
        assert_eq!(updated.embedding, Some(vec![0.0, 1.0, 0.0]));
        assert_eq!(f.provider.calls(), 0);

        let updated = f
            .service
            .update(1, ListingUpdate::default().with_title("Math Tutor"))
            .await
            .unwrap();
        assert_eq!(updated.embedding, Some(vec![1.0, 0.0, 0.0]));
        assert_eq!(f.provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_listing_is_not_found() {
        let f = fixture(vec![], MockEmbeddingProvider::new("mock", 3));

        let err = f.service.update(42, ListingUpdate::default()).await.unwrap_err();

        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_backfill_fills_missing_fields() {
        let f = fixture(
            vec![
                Listing::new(1, 7, "Plumber").with_location(12.97, 77.59),
                Listing::new(2, 7, "Tutor")
                    .with_embedding(vec![0.0, 0.0, 1.0])
                    .with_location(12.98, 77.6),
                Listing::new(3, 7, "Done")
                    .with_embedding(vec![1.0, 1.0, 0.0])
                    .with_location(12.97, 77.59)
                    .with_cell(GeoIndexer::default().cell_of(12.97, 77.59).unwrap()),
            ],
            MockEmbeddingProvider::new("mock", 3).with_vector("Plumber", vec![0.0, 1.0, 0.0]),
        );
        seed_cached_search(&f.cache).await;

        let report = f.service.backfill().await.unwrap();

        assert_eq!(report.scanned, 2);
        assert_eq!(report.embedded, 1);
        assert_eq!(report.located, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.invalidated, 1);
        assert_eq!(f.provider.calls(), 1);

        let plumber = f.repository.get(1).await.unwrap().unwrap();
        assert_eq!(plumber.embedding, Some(vec![0.0, 1.0, 0.0]));
        assert!(plumber.cell.is_some());

        assert!(f.service.backfill().await.unwrap().scanned == 0);
    }

    #[tokio::test]
    async fn test_locate_pending_assigns_cells_without_embedding() {
        let f = fixture(
            vec![
                Listing::new(1, 7, "Plumber").with_location(12.97, 77.59),
                Listing::new(2, 7, "Broken").with_location(95.0, 77.59),
                Listing::new(3, 7, "Online Tutor"),
            ],
            MockEmbeddingProvider::new("mock", 3),
        );
        seed_cached_search(&f.cache).await;

        assert_eq!(f.service.locate_pending().await.unwrap(), 1);

        let plumber = f.repository.get(1).await.unwrap().unwrap();
        assert_eq!(plumber.cell, Some(GeoIndexer::default().cell_of(12.97, 77.59).unwrap()));
        assert!(plumber.needs_embedding());
        assert!(f.repository.get(2).await.unwrap().unwrap().cell.is_none());
        assert_eq!(f.provider.calls(), 0);
        assert_eq!(f.cache.stats().await.size, 1);
    }

    #[tokio::test]
    async fn test_backfill_counts_embedding_failures() {
        let f = fixture(
            vec![Listing::new(1, 7, "Plumber")],
            MockEmbeddingProvider::new("mock", 3).with_error("quota"),
        );

        let report = f.service.backfill().await.unwrap();

        assert_eq!(report.scanned, 1);
        assert_eq!(report.embedded, 0);
        assert_eq!(report.failed, 1);
        assert!(f.repository.get(1).await.unwrap().unwrap().needs_embedding());
    }

    #[tokio::test]
    async fn test_backfill_propagates_storage_errors() {
        let mut repository = MockListingRepository::new();
        repository
            .expect_list_needing_backfill()
            .returning(|| Err(DomainError::dependency_unavailable("storage", "down")));

        let service = ListingIndexService::new(
            GeoIndexer::default(),
            Arc::new(repository),
            EmbeddingService::disabled(3),
            Arc::new(ResultCache::disabled()),
        );

        assert!(service.backfill().await.unwrap_err().is_transient());
    }
}
