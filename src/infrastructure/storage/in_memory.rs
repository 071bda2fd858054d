//! In-memory listing repository

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::info;

use crate::domain::geo::GeoCell;
use crate::domain::listing::{Listing, ListingId, ListingRepository};
use crate::domain::DomainError;

/// Thread-safe in-memory listing store
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug, Default)]
pub struct InMemoryListingRepository {
    listings: RwLock<BTreeMap<ListingId, Listing>>,
}

impl InMemoryListingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with listings
    pub fn with_listings(listings: Vec<Listing>) -> Self {
        Self {
            listings: RwLock::new(listings.into_iter().map(|l| (l.id, l)).collect()),
        }
    }

    /// Loads listings from a JSON array file
    pub fn from_seed_file(path: impl AsRef<Path>) -> Result<Self, DomainError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DomainError::configuration(format!(
                "Failed to read seed file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let listings: Vec<Listing> = serde_json::from_str(&raw).map_err(|e| {
            DomainError::configuration(format!(
                "Failed to parse seed file '{}': {}",
                path.display(),
                e
            ))
        })?;

        info!(path = %path.display(), count = listings.len(), "Loaded seed listings");
        Ok(Self::with_listings(listings))
    }

    fn lock_error(e: impl std::fmt::Display) -> DomainError {
        DomainError::storage(format!("Failed to acquire listing lock: {}", e))
    }
}

#[async_trait]
impl ListingRepository for InMemoryListingRepository {
    async fn find_active_in_cells(&self, cells: &[GeoCell]) -> Result<Vec<Listing>, DomainError> {
        let wanted: HashSet<&GeoCell> = cells.iter().collect();
        let listings = self.listings.read().map_err(Self::lock_error)?;

        Ok(listings
            .values()
            .filter(|l| l.is_active() && l.cell.as_ref().is_some_and(|c| wanted.contains(c)))
            .cloned()
            .collect())
    }

    async fn get(&self, id: ListingId) -> Result<Option<Listing>, DomainError> {
        let listings = self.listings.read().map_err(Self::lock_error)?;
        Ok(listings.get(&id).cloned())
    }

    async fn upsert(&self, listing: Listing) -> Result<Listing, DomainError> {
        let mut listings = self.listings.write().map_err(Self::lock_error)?;
        listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn list_needing_backfill(&self) -> Result<Vec<Listing>, DomainError> {
        let listings = self.listings.read().map_err(Self::lock_error)?;

        Ok(listings
            .values()
            .filter(|l| l.needs_embedding() || l.needs_cell())
            .cloned()
            .collect())
    }

    async fn update_derived(
        &self,
        id: ListingId,
        cell: Option<GeoCell>,
        embedding: Option<Vec<f32>>,
    ) -> Result<bool, DomainError> {
        let mut listings = self.listings.write().map_err(Self::lock_error)?;

        let Some(listing) = listings.get_mut(&id) else {
            return Ok(false);
        };

        if let Some(cell) = cell {
            listing.cell = Some(cell);
        }

        if let Some(embedding) = embedding {
            listing.embedding = Some(embedding);
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geo::GeoIndexer;
    use crate::domain::listing::ListingStatus;

    fn indexed(id: ListingId, title: &str, lat: f64, lng: f64) -> Listing {
        let cell = GeoIndexer::default().cell_of(lat, lng).unwrap();
        Listing::new(id, 1, title).with_location(lat, lng).with_cell(cell)
    }

    #[tokio::test]
    async fn test_find_active_in_cells() {
        let near = indexed(1, "Math Tutor", 12.97, 77.59);
        let inactive = indexed(2, "Old Tutor", 12.97, 77.59).with_status(ListingStatus::Inactive);
        let far = indexed(3, "Plumber", 28.61, 77.21);
        let cell = near.cell.unwrap();

        let repo = InMemoryListingRepository::with_listings(vec![near, inactive, far]);
        let found = repo.find_active_in_cells(&[cell]).await.unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, 1);
    }

    #[tokio::test]
    async fn test_backfill_and_update_derived() {
        let repo = InMemoryListingRepository::with_listings(vec![
            Listing::new(1, 1, "Yoga").with_location(12.9, 77.6),
            indexed(2, "Tutor", 12.9, 77.6).with_embedding(vec![0.1]),
        ]);

        let pending = repo.list_needing_backfill().await.unwrap();
        assert_eq!(pending.iter().map(|l| l.id).collect::<Vec<_>>(), vec![1]);

        let cell = GeoIndexer::default().cell_of(12.9, 77.6).unwrap();
        assert!(repo.update_derived(1, Some(cell), Some(vec![0.2])).await.unwrap());
        assert!(!repo.update_derived(99, Some(cell), None).await.unwrap());

        assert!(repo.list_needing_backfill().await.unwrap().is_empty());
        assert_eq!(repo.get(1).await.unwrap().unwrap().embedding, Some(vec![0.2]));
    }

    #[tokio::test]
    async fn test_update_derived_keeps_untouched_fields() {
        let repo = InMemoryListingRepository::with_listings(vec![
            indexed(1, "Tutor", 12.9, 77.6).with_embedding(vec![0.5]),
        ]);
        let cell = repo.get(1).await.unwrap().unwrap().cell;

        repo.update_derived(1, None, Some(vec![0.7])).await.unwrap();

        let listing = repo.get(1).await.unwrap().unwrap();
        assert_eq!(listing.cell, cell);
        assert_eq!(listing.embedding, Some(vec![0.7]));
    }

    #[tokio::test]
    async fn test_from_seed_file() {
        let path = std::env::temp_dir().join(format!("nearby-seed-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"id": 10, "provider_id": 2, "title": "Home Cleaning", "latitude": 12.97, "longitude": 77.59}]"#,
        )
        .unwrap();

        let repo = InMemoryListingRepository::from_seed_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(repo.get(10).await.unwrap().unwrap().title, "Home Cleaning");
    }

    #[test]
    fn test_missing_seed_file_is_configuration_error() {
        let result = InMemoryListingRepository::from_seed_file("/nonexistent/seed.json");
        assert!(matches!(result, Err(DomainError::Configuration { .. })));
    }
}
