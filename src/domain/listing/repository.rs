//! Listing repository trait

use super::{Listing, ListingId};
use crate::domain::error::DomainError;
use crate::domain::geo::GeoCell;
use async_trait::async_trait;
use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

/// Storage collaborator for listings
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ListingRepository: Send + Sync + Debug {
    /// Active listings whose stored cell is one of `cells`
    async fn find_active_in_cells(&self, cells: &[GeoCell]) -> Result<Vec<Listing>, DomainError>;

    /// Finds a listing by ID
    async fn get(&self, id: ListingId) -> Result<Option<Listing>, DomainError>;

    /// Inserts or replaces a listing
    async fn upsert(&self, listing: Listing) -> Result<Listing, DomainError>;

    /// Listings missing an embedding, or with coordinates but no cell
    async fn list_needing_backfill(&self) -> Result<Vec<Listing>, DomainError>;

    /// Stores derived facts; `None` leaves a field untouched.
    /// Returns false when the listing does not exist.
    async fn update_derived(
        &self,
        id: ListingId,
        cell: Option<GeoCell>,
        embedding: Option<Vec<f32>>,
    ) -> Result<bool, DomainError>;
}
