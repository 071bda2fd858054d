//! Search result entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::geo::GeoCell;
use crate::domain::listing::{Listing, ListingId, ListingStatus};

/// A ranked listing as returned to callers and stored in the result cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: ListingId,
    pub provider_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub status: ListingStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub cell: Option<GeoCell>,
    pub created_at: DateTime<Utc>,
    pub score: f32,
}

impl SearchHit {
    pub fn from_listing(listing: Listing, score: f32) -> Self {
        Self {
            id: listing.id,
            provider_id: listing.provider_id,
            title: listing.title,
            description: listing.description,
            category: listing.category,
            status: listing.status,
            latitude: listing.latitude,
            longitude: listing.longitude,
            cell: listing.cell,
            created_at: listing.created_at,
            score,
        }
    }
}
