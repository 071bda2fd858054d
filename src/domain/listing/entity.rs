//! Listing entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::geo::GeoCell;
use crate::domain::DomainError;

/// Listing identifier as assigned by the marketplace
pub type ListingId = i64;

/// Visibility of a listing in search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    /// Listing is searchable
    #[default]
    Active,
    /// Listing is hidden from search
    Inactive,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ListingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ListingStatus::Active),
            "inactive" => Ok(ListingStatus::Inactive),
            other => Err(DomainError::validation(format!(
                "Unknown listing status '{}'",
                other
            ))),
        }
    }
}

/// A service listing as stored, including the derived facts search uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub provider_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: ListingStatus,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Grid cell derived from the coordinates
    #[serde(default)]
    pub cell: Option<GeoCell>,
    /// Document embedding of the title and description
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Listing {
    pub fn new(id: ListingId, provider_id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            provider_id,
            title: title.into(),
            description: None,
            category: None,
            status: ListingStatus::Active,
            latitude: None,
            longitude: None,
            cell: None,
            embedding: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_status(mut self, status: ListingStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    pub fn with_cell(mut self, cell: GeoCell) -> Self {
        self.cell = Some(cell);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == ListingStatus::Active
    }

    /// Both coordinates, when the listing has a location
    pub fn location(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Text embedded as the listing's document vector
    pub fn indexable_text(&self) -> String {
        match self.description.as_deref() {
            Some(description) if !description.trim().is_empty() => {
                format!("{} {}", self.title, description)
            }
            _ => self.title.clone(),
        }
    }

    /// Whether a stored embedding is missing or empty
    pub fn needs_embedding(&self) -> bool {
        self.embedding.as_ref().is_none_or(|v| v.is_empty())
    }

    /// Whether the listing has coordinates but no cell yet
    pub fn needs_cell(&self) -> bool {
        self.cell.is_none() && self.location().is_some()
    }
}

/// Partial update of a listing's descriptive fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub status: Option<ListingStatus>,
}

impl ListingUpdate {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_status(mut self, status: ListingStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Applies the update, returning whether the embedded text changed
    pub fn apply(self, listing: &mut Listing) -> bool {
        let mut text_changed = false;

        if let Some(title) = self.title {
            text_changed |= title != listing.title;
            listing.title = title;
        }

        if let Some(description) = self.description {
            text_changed |= listing.description.as_deref() != Some(description.as_str());
            listing.description = Some(description);
        }

        if let Some(category) = self.category {
            listing.category = Some(category);
        }

        if let Some(status) = self.status {
            listing.status = status;
        }

        text_changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexable_text() {
        let listing = Listing::new(1, 7, "Math Tutor").with_description("Algebra and calculus");
        assert_eq!(listing.indexable_text(), "Math Tutor Algebra and calculus");

        let bare = Listing::new(2, 7, "Plumber");
        assert_eq!(bare.indexable_text(), "Plumber");
    }

    #[test]
    fn test_backfill_flags() {
        let listing = Listing::new(1, 7, "Math Tutor").with_location(12.97, 77.59);
        assert!(listing.needs_embedding());
        assert!(listing.needs_cell());

        let no_location = Listing::new(2, 7, "Online Tutor").with_embedding(vec![]);
        assert!(no_location.needs_embedding());
        assert!(!no_location.needs_cell());
    }

    #[test]
    fn test_update_reports_text_change() {
        let mut listing = Listing::new(1, 7, "Math Tutor").with_description("Algebra");

        let changed = ListingUpdate::default()
            .with_category("education")
            .with_status(ListingStatus::Inactive)
            .apply(&mut listing);
        assert!(!changed);
        assert_eq!(listing.category.as_deref(), Some("education"));
        assert!(!listing.is_active());

        let unchanged_title = ListingUpdate::default().with_title("Math Tutor").apply(&mut listing);
        assert!(!unchanged_title);

        let changed = ListingUpdate::default()
            .with_description("Geometry")
            .apply(&mut listing);
        assert!(changed);
        assert_eq!(listing.description.as_deref(), Some("Geometry"));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("active".parse::<ListingStatus>().unwrap(), ListingStatus::Active);
        assert!("deleted".parse::<ListingStatus>().is_err());
    }

    #[test]
    fn test_deserialize_minimal_listing() {
        let json = r#"{"id": 3, "provider_id": 9, "title": "Yoga Classes", "latitude": 12.9, "longitude": 77.6}"#;
        let listing: Listing = serde_json::from_str(json).unwrap();

        assert_eq!(listing.status, ListingStatus::Active);
        assert_eq!(listing.location(), Some((12.9, 77.6)));
        assert!(listing.cell.is_none());
    }
}
