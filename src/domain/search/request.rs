//! Search request validation

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::domain::DomainError;

pub const DEFAULT_RADIUS_KM: u32 = 5;
pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_RADIUS_KM: u32 = 50;
pub const MAX_LIMIT: usize = 50;

fn default_radius_km() -> u32 {
    DEFAULT_RADIUS_KM
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// One location-bounded text search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(min = 1, message = "Query must not be empty"))]
    #[validate(custom(function = "validate_not_blank", message = "Query must not be blank"))]
    pub query: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: f64,

    #[validate(range(min = -180.0, max = 180.0, message = "Longitude must be between -180 and 180"))]
    pub longitude: f64,

    #[serde(default = "default_radius_km")]
    #[validate(range(min = 1, max = 50, message = "Radius must be between 1 and 50 km"))]
    pub radius_km: u32,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 50, message = "Limit must be between 1 and 50"))]
    pub limit: usize,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            query: query.into(),
            latitude,
            longitude,
            radius_km: DEFAULT_RADIUS_KM,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_radius_km(mut self, radius_km: u32) -> Self {
        self.radius_km = radius_km;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Runs field validation, mapping failures to `DomainError::Validation`
    pub fn check(&self) -> Result<(), DomainError> {
        // range checks let NaN through
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(DomainError::validation("Coordinates must be finite numbers"));
        }

        self.validate()
            .map_err(|e| DomainError::validation(e.to_string()))
    }
}
