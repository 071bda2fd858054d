//! Geo cell identifiers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::DomainError;

/// Finest supported grid resolution
pub const MAX_RESOLUTION: u8 = 15;

const RESOLUTION_SHIFT: u32 = 60;
const ROW_SHIFT: u32 = 32;
const ROW_MASK: u64 = (1 << 28) - 1;
const COL_MASK: u64 = (1 << 32) - 1;

/// Identifier of one cell of the fixed-resolution grid.
///
/// Packs `(resolution, band, column)` into a `u64`: 4 bits of resolution,
/// 28 bits of latitude band and 32 bits of column within the band. The
/// textual form is the 16-digit lowercase hex encoding, which is what the
/// storage layer persists and filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GeoCell(u64);

impl GeoCell {
    pub(crate) fn from_parts(resolution: u8, band: u32, column: u32) -> Self {
        Self(
            (u64::from(resolution) << RESOLUTION_SHIFT)
                | ((u64::from(band) & ROW_MASK) << ROW_SHIFT)
                | (u64::from(column) & COL_MASK),
        )
    }

    /// Grid resolution the cell belongs to
    pub fn resolution(&self) -> u8 {
        (self.0 >> RESOLUTION_SHIFT) as u8
    }

    /// Latitude band index, counted from the south pole
    pub fn band(&self) -> u32 {
        ((self.0 >> ROW_SHIFT) & ROW_MASK) as u32
    }

    /// Column index within the band, counted eastwards from the antimeridian
    pub fn column(&self) -> u32 {
        (self.0 & COL_MASK) as u32
    }
}

impl fmt::Display for GeoCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for GeoCell {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(DomainError::validation(format!(
                "Invalid geo cell '{}': expected 16 hex digits",
                s
            )));
        }

        u64::from_str_radix(s, 16)
            .map(GeoCell)
            .map_err(|e| DomainError::validation(format!("Invalid geo cell '{}': {}", s, e)))
    }
}

impl Serialize for GeoCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GeoCell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
