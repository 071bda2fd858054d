//! Coordinate to cell mapping and radius coverage

use std::collections::BTreeSet;
use std::f64::consts::PI;

use super::cell::{GeoCell, MAX_RESOLUTION};
use super::ring_table::RingTable;
use crate::domain::DomainError;

/// Mean Earth radius used for all distance math
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Nominal cell edge at resolution 0; each resolution halves it
pub const BASE_EDGE_KM: f64 = 40.0;

/// Resolution whose 2.5 km cells match the default ring table
pub const DEFAULT_RESOLUTION: u8 = 4;

const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * PI / 180.0;

// Slack for thresholds that sit exactly on `rings * edge`
const COVERAGE_EPSILON_KM: f64 = 1e-9;

/// Nominal cell edge length for a resolution
pub fn edge_km(resolution: u8) -> f64 {
    BASE_EDGE_KM / f64::from(1u32 << resolution.min(MAX_RESOLUTION))
}

/// Maps coordinates onto a latitude-banded grid and expands radii into
/// covering cell sets.
///
/// The sphere is cut into bands of equal latitude height; each band is split
/// into as many equal-longitude columns as fit while keeping every cell at
/// least one edge wide, even at the band's poleward boundary. Cell ids are
/// therefore a pure function of `(lat, lng, resolution)`.
#[derive(Debug, Clone)]
pub struct GeoIndexer {
    resolution: u8,
    edge_km: f64,
    band_deg: f64,
    bands: u32,
    ring_table: RingTable,
}

impl GeoIndexer {
    /// Creates an indexer, rejecting ring tables whose ring counts cannot
    /// reach their thresholds at this resolution
    pub fn new(resolution: u8, ring_table: RingTable) -> Result<Self, DomainError> {
        if resolution > MAX_RESOLUTION {
            return Err(DomainError::configuration(format!(
                "Geo resolution {} exceeds maximum {}",
                resolution, MAX_RESOLUTION
            )));
        }

        let edge = edge_km(resolution);

        for step in ring_table.steps() {
            let reach = f64::from(step.rings) * edge;

            if step.max_km > reach + COVERAGE_EPSILON_KM {
                return Err(DomainError::configuration(format!(
                    "Ring table step <= {} km uses {} rings, which only reach {:.3} km with \
                     {:.3} km cells at resolution {}",
                    step.max_km, step.rings, reach, edge, resolution
                )));
            }
        }

        let band_deg = edge / KM_PER_DEGREE;
        let bands = (180.0 / band_deg).ceil() as u32;

        Ok(Self {
            resolution,
            edge_km: edge,
            band_deg,
            bands,
            ring_table,
        })
    }

    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    pub fn edge_km(&self) -> f64 {
        self.edge_km
    }

    pub fn ring_table(&self) -> &RingTable {
        &self.ring_table
    }

    /// Ring expansion depth used for a radius
    pub fn rings_for(&self, radius_km: f64) -> u32 {
        self.ring_table.rings_for(radius_km)
    }

    /// Cell containing a coordinate
    pub fn cell_of(&self, lat: f64, lng: f64) -> Result<GeoCell, DomainError> {
        validate_coordinate(lat, lng)?;

        let band = self.band_of(lat);
        let column = self.column_of(band, lng);

        Ok(GeoCell::from_parts(self.resolution, band, column))
    }

    /// Every cell that may contain a point within `radius_km` of the centre
    pub fn cells_within_radius(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
    ) -> Result<BTreeSet<GeoCell>, DomainError> {
        validate_coordinate(lat, lng)?;

        if !radius_km.is_finite() || radius_km < 0.0 {
            return Err(DomainError::validation(format!(
                "Radius must be a non-negative number of km, got {}",
                radius_km
            )));
        }

        let rings = self.ring_table.rings_for(radius_km);

        Ok(self.grid_disk(lat, lng, rings))
    }

    /// Cells reachable within `rings` cell edges of the centre.
    ///
    /// Bands are taken `rings` deep on both sides. Within a band, a point at
    /// great-circle distance `d` satisfies
    /// `sin(dlng/2) <= sin(d/2R) / sqrt(cos(lat_c) * cos(lat_p))`, bounded
    /// with the band's poleward latitude; bands where the bound degenerates
    /// are taken whole.
    pub fn grid_disk(&self, lat: f64, lng: f64, rings: u32) -> BTreeSet<GeoCell> {
        let mut cells = BTreeSet::new();

        let reach_km = f64::from(rings) * self.edge_km;
        let angular = reach_km / EARTH_RADIUS_KM;
        let half_sin = (angular / 2.0).sin();
        let cos_centre = lat.to_radians().cos().max(0.0);

        let centre_band = i64::from(self.band_of(lat));
        let first_band = (centre_band - i64::from(rings)).max(0);
        let last_band = (centre_band + i64::from(rings)).min(i64::from(self.bands) - 1);

        for band in first_band..=last_band {
            let band = band as u32;
            let columns = self.columns_in(band);
            let cos_band = self.poleward_abs_lat(band).to_radians().cos().max(0.0);
            let denom = (cos_centre * cos_band).sqrt();

            let whole_band = angular >= PI || denom <= f64::EPSILON || half_sin >= denom;

            if whole_band {
                self.insert_band(&mut cells, band, columns);
                continue;
            }

            let half_span_deg = 2.0 * (half_sin / denom).asin().to_degrees();
            let width_deg = 360.0 / f64::from(columns);
            let first = ((lng - half_span_deg + 180.0) / width_deg).floor() as i64;
            let last = ((lng + half_span_deg + 180.0) / width_deg).floor() as i64;

            if last - first + 1 >= i64::from(columns) {
                self.insert_band(&mut cells, band, columns);
                continue;
            }

            for column in first..=last {
                let column = column.rem_euclid(i64::from(columns)) as u32;
                cells.insert(GeoCell::from_parts(self.resolution, band, column));
            }
        }

        cells
    }

    /// Haversine great-circle distance between two coordinates
    pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
        let phi1 = lat1.to_radians();
        let phi2 = lat2.to_radians();
        let d_phi = (lat2 - lat1).to_radians();
        let d_lambda = (lng2 - lng1).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);

        2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
    }

    fn band_of(&self, lat: f64) -> u32 {
        let band = ((lat + 90.0) / self.band_deg).floor().max(0.0) as u32;
        band.min(self.bands - 1)
    }

    fn poleward_abs_lat(&self, band: u32) -> f64 {
        let south = -90.0 + f64::from(band) * self.band_deg;
        let north = (south + self.band_deg).min(90.0);
        south.abs().max(north.abs()).min(90.0)
    }

    fn columns_in(&self, band: u32) -> u32 {
        let circumference_km = 360.0 * KM_PER_DEGREE * self.poleward_abs_lat(band).to_radians().cos();
        let columns = (circumference_km / self.edge_km).floor();

        if columns < 1.0 { 1 } else { columns as u32 }
    }

    fn column_of(&self, band: u32, lng: f64) -> u32 {
        let columns = self.columns_in(band);
        let width_deg = 360.0 / f64::from(columns);
        let column = ((lng + 180.0) / width_deg).floor() as i64;

        column.rem_euclid(i64::from(columns)) as u32
    }

    fn insert_band(&self, cells: &mut BTreeSet<GeoCell>, band: u32, columns: u32) {
        for column in 0..columns {
            cells.insert(GeoCell::from_parts(self.resolution, band, column));
        }
    }
}

impl Default for GeoIndexer {
    fn default() -> Self {
        let edge = edge_km(DEFAULT_RESOLUTION);
        let band_deg = edge / KM_PER_DEGREE;

        Self {
            resolution: DEFAULT_RESOLUTION,
            edge_km: edge,
            band_deg,
            bands: (180.0 / band_deg).ceil() as u32,
            ring_table: RingTable::default(),
        }
    }
}

fn validate_coordinate(lat: f64, lng: f64) -> Result<(), DomainError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(DomainError::invalid_coordinate(format!(
            "Latitude {} is outside [-90, 90]",
            lat
        )));
    }

    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(DomainError::invalid_coordinate(format!(
            "Longitude {} is outside [-180, 180]",
            lng
        )));
    }

    Ok(())
}
