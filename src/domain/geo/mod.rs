//! Geospatial cell indexing for constant-time proximity filtering

mod cell;
mod indexer;
mod ring_table;

pub use cell::{GeoCell, MAX_RESOLUTION};
pub use indexer::{edge_km, GeoIndexer, BASE_EDGE_KM, DEFAULT_RESOLUTION, EARTH_RADIUS_KM};
pub use ring_table::{RingStep, RingTable};
