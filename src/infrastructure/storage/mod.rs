//! Storage infrastructure - Listing repository implementations

mod factory;
mod in_memory;
mod postgres;

pub use factory::{StorageConfig, StorageFactory, StorageType};
pub use in_memory::InMemoryListingRepository;
pub use postgres::{PostgresConfig, PostgresListingRepository};
