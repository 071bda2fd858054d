//! Listings and their storage collaborator

mod entity;
mod repository;

pub use entity::{Listing, ListingId, ListingStatus, ListingUpdate};
pub use repository::ListingRepository;

#[cfg(test)]
pub use repository::MockListingRepository;
