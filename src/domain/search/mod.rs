//! Search request, ranking, and result types

mod hit;
pub mod ranker;
mod request;

pub use hit::SearchHit;
pub use ranker::{Rankable, Ranker, Ranking, ScoredCandidate, FALLBACK_SCORE};
pub use request::{SearchRequest, DEFAULT_LIMIT, DEFAULT_RADIUS_KM, MAX_LIMIT, MAX_RADIUS_KM};
