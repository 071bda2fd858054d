//! Semantic relevance ranking

use thiserror::Error;
use tracing::warn;

use crate::domain::embedding::{cosine_similarity, is_zero_vector};
use crate::domain::listing::Listing;

/// Score given to every candidate when ranking degrades
pub const FALLBACK_SCORE: f32 = 1.0;

/// Anything the ranker can score: exposes an optional stored vector
pub trait Rankable {
    fn embedding(&self) -> Option<&[f32]>;
}

impl Rankable for Listing {
    fn embedding(&self) -> Option<&[f32]> {
        self.embedding.as_deref()
    }
}

/// A candidate with its relevance score attached
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate<T> {
    pub candidate: T,
    pub score: f32,
}

/// Ordered candidates plus whether the fallback ordering was used
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking<T> {
    pub candidates: Vec<ScoredCandidate<T>>,
    pub degraded: bool,
}

#[derive(Debug, Error, PartialEq)]
enum RankingFailure {
    #[error("query vector has zero magnitude")]
    ZeroQuery,

    #[error("candidate {index} has dimension {actual}, query has {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("candidate {index} produced a non-finite score")]
    NonFinite { index: usize },
}

/// Orders candidates by cosine similarity to a query vector.
///
/// Candidates without a vector score 0. If scoring cannot be trusted (zero
/// query vector, mismatched dimensions, NaN) every candidate scores
/// [`FALLBACK_SCORE`] in input order instead of failing the search.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ranker;

impl Ranker {
    pub fn new() -> Self {
        Self
    }

    pub fn rank<T: Rankable>(&self, query: &[f32], candidates: Vec<T>) -> Ranking<T> {
        if candidates.is_empty() {
            return Ranking {
                candidates: Vec::new(),
                degraded: false,
            };
        }

        match Self::scores(query, &candidates) {
            Ok(scores) => {
                let mut scored: Vec<ScoredCandidate<T>> = candidates
                    .into_iter()
                    .zip(scores)
                    .map(|(candidate, score)| ScoredCandidate { candidate, score })
                    .collect();

                // stable: ties keep input order
                scored.sort_by(|a, b| b.score.total_cmp(&a.score));

                Ranking {
                    candidates: scored,
                    degraded: false,
                }
            }
            Err(failure) => {
                warn!(
                    error = %failure,
                    candidates = candidates.len(),
                    "Ranking degraded to input order"
                );

                Ranking {
                    candidates: candidates
                        .into_iter()
                        .map(|candidate| ScoredCandidate {
                            candidate,
                            score: FALLBACK_SCORE,
                        })
                        .collect(),
                    degraded: true,
                }
            }
        }
    }

    fn scores<T: Rankable>(query: &[f32], candidates: &[T]) -> Result<Vec<f32>, RankingFailure> {
        if is_zero_vector(query) {
            return Err(RankingFailure::ZeroQuery);
        }

        candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                let vector = match candidate.embedding() {
                    Some(v) if !v.is_empty() => v,
                    _ => return Ok(0.0),
                };

                if vector.len() != query.len() {
                    return Err(RankingFailure::DimensionMismatch {
                        index,
                        expected: query.len(),
                        actual: vector.len(),
                    });
                }

                let score = cosine_similarity(query, vector);
                if score.is_finite() {
                    Ok(score)
                } else {
                    Err(RankingFailure::NonFinite { index })
                }
            })
            .collect()
    }
}
