//! Combining lexical and vector result lists.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{ConfigError, Result};
use crate::traits::store::{Reranker, SearchHit};

/// Reciprocal Rank Fusion smoothing constant.
pub const RRF_K: f32 = 60.0;

/// Merge lexical and vector hits with Reciprocal Rank Fusion.
///
/// Each hit contributes `1 / (RRF_K + rank + 1)` per list it appears in.
/// A chunk present in both lists keeps both raw scores. Output is sorted
/// best first; equal scores keep first-seen order (lexical list first).
pub fn fuse_hits(lexical: Vec<SearchHit>, vector: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut fused: Vec<SearchHit> = Vec::with_capacity(lexical.len() + vector.len());

    for (list, is_vector) in [(lexical, false), (vector, true)] {
        for (rank, hit) in list.into_iter().enumerate() {
            let rrf = 1.0 / (RRF_K + rank as f32 + 1.0);
            match positions.get(&hit.chunk_id) {
                Some(&pos) => {
                    let existing = &mut fused[pos];
                    existing.score += rrf;
                    if is_vector {
                        existing.vector_score = hit.vector_score;
                    } else {
                        existing.lexical_score = hit.lexical_score;
                    }
                }
                None => {
                    positions.insert(hit.chunk_id.clone(), fused.len());
                    fused.push(SearchHit { score: rrf, ..hit });
                }
            }
        }
    }

    sort_by_score(&mut fused);
    fused
}

/// Stable sort, best first.
pub(crate) fn sort_by_score(hits: &mut [SearchHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Min-max normalise the present values to [0, 1].
///
/// When every present value is equal they all map to 1.0.
fn normalise(values: &[Option<f32>]) -> Vec<f32> {
    let present = values.iter().flatten();
    let min = present.clone().copied().fold(f32::INFINITY, f32::min);
    let max = present.copied().fold(f32::NEG_INFINITY, f32::max);

    values
        .iter()
        .map(|v| match v {
            None => 0.0,
            Some(_) if max <= min => 1.0,
            Some(v) => (v - min) / (max - min),
        })
        .collect()
}

/// Weighted blend of normalised vector and lexical scores.
///
/// `score = weight * vector + (1 - weight) * lexical`; a hit missing from
/// one index contributes 0 for that side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearCombination {
    weight: f32,
}

impl LinearCombination {
    /// `weight` is the vector-search share, within [0, 1].
    pub fn new(weight: f32) -> std::result::Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&weight) {
            return Err(ConfigError::InvalidWeight(weight));
        }
        Ok(Self { weight })
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    /// Blend scores and sort; does not truncate.
    pub fn combine(&self, mut candidates: Vec<SearchHit>) -> Vec<SearchHit> {
        let vector: Vec<Option<f32>> = candidates.iter().map(|h| h.vector_score).collect();
        let lexical: Vec<Option<f32>> = candidates.iter().map(|h| h.lexical_score).collect();
        let vector = normalise(&vector);
        let lexical = normalise(&lexical);

        for (i, hit) in candidates.iter_mut().enumerate() {
            hit.score = self.weight * vector[i] + (1.0 - self.weight) * lexical[i];
        }
        sort_by_score(&mut candidates);
        candidates
    }
}

#[async_trait]
impl Reranker for LinearCombination {
    fn name(&self) -> String {
        format!("linear_combination({:.2})", self.weight)
    }

    async fn rerank(&self, _query: &str, candidates: Vec<SearchHit>) -> Result<Vec<SearchHit>> {
        Ok(self.combine(candidates))
    }
}
