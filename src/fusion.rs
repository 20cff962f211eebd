//! Reciprocal Rank Fusion of keyword and vector result lists.
//!
//! Keyword relevance statistics and vector distances live on incomparable
//! scales, so the merge is rank-based: each list contributes
//! `1 / (k + rank)` with 1-based ranks and k = 60. A chunk ranked well in
//! both lists reliably outranks one ranked first in only one, and an empty
//! list (vector backend unavailable, tokenless query) degrades the fused
//! order to the surviving list unchanged.

use std::collections::HashMap;

use crate::models::SearchHit;

/// Standard RRF smoothing term.
pub const RRF_K: f64 = 60.0;

/// Each underlying search fetches this multiple of the final limit before
/// fusion, leaving headroom for the merge.
pub const CANDIDATE_FACTOR: usize = 2;

/// Contribution of a 1-based rank position to the fused score.
fn rrf_score(rank: usize) -> f64 {
    1.0 / (RRF_K + rank as f64)
}

/// Fuse two ranked candidate lists into the top-`limit` results.
///
/// A chunk found by both searches is merged by identifier with its two
/// contributions summed, never duplicated. Ties keep first-encounter order:
/// vector-list order first, then keyword-only additions.
pub fn fuse(vector_hits: Vec<SearchHit>, keyword_hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    let mut merged: Vec<SearchHit> = Vec::with_capacity(vector_hits.len() + keyword_hits.len());
    let mut position: HashMap<String, usize> = HashMap::new();

    for (i, mut hit) in vector_hits.into_iter().enumerate() {
        hit.score = rrf_score(i + 1);
        position.insert(hit.chunk_id.clone(), merged.len());
        merged.push(hit);
    }

    for (i, mut hit) in keyword_hits.into_iter().enumerate() {
        let contribution = rrf_score(i + 1);
        match position.get(&hit.chunk_id) {
            Some(&idx) => merged[idx].score += contribution,
            None => {
                hit.score = contribution;
                position.insert(hit.chunk_id.clone(), merged.len());
                merged.push(hit);
            }
        }
    }

    // Stable sort: equal scores keep first-encounter order.
    merged.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    merged.truncate(limit);
    merged
}
