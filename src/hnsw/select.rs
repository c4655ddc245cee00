//! Neighbor selection: which search candidates become graph edges.
//!
//! Heuristic mode (Algorithm 4 of the HNSW paper) admits a candidate only if it
//! is strictly closer to the base point than to every neighbor already admitted,
//! which spreads edges across directions instead of clustering them.
//! Simple mode keeps the `m` closest candidates.

use crate::hnsw::graph::HnswIndex;
use ordered_float::OrderedFloat;

fn sort_candidates(candidates: &[(f32, u32)]) -> Vec<(f32, u32)> {
    let mut sorted = candidates.to_vec();
    sorted.sort_unstable_by_key(|&(dist, id)| (OrderedFloat(dist), id));
    sorted
}

/// Keep the `m` closest candidates.
pub fn select_simple(candidates: &[(f32, u32)], m: usize) -> Vec<(f32, u32)> {
    let mut sorted = sort_candidates(candidates);
    sorted.truncate(m);
    sorted
}

/// Diversity-aware selection. `pair_distance(a, b)` measures two candidates
/// against each other; the `f32` in each candidate is its distance to the base point.
pub fn select_heuristic<D>(candidates: &[(f32, u32)], m: usize, pair_distance: D) -> Vec<(f32, u32)>
where
    D: Fn(u32, u32) -> f32,
{
    let mut selected: Vec<(f32, u32)> = Vec::with_capacity(m);
    for (dist_to_base, cid) in sort_candidates(candidates) {
        if selected.len() >= m {
            break;
        }
        let is_diverse = selected
            .iter()
            .all(|&(_, sid)| dist_to_base < pair_distance(cid, sid));
        if is_diverse {
            selected.push((dist_to_base, cid));
        }
    }
    selected
}

impl HnswIndex {
    /// Select at most `m` neighbors using the mode fixed in the index configuration.
    pub(crate) fn select_neighbors(&self, candidates: &[(f32, u32)], m: usize) -> Vec<(f32, u32)> {
        if self.config.use_heuristic {
            select_heuristic(candidates, m, |a, b| self.distance_between(a, b))
        } else {
            select_simple(candidates, m)
        }
    }
}
