//! HNSW search: single-layer best-first search and multi-layer KNN.
//!
//! [`search_layer`] is the one traversal primitive. Insertion uses it with
//! `ef_construction`, queries with `max(ef, k)` at layer 0, and both use it
//! with `ef = 1` for the greedy descent through upper layers.

use crate::error::Result;
use crate::hnsw::graph::{HnswIndex, Label};
use crate::hnsw::visited::VisitedSet;
use ordered_float::OrderedFloat;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

thread_local! {
    /// Thread-local VisitedSet pool for queries.
    /// Reused across searches on the same thread instead of allocating per query.
    static SEARCH_VISITED: RefCell<VisitedSet> = RefCell::new(VisitedSet::new(0));
}

/// A candidate to expand. Reversed ordering turns `BinaryHeap` into a min-heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    distance: OrderedFloat<f32>,
    id: u32,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .cmp(&self.distance)
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A result entry. Max-heap by distance so the worst result is on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResultEntry {
    distance: OrderedFloat<f32>,
    id: u32,
}

impl Ord for ResultEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for ResultEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Search a single layer of the HNSW graph.
///
/// Returns up to `ef` `(distance, id)` pairs closest to `query` among nodes
/// reachable from `entry_points` at `layer`, sorted ascending by distance
/// (ties broken by id). `visited` is cleared at the start of each call and
/// must cover every node id.
pub fn search_layer(
    index: &HnswIndex,
    query: &[f32],
    entry_points: &[u32],
    ef: usize,
    layer: usize,
    visited: &mut VisitedSet,
) -> Vec<(f32, u32)> {
    let ef = ef.max(1);
    visited.clear();
    // Neither heap can outgrow the node count, whatever `ef` the caller asked for
    let cap = ef.min(index.len()).max(1);
    let mut candidates: BinaryHeap<Candidate> = BinaryHeap::with_capacity(cap.saturating_mul(2));
    let mut results: BinaryHeap<ResultEntry> = BinaryHeap::with_capacity(cap + 1);

    for &ep in entry_points {
        if visited.insert(ep) {
            let distance = OrderedFloat(index.distance_to(query, ep));
            candidates.push(Candidate { distance, id: ep });
            results.push(ResultEntry { distance, id: ep });
            if results.len() > ef {
                results.pop();
            }
        }
    }

    // Cached worst distance, valid whenever results is non-empty
    let mut worst = results.peek().map_or(f32::MAX, |r| r.distance.0);

    while let Some(candidate) = candidates.pop() {
        // Closest unexpanded candidate is already worse than every kept result
        if results.len() >= ef && candidate.distance.0 > worst {
            break;
        }

        let Some(neighbor_list) = index.neighbors(candidate.id, layer) else {
            continue;
        };

        for &neighbor_id in neighbor_list {
            if !visited.insert(neighbor_id) {
                continue;
            }

            let dist = index.distance_to(query, neighbor_id);
            if results.len() < ef || dist < worst {
                let distance = OrderedFloat(dist);
                candidates.push(Candidate {
                    distance,
                    id: neighbor_id,
                });
                results.push(ResultEntry {
                    distance,
                    id: neighbor_id,
                });
                if results.len() > ef {
                    results.pop();
                }
                worst = results.peek().map_or(f32::MAX, |r| r.distance.0);
            }
        }
    }

    results
        .into_sorted_vec()
        .into_iter()
        .map(|r| (r.distance.0, r.id))
        .collect()
}

impl HnswIndex {
    /// Greedy `ef = 1` descent from `entry` through layers `from` down to `to`
    /// (both inclusive). Returns the node closest to `query` found on layer `to`.
    pub(crate) fn greedy_descend(
        &self,
        query: &[f32],
        entry: u32,
        from: usize,
        to: usize,
        visited: &mut VisitedSet,
    ) -> u32 {
        let mut current = entry;
        if from < to {
            return current;
        }
        for layer in (to..=from).rev() {
            let nearest = search_layer(self, query, std::slice::from_ref(&current), 1, layer, visited);
            if let Some(&(_, id)) = nearest.first() {
                current = id;
            }
        }
        current
    }

    /// Find the `k` nearest stored points to `query`.
    ///
    /// Returns `(distance, label)` pairs sorted by non-decreasing distance; fewer
    /// than `k` when the index holds fewer points. `ef` is raised to at least `k`.
    pub fn search_knn(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<(f32, Label)>> {
        self.check_dimension(query)?;
        let entry_point = match self.entry_point {
            Some(ep) if k > 0 => ep,
            _ => return Ok(Vec::new()),
        };

        let results = SEARCH_VISITED.with(|cell| {
            let mut visited = cell.borrow_mut();
            visited.ensure_capacity(self.len());

            let mut current_ep = entry_point;
            if self.max_level > 0 {
                current_ep = self.greedy_descend(query, entry_point, self.max_level, 1, &mut *visited);
            }

            search_layer(
                self,
                query,
                std::slice::from_ref(&current_ep),
                ef.max(k),
                0,
                &mut *visited,
            )
        });

        Ok(results
            .into_iter()
            .take(k)
            .map(|(distance, id)| (distance, self.labels[id as usize]))
            .collect())
    }

    /// [`search_knn`](Self::search_knn) with the configured `ef_search`.
    pub fn search_knn_default(&self, query: &[f32], k: usize) -> Result<Vec<(f32, Label)>> {
        self.search_knn(query, k, self.config.ef_search)
    }
}
