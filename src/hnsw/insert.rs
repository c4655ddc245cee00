//! HNSW insertion algorithm.
//!
//! Inserts a point into the HNSW graph with bidirectional connections and
//! per-neighbor pruning, so degree bounds hold after every insertion.
//!
//! Each node also gets an anchor on every layer it shares with earlier nodes.
//! The anchor edges, kept in both directions, form a spanning tree per layer.
//! Pruning never removes them, so no node can lose its last way in.

use crate::error::{HnswError, Result};
use crate::hnsw::graph::{HnswIndex, Label};
use crate::hnsw::search::search_layer;
use crate::hnsw::visited::VisitedSet;

impl HnswIndex {
    /// Insert a point under `label` and return its node id.
    ///
    /// Fails without touching the index when the dimension is wrong or the
    /// label is already present.
    pub fn add_point(&mut self, point: &[f32], label: Label) -> Result<u32> {
        self.check_dimension(point)?;
        if self.label_lookup.contains_key(&label) {
            return Err(HnswError::DuplicateLabel(label));
        }
        let internal_id = u32::try_from(self.len())
            .ok()
            .filter(|&id| id < u32::MAX)
            .ok_or(HnswError::CapacityExceeded)?;

        let level = self.sampler.sample();

        // First node — becomes the entry point and the root of every layer's tree
        let Some(entry_point) = self.entry_point else {
            self.push_node(point, label, level, vec![Vec::new(); level + 1], vec![None; level + 1]);
            self.entry_point = Some(internal_id);
            self.max_level = level;
            tracing::debug!(id = internal_id, level, "first node inserted");
            return Ok(internal_id);
        };

        // One visited set for every search_layer call of this insertion
        let mut visited = VisitedSet::new(self.len());

        // Phase 1: greedy descent from the top layer down to level + 1
        let mut current_ep =
            self.greedy_descend(point, entry_point, self.max_level, level + 1, &mut visited);

        // Phase 2: search each shared layer and pick the new node's neighbors.
        // Lists are collected first; the node is pushed once all are known.
        // Layers above the current top start new trees with this node as root.
        let top = level.min(self.max_level);
        let mut node_neighbors: Vec<Vec<u32>> = vec![Vec::new(); level + 1];
        let mut node_anchors: Vec<Option<u32>> = vec![None; level + 1];
        for layer in (0..=top).rev() {
            let candidates = search_layer(
                self,
                point,
                std::slice::from_ref(&current_ep),
                self.config.ef_construction,
                layer,
                &mut visited,
            );

            let bound = self.max_degree(layer);
            let selected = self.select_neighbors(&candidates, bound);
            let mut ids: Vec<u32> = selected.iter().map(|&(_, id)| id).collect();

            // Closest node on this layer seeds the next one down
            if let Some(&(_, nearest)) = candidates.first() {
                current_ep = nearest;
            }

            let anchor = self.pick_anchor(&ids, current_ep, layer);
            if let Some(anchor) = anchor {
                if !ids.contains(&anchor) {
                    if ids.len() >= bound {
                        ids.pop();
                    }
                    ids.push(anchor);
                }
            }
            node_neighbors[layer] = ids;
            node_anchors[layer] = anchor;
        }

        self.push_node(point, label, level, node_neighbors, node_anchors);

        // Phase 3: add reverse edges and prune neighbors pushed over their bound.
        // Tree edges are never pruned, which keeps every layer connected.
        for layer in 0..=top {
            let m_max = self.max_degree(layer);
            let my_neighbors: Vec<u32> = self.neighbors[internal_id as usize][layer].clone();
            for neighbor_id in my_neighbors {
                let nid = neighbor_id as usize;
                self.neighbors[nid][layer].push(internal_id);

                if self.neighbors[nid][layer].len() > m_max {
                    let (mut kept, loose): (Vec<u32>, Vec<u32>) = self.neighbors[nid][layer]
                        .iter()
                        .partition(|&&cid| self.is_tree_edge(neighbor_id, cid, layer));
                    let candidates: Vec<(f32, u32)> = loose
                        .into_iter()
                        .map(|cid| (self.distance_between(neighbor_id, cid), cid))
                        .collect();
                    let pruned = self.select_neighbors(&candidates, m_max.saturating_sub(kept.len()));
                    kept.extend(pruned.into_iter().map(|(_, id)| id));
                    self.neighbors[nid][layer] = kept;
                }
            }
        }

        // Global state changes only after the node's own lists are complete
        if level > self.max_level {
            tracing::debug!(
                id = internal_id,
                from = self.max_level,
                to = level,
                "entry point raised"
            );
            self.max_level = level;
            self.entry_point = Some(internal_id);
        }

        Ok(internal_id)
    }

    /// Choose the node a new node hangs off in `layer`'s spanning tree: the
    /// closest selected neighbor with a free tree slot, or failing that the
    /// first free node found walking down the tree from the closest one.
    /// Returns `None` only when the layer's bound is 1 and the tree is full.
    fn pick_anchor(&self, selected: &[u32], nearest: u32, layer: usize) -> Option<u32> {
        let bound = self.max_degree(layer);
        if let Some(&id) = selected
            .iter()
            .find(|&&id| self.tree_degree(id, layer) < bound)
        {
            return Some(id);
        }
        // Children always have larger ids than their anchor, so the walk ends
        let mut current = selected.first().copied().unwrap_or(nearest);
        loop {
            if self.tree_degree(current, layer) < bound {
                return Some(current);
            }
            current = *self.neighbors[current as usize][layer]
                .iter()
                .find(|&&child| self.anchors[child as usize][layer] == Some(current))?;
        }
    }

    /// Append a node's SoA fields. The node's id is the previous `len()`.
    fn push_node(
        &mut self,
        point: &[f32],
        label: Label,
        level: usize,
        adjacency: Vec<Vec<u32>>,
        anchors: Vec<Option<u32>>,
    ) {
        let id = self.labels.len() as u32;
        self.points.extend_from_slice(point);
        self.neighbors.push(adjacency);
        self.anchors.push(anchors);
        self.levels.push(level as u8);
        self.labels.push(label);
        self.label_lookup.insert(label, id);
    }
}
