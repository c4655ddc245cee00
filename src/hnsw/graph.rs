//! HNSW graph structure and configuration.
//!
//! [`HnswConfig`] defines tuning parameters (M, ef_construction, heuristic mode, seed).
//! [`HnswIndex`] stores the graph using Struct-of-Arrays layout for cache efficiency.

use crate::config;
use crate::error::{HnswError, Result};
use crate::hnsw::distance::DistanceMetric;
use crate::hnsw::level::LevelSampler;
use crate::hnsw::visited::VisitedSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller-supplied external identifier of a point.
pub type Label = i64;

/// Configuration parameters for an HNSW index.
///
/// Controls the trade-off between build speed, search speed, recall, and memory usage.
/// Fixed for the lifetime of an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HnswConfig {
    /// Base edge budget: max links per node at layers > 0. Layer 0 allows `2 * m`.
    pub m: usize,
    /// Candidate list size during index construction.
    pub ef_construction: usize,
    /// Candidate list size used by `search_knn_default`.
    pub ef_search: usize,
    /// Maximum number of layers in the graph.
    pub max_layers: usize,
    /// Diversity-aware neighbor selection (true) or plain k-closest (false).
    pub use_heuristic: bool,
    /// Seed for the level sampler.
    pub seed: u64,
    /// Distance function for similarity computation.
    pub distance_metric: DistanceMetric,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            m: config::HNSW_DEFAULT_M,
            ef_construction: config::HNSW_DEFAULT_EF_CONSTRUCTION,
            ef_search: config::HNSW_DEFAULT_EF_SEARCH,
            max_layers: config::HNSW_DEFAULT_MAX_LAYERS,
            use_heuristic: true,
            seed: config::HNSW_DEFAULT_SEED,
            distance_metric: DistanceMetric::Euclidean,
        }
    }
}

impl HnswConfig {
    /// Default configuration with the given edge budget and construction breadth.
    pub fn new(m: usize, ef_construction: usize) -> Self {
        Self {
            m,
            ef_construction,
            ..Self::default()
        }
    }

    pub fn with_heuristic(mut self, use_heuristic: bool) -> Self {
        self.use_heuristic = use_heuristic;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_ef_search(mut self, ef_search: usize) -> Self {
        self.ef_search = ef_search;
        self
    }

    pub fn with_max_layers(mut self, max_layers: usize) -> Self {
        self.max_layers = max_layers;
        self
    }

    /// Rejects parameter combinations the index cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.m == 0 {
            return Err(HnswError::InvalidConfig("M must be >= 1".into()));
        }
        if self.ef_construction == 0 {
            return Err(HnswError::InvalidConfig("ef_construction must be >= 1".into()));
        }
        if self.max_layers == 0 || self.max_layers > config::HNSW_MAX_LAYERS_LIMIT {
            return Err(HnswError::InvalidConfig(format!(
                "max_layers must be in 1..={}, got {}",
                config::HNSW_MAX_LAYERS_LIMIT,
                self.max_layers
            )));
        }
        Ok(())
    }
}

/// HNSW index using Struct-of-Arrays (SoA) layout.
/// Points are stored contiguously in an arena keyed by dense node id.
#[derive(Debug)]
pub struct HnswIndex {
    pub(crate) config: HnswConfig,
    pub(crate) dimension: usize,
    pub(crate) m_max: usize,
    pub(crate) m_max0: usize,
    pub(crate) sampler: LevelSampler,
    // SoA: point arena, `dimension` floats per node
    pub(crate) points: Vec<f32>,
    // SoA: graph structure
    pub(crate) neighbors: Vec<Vec<Vec<u32>>>, // [node_id][layer][neighbor_ids]
    // [node_id][layer] -> earlier node this one hangs off in the layer's spanning tree
    pub(crate) anchors: Vec<Vec<Option<u32>>>,
    pub(crate) levels: Vec<u8>,
    pub(crate) labels: Vec<Label>,
    pub(crate) label_lookup: HashMap<Label, u32>,
    // Index metadata
    pub(crate) entry_point: Option<u32>,
    pub(crate) max_level: usize,
}

impl HnswIndex {
    /// Creates a new empty HNSW index with the given dimension and configuration.
    pub fn new(dimension: usize, config: HnswConfig) -> Result<Self> {
        if dimension == 0 {
            return Err(HnswError::InvalidConfig("dimension must be >= 1".into()));
        }
        config.validate()?;
        Ok(Self {
            dimension,
            m_max: config.m,
            m_max0: config.m * 2,
            sampler: LevelSampler::new(config.m, config.max_layers, config.seed),
            points: Vec::new(),
            neighbors: Vec::new(),
            anchors: Vec::new(),
            levels: Vec::new(),
            labels: Vec::new(),
            label_lookup: HashMap::new(),
            entry_point: None,
            max_level: 0,
            config,
        })
    }

    /// Creates a new empty HNSW index with default configuration (M=16, ef_c=200).
    pub fn with_default_config(dimension: usize) -> Result<Self> {
        Self::new(dimension, HnswConfig::default())
    }

    /// Number of points in the index.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Highest layer of any node (0 for an empty index).
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Node every search starts from, `None` while the index is empty.
    pub fn entry_point(&self) -> Option<u32> {
        self.entry_point
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn config(&self) -> &HnswConfig {
        &self.config
    }

    /// Degree bound at layers above 0.
    pub fn m_max(&self) -> usize {
        self.m_max
    }

    /// Degree bound at layer 0.
    pub fn m_max0(&self) -> usize {
        self.m_max0
    }

    /// Level normalization constant `1 / ln(M)`.
    pub fn level_multiplier(&self) -> f64 {
        self.sampler.mult()
    }

    /// Degree bound for a given layer.
    #[inline]
    pub(crate) fn max_degree(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m_max0
        } else {
            self.m_max
        }
    }

    /// Point stored for a node, or `None` for an unknown id.
    pub fn point(&self, id: u32) -> Option<&[f32]> {
        ((id as usize) < self.len()).then(|| self.vector(id))
    }

    /// Layer assignment of a node, or `None` for an unknown id.
    pub fn level_of(&self, id: u32) -> Option<usize> {
        self.levels.get(id as usize).map(|&level| level as usize)
    }

    /// O(1) slice into the contiguous arena. `id` must be a stored node.
    #[inline]
    pub(crate) fn vector(&self, id: u32) -> &[f32] {
        let start = id as usize * self.dimension;
        &self.points[start..start + self.dimension]
    }

    #[inline]
    pub(crate) fn level(&self, id: u32) -> usize {
        self.levels[id as usize] as usize
    }

    /// True when the edge `from -> to` at `layer` belongs to the layer's
    /// spanning tree. Tree edges survive every prune.
    #[inline]
    pub(crate) fn is_tree_edge(&self, from: u32, to: u32, layer: usize) -> bool {
        self.anchors[from as usize][layer] == Some(to)
            || self.anchors[to as usize][layer] == Some(from)
    }

    /// Number of tree edges in `id`'s list at `layer`.
    pub(crate) fn tree_degree(&self, id: u32, layer: usize) -> usize {
        self.neighbors[id as usize][layer]
            .iter()
            .filter(|&&other| self.is_tree_edge(id, other, layer))
            .count()
    }

    /// Neighbors of `id` at `layer`, or `None` if the node does not reach that layer.
    pub fn neighbors(&self, id: u32, layer: usize) -> Option<&[u32]> {
        self.neighbors
            .get(id as usize)
            .and_then(|layers| layers.get(layer))
            .map(Vec::as_slice)
    }

    pub fn label_of(&self, id: u32) -> Option<Label> {
        self.labels.get(id as usize).copied()
    }

    pub fn id_of(&self, label: Label) -> Option<u32> {
        self.label_lookup.get(&label).copied()
    }

    pub fn contains_label(&self, label: Label) -> bool {
        self.label_lookup.contains_key(&label)
    }

    /// Checked distance between two caller vectors of the index dimension.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        self.check_dimension(a)?;
        self.check_dimension(b)?;
        self.config.distance_metric.distance(a, b)
    }

    /// Distance from a query to a stored node.
    #[inline]
    pub(crate) fn distance_to(&self, query: &[f32], id: u32) -> f32 {
        self.config.distance_metric.distance_exact(query, self.vector(id))
    }

    /// Distance between two stored nodes.
    #[inline]
    pub(crate) fn distance_between(&self, a: u32, b: u32) -> f32 {
        self.config
            .distance_metric
            .distance_exact(self.vector(a), self.vector(b))
    }

    pub(crate) fn check_dimension(&self, v: &[f32]) -> Result<()> {
        if v.len() != self.dimension {
            return Err(HnswError::DimensionMismatch {
                expected: self.dimension,
                actual: v.len(),
            });
        }
        Ok(())
    }

    /// Check every structural invariant of the graph.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let nc = self.labels.len();
        let dim = self.dimension;

        if self.m_max != self.config.m || self.m_max0 != self.config.m * 2 {
            return Err(format!(
                "degree bounds ({}, {}) do not match M={}",
                self.m_max, self.m_max0, self.config.m
            ));
        }

        // Point arena: `dimension` floats per node
        if self.points.len() != nc * dim {
            return Err(format!(
                "points length {} != node_count({}) * dimension({})",
                self.points.len(),
                nc,
                dim
            ));
        }
        if self.neighbors.len() != nc {
            return Err(format!(
                "neighbors length {} != node_count {}",
                self.neighbors.len(),
                nc
            ));
        }
        if self.levels.len() != nc {
            return Err(format!("levels length {} != node_count {}", self.levels.len(), nc));
        }
        if self.anchors.len() != nc {
            return Err(format!("anchors length {} != node_count {}", self.anchors.len(), nc));
        }

        // Label mappings must be a bijection
        if self.label_lookup.len() != nc {
            return Err(format!(
                "label_lookup({}) != node_count({})",
                self.label_lookup.len(),
                nc
            ));
        }
        for (id, label) in self.labels.iter().enumerate() {
            if self.label_lookup.get(label) != Some(&(id as u32)) {
                return Err(format!("label {} does not map back to node {}", label, id));
            }
        }

        let mut top = 0usize;
        for (node_id, node_neighbors) in self.neighbors.iter().enumerate() {
            let level = self.levels[node_id] as usize;
            if level >= self.config.max_layers {
                return Err(format!(
                    "node {} level {} exceeds max_layers {}",
                    node_id, level, self.config.max_layers
                ));
            }
            top = top.max(level);
            if node_neighbors.len() != level + 1 {
                return Err(format!(
                    "node {} has {} adjacency lists for level {}",
                    node_id,
                    node_neighbors.len(),
                    level
                ));
            }
            if self.anchors[node_id].len() != level + 1 {
                return Err(format!(
                    "node {} has {} anchor slots for level {}",
                    node_id,
                    self.anchors[node_id].len(),
                    level
                ));
            }
            for (layer, layer_neighbors) in node_neighbors.iter().enumerate() {
                if layer_neighbors.len() > self.max_degree(layer) {
                    return Err(format!(
                        "node {} degree {} exceeds bound {} at layer {}",
                        node_id,
                        layer_neighbors.len(),
                        self.max_degree(layer),
                        layer
                    ));
                }
                for &neighbor in layer_neighbors {
                    if neighbor as usize >= nc {
                        return Err(format!(
                            "neighbor {} out of bounds (node_count={}) at node {} layer {}",
                            neighbor, nc, node_id, layer
                        ));
                    }
                    if neighbor as usize == node_id {
                        return Err(format!("node {} links to itself at layer {}", node_id, layer));
                    }
                    if (self.levels[neighbor as usize] as usize) < layer {
                        return Err(format!(
                            "node {} links to {} at layer {} above its level",
                            node_id, neighbor, layer
                        ));
                    }
                }
            }
        }

        match self.entry_point {
            None if nc > 0 => return Err("non-empty index has no entry point".into()),
            Some(ep) if ep as usize >= nc => {
                return Err(format!("entry_point {} >= node_count {}", ep, nc))
            }
            Some(ep) if self.levels[ep as usize] as usize != self.max_level => {
                return Err(format!(
                    "entry point level {} != max_level {}",
                    self.levels[ep as usize], self.max_level
                ))
            }
            _ => {}
        }
        if self.max_level != top {
            return Err(format!("max_level {} != highest node level {}", self.max_level, top));
        }

        self.validate_trees()?;
        self.validate_reachability()
    }

    /// Anchors point to earlier nodes on the same layer, both directions of
    /// every tree edge are present, and no node carries more tree edges than
    /// its degree bound.
    fn validate_trees(&self) -> std::result::Result<(), String> {
        for (node_id, node_anchors) in self.anchors.iter().enumerate() {
            let id = node_id as u32;
            for (layer, anchor) in node_anchors.iter().enumerate() {
                if let Some(anchor) = *anchor {
                    if anchor >= id {
                        return Err(format!(
                            "node {} anchored to later node {} at layer {}",
                            node_id, anchor, layer
                        ));
                    }
                    if self.level(anchor) < layer {
                        return Err(format!(
                            "node {} anchored to {} at layer {} above its level",
                            node_id, anchor, layer
                        ));
                    }
                    if !self.neighbors[node_id][layer].contains(&anchor)
                        || !self.neighbors[anchor as usize][layer].contains(&id)
                    {
                        return Err(format!(
                            "tree edge {} <-> {} missing at layer {}",
                            node_id, anchor, layer
                        ));
                    }
                }
                if self.tree_degree(id, layer) > self.max_degree(layer) {
                    return Err(format!(
                        "node {} has {} tree edges at layer {}",
                        node_id,
                        self.tree_degree(id, layer),
                        layer
                    ));
                }
            }
        }
        Ok(())
    }

    /// Every node on a layer is reachable from the entry point by following
    /// that layer's edges. Layers whose bound is 1 cannot hold a spanning tree
    /// and are skipped.
    fn validate_reachability(&self) -> std::result::Result<(), String> {
        let Some(entry_point) = self.entry_point else {
            return Ok(());
        };
        let mut visited = VisitedSet::new(self.len());
        for layer in 0..=self.max_level {
            if self.max_degree(layer) < 2 {
                continue;
            }
            let on_layer = self.levels.iter().filter(|&&l| l as usize >= layer).count();
            let reached = self.reachable_from(entry_point, layer, &mut visited);
            if reached != on_layer {
                return Err(format!(
                    "only {} of {} nodes reachable from the entry point at layer {}",
                    reached, on_layer, layer
                ));
            }
        }
        Ok(())
    }

    /// Count the nodes reachable from `start` at `layer`.
    pub(crate) fn reachable_from(&self, start: u32, layer: usize, visited: &mut VisitedSet) -> usize {
        visited.clear();
        visited.ensure_capacity(self.len());
        let mut stack = vec![start];
        visited.insert(start);
        while let Some(id) = stack.pop() {
            if let Some(list) = self.neighbors(id, layer) {
                stack.extend(list.iter().copied().filter(|&n| visited.insert(n)));
            }
        }
        visited.len()
    }
}
