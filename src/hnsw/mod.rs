//! Hierarchical Navigable Small World (HNSW) approximate nearest neighbor index.
//!
//! Nodes are dense `u32` ids into flat arenas: points are stored contiguously,
//! adjacency is `neighbors[node][layer]`, and neighbor relationships are plain
//! ids. Layer 0 holds every node; each higher layer holds roughly `1/M` of the
//! layer below, giving long hops at the top and fine-grained search at the bottom.

/// Squared Euclidean distance metric.
pub mod distance;
/// HNSW graph structure, configuration, and invariant checks.
pub mod graph;
/// HNSW insertion with bidirectional connections and per-neighbor pruning.
pub mod insert;
/// Seeded level sampler.
pub mod level;
/// HNSW search: single-layer search and multi-layer KNN.
pub mod search;
/// Heuristic and simple neighbor selection.
pub mod select;
/// Generation-based visited set for efficient graph traversal.
pub mod visited;

pub use distance::DistanceMetric;
pub use graph::{HnswConfig, HnswIndex, Label};
pub use level::LevelSampler;
pub use search::search_layer;
