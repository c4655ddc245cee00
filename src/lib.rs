//! # hnsw-index
//!
//! Approximate nearest neighbor index over fixed-dimension `f32` vectors using
//! Hierarchical Navigable Small World graphs, with exact-state snapshots.
//!
//! The index itself is single-threaded: [`HnswIndex::add_point`] takes
//! `&mut self` and [`HnswIndex::search_knn`] takes `&self`. Use
//! [`storage::SharedIndex`] to share one index across threads.

/// Global configuration constants: defaults and snapshot format constants.
pub mod config;
/// Error type and `Result` alias.
pub mod error;
/// HNSW graph structure, search, insertion, and neighbor selection.
pub mod hnsw;
/// Snapshot persistence and the thread-safe index handle.
pub mod storage;

pub use error::{HnswError, Result};
pub use hnsw::{DistanceMetric, HnswConfig, HnswIndex, Label};
pub use storage::SharedIndex;
