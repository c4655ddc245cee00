use crate::error::Result;
use crate::hnsw::graph::{HnswConfig, HnswIndex, Label};
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;

/// A thread-safe handle to one index.
///
/// Insertions take the write lock, so they are serialized and never overlap a
/// query. Queries and saves take the read lock and run concurrently.
/// Cloning a `SharedIndex` produces a new handle to the same index.
#[derive(Debug, Clone)]
pub struct SharedIndex {
    pub index: Arc<RwLock<HnswIndex>>,
}

impl SharedIndex {
    /// Creates a handle to a new empty index.
    pub fn new(dimension: usize, config: HnswConfig) -> Result<Self> {
        Ok(Self::from_index(HnswIndex::new(dimension, config)?))
    }

    pub fn from_index(index: HnswIndex) -> Self {
        Self {
            index: Arc::new(RwLock::new(index)),
        }
    }

    /// Inserts a point. Returns the new node id.
    pub fn add_point(&self, point: &[f32], label: Label) -> Result<u32> {
        self.index.write().add_point(point, label)
    }

    /// Finds the `k` nearest labels to `query`.
    pub fn search_knn(&self, query: &[f32], k: usize, ef: usize) -> Result<Vec<(f32, Label)>> {
        self.index.read().search_knn(query, k, ef)
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Saves a snapshot; concurrent queries keep running, insertions wait.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.index.read().save_index(path)
    }

    /// Opens a handle to an index loaded from `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::from_index(HnswIndex::load(path)?))
    }
}
