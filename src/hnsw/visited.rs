//! Visited-node bookkeeping for graph traversals.
//!
//! Every node id owns one stamp. A node counts as visited when its stamp equals
//! the current pass number, so starting a new pass is a counter bump rather
//! than a rewrite of the whole table. The set also counts how many nodes the
//! current pass has marked, which the reachability check in
//! [`HnswIndex::validate`](crate::HnswIndex::validate) reads back.

/// Per-pass visited marks keyed by dense node id.
#[derive(Debug)]
pub struct VisitedSet {
    stamps: Vec<u32>,
    pass: u32,
    marked: usize,
}

impl VisitedSet {
    /// A set covering node ids `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            stamps: vec![0; capacity],
            pass: 1,
            marked: 0,
        }
    }

    /// Start a new pass with nothing marked.
    pub fn clear(&mut self) {
        self.marked = 0;
        match self.pass.checked_add(1) {
            Some(next) => self.pass = next,
            None => {
                // Stamps from 4 billion passes ago would alias; wipe once
                self.stamps.fill(0);
                self.pass = 1;
            }
        }
    }

    /// Grow to cover ids `0..capacity`. Marks of the current pass are kept.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.stamps.len() {
            self.stamps.resize(capacity, 0);
        }
    }

    /// Mark `id`. Returns `true` the first time `id` is marked in this pass.
    #[inline]
    pub fn insert(&mut self, id: u32) -> bool {
        let stamp = &mut self.stamps[id as usize];
        if *stamp == self.pass {
            return false;
        }
        *stamp = self.pass;
        self.marked += 1;
        true
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.stamps.get(id as usize) == Some(&self.pass)
    }

    /// Number of ids marked in this pass.
    pub fn len(&self) -> usize {
        self.marked
    }

    pub fn is_empty(&self) -> bool {
        self.marked == 0
    }
}

impl Default for VisitedSet {
    fn default() -> Self {
        Self::new(0)
    }
}
