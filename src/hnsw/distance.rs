//! Distance metric for HNSW search.
//!
//! The index measures dissimilarity with squared Euclidean distance (L2²): it is
//! monotonic in Euclidean distance and skips the square root on every comparison.

use crate::error::{HnswError, Result};

/// Distance metric used for vector similarity computation.
///
/// All metrics return a distance value where **lower is better** (more similar).
/// Recorded in the index configuration and in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[non_exhaustive]
pub enum DistanceMetric {
    /// Squared Euclidean distance (L2²). Range: \[0, ∞).
    #[default]
    Euclidean,
}

impl DistanceMetric {
    /// Distance between two slices of equal length. Callers validate lengths.
    #[inline]
    pub fn distance_exact(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Euclidean => euclidean_sq(a, b),
        }
    }

    /// Checked distance: fails with [`HnswError::DimensionMismatch`] when lengths differ.
    pub fn distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(HnswError::DimensionMismatch {
                expected: a.len(),
                actual: b.len(),
            });
        }
        Ok(self.distance_exact(a, b))
    }
}

/// Squared Euclidean distance between two f32 slices.
///
/// Accumulates four lanes at a time so the loop vectorizes; the lane order is
/// fixed, which keeps results bit-identical between calls on the same inputs.
#[inline]
pub fn euclidean_sq(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut acc = [0.0f32; 4];
    let chunks_a = a.chunks_exact(4);
    let chunks_b = b.chunks_exact(4);
    let rem_a = chunks_a.remainder();
    let rem_b = chunks_b.remainder();
    for (ca, cb) in chunks_a.zip(chunks_b) {
        for lane in 0..4 {
            let d = ca[lane] - cb[lane];
            acc[lane] += d * d;
        }
    }
    let mut sum = (acc[0] + acc[1]) + (acc[2] + acc[3]);
    for (x, y) in rem_a.iter().zip(rem_b) {
        let d = x - y;
        sum += d * d;
    }
    sum
}
