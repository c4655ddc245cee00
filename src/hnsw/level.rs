//! Randomized level assignment for new nodes.
//!
//! Levels follow `floor(-ln(r) * mult)` with `r` drawn from the open interval
//! (0, 1) and `mult = 1 / ln(M)`, so each layer holds roughly `1/M` of the
//! nodes of the layer below it.

use rand::distributions::Open01;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Level sampler owning its RNG. State persists across calls and snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelSampler {
    rng: ChaCha8Rng,
    mult: f64,
    max_level: usize,
}

impl LevelSampler {
    /// Creates a sampler for edge budget `m`, capping levels at `max_layers - 1`.
    pub fn new(m: usize, max_layers: usize, seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            mult: level_multiplier(m),
            max_level: max_layers.saturating_sub(1),
        }
    }

    /// Normalization constant `1 / ln(M)`.
    pub fn mult(&self) -> f64 {
        self.mult
    }

    /// Highest level this sampler will return.
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Draw the level for the next node.
    pub fn sample(&mut self) -> usize {
        let r: f64 = self.rng.sample(Open01);
        level_for(r, self.mult).min(self.max_level)
    }
}

/// `1 / ln(M)`. `M == 1` would divide by zero, so it shares the `M == 2` multiplier.
pub fn level_multiplier(m: usize) -> f64 {
    1.0 / (m.max(2) as f64).ln()
}

/// Level for a uniform draw `r` in (0, 1).
#[inline]
pub fn level_for(r: f64, mult: f64) -> usize {
    (-r.ln() * mult).floor() as usize
}
