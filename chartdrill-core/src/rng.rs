//! Reproducible segment draws.
//!
//! A master seed expands into per-`(symbol, draw)` sub-seeds via BLAKE3, so a
//! practice set can be replayed: the third segment drawn for `BTCUSDT` under
//! seed 42 is always the same window, whatever was drawn before it.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSeed {
    master_seed: u64,
}

impl SampleSeed {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Deterministic sub-seed for one draw of one symbol.
    pub fn sub_seed(&self, symbol: &str, draw: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        hasher.update(&draw.to_le_bytes());
        let hash = hasher.finalize();
        let mut first = [0u8; 8];
        first.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(first)
    }

    pub fn rng_for(&self, symbol: &str, draw: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(symbol, draw))
    }
}
