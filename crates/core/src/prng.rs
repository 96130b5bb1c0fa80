//! Seedable Xorshift64 generator used for placement, scale and texture draws.
//!
//! The field owns one generator and forks an independent stream for every
//! particle it creates, so a given `FieldConfig::seed` always reproduces the
//! same population.

use serde::{Deserialize, Serialize};

/// Xorshift64 PRNG with shifts (13, 7, 17).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    /// Replacement for a zero seed, which is a fixed point of xorshift.
    const FALLBACK_SEED: u64 = 0x5EED_DEAD_BEEF_CAFE;

    /// Creates a generator. A `seed` of 0 is replaced by a non-zero constant.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { Self::FALLBACK_SEED } else { seed },
        }
    }

    /// Advances the state and returns the next 64-bit value.
    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Uniform f64 in [0, 1) built from the upper 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform f64 in [min, max). Returns `min` when the range is empty.
    pub fn next_range(&mut self, min: f64, max: f64) -> f64 {
        if max <= min {
            return min;
        }
        let v = min + self.next_f64() * (max - min);
        // Rounding can land exactly on `max` for wide ranges.
        if v >= max {
            min
        } else {
            v
        }
    }

    /// Uniform index in [0, len). Returns `None` for an empty range.
    pub fn next_index(&mut self, len: usize) -> Option<usize> {
        (len > 0).then(|| (self.next_u64() % len as u64) as usize)
    }

    /// Splits off an independent generator.
    ///
    /// The child seed is passed through a splitmix64 finaliser so that
    /// consecutive forks do not produce correlated streams.
    pub fn fork(&mut self) -> Self {
        let mut z = self.next_u64().wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        Self::new(z ^ (z >> 31))
    }
}
