//! Deterministic randomness for chance-gated effect steps.
//!
//! Each cast draws from its own stream derived from the pipeline seed and
//! the cast ID, so the outcome of one cast's chance rolls never depends on
//! how many rolls sibling casts made before it.
//!
//! ```
//! use spellcore::core::{CastId, SpellRng};
//!
//! let root = SpellRng::new(42);
//! let mut a = root.for_cast(CastId(1));
//! let mut b = SpellRng::new(42).for_cast(CastId(1));
//! assert_eq!(a.roll(0.5), b.roll(0.5));
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::CastId;

/// Deterministic ChaCha8-backed RNG.
#[derive(Clone, Debug)]
pub struct SpellRng {
    inner: ChaCha8Rng,
    seed: u64,
}

impl SpellRng {
    /// Create a new RNG with the given seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Independent stream for one cast.
    #[must_use]
    pub fn for_cast(&self, cast: CastId) -> Self {
        let cast_seed = self.seed ^ cast.raw().wrapping_mul(0x9E37_79B9_7F4A_7C15);
        Self::new(cast_seed)
    }

    /// Roll against a probability.
    ///
    /// Probabilities outside the open interval (0, 1) always pass without
    /// consuming randomness: `0` and negative values mean "not configured".
    pub fn roll(&mut self, chance: f64) -> bool {
        if chance <= 0.0 || chance >= 1.0 {
            return true;
        }
        self.inner.gen::<f64>() < chance
    }

    /// Get the current state for serialization.
    #[must_use]
    pub fn state(&self) -> SpellRngState {
        SpellRngState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
        }
    }

    /// Restore from a saved state.
    #[must_use]
    pub fn from_state(state: &SpellRngState) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(state.word_pos);
        Self {
            inner,
            seed: state.seed,
        }
    }
}

/// Serializable RNG position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellRngState {
    pub seed: u64,
    /// ChaCha8 word position (128-bit counter)
    pub word_pos: u128,
}
