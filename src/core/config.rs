//! Pipeline configuration.
//!
//! The configuration layer hands these over already parsed. Every field has
//! a default so a partial document deserializes:
//!
//! ```
//! use spellcore::core::{PipelineConfig, RegenRule};
//!
//! let config = PipelineConfig::default()
//!     .with_abandon_after(600)
//!     .with_regen("mana", RegenRule::new(5, 20));
//!
//! assert_eq!(config.abandon_after_ticks, 600);
//! assert_eq!(config.regen_for(&"mana".into()), Some(&RegenRule::new(5, 20)));
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::tick::TICKS_PER_SECOND;
use super::ResourceKey;

/// Default time a chain may sit without progress before it is abandoned.
pub const DEFAULT_ABANDON_AFTER_TICKS: u64 = 60 * TICKS_PER_SECOND;

/// Default nesting limit for sub-chains.
pub const DEFAULT_MAX_SUB_CHAIN_DEPTH: usize = 8;

/// Resource regeneration: `amount` every `interval_ticks`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenRule {
    pub amount: i64,
    pub interval_ticks: u64,
}

impl RegenRule {
    /// Create a regeneration rule.
    #[must_use]
    pub const fn new(amount: i64, interval_ticks: u64) -> Self {
        Self {
            amount,
            interval_ticks,
        }
    }

    /// Does this rule fire on tick `now`?
    #[must_use]
    pub fn fires_at(&self, now: u64) -> bool {
        self.interval_ticks > 0 && self.amount != 0 && now % self.interval_ticks == 0
    }
}

/// Configuration for an [`EffectPipeline`](crate::pipeline::EffectPipeline).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Ticks an executing chain may go without progress before it is moved
    /// to `Cancelled`. Chains may override this.
    pub abandon_after_ticks: u64,

    /// Seed for chance rolls.
    pub rng_seed: u64,

    /// Maximum sub-chain nesting. Deeper steps fail.
    pub max_sub_chain_depth: usize,

    /// Regeneration per resource pool.
    pub regen: FxHashMap<ResourceKey, RegenRule>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            abandon_after_ticks: DEFAULT_ABANDON_AFTER_TICKS,
            rng_seed: 0,
            max_sub_chain_depth: DEFAULT_MAX_SUB_CHAIN_DEPTH,
            regen: FxHashMap::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the default abandonment bound.
    #[must_use]
    pub fn with_abandon_after(mut self, ticks: u64) -> Self {
        self.abandon_after_ticks = ticks;
        self
    }

    /// Set the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng_seed = seed;
        self
    }

    /// Set the sub-chain nesting limit.
    #[must_use]
    pub fn with_max_sub_chain_depth(mut self, depth: usize) -> Self {
        self.max_sub_chain_depth = depth;
        self
    }

    /// Add a regeneration rule.
    #[must_use]
    pub fn with_regen(mut self, resource: impl Into<ResourceKey>, rule: RegenRule) -> Self {
        self.regen.insert(resource.into(), rule);
        self
    }

    /// Regeneration rule for a resource, if any.
    #[must_use]
    pub fn regen_for(&self, resource: &ResourceKey) -> Option<&RegenRule> {
        self.regen.get(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.abandon_after_ticks, 1200);
        assert_eq!(config.max_sub_chain_depth, 8);
        assert!(config.regen.is_empty());
    }

    #[test]
    fn test_regen_fires() {
        let rule = RegenRule::new(5, 20);
        assert!(rule.fires_at(0));
        assert!(rule.fires_at(40));
        assert!(!rule.fires_at(41));

        assert!(!RegenRule::new(5, 0).fires_at(0));
        assert!(!RegenRule::new(0, 20).fires_at(20));
    }

    #[test]
    fn test_partial_document() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "abandon_after_ticks": 40 }"#).unwrap();
        assert_eq!(config.abandon_after_ticks, 40);
        assert_eq!(config.max_sub_chain_depth, DEFAULT_MAX_SUB_CHAIN_DEPTH);
    }

    #[test]
    fn test_regen_document() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{ "regen": { "mana": { "amount": 2, "interval_ticks": 10 } } }"#,
        )
        .unwrap();
        assert_eq!(
            config.regen_for(&ResourceKey::mana()),
            Some(&RegenRule::new(2, 10))
        );
    }
}
