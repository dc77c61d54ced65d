//! Effect chains.
//!
//! A spell's effect is an [`EffectChain`]: an ordered list of
//! [`ChainStep`]s, each wrapping one [`EffectDescriptor`] with the gates the
//! pipeline applies before realizing it:
//!
//! 1. `delay_ticks` - how long to wait after the previous step
//! 2. `condition` - evaluated once, when the step is reached
//! 3. `chance` - rolled on the cast's own RNG stream
//!
//! Chains are immutable once built and shared behind `Arc`; the step list is
//! an `im::Vector`, so deriving a variant of a chain is cheap.

mod chain;
mod condition;
mod descriptor;

pub use chain::{ChainStep, EffectChain, StepPath};
pub use condition::{ConditionContext, ConditionEvaluator, CustomEvaluator, StepCondition, Subject};
pub use descriptor::{Anchor, EffectDescriptor, DEFAULT_LINE_MAX_DISTANCE_SQ, DEFAULT_LINE_SPACING};
