//! Effect chains and their steps.
//!
//! Chains come from the configuration layer already validated and are never
//! modified afterwards: the pipeline only ever holds them behind an `Arc`.
//! Steps live in an `im::Vector` so deriving a variant of a chain shares
//! structure with its source instead of copying every step.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::Offsets;

use super::condition::StepCondition;
use super::descriptor::{Anchor, EffectDescriptor};

/// One step of a chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainStep {
    /// The effect.
    pub descriptor: EffectDescriptor,

    /// Ticks to wait before this step runs.
    #[serde(default)]
    pub delay_ticks: u64,

    /// Evaluated once, when the step is reached. `false` skips the step.
    #[serde(default)]
    pub condition: StepCondition,

    /// Probability in (0, 1) that the step runs. Anything else means always.
    #[serde(default)]
    pub chance: f64,

    /// A mandatory step that cannot be realized fails the whole chain.
    #[serde(default)]
    pub mandatory: bool,

    /// Where positional effects play.
    #[serde(default)]
    pub anchor: Anchor,

    /// Adjustments applied to the anchor position.
    #[serde(default)]
    pub offsets: Offsets,
}

impl ChainStep {
    /// An immediate, unconditional, optional step at the caster.
    pub fn new(descriptor: EffectDescriptor) -> Self {
        Self {
            descriptor,
            delay_ticks: 0,
            condition: StepCondition::Always,
            chance: 0.0,
            mandatory: false,
            anchor: Anchor::Caster,
            offsets: Offsets::NONE,
        }
    }

    /// Set the delay (builder pattern).
    #[must_use]
    pub fn after(mut self, ticks: u64) -> Self {
        self.delay_ticks = ticks;
        self
    }

    /// Set the condition (builder pattern).
    #[must_use]
    pub fn when(mut self, condition: StepCondition) -> Self {
        self.condition = condition;
        self
    }

    /// Set the chance (builder pattern).
    #[must_use]
    pub fn with_chance(mut self, chance: f64) -> Self {
        self.chance = chance;
        self
    }

    /// Mark mandatory (builder pattern).
    #[must_use]
    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    /// Set the anchor (builder pattern).
    #[must_use]
    pub fn at(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Set the offsets (builder pattern).
    #[must_use]
    pub fn with_offsets(mut self, offsets: Offsets) -> Self {
        self.offsets = offsets;
        self
    }
}

impl From<EffectDescriptor> for ChainStep {
    fn from(descriptor: EffectDescriptor) -> Self {
        Self::new(descriptor)
    }
}

/// An ordered, read-only sequence of steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectChain {
    /// Name used in diagnostics.
    pub name: String,

    /// Steps in execution order.
    pub steps: im::Vector<ChainStep>,

    /// Override for the pipeline's abandonment bound.
    #[serde(default)]
    pub abandon_after_ticks: Option<u64>,
}

impl EffectChain {
    /// Create an empty chain.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: im::Vector::new(),
            abandon_after_ticks: None,
        }
    }

    /// Append a step (builder pattern).
    #[must_use]
    pub fn then(mut self, step: impl Into<ChainStep>) -> Self {
        self.steps.push_back(step.into());
        self
    }

    /// Set the abandonment bound (builder pattern).
    #[must_use]
    pub fn abandon_after(mut self, ticks: u64) -> Self {
        self.abandon_after_ticks = Some(ticks);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn step(&self, index: usize) -> Option<&ChainStep> {
        self.steps.get(index)
    }

    /// Sum of every delay, including nested chains.
    #[must_use]
    pub fn total_delay(&self) -> u64 {
        self.steps
            .iter()
            .map(|step| {
                let nested = match &step.descriptor {
                    EffectDescriptor::SubChain(inner) => inner.total_delay(),
                    _ => 0,
                };
                step.delay_ticks + nested
            })
            .sum()
    }
}

/// Position of a step, as indices through nested sub-chains.
///
/// `[2]` is the third step of the top-level chain; `[2, 0]` is the first
/// step of the sub-chain at that position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StepPath(SmallVec<[usize; 4]>);

impl StepPath {
    /// A top-level step.
    #[must_use]
    pub fn root(index: usize) -> Self {
        let mut path = SmallVec::new();
        path.push(index);
        Self(path)
    }

    /// Path of the step at `index` inside the chain this path points into.
    #[must_use]
    pub fn child(&self, index: usize) -> Self {
        let mut path = self.0.clone();
        path.push(index);
        Self(path)
    }

    /// An empty path, the prefix of top-level steps.
    #[must_use]
    pub fn empty() -> Self {
        Self(SmallVec::new())
    }

    /// Nesting depth: 1 for top-level steps.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl std::fmt::Display for StepPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}
