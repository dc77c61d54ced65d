//! Cast requests, contexts, states and reports.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::Operation;
use crate::core::{CastId, CasterId, EntityId, Location, SpellId, SpellRngState};
use crate::effects::{EffectChain, StepPath};
use crate::error::{CastRejection, ChainFailure};
use crate::session::SpellCost;

/// What a cast is aimed at.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum CastTarget {
    #[default]
    None,
    Entity(EntityId),
    Location(Location),
}

/// A cast as handed over by the command layer.
///
/// The chain, cost and cooldown come from configuration already resolved;
/// `permitted` is the verdict of the faction/team/territory checks.
#[derive(Clone, Debug)]
pub struct CastRequest {
    pub caster: CasterId,
    pub spell: SpellId,
    pub chain: Arc<EffectChain>,
    pub target: CastTarget,
    pub power: f32,
    pub cost: SpellCost,
    pub cooldown_ticks: u64,
    pub permitted: bool,
}

impl CastRequest {
    /// A free, permitted, untargeted cast at power 1.
    pub fn new(caster: CasterId, spell: SpellId, chain: impl Into<Arc<EffectChain>>) -> Self {
        Self {
            caster,
            spell,
            chain: chain.into(),
            target: CastTarget::None,
            power: 1.0,
            cost: SpellCost::free(),
            cooldown_ticks: 0,
            permitted: true,
        }
    }

    #[must_use]
    pub fn at_entity(mut self, entity: EntityId) -> Self {
        self.target = CastTarget::Entity(entity);
        self
    }

    #[must_use]
    pub fn at_location(mut self, location: Location) -> Self {
        self.target = CastTarget::Location(location);
        self
    }

    #[must_use]
    pub fn with_power(mut self, power: f32) -> Self {
        self.power = power;
        self
    }

    #[must_use]
    pub fn costing(mut self, cost: SpellCost) -> Self {
        self.cost = cost;
        self
    }

    #[must_use]
    pub fn with_cooldown(mut self, ticks: u64) -> Self {
        self.cooldown_ticks = ticks;
        self
    }

    #[must_use]
    pub fn permitted(mut self, permitted: bool) -> Self {
        self.permitted = permitted;
        self
    }
}

/// Per-cast record, fixed when the cast is accepted.
#[derive(Clone, Debug)]
pub struct CastContext {
    pub id: CastId,
    pub caster: CasterId,
    pub spell: SpellId,
    pub chain: Arc<EffectChain>,
    pub target: CastTarget,
    pub power: f32,
    /// Cost as declared at acceptance.
    pub cost: SpellCost,
    pub accepted_at: u64,
}

/// Handle returned by [`request_cast`](super::EffectPipeline::request_cast).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CastHandle {
    id: CastId,
}

impl CastHandle {
    pub(crate) const fn new(id: CastId) -> Self {
        Self { id }
    }

    #[must_use]
    pub const fn id(self) -> CastId {
        self.id
    }
}

/// Why a cast was cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// `cancel` was called on the handle.
    Requested,
    /// The caster left the world.
    CasterRemoved,
    /// The caster's session was closed.
    SessionClosed,
    /// Nothing ran for longer than the abandonment limit.
    Abandoned { idle_ticks: u64 },
}

/// Why a cast failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CastFailure {
    /// Refused before any side effect.
    Rejected(CastRejection),
    /// The chain could not be carried out. Cost is not refunded.
    Chain(ChainFailure),
}

impl std::fmt::Display for CastFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(r) => write!(f, "rejected: {r}"),
            Self::Chain(c) => write!(f, "chain failed: {c}"),
        }
    }
}

/// Lifecycle of a cast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CastState {
    Queued,
    Resolving,
    Executing,
    Completed,
    Cancelled(CancelReason),
    Failed(CastFailure),
}

impl CastState {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled(_) | Self::Failed(_))
    }

    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Resolving => "resolving",
            Self::Executing => "executing",
            Self::Completed => "completed",
            Self::Cancelled(_) => "cancelled",
            Self::Failed(_) => "failed",
        }
    }
}

/// Why a step did not run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    ConditionFalse,
    ChanceFailed,
    CapabilityUnavailable(Operation),
    /// The anchor or recipient the step needs does not exist.
    NoAnchor,
    /// A line target was out of range or in another world.
    OutOfRange,
}

/// What happened to one step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeKind {
    Executed,
    Skipped(SkipReason),
}

/// Outcome of one step, addressed by its path in the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub path: StepPath,
    pub kind: OutcomeKind,
}

impl StepOutcome {
    #[must_use]
    pub fn is_executed(&self) -> bool {
        self.kind == OutcomeKind::Executed
    }
}

/// Final account of a reaped cast.
#[derive(Clone, Debug)]
pub struct CastReport {
    pub context: CastContext,
    pub state: CastState,
    pub outcomes: Vec<StepOutcome>,
    /// Where the cast's chance stream stopped. Restoring it with
    /// [`SpellRng::from_state`](crate::core::SpellRng::from_state) continues
    /// the exact roll sequence a further step would have seen.
    pub rng: SpellRngState,
}
