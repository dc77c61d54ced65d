//! # spellcore
//!
//! Version-adapted capability layer and effect pipeline for a spell-casting
//! game server extension.
//!
//! ## Design Principles
//!
//! 1. **One stable surface**: Spell logic only ever talks to
//!    [`Capabilities`]. Host internals that break between releases are
//!    confined to one adapter per release.
//!
//! 2. **Resolve once, fail fast**: The resolver picks the adapter for the
//!    exact host release at load time. An unknown release stops
//!    initialization instead of guessing.
//!
//! 3. **Tick-loop only**: Host internals are single-threaded. Every
//!    capability call and pipeline mutation takes a [`Tick`] token that only
//!    the tick loop can mint.
//!
//! ## Architecture
//!
//! - **Degrade, don't crash**: A missing or reshaped host symbol becomes
//!   `CapabilityError::Unavailable`. The pipeline skips the step, or fails
//!   the one cast when the step is mandatory.
//!
//! - **Cooperative continuations**: Delayed steps park the cast with a
//!   scheduler and resume on a later tick. Nothing blocks.
//!
//! - **Persistent chains**: Effect chains use `im-rs` vectors and are
//!   shared behind `Arc`, so casts never copy them.
//!
//! ## Modules
//!
//! - `core`: IDs, locations, tick tokens, RNG, configuration
//! - `error`: Error taxonomy
//! - `capability`: The capability interface and its value types
//! - `host`: Raw host bridge the adapters are written against
//! - `adapter`: Shared adapter utilities and one adapter per host release
//! - `resolver`: Version detection and the published handle
//! - `effects`: Effect descriptors, chains and step conditions
//! - `session`: Per-caster resource pools and cooldowns
//! - `scheduler`: Deferred continuation scheduling
//! - `pipeline`: The cast state machine

pub mod core;
pub mod error;
pub mod capability;
pub mod host;
pub mod adapter;
pub mod resolver;
pub mod effects;
pub mod session;
pub mod scheduler;
pub mod pipeline;

// Re-export commonly used types
pub use crate::core::{
    CasterId, CastId, EntityId, ResourceKey, SpellId,
    BlockPos, Location, Offsets, Vec3,
    Tick, TickLoop, TICKS_PER_SECOND,
    SpellRng, PipelineConfig, RegenRule,
};

pub use crate::error::{
    CapabilityError, CapabilityResult, CastRejection, ChainFailure, HostFault, ResolveError,
    SnapshotError, SpellcoreError,
};

pub use crate::capability::{
    BlockState, Capabilities, CapabilityHandle, EntityField, FieldValue, Operation,
    PacketPayload, ParticleKind, ParticleParams, SoundSpec,
};

pub use crate::host::{HostBridge, HostValue, SymbolRef};

pub use crate::adapter::{AdapterKind, V1_21Adapter, V1_21_1Adapter};

pub use crate::resolver::{capabilities, initialize, CapabilitySlot, Resolver, VersionCoordinate};

pub use crate::effects::{
    Anchor, ChainStep, EffectChain, EffectDescriptor, StepCondition, StepPath, Subject,
};

pub use crate::session::{CasterState, CooldownTable, ResourcePool, SpellCost};

pub use crate::scheduler::{TaskScheduler, TickQueue};

pub use crate::pipeline::{
    CancelReason, CastContext, CastFailure, CastHandle, CastReport, CastRequest, CastState,
    CastTarget, EffectPipeline, OutcomeKind, SkipReason, StepOutcome,
};
