//! The capability interface.
//!
//! Every primitive the spell layer needs from the host goes through
//! [`Capabilities`]. The interface has no implementation of its own: the
//! version adapters provide one per supported host release, and the
//! resolver publishes exactly one of them as a [`CapabilityHandle`].
//!
//! ## Contract
//!
//! - Every operation takes a [`Tick`] token. The host internals behind
//!   these calls are not safe for concurrent mutation, so callers must be on
//!   the tick loop.
//! - An operation either fully succeeds or returns
//!   [`CapabilityError::Unavailable`](crate::error::CapabilityError); it
//!   never panics and never reports success for a partial effect.
//!   Missing or reshaped host symbols are detected before any host call,
//!   so they never leave an effect half-applied. An operation made of
//!   several host calls stops at the first one the host refuses; the calls
//!   before it stay applied.

mod types;

use std::sync::Arc;

pub use types::{
    BlockState, EntityField, FieldValue, Operation, PacketPayload, ParticleKind, ParticleParams,
    SoundSpec,
};

use crate::core::{BlockPos, EntityId, Location, Tick};
use crate::error::CapabilityResult;
use crate::resolver::VersionCoordinate;

/// Primitive host operations.
pub trait Capabilities: Send + Sync {
    /// The host release this implementation is bound to.
    fn version(&self) -> VersionCoordinate;

    /// Emit particles at a location.
    fn render_effect(
        &self,
        tick: &Tick,
        at: &Location,
        kind: &ParticleKind,
        params: &ParticleParams,
    ) -> CapabilityResult<()>;

    /// Play a sound at a location.
    fn play_sound(&self, tick: &Tick, at: &Location, sound: &SoundSpec) -> CapabilityResult<()>;

    /// Replace the block state at a position in a world.
    fn mutate_block_state(
        &self,
        tick: &Tick,
        world: &str,
        pos: BlockPos,
        state: &BlockState,
    ) -> CapabilityResult<()>;

    /// Deliver a client-side effect to one player.
    fn send_targeted_packet_effect(
        &self,
        tick: &Tick,
        player: EntityId,
        payload: &PacketPayload,
    ) -> CapabilityResult<()>;

    /// Read an internal field of an entity.
    fn read_entity_internal_field(
        &self,
        tick: &Tick,
        entity: EntityId,
        field: EntityField,
    ) -> CapabilityResult<FieldValue>;

    /// Current location of an entity.
    fn entity_location(&self, tick: &Tick, entity: EntityId) -> CapabilityResult<Location>;
}

/// Shared, read-only reference to the published capability implementation.
///
/// Cloning the handle shares the same implementation; there is only ever
/// one per resolver.
#[derive(Clone)]
pub struct CapabilityHandle {
    inner: Arc<dyn Capabilities>,
}

impl CapabilityHandle {
    /// Wrap an implementation.
    pub fn new(inner: Arc<dyn Capabilities>) -> Self {
        Self { inner }
    }

    /// Wrap an owned implementation.
    pub fn from_impl(inner: impl Capabilities + 'static) -> Self {
        Self::new(Arc::new(inner))
    }

    /// Do two handles share one implementation?
    #[must_use]
    pub fn same_as(&self, other: &CapabilityHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::ops::Deref for CapabilityHandle {
    type Target = dyn Capabilities;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl std::fmt::Debug for CapabilityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityHandle")
            .field("version", &self.inner.version())
            .finish()
    }
}
