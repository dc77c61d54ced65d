//! Primitive effect descriptors.
//!
//! A descriptor says *what* a step does; the [`ChainStep`](super::ChainStep)
//! wrapping it says *when* (delay, condition, chance) and *where* (anchor,
//! offsets).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::capability::{BlockState, PacketPayload, ParticleKind, ParticleParams, SoundSpec};
use crate::core::Location;

use super::EffectChain;

/// Default spacing between points of a line effect, in blocks.
pub const DEFAULT_LINE_SPACING: f64 = 1.0;

/// Default squared range of a line effect.
pub const DEFAULT_LINE_MAX_DISTANCE_SQ: f64 = 100.0;

/// A primitive effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EffectDescriptor {
    // === Visual ===

    /// Particle burst at the step's anchor.
    Particle {
        kind: ParticleKind,
        #[serde(default)]
        params: ParticleParams,
    },

    /// Particles every `spacing` blocks from the caster to the target.
    /// Skipped when the squared distance exceeds `max_distance_sq`.
    Line {
        kind: ParticleKind,
        #[serde(default)]
        params: ParticleParams,
        spacing: f64,
        max_distance_sq: f64,
    },

    // === Audio ===

    /// Sound at the step's anchor.
    Sound(SoundSpec),

    // === State-mutating ===

    /// Replace the block at the step's anchor.
    BlockChange(BlockState),

    /// Client-side effect sent to the entity at the step's anchor.
    Packet(PacketPayload),

    // === Composite ===

    /// Run another chain in place. Its delays suspend the outer chain.
    SubChain(Arc<EffectChain>),
}

impl EffectDescriptor {
    /// Particle burst.
    pub fn particle(kind: impl Into<String>, count: u32) -> Self {
        Self::Particle {
            kind: ParticleKind::new(kind),
            params: ParticleParams {
                count,
                ..ParticleParams::default()
            },
        }
    }

    /// Particle line with default spacing and range.
    pub fn line(kind: impl Into<String>) -> Self {
        Self::Line {
            kind: ParticleKind::new(kind),
            params: ParticleParams::default(),
            spacing: DEFAULT_LINE_SPACING,
            max_distance_sq: DEFAULT_LINE_MAX_DISTANCE_SQ,
        }
    }

    /// Sound at default volume and pitch.
    pub fn sound(sound: impl Into<String>) -> Self {
        Self::Sound(SoundSpec::new(sound))
    }

    /// Block change.
    pub fn block(state: BlockState) -> Self {
        Self::BlockChange(state)
    }

    /// Client packet.
    pub fn packet(payload: PacketPayload) -> Self {
        Self::Packet(payload)
    }

    /// Nested chain.
    pub fn sub_chain(chain: impl Into<Arc<EffectChain>>) -> Self {
        Self::SubChain(chain.into())
    }

    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Particle { .. } => "particle",
            Self::Line { .. } => "line",
            Self::Sound(_) => "sound",
            Self::BlockChange(_) => "block_change",
            Self::Packet(_) => "packet",
            Self::SubChain(_) => "sub_chain",
        }
    }
}

/// Where a positional effect plays, resolved when the step executes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Anchor {
    /// The caster's current position.
    #[default]
    Caster,
    /// The cast target's current position.
    Target,
    /// A fixed location.
    Fixed(Location),
}
