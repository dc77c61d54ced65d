//! Core types: identifiers, positions, logical time, RNG, configuration.
//!
//! Nothing here talks to the host. These are the values every other module
//! passes around.

pub mod ids;
pub mod location;
pub mod tick;
pub mod rng;
pub mod config;

pub use ids::{CasterId, CastId, EntityId, ResourceKey, SpellId};
pub use location::{BlockPos, Location, Offsets, Vec3};
pub use tick::{seconds_to_ticks, Tick, TickLoop, TICKS_PER_SECOND};
pub use rng::{SpellRng, SpellRngState};
pub use config::{PipelineConfig, RegenRule, DEFAULT_ABANDON_AFTER_TICKS, DEFAULT_MAX_SUB_CHAIN_DEPTH};
