//! Parameter and result types for capability operations.

use serde::{Deserialize, Serialize};

use crate::core::{BlockPos, EntityId, Vec3};

/// The closed set of capability operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operation {
    RenderEffect,
    PlaySound,
    MutateBlockState,
    SendTargetedPacketEffect,
    ReadEntityInternalField,
    EntityLocation,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Operation; 6] = [
        Operation::RenderEffect,
        Operation::PlaySound,
        Operation::MutateBlockState,
        Operation::SendTargetedPacketEffect,
        Operation::ReadEntityInternalField,
        Operation::EntityLocation,
    ];

    /// Stable snake_case name, used in logs and warn-once keys.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Operation::RenderEffect => "render_effect",
            Operation::PlaySound => "play_sound",
            Operation::MutateBlockState => "mutate_block_state",
            Operation::SendTargetedPacketEffect => "send_targeted_packet_effect",
            Operation::ReadEntityInternalField => "read_entity_internal_field",
            Operation::EntityLocation => "entity_location",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Namespaced particle type, e.g. `minecraft:flame`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticleKind(pub String);

impl ParticleKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// How a particle burst is emitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticleParams {
    pub count: u32,
    #[serde(default)]
    pub spread: Vec3,
    #[serde(default)]
    pub speed: f64,
    /// Show to clients beyond the normal view distance.
    #[serde(default)]
    pub force: bool,
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            count: 1,
            spread: Vec3::ZERO,
            speed: 0.0,
            force: false,
        }
    }
}

impl ParticleParams {
    /// Scale the burst by a cast's power. Never drops below one particle.
    #[must_use]
    pub fn scaled(&self, power: f32) -> Self {
        let count = (f64::from(self.count) * f64::from(power.max(0.0))).round() as u32;
        Self {
            count: count.max(1),
            ..self.clone()
        }
    }
}

/// A sound to play at a location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoundSpec {
    pub sound: String,
    #[serde(default = "default_unit")]
    pub volume: f32,
    #[serde(default = "default_unit")]
    pub pitch: f32,
}

fn default_unit() -> f32 {
    1.0
}

impl SoundSpec {
    pub fn new(sound: impl Into<String>) -> Self {
        Self {
            sound: sound.into(),
            volume: 1.0,
            pitch: 1.0,
        }
    }
}

/// A block state in the host's textual form, e.g. `minecraft:oak_log[axis=y]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockState {
    pub block: String,
    /// Property pairs, kept sorted by name.
    #[serde(default)]
    pub properties: Vec<(String, String)>,
}

impl BlockState {
    pub fn new(block: impl Into<String>) -> Self {
        Self {
            block: block.into(),
            properties: Vec::new(),
        }
    }

    /// Set a property (builder pattern).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.properties.binary_search_by(|(n, _)| n.as_str().cmp(&name)) {
            Ok(idx) => self.properties[idx].1 = value,
            Err(idx) => self.properties.insert(idx, (name, value)),
        }
        self
    }
}

impl std::fmt::Display for BlockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.block)?;
        if !self.properties.is_empty() {
            f.write_str("[")?;
            for (i, (name, value)) in self.properties.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{name}={value}")?;
            }
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// Client-side effect delivered to a single player.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PacketPayload {
    /// Text above the hotbar.
    ActionBar { text: String },

    /// Title and subtitle, timings in ticks.
    Title {
        title: String,
        subtitle: String,
        fade_in: u32,
        stay: u32,
        fade_out: u32,
    },

    /// A block only this player sees.
    FakeBlock { pos: BlockPos, state: BlockState },

    /// Outline an entity for this player only.
    EntityGlow { entity: EntityId, glowing: bool },

    /// Red world-border vignette at the given warning distance.
    BorderWarning { distance: u32 },
}

impl PacketPayload {
    /// Short name for logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            PacketPayload::ActionBar { .. } => "action_bar",
            PacketPayload::Title { .. } => "title",
            PacketPayload::FakeBlock { .. } => "fake_block",
            PacketPayload::EntityGlow { .. } => "entity_glow",
            PacketPayload::BorderWarning { .. } => "border_warning",
        }
    }
}

/// Internal entity fields the adapters know how to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityField {
    Health,
    MaxHealth,
    Absorption,
    FallDistance,
    FireTicks,
    FrozenTicks,
    AirSupply,
}

impl EntityField {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            EntityField::Health => "health",
            EntityField::MaxHealth => "max_health",
            EntityField::Absorption => "absorption",
            EntityField::FallDistance => "fall_distance",
            EntityField::FireTicks => "fire_ticks",
            EntityField::FrozenTicks => "frozen_ticks",
            EntityField::AirSupply => "air_supply",
        }
    }
}

impl std::fmt::Display for EntityField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Value read from an internal field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl FieldValue {
    /// Numeric view, if the value is numeric or boolean.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            FieldValue::Text(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_state_display() {
        let state = BlockState::new("minecraft:oak_log")
            .with("axis", "y")
            .with("age", "3")
            .with("axis", "x");
        assert_eq!(state.to_string(), "minecraft:oak_log[age=3,axis=x]");
        assert_eq!(BlockState::new("minecraft:stone").to_string(), "minecraft:stone");
    }

    #[test]
    fn test_particle_scaling() {
        let params = ParticleParams {
            count: 10,
            ..ParticleParams::default()
        };
        assert_eq!(params.scaled(1.5).count, 15);
        assert_eq!(params.scaled(0.0).count, 1);
    }

    #[test]
    fn test_field_value_numeric() {
        assert_eq!(FieldValue::Int(4).as_f64(), Some(4.0));
        assert_eq!(FieldValue::Bool(true).as_f64(), Some(1.0));
        assert_eq!(FieldValue::Text("x".into()).as_f64(), None);
    }

    #[test]
    fn test_operation_names_unique() {
        let mut names: Vec<_> = Operation::ALL.iter().map(|op| op.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Operation::ALL.len());
    }
}
