//! Adapter for host release 1.21.1.
//!
//! Differences from 1.21: particle emission takes the long-distance flag as
//! an argument, block states travel as a name plus property list, titles
//! are sent as one bundled packet, per-player entity glow is available, and
//! fall distance became a double behind an accessor.

use std::sync::Arc;

use crate::capability::{
    BlockState, Capabilities, EntityField, FieldValue, Operation, PacketPayload, ParticleKind,
    ParticleParams, SoundSpec,
};
use crate::core::{BlockPos, EntityId, Location, Tick};
use crate::error::{CapabilityError, CapabilityResult};
use crate::host::{HostBridge, HostValue};
use crate::resolver::VersionCoordinate;

use super::shared::{decode_field, decode_location, location_args, AdapterCore, SymbolSpec};

/// Version coordinate this adapter is bound to.
pub const VERSION: VersionCoordinate = VersionCoordinate::new(1, 21, 1);

const LEVEL: &str = "net.minecraft.server.level.ServerLevel";
const ENTITY: &str = "net.minecraft.world.entity.Entity";
const LIVING: &str = "net.minecraft.world.entity.LivingEntity";
const PLAYER_CONN: &str = "net.minecraft.server.network.ServerGamePacketListenerImpl";

const SEND_PARTICLES: SymbolSpec =
    SymbolSpec::new(LEVEL, "sendParticles", "(Ljava/lang/String;DDDLjava/lang/String;IDDDDZ)I");
const PLAY_SOUND: SymbolSpec =
    SymbolSpec::new(LEVEL, "playSound", "(Ljava/lang/String;DDDLjava/lang/String;FF)V");
const SET_BLOCK: SymbolSpec = SymbolSpec::new(
    LEVEL,
    "setBlock",
    "(Ljava/lang/String;IIILjava/lang/String;Ljava/util/List;I)Z",
);
const POSITION: SymbolSpec = SymbolSpec::new(ENTITY, "position", "(J)Ljava/util/List;");

const SEND_ACTION_BAR: SymbolSpec =
    SymbolSpec::new(PLAYER_CONN, "sendActionBar", "(JLjava/lang/String;)V");
const SEND_TITLE_BUNDLE: SymbolSpec = SymbolSpec::new(
    PLAYER_CONN,
    "sendTitleBundle",
    "(JLjava/lang/String;Ljava/lang/String;III)V",
);
const SEND_BLOCK_UPDATE: SymbolSpec = SymbolSpec::new(
    PLAYER_CONN,
    "sendBlockUpdate",
    "(JIIILjava/lang/String;Ljava/util/List;)V",
);
const SEND_ENTITY_GLOW: SymbolSpec = SymbolSpec::new(PLAYER_CONN, "sendEntityGlow", "(JJZ)V");
const SEND_BORDER_WARNING: SymbolSpec =
    SymbolSpec::new(PLAYER_CONN, "sendBorderWarningDistance", "(JI)V");

/// Block update flags: notify neighbours and send to clients.
const BLOCK_UPDATE_FLAGS: i64 = 3;

fn field_getter(field: EntityField) -> SymbolSpec {
    match field {
        EntityField::Health => SymbolSpec::new(LIVING, "getHealth", "(J)F"),
        EntityField::MaxHealth => SymbolSpec::new(LIVING, "getMaxHealth", "(J)F"),
        EntityField::Absorption => SymbolSpec::new(LIVING, "getAbsorptionAmount", "(J)F"),
        EntityField::FallDistance => SymbolSpec::new(ENTITY, "getFallDistance", "(J)D"),
        EntityField::FireTicks => SymbolSpec::new(ENTITY, "getRemainingFireTicks", "(J)I"),
        EntityField::FrozenTicks => SymbolSpec::new(ENTITY, "getTicksFrozen", "(J)I"),
        EntityField::AirSupply => SymbolSpec::new(ENTITY, "getAirSupply", "(J)I"),
    }
}

fn property_list(state: &BlockState) -> HostValue {
    HostValue::List(
        state
            .properties
            .iter()
            .map(|(name, value)| HostValue::Text(format!("{name}={value}")))
            .collect(),
    )
}

/// Capability implementation for host 1.21.1.
#[derive(Debug)]
pub struct V1_21_1Adapter {
    core: AdapterCore,
}

impl V1_21_1Adapter {
    pub fn new(host: Arc<dyn HostBridge>) -> Self {
        Self {
            core: AdapterCore::new(host, VERSION),
        }
    }

    /// Number of host symbols resolved so far.
    #[must_use]
    pub fn cached_symbols(&self) -> usize {
        self.core.symbols().len()
    }

    /// Distinct diagnostics logged so far.
    #[must_use]
    pub fn warnings_reported(&self) -> usize {
        self.core.warnings().len()
    }
}

impl Capabilities for V1_21_1Adapter {
    fn version(&self) -> VersionCoordinate {
        VERSION
    }

    fn render_effect(
        &self,
        _tick: &Tick,
        at: &Location,
        kind: &ParticleKind,
        params: &ParticleParams,
    ) -> CapabilityResult<()> {
        let mut args = location_args(at);
        args.extend([
            HostValue::Text(kind.as_str().to_string()),
            HostValue::Int(i64::from(params.count)),
            HostValue::Float(params.spread.x),
            HostValue::Float(params.spread.y),
            HostValue::Float(params.spread.z),
            HostValue::Float(params.speed),
            HostValue::Bool(params.force),
        ]);
        self.core
            .call(Operation::RenderEffect, &SEND_PARTICLES, &args)
            .map(|_| ())
    }

    fn play_sound(&self, _tick: &Tick, at: &Location, sound: &SoundSpec) -> CapabilityResult<()> {
        let mut args = location_args(at);
        args.extend([
            HostValue::Text(sound.sound.clone()),
            HostValue::Float(f64::from(sound.volume)),
            HostValue::Float(f64::from(sound.pitch)),
        ]);
        self.core.call(Operation::PlaySound, &PLAY_SOUND, &args).map(|_| ())
    }

    fn mutate_block_state(
        &self,
        _tick: &Tick,
        world: &str,
        pos: BlockPos,
        state: &BlockState,
    ) -> CapabilityResult<()> {
        let args = [
            HostValue::Text(world.to_string()),
            HostValue::Int(i64::from(pos.x)),
            HostValue::Int(i64::from(pos.y)),
            HostValue::Int(i64::from(pos.z)),
            HostValue::Text(state.block.clone()),
            property_list(state),
            HostValue::Int(BLOCK_UPDATE_FLAGS),
        ];
        let result = self.core.call(Operation::MutateBlockState, &SET_BLOCK, &args)?;
        // `false` only means the block already had that state.
        self.core
            .note_return_kind(Operation::MutateBlockState, &SET_BLOCK, &result, "bool");
        Ok(())
    }

    fn send_targeted_packet_effect(
        &self,
        _tick: &Tick,
        player: EntityId,
        payload: &PacketPayload,
    ) -> CapabilityResult<()> {
        let op = Operation::SendTargetedPacketEffect;
        let who = HostValue::Entity(player);
        let (spec, args) = match payload {
            PacketPayload::ActionBar { text } => {
                (&SEND_ACTION_BAR, vec![who, HostValue::Text(text.clone())])
            }
            PacketPayload::Title {
                title,
                subtitle,
                fade_in,
                stay,
                fade_out,
            } => (
                &SEND_TITLE_BUNDLE,
                vec![
                    who,
                    HostValue::Text(title.clone()),
                    HostValue::Text(subtitle.clone()),
                    HostValue::Int(i64::from(*fade_in)),
                    HostValue::Int(i64::from(*stay)),
                    HostValue::Int(i64::from(*fade_out)),
                ],
            ),
            PacketPayload::FakeBlock { pos, state } => (
                &SEND_BLOCK_UPDATE,
                vec![
                    who,
                    HostValue::Int(i64::from(pos.x)),
                    HostValue::Int(i64::from(pos.y)),
                    HostValue::Int(i64::from(pos.z)),
                    HostValue::Text(state.block.clone()),
                    property_list(state),
                ],
            ),
            PacketPayload::EntityGlow { entity, glowing } => (
                &SEND_ENTITY_GLOW,
                vec![who, HostValue::Entity(*entity), HostValue::Bool(*glowing)],
            ),
            PacketPayload::BorderWarning { distance } => (
                &SEND_BORDER_WARNING,
                vec![who, HostValue::Int(i64::from(*distance))],
            ),
        };
        self.core.call(op, spec, &args).map(|_| ())
    }

    fn read_entity_internal_field(
        &self,
        _tick: &Tick,
        entity: EntityId,
        field: EntityField,
    ) -> CapabilityResult<FieldValue> {
        let op = Operation::ReadEntityInternalField;
        let spec = field_getter(field);
        let value = self.core.call(op, &spec, &[HostValue::Entity(entity)])?;
        decode_field(&value).ok_or_else(|| {
            CapabilityError::unavailable(op, format!("{field} returned {}", value.type_name()))
        })
    }

    fn entity_location(&self, _tick: &Tick, entity: EntityId) -> CapabilityResult<Location> {
        let op = Operation::EntityLocation;
        let value = self.core.call(op, &POSITION, &[HostValue::Entity(entity)])?;
        decode_location(&value).ok_or_else(|| {
            CapabilityError::unavailable(op, format!("position returned {}", value.type_name()))
        })
    }
}
