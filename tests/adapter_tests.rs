//! Version adapter integration tests.
//!
//! These tests drive both adapters against a fake host bridge that exposes
//! the symbols of one host release and records every call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use spellcore::adapter::{AdapterKind, V1_21Adapter, V1_21_1Adapter};
use spellcore::capability::{
    BlockState, Capabilities, EntityField, FieldValue, Operation, PacketPayload, ParticleKind,
    ParticleParams, SoundSpec,
};
use spellcore::core::{BlockPos, EntityId, Location, TickLoop};
use spellcore::error::{CapabilityError, HostFault};
use spellcore::host::{HostBridge, HostValue, SymbolRef};

// =============================================================================
// Fake host
// =============================================================================

const SHAPES_1_21: &[(&str, &str)] = &[
    ("sendParticles", "(Ljava/lang/String;DDDLjava/lang/String;IDDDD)I"),
    ("sendParticlesLongDistance", "(Ljava/lang/String;DDDLjava/lang/String;IDDDD)I"),
    ("playSound", "(Ljava/lang/String;DDDLjava/lang/String;FF)V"),
    ("setBlock", "(Ljava/lang/String;IIILjava/lang/String;I)Z"),
    ("position", "(J)Ljava/util/List;"),
    ("sendActionBar", "(JLjava/lang/String;)V"),
    ("sendTitlesAnimation", "(JIII)V"),
    ("sendTitleText", "(JLjava/lang/String;)V"),
    ("sendSubtitleText", "(JLjava/lang/String;)V"),
    ("sendBlockUpdate", "(JIIILjava/lang/String;)V"),
    ("sendBorderWarningDistance", "(JI)V"),
    ("getHealth", "(J)F"),
    ("fallDistance", "(J)F"),
];

const SHAPES_1_21_1: &[(&str, &str)] = &[
    ("sendParticles", "(Ljava/lang/String;DDDLjava/lang/String;IDDDDZ)I"),
    ("playSound", "(Ljava/lang/String;DDDLjava/lang/String;FF)V"),
    ("setBlock", "(Ljava/lang/String;IIILjava/lang/String;Ljava/util/List;I)Z"),
    ("position", "(J)Ljava/util/List;"),
    ("sendActionBar", "(JLjava/lang/String;)V"),
    ("sendTitleBundle", "(JLjava/lang/String;Ljava/lang/String;III)V"),
    ("sendBlockUpdate", "(JIIILjava/lang/String;Ljava/util/List;)V"),
    ("sendEntityGlow", "(JJZ)V"),
    ("sendBorderWarningDistance", "(JI)V"),
    ("getHealth", "(J)F"),
    ("getFallDistance", "(J)D"),
];

/// Host exposing a fixed symbol table and logging every invocation.
struct FakeHost {
    version: String,
    shapes: HashMap<String, String>,
    lookups: Mutex<Vec<String>>,
    calls: Mutex<Vec<(String, Vec<HostValue>)>>,
    rejects: Option<String>,
    returns: HashMap<String, HostValue>,
}

impl FakeHost {
    fn new(version: &str, shapes: &[(&str, &str)]) -> Self {
        Self {
            version: version.to_string(),
            shapes: shapes
                .iter()
                .map(|(name, shape)| (name.to_string(), shape.to_string()))
                .collect(),
            lookups: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            rejects: None,
            returns: HashMap::new(),
        }
    }

    fn release_1_21() -> Arc<Self> {
        Arc::new(Self::new("1.21-R0.1-SNAPSHOT", SHAPES_1_21))
    }

    fn release_1_21_1() -> Arc<Self> {
        Arc::new(Self::new("1.21.1-R0.1-SNAPSHOT", SHAPES_1_21_1))
    }

    /// Same release with one symbol removed.
    fn without(version: &str, shapes: &[(&str, &str)], missing: &str) -> Arc<Self> {
        let mut host = Self::new(version, shapes);
        host.shapes.remove(missing);
        Arc::new(host)
    }

    /// Same release where calls to `name` are refused after being recorded.
    fn rejecting(version: &str, shapes: &[(&str, &str)], name: &str) -> Arc<Self> {
        let mut host = Self::new(version, shapes);
        host.rejects = Some(name.to_string());
        Arc::new(host)
    }

    /// Same release where `name` returns `value`.
    fn returning(version: &str, shapes: &[(&str, &str)], name: &str, value: HostValue) -> Arc<Self> {
        let mut host = Self::new(version, shapes);
        host.returns.insert(name.to_string(), value);
        Arc::new(host)
    }

    fn call_names(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    fn last_args(&self) -> Vec<HostValue> {
        self.calls.lock().unwrap().last().map(|(_, a)| a.clone()).unwrap_or_default()
    }

    fn lookup_count(&self, name: &str) -> usize {
        self.lookups.lock().unwrap().iter().filter(|n| *n == name).count()
    }
}

impl HostBridge for FakeHost {
    fn version_string(&self) -> String {
        self.version.clone()
    }

    fn lookup_symbol(&self, owner: &str, name: &str) -> Option<SymbolRef> {
        self.lookups.lock().unwrap().push(name.to_string());
        let shape = self.shapes.get(name)?;
        Some(SymbolRef {
            id: self.lookups.lock().unwrap().len() as u64,
            owner: owner.to_string(),
            name: name.to_string(),
            shape: shape.clone(),
        })
    }

    fn invoke(&self, symbol: &SymbolRef, args: &[HostValue]) -> Result<HostValue, HostFault> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.name.clone(), args.to_vec()));
        if self.rejects.as_deref() == Some(symbol.name.as_str()) {
            return Err(HostFault::Rejected(format!("{} refused", symbol.name)));
        }
        if let Some(value) = self.returns.get(&symbol.name) {
            return Ok(value.clone());
        }
        Ok(match symbol.name.as_str() {
            "setBlock" => HostValue::Bool(true),
            "position" => HostValue::List(vec![
                HostValue::Text("world".to_string()),
                HostValue::Float(10.5),
                HostValue::Float(64.0),
                HostValue::Float(-3.25),
                HostValue::Float(90.0),
                HostValue::Float(0.0),
            ]),
            "getHealth" => HostValue::Float(18.0),
            "fallDistance" | "getFallDistance" => HostValue::Float(2.5),
            "sendParticles" | "sendParticlesLongDistance" => HostValue::Int(1),
            _ => HostValue::Unit,
        })
    }
}

fn here() -> Location {
    Location::new("world", 1.0, 2.0, 3.0)
}

fn title() -> PacketPayload {
    PacketPayload::Title {
        title: "Fireball".to_string(),
        subtitle: "ready".to_string(),
        fade_in: 5,
        stay: 40,
        fade_out: 5,
    }
}

// =============================================================================
// Release 1.21
// =============================================================================

/// Test that forced particles use the long-distance entry point on 1.21.
#[test]
fn test_1_21_particle_entry_points() {
    let host = FakeHost::release_1_21();
    let adapter = V1_21Adapter::new(host.clone());
    let tick = TickLoop::new().current();
    let kind = ParticleKind::new("flame");

    adapter
        .render_effect(&tick, &here(), &kind, &ParticleParams::default())
        .unwrap();
    let forced = ParticleParams {
        force: true,
        ..ParticleParams::default()
    };
    adapter.render_effect(&tick, &here(), &kind, &forced).unwrap();

    assert_eq!(host.call_names(), vec!["sendParticles", "sendParticlesLongDistance"]);
}

/// Test that 1.21 passes the block state as one string.
#[test]
fn test_1_21_block_state_string() {
    let host = FakeHost::release_1_21();
    let adapter = V1_21Adapter::new(host.clone());
    let tick = TickLoop::new().current();

    let state = BlockState::new("minecraft:oak_stairs")
        .with("facing", "north")
        .with("half", "top");
    adapter
        .mutate_block_state(&tick, "world", BlockPos::new(1, 64, -2), &state)
        .unwrap();

    let args = host.last_args();
    assert_eq!(
        args[4],
        HostValue::Text("minecraft:oak_stairs[facing=north,half=top]".to_string())
    );
}

/// Test that the 1.21 title is three calls in a fixed order.
#[test]
fn test_1_21_title_sequence() {
    let host = FakeHost::release_1_21();
    let adapter = V1_21Adapter::new(host.clone());
    let tick = TickLoop::new().current();

    adapter
        .send_targeted_packet_effect(&tick, EntityId(7), &title())
        .unwrap();

    assert_eq!(
        host.call_names(),
        vec!["sendTitlesAnimation", "sendSubtitleText", "sendTitleText"]
    );
}

/// Test that a title with one missing symbol sends nothing at all.
#[test]
fn test_1_21_title_never_half_applied() {
    let host = FakeHost::without("1.21", SHAPES_1_21, "sendTitleText");
    let adapter = V1_21Adapter::new(host.clone());
    let tick = TickLoop::new().current();

    let err = adapter
        .send_targeted_packet_effect(&tick, EntityId(7), &title())
        .unwrap_err();

    assert_eq!(err.operation(), Operation::SendTargetedPacketEffect);
    assert!(host.call_names().is_empty());
}

/// Test that a title failing on its second call stops there and reports it.
#[test]
fn test_1_21_title_stops_at_failed_call() {
    let host = FakeHost::rejecting("1.21", SHAPES_1_21, "sendSubtitleText");
    let adapter = V1_21Adapter::new(host.clone());
    let tick = TickLoop::new().current();

    let err = adapter
        .send_targeted_packet_effect(&tick, EntityId(7), &title())
        .unwrap_err();

    assert_eq!(err.operation(), Operation::SendTargetedPacketEffect);
    assert!(err.to_string().contains("sendSubtitleText refused"));
    // The animation went out; the title text was never sent.
    assert_eq!(host.call_names(), vec!["sendTitlesAnimation", "sendSubtitleText"]);
    assert_eq!(adapter.warnings_reported(), 1);

    // Repeats are not reported again.
    let _ = adapter.send_targeted_packet_effect(&tick, EntityId(7), &title());
    assert_eq!(adapter.warnings_reported(), 1);
}

/// Test that an unexpected setBlock return still counts as applied.
#[test]
fn test_block_change_with_odd_return_succeeds() {
    let host = FakeHost::returning("1.21", SHAPES_1_21, "setBlock", HostValue::Int(1));
    let adapter = V1_21Adapter::new(host.clone());
    let tick = TickLoop::new().current();
    let stone = BlockState::new("minecraft:stone");

    adapter
        .mutate_block_state(&tick, "world", BlockPos::new(0, 64, 0), &stone)
        .unwrap();
    adapter
        .mutate_block_state(&tick, "world", BlockPos::new(1, 64, 0), &stone)
        .unwrap();

    assert_eq!(host.call_names(), vec!["setBlock", "setBlock"]);
    assert_eq!(adapter.warnings_reported(), 1);

    let host = FakeHost::returning("1.21.1", SHAPES_1_21_1, "setBlock", HostValue::Unit);
    let adapter = V1_21_1Adapter::new(host.clone());
    adapter
        .mutate_block_state(&tick, "world", BlockPos::new(0, 64, 0), &stone)
        .unwrap();
    assert_eq!(host.call_names(), vec!["setBlock"]);
}

/// Test that entity glow is reported unavailable on 1.21 without touching the host.
#[test]
fn test_1_21_glow_unsupported() {
    let host = FakeHost::release_1_21();
    let adapter = V1_21Adapter::new(host.clone());
    let tick = TickLoop::new().current();

    let glow = PacketPayload::EntityGlow {
        entity: EntityId(3),
        glowing: true,
    };
    let err = adapter
        .send_targeted_packet_effect(&tick, EntityId(7), &glow)
        .unwrap_err();

    assert!(matches!(err, CapabilityError::Unavailable { .. }));
    assert!(host.call_names().is_empty());
    assert!(host.lookups.lock().unwrap().is_empty());
}

// =============================================================================
// Release 1.21.1
// =============================================================================

/// Test that 1.21.1 passes the force flag as an argument.
#[test]
fn test_1_21_1_particle_force_flag() {
    let host = FakeHost::release_1_21_1();
    let adapter = V1_21_1Adapter::new(host.clone());
    let tick = TickLoop::new().current();

    let forced = ParticleParams {
        count: 12,
        force: true,
        ..ParticleParams::default()
    };
    adapter
        .render_effect(&tick, &here(), &ParticleKind::new("flame"), &forced)
        .unwrap();

    assert_eq!(host.call_names(), vec!["sendParticles"]);
    let args = host.last_args();
    assert_eq!(args[5], HostValue::Int(12));
    assert_eq!(args.last(), Some(&HostValue::Bool(true)));
}

/// Test that 1.21.1 splits block name and properties.
#[test]
fn test_1_21_1_block_properties() {
    let host = FakeHost::release_1_21_1();
    let adapter = V1_21_1Adapter::new(host.clone());
    let tick = TickLoop::new().current();

    let state = BlockState::new("minecraft:lever").with("powered", "true");
    adapter
        .mutate_block_state(&tick, "world", BlockPos::new(0, 70, 0), &state)
        .unwrap();

    let args = host.last_args();
    assert_eq!(args[4], HostValue::Text("minecraft:lever".to_string()));
    assert_eq!(
        args[5],
        HostValue::List(vec![HostValue::Text("powered=true".to_string())])
    );
}

/// Test that 1.21.1 sends a bundled title and supports entity glow.
#[test]
fn test_1_21_1_packets() {
    let host = FakeHost::release_1_21_1();
    let adapter = V1_21_1Adapter::new(host.clone());
    let tick = TickLoop::new().current();

    adapter
        .send_targeted_packet_effect(&tick, EntityId(7), &title())
        .unwrap();
    adapter
        .send_targeted_packet_effect(
            &tick,
            EntityId(7),
            &PacketPayload::EntityGlow {
                entity: EntityId(3),
                glowing: true,
            },
        )
        .unwrap();

    assert_eq!(host.call_names(), vec!["sendTitleBundle", "sendEntityGlow"]);
}

/// Test that fall distance is read through the accessor on 1.21.1.
#[test]
fn test_1_21_1_fall_distance_accessor() {
    let host = FakeHost::release_1_21_1();
    let adapter = V1_21_1Adapter::new(host.clone());
    let tick = TickLoop::new().current();

    let value = adapter
        .read_entity_internal_field(&tick, EntityId(3), EntityField::FallDistance)
        .unwrap();

    assert_eq!(value, FieldValue::Float(2.5));
    assert_eq!(host.call_names(), vec!["getFallDistance"]);
}

// =============================================================================
// Shared behavior
// =============================================================================

/// Test that both adapters decode entity positions the same way.
#[test]
fn test_entity_location_decoding() {
    let tick = TickLoop::new().current();
    let old = V1_21Adapter::new(FakeHost::release_1_21());
    let new = V1_21_1Adapter::new(FakeHost::release_1_21_1());

    let expected = Location::new("world", 10.5, 64.0, -3.25).facing(90.0, 0.0);
    assert_eq!(old.entity_location(&tick, EntityId(1)).unwrap(), expected);
    assert_eq!(new.entity_location(&tick, EntityId(1)).unwrap(), expected);
}

/// Test that a symbol with the other release's shape is rejected, not called.
#[test]
fn test_shape_mismatch_degrades() {
    // A 1.21.1 host with the 1.21 adapter: sendParticles has the wrong shape.
    let host = FakeHost::release_1_21_1();
    let adapter = V1_21Adapter::new(host.clone());
    let tick = TickLoop::new().current();

    let err = adapter
        .render_effect(&tick, &here(), &ParticleKind::new("flame"), &ParticleParams::default())
        .unwrap_err();

    assert_eq!(err.operation(), Operation::RenderEffect);
    assert!(err.to_string().contains("incompatible layout"));
    assert!(host.call_names().is_empty());
}

/// Test that lookups are memoized across calls, including misses.
#[test]
fn test_lookups_memoized() {
    let host = FakeHost::without("1.21.1", SHAPES_1_21_1, "playSound");
    let adapter = V1_21_1Adapter::new(host.clone());
    let tick = TickLoop::new().current();
    let sound = SoundSpec::new("entity.blaze.shoot");

    for _ in 0..5 {
        adapter
            .render_effect(&tick, &here(), &ParticleKind::new("flame"), &ParticleParams::default())
            .unwrap();
        assert!(adapter.play_sound(&tick, &here(), &sound).is_err());
    }

    assert_eq!(host.lookup_count("sendParticles"), 1);
    assert_eq!(host.lookup_count("playSound"), 1);
    assert_eq!(adapter.cached_symbols(), 2);
}

/// Test that a field whose accessor is missing is unavailable, not a panic.
#[test]
fn test_unreadable_field() {
    let host = FakeHost::release_1_21();
    let adapter = V1_21Adapter::new(host);
    let tick = TickLoop::new().current();

    // getAirSupply is not exposed by this fake host.
    let err = adapter
        .read_entity_internal_field(&tick, EntityId(1), EntityField::AirSupply)
        .unwrap_err();
    assert_eq!(err.operation(), Operation::ReadEntityInternalField);
}

/// Test that every adapter kind instantiates a handle reporting its own release.
#[test]
fn test_instantiate_each_kind() {
    for kind in AdapterKind::ALL {
        let handle = kind.instantiate(FakeHost::release_1_21_1());
        assert_eq!(handle.version(), kind.coordinate());
    }
}
