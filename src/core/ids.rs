//! Identifier types.
//!
//! The host owns every entity; the core only ever holds opaque handles to
//! them. Spells and resources are identified by whatever the configuration
//! layer assigned.
//!
//! ```
//! use spellcore::core::{CasterId, EntityId};
//!
//! let caster = CasterId::new(7);
//! assert_eq!(caster.entity(), EntityId(7));
//! ```

use serde::{Deserialize, Serialize};

/// Opaque handle to a host entity (player, mob, armor stand, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create a new entity handle.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw handle value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Identity of a caster. Every caster is also a host entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CasterId(pub u64);

impl CasterId {
    /// Create a new caster ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The host entity backing this caster.
    #[must_use]
    pub const fn entity(self) -> EntityId {
        EntityId(self.0)
    }
}

impl std::fmt::Display for CasterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Caster({})", self.0)
    }
}

/// Spell identifier assigned by the configuration layer.
///
/// Cooldowns are tracked per spell, so two chains sharing a `SpellId`
/// share a cooldown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpellId(pub u32);

impl SpellId {
    /// Create a new spell ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SpellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Spell({})", self.0)
    }
}

/// Identity of one accepted cast. Allocated by the pipeline, never reused
/// within a pipeline's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CastId(pub u64);

impl CastId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CastId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cast({})", self.0)
    }
}

/// Name of a resource pool ("mana", "stamina", ...).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey(pub String);

impl ResourceKey {
    /// Create a resource key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The conventional primary pool.
    pub fn mana() -> Self {
        Self::new("mana")
    }

    /// Borrow the key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caster_entity() {
        let caster = CasterId::new(42);
        assert_eq!(caster.entity(), EntityId(42));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", EntityId(3)), "Entity(3)");
        assert_eq!(format!("{}", CasterId(3)), "Caster(3)");
        assert_eq!(format!("{}", SpellId(9)), "Spell(9)");
        assert_eq!(format!("{}", CastId(1)), "Cast(1)");
        assert_eq!(format!("{}", ResourceKey::mana()), "mana");
    }

    #[test]
    fn test_resource_key_from_str() {
        let key: ResourceKey = "stamina".into();
        assert_eq!(key.as_str(), "stamina");
    }

    #[test]
    fn test_serialization() {
        let id = SpellId(123);
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: SpellId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
