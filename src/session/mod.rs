//! Per-caster session state.
//!
//! A session holds what a caster carries between casts: resource pools and
//! spell cooldowns. Sessions are opened and closed by the host's
//! join/leave lifecycle; the pipeline refuses casts from casters with no
//! open session.
//!
//! Cost checks are all-or-nothing. [`CasterState::check_cost`] looks at
//! every pool before [`CasterState::deduct`] touches any of them.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{ResourceKey, SpellId};
use crate::error::{CastRejection, SnapshotError};

/// A bounded resource pool (mana, stamina, ...).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePool {
    current: i64,
    max: i64,
}

impl ResourcePool {
    /// Create a pool. `current` is clamped to `0..=max`.
    #[must_use]
    pub fn new(current: i64, max: i64) -> Self {
        let max = max.max(0);
        Self {
            current: current.clamp(0, max),
            max,
        }
    }

    /// A pool filled to capacity.
    #[must_use]
    pub fn full(max: i64) -> Self {
        Self::new(max, max)
    }

    #[must_use]
    pub fn current(&self) -> i64 {
        self.current
    }

    #[must_use]
    pub fn max(&self) -> i64 {
        self.max
    }

    #[must_use]
    pub fn can_afford(&self, amount: i64) -> bool {
        self.current >= amount
    }

    /// Remove `amount`. Callers check [`can_afford`](Self::can_afford) first.
    pub fn deduct(&mut self, amount: i64) {
        self.current = (self.current - amount).max(0);
    }

    /// Add `amount`, capped at the pool's maximum. Returns the amount gained.
    pub fn restore(&mut self, amount: i64) -> i64 {
        let before = self.current;
        self.current = (self.current + amount).clamp(0, self.max);
        self.current - before
    }
}

/// One resource requirement of a spell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCost {
    pub resource: ResourceKey,
    pub amount: i64,
}

/// Everything a spell costs to cast.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellCost(pub SmallVec<[ResourceCost; 2]>);

impl SpellCost {
    /// No cost.
    #[must_use]
    pub fn free() -> Self {
        Self::default()
    }

    /// A single-resource cost.
    #[must_use]
    pub fn of(resource: impl Into<ResourceKey>, amount: i64) -> Self {
        Self::free().and(resource, amount)
    }

    /// Add another requirement.
    #[must_use]
    pub fn and(mut self, resource: impl Into<ResourceKey>, amount: i64) -> Self {
        self.0.push(ResourceCost {
            resource: resource.into(),
            amount,
        });
        self
    }

    #[must_use]
    pub fn is_free(&self) -> bool {
        self.0.iter().all(|c| c.amount <= 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceCost> {
        self.0.iter()
    }

    /// Positive amounts summed per resource, in first-mention order.
    #[must_use]
    pub fn totals(&self) -> SmallVec<[(&ResourceKey, i64); 2]> {
        let mut totals: SmallVec<[(&ResourceKey, i64); 2]> = SmallVec::new();
        for req in self.iter().filter(|c| c.amount > 0) {
            match totals.iter_mut().find(|(key, _)| *key == &req.resource) {
                Some((_, total)) => *total = total.saturating_add(req.amount),
                None => totals.push((&req.resource, req.amount)),
            }
        }
        totals
    }
}


/// When a spell's cooldown started and how long it lasts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownEntry {
    pub started_at: u64,
    pub duration: u64,
}

impl CooldownEntry {
    /// Ticks left at `now`; zero once expired.
    #[must_use]
    pub fn remaining(&self, now: u64) -> u64 {
        self.started_at.saturating_add(self.duration).saturating_sub(now)
    }
}

/// Cooldowns per spell.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownTable {
    entries: FxHashMap<SpellId, CooldownEntry>,
}

impl CooldownTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks until `spell` may be cast again.
    #[must_use]
    pub fn remaining(&self, spell: SpellId, now: u64) -> u64 {
        self.entries.get(&spell).map_or(0, |e| e.remaining(now))
    }

    /// Start a cooldown. A zero duration clears any existing entry.
    pub fn start(&mut self, spell: SpellId, now: u64, duration: u64) {
        if duration == 0 {
            self.entries.remove(&spell);
        } else {
            self.entries.insert(
                spell,
                CooldownEntry {
                    started_at: now,
                    duration,
                },
            );
        }
    }

    /// Drop entries that have expired by `now`.
    pub fn prune(&mut self, now: u64) {
        self.entries.retain(|_, e| e.remaining(now) > 0);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the pipeline tracks for one caster.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CasterState {
    pools: FxHashMap<ResourceKey, ResourcePool>,
    cooldowns: CooldownTable,
}

impl CasterState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add or replace a pool.
    #[must_use]
    pub fn with_pool(mut self, resource: impl Into<ResourceKey>, pool: ResourcePool) -> Self {
        self.pools.insert(resource.into(), pool);
        self
    }

    #[must_use]
    pub fn pool(&self, resource: &ResourceKey) -> Option<&ResourcePool> {
        self.pools.get(resource)
    }

    pub fn pool_mut(&mut self, resource: &ResourceKey) -> Option<&mut ResourcePool> {
        self.pools.get_mut(resource)
    }

    pub fn pools_mut(&mut self) -> impl Iterator<Item = (&ResourceKey, &mut ResourcePool)> {
        self.pools.iter_mut()
    }

    #[must_use]
    pub fn cooldowns(&self) -> &CooldownTable {
        &self.cooldowns
    }

    pub fn cooldowns_mut(&mut self) -> &mut CooldownTable {
        &mut self.cooldowns
    }

    /// Check a cost against every pool without changing anything.
    ///
    /// A missing pool counts as empty. A resource named more than once is
    /// checked against its total.
    pub fn check_cost(&self, cost: &SpellCost) -> Result<(), CastRejection> {
        for (resource, required) in cost.totals() {
            let available = self.pools.get(resource).map_or(0, ResourcePool::current);
            if available < required {
                return Err(CastRejection::InsufficientResources {
                    resource: resource.clone(),
                    required,
                    available,
                });
            }
        }
        Ok(())
    }

    /// Check a spell's cooldown at `now`.
    pub fn check_cooldown(&self, spell: SpellId, now: u64) -> Result<(), CastRejection> {
        match self.cooldowns.remaining(spell, now) {
            0 => Ok(()),
            remaining_ticks => Err(CastRejection::OnCooldown {
                spell,
                remaining_ticks,
            }),
        }
    }

    /// Deduct a cost already accepted by [`check_cost`](Self::check_cost).
    pub fn deduct(&mut self, cost: &SpellCost) {
        for (resource, amount) in cost.totals() {
            if let Some(pool) = self.pools.get_mut(resource) {
                pool.deduct(amount);
            }
        }
    }

    /// Encode for persistence across host restarts.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Decode a snapshot written by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        bincode::deserialize(bytes).map_err(|e| SnapshotError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_clamps() {
        let mut pool = ResourcePool::new(150, 100);
        assert_eq!(pool.current(), 100);

        pool.deduct(30);
        assert_eq!(pool.current(), 70);

        assert_eq!(pool.restore(50), 30);
        assert_eq!(pool.current(), 100);
    }

    #[test]
    fn test_check_cost_is_all_or_nothing() {
        let state = CasterState::new()
            .with_pool("mana", ResourcePool::full(100))
            .with_pool("stamina", ResourcePool::new(5, 20));

        let cost = SpellCost::of("mana", 40).and("stamina", 10);
        let err = state.check_cost(&cost).unwrap_err();
        assert_eq!(
            err,
            CastRejection::InsufficientResources {
                resource: ResourceKey::new("stamina"),
                required: 10,
                available: 5,
            }
        );
        // Nothing was touched.
        assert_eq!(state.pool(&ResourceKey::mana()).unwrap().current(), 100);
    }

    #[test]
    fn test_repeated_resource_checked_against_total() {
        let state = CasterState::new().with_pool("mana", ResourcePool::new(7, 100));

        let cost = SpellCost::of("mana", 5).and("mana", 5);
        assert_eq!(
            state.check_cost(&cost),
            Err(CastRejection::InsufficientResources {
                resource: ResourceKey::mana(),
                required: 10,
                available: 7,
            })
        );
        assert!(state.check_cost(&SpellCost::of("mana", 3).and("mana", 4)).is_ok());
    }

    #[test]
    fn test_missing_pool_counts_as_empty() {
        let state = CasterState::new();
        assert!(state.check_cost(&SpellCost::of("mana", 1)).is_err());
        assert!(state.check_cost(&SpellCost::free()).is_ok());
    }

    #[test]
    fn test_deduct() {
        let mut state = CasterState::new().with_pool("mana", ResourcePool::full(100));
        state.deduct(&SpellCost::of("mana", 25));
        assert_eq!(state.pool(&ResourceKey::mana()).unwrap().current(), 75);
    }

    #[test]
    fn test_cooldowns() {
        let mut state = CasterState::new();
        state.cooldowns_mut().start(SpellId(1), 100, 40);

        assert_eq!(
            state.check_cooldown(SpellId(1), 120),
            Err(CastRejection::OnCooldown {
                spell: SpellId(1),
                remaining_ticks: 20,
            })
        );
        assert!(state.check_cooldown(SpellId(1), 140).is_ok());
        assert!(state.check_cooldown(SpellId(2), 120).is_ok());

        state.cooldowns_mut().prune(140);
        assert!(state.cooldowns().is_empty());
    }

    #[test]
    fn test_endless_cooldown_saturates() {
        let mut table = CooldownTable::new();
        table.start(SpellId(1), 10, u64::MAX);

        assert_eq!(table.remaining(SpellId(1), 20), u64::MAX - 20);
        table.prune(20);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut state = CasterState::new().with_pool("mana", ResourcePool::new(60, 100));
        state.cooldowns_mut().start(SpellId(9), 10, 200);

        let bytes = state.to_bytes().unwrap();
        let restored = CasterState::from_bytes(&bytes).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_snapshot_rejects_garbage() {
        assert!(matches!(
            CasterState::from_bytes(&[0xFF]),
            Err(SnapshotError::Decode(_))
        ));
    }
}
