//! Typed entity reuse pools.
//!
//! Short-lived entities (projectiles, melee sweeps, hazard zones, gems) and
//! enemies churn constantly at swarm densities; despawning them for real
//! would allocate and free archetype storage every tick. Instead, despawn
//! is logical: the orchestrator clears the entity's mutable state, drops its
//! `Active` flag, and parks the id here. Enemy pools are keyed by archetype
//! since the component set and collision shape differ per archetype; effect
//! pools are generic because their geometry is per-instance data.
//!
//! Pools grow on demand. There is no hard cap and no rejection path.

use std::collections::HashMap;

use bevy_ecs::prelude::*;

/// Free-lists of inactive, reusable entity ids.
///
/// Invariant: an id in any free-list always refers to an entity whose
/// `Active` flag is false. `release_*` is only called by the orchestrator
/// after it has reset the entity, and `acquire_*` hands the id straight to
/// a spawn that re-initializes every field.
#[derive(Resource, Debug, Default)]
pub struct EntityPool {
    enemies: HashMap<u32, Vec<Entity>>,
    projectiles: Vec<Entity>,
    swings: Vec<Entity>,
    hazards: Vec<Entity>,
    gems: Vec<Entity>,
}

impl EntityPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop a free enemy of the given archetype, if any.
    pub fn acquire_enemy(&mut self, kind: u32) -> Option<Entity> {
        self.enemies.get_mut(&kind).and_then(Vec::pop)
    }

    pub fn release_enemy(&mut self, kind: u32, entity: Entity) {
        self.enemies.entry(kind).or_default().push(entity);
    }

    pub fn acquire_projectile(&mut self) -> Option<Entity> {
        self.projectiles.pop()
    }

    pub fn release_projectile(&mut self, entity: Entity) {
        self.projectiles.push(entity);
    }

    pub fn acquire_swing(&mut self) -> Option<Entity> {
        self.swings.pop()
    }

    pub fn release_swing(&mut self, entity: Entity) {
        self.swings.push(entity);
    }

    pub fn acquire_hazard(&mut self) -> Option<Entity> {
        self.hazards.pop()
    }

    pub fn release_hazard(&mut self, entity: Entity) {
        self.hazards.push(entity);
    }

    pub fn acquire_gem(&mut self) -> Option<Entity> {
        self.gems.pop()
    }

    pub fn release_gem(&mut self, entity: Entity) {
        self.gems.push(entity);
    }

    /// Total parked ids across every pool.
    pub fn pooled_count(&self) -> usize {
        self.enemies.values().map(Vec::len).sum::<usize>()
            + self.projectiles.len()
            + self.swings.len()
            + self.hazards.len()
            + self.gems.len()
    }

    /// Parked ids for one enemy archetype.
    pub fn pooled_enemies(&self, kind: u32) -> usize {
        self.enemies.get(&kind).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_yields_none() {
        let mut pool = EntityPool::new();
        assert!(pool.acquire_enemy(0).is_none());
        assert!(pool.acquire_projectile().is_none());
        assert_eq!(pool.pooled_count(), 0);
    }

    #[test]
    fn test_release_then_acquire_returns_same_id() {
        let mut pool = EntityPool::new();
        let e = Entity::from_raw(42);
        pool.release_projectile(e);
        assert_eq!(pool.pooled_count(), 1);
        assert_eq!(pool.acquire_projectile(), Some(e));
        assert!(pool.acquire_projectile().is_none());
    }

    #[test]
    fn test_enemy_pools_are_type_keyed() {
        let mut pool = EntityPool::new();
        let slime = Entity::from_raw(1);
        let bat = Entity::from_raw(2);
        pool.release_enemy(0, slime);
        pool.release_enemy(1, bat);

        // Acquiring one archetype never drains another
        assert_eq!(pool.acquire_enemy(1), Some(bat));
        assert!(pool.acquire_enemy(1).is_none());
        assert_eq!(pool.pooled_enemies(0), 1);
        assert_eq!(pool.acquire_enemy(0), Some(slime));
    }

    #[test]
    fn test_lifo_reuse_order() {
        let mut pool = EntityPool::new();
        pool.release_gem(Entity::from_raw(1));
        pool.release_gem(Entity::from_raw(2));
        // Most recently released comes back first (warm reuse)
        assert_eq!(pool.acquire_gem(), Some(Entity::from_raw(2)));
        assert_eq!(pool.acquire_gem(), Some(Entity::from_raw(1)));
    }
}
