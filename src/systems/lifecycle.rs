//! Spawn/despawn queues and death collection.
//!
//! Systems never resize entity storage themselves. They append requests to
//! the queues below; the orchestrator drains them after the schedule has
//! run, so every structural change happens at a single well-defined point
//! at the end of the tick.
//!
//! Deaths are plain event values consumed by the orchestrator rather than
//! callbacks held by entities, which keeps ownership acyclic.

use bevy_ecs::prelude::*;

use crate::components::{
    Active, EnemyFlags, EnemyKind, EnemyStats, Health, Obstacle, Owner, Position, SlowEffect,
};
use crate::systems::movement::DeltaTime;

/// Parameters for spawning a projectile, shared by the public API and the
/// AI/boss spawn requests.
#[derive(Debug, Clone, Copy)]
pub struct ProjectileSpec {
    pub owner: Owner,
    pub x: f32,
    pub y: f32,
    pub dir_x: f32,
    pub dir_y: f32,
    pub speed: f32,
    pub radius: f32,
    pub damage: f32,
    pub pierce: u32,
    pub lifetime: f32,
    pub crit_chance: f32,
    pub crit_mult: f32,
    pub slow: Option<SlowEffect>,
}

impl Default for ProjectileSpec {
    fn default() -> Self {
        Self {
            owner: Owner::Player,
            x: 0.0,
            y: 0.0,
            dir_x: 1.0,
            dir_y: 0.0,
            speed: 10.0,
            radius: 0.25,
            damage: 1.0,
            pierce: 0,
            lifetime: 3.0,
            crit_chance: 0.0,
            crit_mult: 2.0,
            slow: None,
        }
    }
}

/// Parameters for spawning a hazard zone.
#[derive(Debug, Clone, Copy)]
pub struct HazardSpec {
    pub owner: Owner,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub damage_per_tick: f32,
    pub tick_interval: f32,
    pub lifetime: f32,
    pub slow: Option<SlowEffect>,
}

/// Parameters for spawning a melee swing.
#[derive(Debug, Clone, Copy)]
pub struct SwingSpec {
    pub x: f32,
    pub y: f32,
    pub start_angle: f32,
    pub total_sweep: f32,
    pub duration: f32,
    pub reach: f32,
    pub damage: f32,
    pub crit_chance: f32,
    pub crit_mult: f32,
}

/// A spawn deferred to end-of-tick.
#[derive(Debug, Clone)]
pub enum SpawnRequest {
    Enemy {
        kind: u32,
        x: f32,
        y: f32,
        elite: bool,
        difficulty: f32,
    },
    Projectile(ProjectileSpec),
    Hazard(HazardSpec),
}

/// Queue of deferred spawns, drained by the orchestrator.
#[derive(Resource, Debug, Default)]
pub struct SpawnQueue(pub Vec<SpawnRequest>);

/// Entities to reset and return to their pools at end-of-tick.
#[derive(Resource, Debug, Default)]
pub struct DespawnQueue(pub Vec<Entity>);

/// A validated-at-apply-time cluster merge.
///
/// Members are re-checked for liveness when the queue drains; a member that
/// went inactive in the meantime aborts the whole merge for this tick.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub kind: u32,
    pub x: f32,
    pub y: f32,
    pub combined_hp: f32,
    pub members: Vec<Entity>,
}

#[derive(Resource, Debug, Default)]
pub struct MergeQueue(pub Vec<MergeRequest>);

/// Value produced when an enemy dies with its reward intact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeathEvent {
    pub x: f32,
    pub y: f32,
    pub xp: f32,
}

#[derive(Resource, Debug, Default)]
pub struct DeathEvents(pub Vec<DeathEvent>);

/// System that collects enemies whose HP reached zero this tick.
///
/// Runs last in the schedule. Emits a `DeathEvent` carrying the reward and
/// queues the entity for pool return; the orchestrator turns events into
/// gem drops. Cluster-merged enemies never pass through here because the
/// merger only gathers live members.
pub fn death_system(
    mut deaths: ResMut<DeathEvents>,
    mut despawns: ResMut<DespawnQueue>,
    query: Query<(Entity, &Position, &Health, &EnemyStats, &EnemyFlags, &Active), With<EnemyKind>>,
) {
    for (entity, pos, health, stats, flags, active) in query.iter() {
        if !active.0 || health.is_alive() {
            continue;
        }
        deaths.0.push(DeathEvent {
            x: pos.x,
            y: pos.y,
            xp: stats.xp_value * flags.reward_mult,
        });
        despawns.0.push(entity);
    }
}

/// System that expires temporary obstacles. Permanent obstacles
/// (`lifetime: None`) are never touched.
pub fn obstacle_expiry_system(
    dt: Res<DeltaTime>,
    mut despawns: ResMut<DespawnQueue>,
    mut query: Query<(Entity, &mut Obstacle, &Active)>,
) {
    let delta = dt.0;
    for (entity, mut obstacle, active) in query.iter_mut() {
        if !active.0 {
            continue;
        }
        if let Some(remaining) = obstacle.lifetime.as_mut() {
            *remaining -= delta;
            if *remaining <= 0.0 {
                despawns.0.push(entity);
            }
        }
    }
}
