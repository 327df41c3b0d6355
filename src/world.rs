//! Serializable state snapshots for an external renderer.
//!
//! The renderer is a pure consumer: it reads `{kind, position, radius,
//! scale, hp percent}` views of the active entities and never mutates
//! anything. Snapshots are also the equality surface for the replay
//! determinism contract, so they capture every field a divergence could
//! show up in.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::*;
use crate::systems::pickup::GEM_RADIUS;

/// Render scale for elite enemies.
pub const ELITE_SCALE: f32 = 1.3;

/// Render scale for a merged super enemy grows with the merge size.
pub fn super_scale(merged_count: u32) -> f32 {
    (1.0 + 0.15 * merged_count.saturating_sub(1) as f32).min(2.5)
}

/// One active enemy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySnapshot {
    pub kind: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub scale: f32,
    pub hp: f32,
    pub hp_max: f32,
    pub hp_percent: f32,
    pub elite: bool,
    pub boss: bool,
    pub super_enemy: bool,
}

/// One active projectile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub owner: String,
}

/// One active gem pickup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GemSnapshot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub xp: f32,
}

/// One active hazard zone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardSnapshot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub remaining: f32,
    pub owner: String,
}

/// One obstacle collider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleSnapshot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

/// Player avatar state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub hp: f32,
    pub hp_max: f32,
    pub hp_percent: f32,
    pub xp: f32,
    pub alive: bool,
}

/// Complete simulation state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Current simulation tick.
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub time: f32,
    pub player: PlayerSnapshot,
    pub enemies: Vec<EnemySnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub gems: Vec<GemSnapshot>,
    pub hazards: Vec<HazardSnapshot>,
    pub obstacles: Vec<ObstacleSnapshot>,
}

fn owner_str(owner: Owner) -> String {
    match owner {
        Owner::Player => "Player".to_string(),
        Owner::Enemy => "Enemy".to_string(),
    }
}

impl Snapshot {
    /// Build a snapshot from the ECS world. Pooled (inactive) entities are
    /// invisible here by construction.
    pub fn from_world(world: &mut World, tick: u64, time: f32) -> Self {
        let player = world.resource::<PlayerState>();
        let player = PlayerSnapshot {
            x: player.x,
            y: player.y,
            radius: player.radius,
            hp: player.hp,
            hp_max: player.max_hp,
            hp_percent: player.hp_fraction(),
            xp: player.xp,
            alive: player.is_alive(),
        };

        let mut enemies = Vec::new();
        let mut enemy_query = world.query::<(
            &EnemyKind,
            &Position,
            &Radius,
            &Health,
            &EnemyFlags,
            &Active,
        )>();
        for (kind, pos, radius, health, flags, active) in enemy_query.iter(world) {
            if !active.0 {
                continue;
            }
            let scale = if flags.super_enemy {
                super_scale(flags.merged_count)
            } else if flags.elite {
                ELITE_SCALE
            } else {
                1.0
            };
            enemies.push(EnemySnapshot {
                kind: kind.0,
                x: pos.x,
                y: pos.y,
                radius: radius.0,
                scale,
                hp: health.current,
                hp_max: health.max,
                hp_percent: health.fraction(),
                elite: flags.elite,
                boss: flags.boss,
                super_enemy: flags.super_enemy,
            });
        }

        let mut projectiles = Vec::new();
        let mut projectile_query = world.query::<(&Projectile, &Position, &Radius, &Active)>();
        for (projectile, pos, radius, active) in projectile_query.iter(world) {
            if !active.0 {
                continue;
            }
            projectiles.push(ProjectileSnapshot {
                x: pos.x,
                y: pos.y,
                radius: radius.0,
                owner: owner_str(projectile.owner),
            });
        }

        let mut gems = Vec::new();
        let mut gem_query = world.query::<(&Gem, &Position, &Active)>();
        for (gem, pos, active) in gem_query.iter(world) {
            if !active.0 {
                continue;
            }
            gems.push(GemSnapshot {
                x: pos.x,
                y: pos.y,
                radius: GEM_RADIUS,
                xp: gem.xp,
            });
        }

        let mut hazards = Vec::new();
        let mut hazard_query = world.query::<(&HazardZone, &Position, &Radius, &Active)>();
        for (hazard, pos, radius, active) in hazard_query.iter(world) {
            if !active.0 {
                continue;
            }
            hazards.push(HazardSnapshot {
                x: pos.x,
                y: pos.y,
                radius: radius.0,
                remaining: hazard.lifetime,
                owner: owner_str(hazard.owner),
            });
        }

        let mut obstacles = Vec::new();
        let mut obstacle_query = world.query::<(&Obstacle, &Position, &Radius, &Active)>();
        for (_, pos, radius, active) in obstacle_query.iter(world) {
            if !active.0 {
                continue;
            }
            obstacles.push(ObstacleSnapshot {
                x: pos.x,
                y: pos.y,
                radius: radius.0,
            });
        }

        Self {
            tick,
            time,
            player,
            enemies,
            projectiles,
            gems,
            hazards,
            obstacles,
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
