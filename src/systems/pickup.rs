//! Gem pickups: magnetism and collection.

use bevy_ecs::prelude::*;

use crate::collision::{circles_overlap, normalize};
use crate::components::*;
use crate::config::SimConfig;
use crate::systems::lifecycle::DespawnQueue;
use crate::systems::movement::DeltaTime;

/// Collision radius of a gem, a constant rather than a component since
/// every gem is the same size.
pub const GEM_RADIUS: f32 = 0.3;

/// System that homes nearby gems in on the player and collects them.
pub fn pickup_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut player: ResMut<PlayerState>,
    mut despawns: ResMut<DespawnQueue>,
    mut gems: Query<(Entity, &mut Position, &Gem, &Active)>,
) {
    let delta = dt.0;
    if !player.is_alive() {
        return;
    }

    for (entity, mut pos, gem, active) in gems.iter_mut() {
        if !active.0 {
            continue;
        }

        if circles_overlap(pos.x, pos.y, GEM_RADIUS, player.x, player.y, player.radius) {
            player.xp += gem.xp;
            despawns.0.push(entity);
            continue;
        }

        let dx = player.x - pos.x;
        let dy = player.y - pos.y;
        let within_magnet = dx * dx + dy * dy
            <= player.pickup_radius * player.pickup_radius;
        if within_magnet {
            if let Some((nx, ny)) = normalize(dx, dy) {
                let step = config.player.magnet_speed * delta;
                pos.x += nx * step;
                pos.y += ny * step;
            }
        }
    }
}
