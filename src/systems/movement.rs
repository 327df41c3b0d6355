//! Movement systems for the player and the swarm.

use bevy_ecs::prelude::*;

use crate::collision::normalize;
use crate::components::*;
use crate::config::SimConfig;

/// Resource containing the delta time for the current tick.
#[derive(Resource, Default)]
pub struct DeltaTime(pub f32);

/// System that integrates the player's input for this tick.
///
/// Input is the raw stick/key vector recorded in the input stream; it is
/// normalized here so diagonal movement is not faster. Also counts down the
/// post-hit invulnerability window.
pub fn player_movement_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut player: ResMut<PlayerState>,
) {
    let delta = dt.0;
    player.hurt_timer = (player.hurt_timer - delta).max(0.0);

    if !player.is_alive() {
        return;
    }
    if let Some((nx, ny)) = normalize(player.input_x, player.input_y) {
        let step = player.move_speed * delta;
        player.x += nx * step;
        player.y += ny * step;
        let half = config.world_half_extent;
        player.x = player.x.clamp(-half, half);
        player.y = player.y.clamp(-half, half);
    }
}

/// System that applies enemy velocity to position.
///
/// Velocity is decided by the behavior phase; this phase only integrates,
/// applying slow multipliers and boss phase movement multipliers, then
/// clamps to the play area so the spatial index insert precondition holds.
pub fn enemy_movement_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut query: Query<
        (
            &mut Position,
            &Velocity,
            &mut Slow,
            Option<&BossPhaseState>,
            &Active,
        ),
        With<EnemyKind>,
    >,
) {
    let delta = dt.0;
    let half = config.world_half_extent;
    for (mut pos, vel, mut slow, boss, active) in query.iter_mut() {
        if !active.0 {
            continue;
        }

        let mut mult = 1.0;
        if slow.is_active() {
            slow.remaining -= delta;
            mult *= (1.0 - slow.factor).max(0.0);
        }
        if let Some(boss) = boss {
            mult *= boss.movement_mult();
        }

        pos.x = (pos.x + vel.vx * delta * mult).clamp(-half, half);
        pos.y = (pos.y + vel.vy * delta * mult).clamp(-half, half);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> PlayerState {
        PlayerState {
            x: 0.0,
            y: 0.0,
            radius: 0.6,
            hp: 100.0,
            max_hp: 100.0,
            move_speed: 10.0,
            input_x: 0.0,
            input_y: 0.0,
            hurt_timer: 0.0,
            pickup_radius: 4.0,
            xp: 0.0,
        }
    }

    #[test]
    fn test_player_input_is_normalized() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));
        world.insert_resource(SimConfig::default());
        let mut p = player();
        p.input_x = 1.0;
        p.input_y = 1.0;
        world.insert_resource(p);

        let mut schedule = Schedule::default();
        schedule.add_systems(player_movement_system);
        schedule.run(&mut world);

        let p = world.resource::<PlayerState>();
        let dist = (p.x * p.x + p.y * p.y).sqrt();
        assert!((dist - 10.0).abs() < 1e-3, "diagonal must not be faster");
    }

    #[test]
    fn test_zero_input_is_guarded() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));
        world.insert_resource(SimConfig::default());
        world.insert_resource(player());

        let mut schedule = Schedule::default();
        schedule.add_systems(player_movement_system);
        schedule.run(&mut world);

        let p = world.resource::<PlayerState>();
        assert_eq!((p.x, p.y), (0.0, 0.0));
        assert!(p.x.is_finite() && p.y.is_finite());
    }

    #[test]
    fn test_enemy_velocity_applied_with_slow() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));
        world.insert_resource(SimConfig::default());

        let e = world
            .spawn((
                EnemyKind(0),
                Position::new(0.0, 0.0),
                Velocity::new(4.0, 0.0),
                Slow {
                    factor: 0.5,
                    remaining: 2.0,
                },
                Active(true),
            ))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(enemy_movement_system);
        schedule.run(&mut world);

        let pos = world.get::<Position>(e).unwrap();
        assert!((pos.x - 2.0).abs() < 1e-4, "half speed while slowed");
    }

    #[test]
    fn test_inactive_enemy_does_not_move() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(1.0));
        world.insert_resource(SimConfig::default());

        let e = world
            .spawn((
                EnemyKind(0),
                Position::new(1.0, 1.0),
                Velocity::new(4.0, 0.0),
                Slow::default(),
                Active(false),
            ))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(enemy_movement_system);
        schedule.run(&mut world);

        let pos = world.get::<Position>(e).unwrap();
        assert_eq!((pos.x, pos.y), (1.0, 1.0));
    }

    #[test]
    fn test_position_clamped_to_world_bounds() {
        let mut world = World::new();
        world.insert_resource(DeltaTime(10.0));
        world.insert_resource(SimConfig::default());
        let half = world.resource::<SimConfig>().world_half_extent;

        let e = world
            .spawn((
                EnemyKind(0),
                Position::new(half - 1.0, 0.0),
                Velocity::new(100.0, 0.0),
                Slow::default(),
                Active(true),
            ))
            .id();

        let mut schedule = Schedule::default();
        schedule.add_systems(enemy_movement_system);
        schedule.run(&mut world);

        assert_eq!(world.get::<Position>(e).unwrap().x, half);
    }
}
