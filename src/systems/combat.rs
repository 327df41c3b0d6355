//! Effect resolution: projectiles, melee sweeps, hazard zones, and contact
//! damage.
//!
//! ## Gather/apply split
//!
//! Resolution systems never write health directly. They accumulate intents
//! into [`DamageEvents`] and a single apply system walks the enemy query
//! once, looking each entity up in the gathered maps. Iteration order of
//! the maps never matters because they are only read through the query
//! walk, which keeps the tick deterministic. Invulnerability is enforced
//! at apply time, so a rejected hit still consumes pierce and still marks
//! a melee target as swept.

use std::collections::HashMap;

use bevy_ecs::prelude::*;

use crate::collision::{arc_hit, circles_overlap, ease_out_cubic};
use crate::components::*;
use crate::config::SimConfig;
use crate::rng::SimRng;
use crate::spatial::SpatialIndex;
use crate::systems::lifecycle::DespawnQueue;
use crate::systems::movement::DeltaTime;

/// Margin added to quadtree candidate queries so large targets on the far
/// side of a cell boundary are never missed. Callers do the exact test.
const QUERY_MARGIN: f32 = 2.0;

/// Damage and status intents gathered during resolution, applied once at
/// the end of the combat phase.
#[derive(Resource, Debug, Default)]
pub struct DamageEvents {
    pub enemy_damage: HashMap<Entity, f32>,
    pub enemy_slows: HashMap<Entity, SlowEffect>,
    /// Strongest single hit against the player this tick. The player has
    /// post-hit invulnerability, so overlapping sources do not stack.
    pub player_hit: f32,
}

impl DamageEvents {
    pub fn add_enemy_damage(&mut self, entity: Entity, amount: f32) {
        *self.enemy_damage.entry(entity).or_insert(0.0) += amount;
    }

    pub fn add_enemy_slow(&mut self, entity: Entity, effect: SlowEffect) {
        self.enemy_slows
            .entry(entity)
            .and_modify(|s| {
                if effect.factor >= s.factor {
                    s.factor = effect.factor;
                }
                s.duration = s.duration.max(effect.duration);
            })
            .or_insert(effect);
    }

    pub fn register_player_hit(&mut self, amount: f32) {
        self.player_hit = self.player_hit.max(amount);
    }

    pub fn clear(&mut self) {
        self.enemy_damage.clear();
        self.enemy_slows.clear();
        self.player_hit = 0.0;
    }
}

/// Roll a hit's final damage, applying a crit if one lands.
fn roll_damage(rng: &mut SimRng, base: f32, crit_chance: f32, crit_mult: f32) -> f32 {
    if rng.chance(crit_chance) {
        base * crit_mult
    } else {
        base
    }
}

/// System that advances projectiles and resolves their hits.
pub fn projectile_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    index: Res<SpatialIndex>,
    player: Res<PlayerState>,
    mut rng: ResMut<SimRng>,
    mut events: ResMut<DamageEvents>,
    mut despawns: ResMut<DespawnQueue>,
    mut projectiles: Query<(
        Entity,
        &mut Position,
        &Velocity,
        &Radius,
        &mut Projectile,
        &Active,
    )>,
    targets: Query<(&Position, &Radius), (With<EnemyKind>, Without<Projectile>)>,
) {
    let delta = dt.0;
    let half = config.world_half_extent;
    let mut candidates = Vec::new();

    for (entity, mut pos, vel, radius, mut projectile, active) in projectiles.iter_mut() {
        if !active.0 {
            continue;
        }

        pos.x += vel.vx * delta;
        pos.y += vel.vy * delta;
        projectile.lifetime -= delta;

        let out_of_bounds = pos.x.abs() > half || pos.y.abs() > half;
        if projectile.lifetime <= 0.0 || out_of_bounds {
            despawns.0.push(entity);
            continue;
        }

        match projectile.owner {
            Owner::Player => {
                candidates.clear();
                index.query_circle(pos.x, pos.y, radius.0 + QUERY_MARGIN, &mut candidates);
                let mut spent = false;
                for candidate in &candidates {
                    if projectile.hit.contains(&candidate.entity) {
                        continue;
                    }
                    // Exact test against the target's current position.
                    let Ok((tpos, tradius)) = targets.get(candidate.entity) else {
                        continue;
                    };
                    if !circles_overlap(pos.x, pos.y, radius.0, tpos.x, tpos.y, tradius.0) {
                        continue;
                    }
                    projectile.hit.push(candidate.entity);
                    let damage = roll_damage(
                        &mut rng,
                        projectile.damage,
                        projectile.crit_chance,
                        projectile.crit_mult,
                    );
                    events.add_enemy_damage(candidate.entity, damage);
                    if let Some(slow) = projectile.slow {
                        events.add_enemy_slow(candidate.entity, slow);
                    }
                    if projectile.pierce == 0 {
                        despawns.0.push(entity);
                        spent = true;
                        break;
                    }
                    projectile.pierce -= 1;
                }
                if spent {
                    continue;
                }
            }
            Owner::Enemy => {
                if circles_overlap(pos.x, pos.y, radius.0, player.x, player.y, player.radius) {
                    events.register_player_hit(projectile.damage);
                    despawns.0.push(entity);
                }
            }
        }
    }
}

/// System that advances melee sweeps and applies their arc hits.
///
/// The swept angle follows a cubic ease-out over the swing's duration. A
/// target continuously inside the arc across many ticks is still damaged
/// exactly once per swing instance.
pub fn melee_system(
    dt: Res<DeltaTime>,
    index: Res<SpatialIndex>,
    mut rng: ResMut<SimRng>,
    mut events: ResMut<DamageEvents>,
    mut despawns: ResMut<DespawnQueue>,
    mut swings: Query<(Entity, &Position, &mut MeleeSwing, &Active)>,
    targets: Query<(&Position, &Radius), (With<EnemyKind>, Without<MeleeSwing>)>,
) {
    let delta = dt.0;
    let mut candidates = Vec::new();

    for (entity, pos, mut swing, active) in swings.iter_mut() {
        if !active.0 {
            continue;
        }

        swing.elapsed += delta;
        let progress = if swing.duration > 0.0 {
            swing.elapsed / swing.duration
        } else {
            1.0
        };
        let swept = swing.total_sweep * ease_out_cubic(progress);

        candidates.clear();
        index.query_circle(pos.x, pos.y, swing.reach + QUERY_MARGIN, &mut candidates);
        for candidate in &candidates {
            if swing.hit.contains(&candidate.entity) {
                continue;
            }
            let Ok((tpos, tradius)) = targets.get(candidate.entity) else {
                continue;
            };
            if !arc_hit(
                pos.x,
                pos.y,
                swing.reach + tradius.0,
                swing.start_angle,
                swept,
                tpos.x,
                tpos.y,
                tradius.0,
            ) {
                continue;
            }
            swing.hit.push(candidate.entity);
            let damage = roll_damage(&mut rng, swing.damage, swing.crit_chance, swing.crit_mult);
            events.add_enemy_damage(candidate.entity, damage);
        }

        if swing.elapsed >= swing.duration {
            despawns.0.push(entity);
        }
    }
}

/// System that ticks hazard zones: periodic damage plus slow application.
pub fn hazard_system(
    dt: Res<DeltaTime>,
    index: Res<SpatialIndex>,
    player: Res<PlayerState>,
    mut events: ResMut<DamageEvents>,
    mut despawns: ResMut<DespawnQueue>,
    mut hazards: Query<(Entity, &Position, &Radius, &mut HazardZone, &Active)>,
    targets: Query<(&Position, &Radius), (With<EnemyKind>, Without<HazardZone>)>,
) {
    let delta = dt.0;
    let mut candidates = Vec::new();

    for (entity, pos, radius, mut hazard, active) in hazards.iter_mut() {
        if !active.0 {
            continue;
        }

        hazard.lifetime -= delta;
        if hazard.lifetime <= 0.0 {
            despawns.0.push(entity);
            continue;
        }

        hazard.tick_timer -= delta;
        if hazard.tick_timer > 0.0 {
            continue;
        }
        hazard.tick_timer += hazard.tick_interval.max(delta);

        match hazard.owner {
            Owner::Player => {
                candidates.clear();
                index.query_circle(pos.x, pos.y, radius.0 + QUERY_MARGIN, &mut candidates);
                for candidate in &candidates {
                    let Ok((tpos, tradius)) = targets.get(candidate.entity) else {
                        continue;
                    };
                    if !circles_overlap(pos.x, pos.y, radius.0, tpos.x, tpos.y, tradius.0) {
                        continue;
                    }
                    events.add_enemy_damage(candidate.entity, hazard.damage_per_tick);
                    if let Some(slow) = hazard.slow {
                        events.add_enemy_slow(candidate.entity, slow);
                    }
                }
            }
            Owner::Enemy => {
                if circles_overlap(pos.x, pos.y, radius.0, player.x, player.y, player.radius) {
                    events.register_player_hit(hazard.damage_per_tick);
                }
            }
        }
    }
}

/// System that registers player-enemy contact damage.
///
/// Untargetable enemies (mid-dash) pass through the player without hurting
/// them. Boss phase damage multipliers apply here.
pub fn contact_system(
    player: Res<PlayerState>,
    mut events: ResMut<DamageEvents>,
    enemies: Query<
        (
            &Position,
            &Radius,
            &EnemyStats,
            &Behavior,
            Option<&BossPhaseState>,
            &Active,
        ),
        With<EnemyKind>,
    >,
) {
    if !player.is_alive() {
        return;
    }
    for (pos, radius, stats, behavior, boss, active) in enemies.iter() {
        if !active.0 || behavior.is_untargetable() {
            continue;
        }
        if !circles_overlap(pos.x, pos.y, radius.0, player.x, player.y, player.radius) {
            continue;
        }
        let mult = boss.map_or(1.0, |b| b.damage_mult);
        events.register_player_hit(stats.contact_damage * mult);
    }
}

/// System that applies every gathered damage and status intent.
///
/// Walks the enemy query in iteration order and reads the maps by key, so
/// the application order is the query order, not the map order. Enemies
/// whose behavior currently rejects damage (flicker-invulnerable, mid-dash)
/// shrug off both damage and slows.
pub fn damage_apply_system(
    config: Res<SimConfig>,
    mut events: ResMut<DamageEvents>,
    mut player: ResMut<PlayerState>,
    mut enemies: Query<(Entity, &mut Health, &Behavior, &mut Slow, &Active), With<EnemyKind>>,
) {
    for (entity, mut health, behavior, mut slow, active) in enemies.iter_mut() {
        if !active.0 || behavior.rejects_damage() {
            continue;
        }
        if let Some(&damage) = events.enemy_damage.get(&entity) {
            health.damage(damage);
        }
        if let Some(&effect) = events.enemy_slows.get(&entity) {
            slow.apply(effect);
        }
    }

    if events.player_hit > 0.0 && player.hurt_timer <= 0.0 && player.is_alive() {
        player.hp = (player.hp - events.player_hit).max(0.0);
        player.hurt_timer = config.player.hurt_cooldown;
    }

    events.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Rect;
    use std::f32::consts::TAU;

    fn test_world() -> World {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.1));
        world.insert_resource(SimConfig::default());
        world.insert_resource(SimRng::new(5));
        world.insert_resource(DamageEvents::default());
        world.insert_resource(DespawnQueue::default());
        world.insert_resource(SpatialIndex::new(Rect::centered(120.0), 8));
        world.insert_resource(PlayerState {
            x: 0.0,
            y: 0.0,
            radius: 0.6,
            hp: 100.0,
            max_hp: 100.0,
            move_speed: 9.0,
            input_x: 0.0,
            input_y: 0.0,
            hurt_timer: 0.0,
            pickup_radius: 4.0,
            xp: 0.0,
        });
        world
    }

    fn spawn_enemy(world: &mut World, x: f32, y: f32) -> Entity {
        world
            .spawn((
                EnemyKind(0),
                Position::new(x, y),
                Radius(0.5),
                Velocity::default(),
                Health::new(50.0),
                EnemyStats {
                    move_speed: 3.0,
                    contact_damage: 8.0,
                    xp_value: 1.0,
                },
                EnemyFlags::default(),
                Behavior::Chaser,
                Slow::default(),
                Active(true),
            ))
            .id()
    }

    fn rebuild_index(world: &mut World) {
        let mut entries = Vec::new();
        let mut q = world.query::<(Entity, &Position, &Radius, &EnemyKind, &Active)>();
        for (e, pos, r, _, active) in q.iter(world) {
            if active.0 {
                entries.push((e, pos.x, pos.y, r.0));
            }
        }
        let mut index = world.resource_mut::<SpatialIndex>();
        index.clear();
        for (e, x, y, r) in entries {
            index.insert(e, x, y, r);
        }
    }

    fn run(world: &mut World, systems: impl FnOnce(&mut Schedule), ticks: usize) {
        let mut schedule = Schedule::default();
        systems(&mut schedule);
        for _ in 0..ticks {
            rebuild_index(world);
            schedule.run(world);
        }
    }

    #[test]
    fn test_projectile_damages_enemy_and_despawns() {
        let mut world = test_world();
        let enemy = spawn_enemy(&mut world, 2.0, 0.0);
        let projectile = world
            .spawn((
                Position::new(1.0, 0.0),
                Velocity::new(10.0, 0.0),
                Radius(0.25),
                Projectile {
                    owner: Owner::Player,
                    damage: 7.0,
                    lifetime: 2.0,
                    ..Default::default()
                },
                Active(true),
            ))
            .id();

        run(
            &mut world,
            |s| {
                s.add_systems((projectile_system, damage_apply_system).chain());
            },
            1,
        );

        assert_eq!(world.get::<Health>(enemy).unwrap().current, 43.0);
        assert!(world.resource::<DespawnQueue>().0.contains(&projectile));
    }

    #[test]
    fn test_piercing_projectile_hits_each_enemy_once() {
        let mut world = test_world();
        let a = spawn_enemy(&mut world, 1.5, 0.0);
        let b = spawn_enemy(&mut world, 3.0, 0.0);
        world.spawn((
            Position::new(0.5, 0.0),
            Velocity::new(15.0, 0.0),
            Radius(0.25),
            Projectile {
                owner: Owner::Player,
                damage: 5.0,
                pierce: 3,
                lifetime: 2.0,
                ..Default::default()
            },
            Active(true),
        ));

        run(
            &mut world,
            |s| {
                s.add_systems((projectile_system, damage_apply_system).chain());
            },
            4,
        );

        assert_eq!(world.get::<Health>(a).unwrap().current, 45.0);
        assert_eq!(world.get::<Health>(b).unwrap().current, 45.0);
    }

    #[test]
    fn test_enemy_projectile_hits_player_once() {
        let mut world = test_world();
        world.spawn((
            Position::new(1.0, 0.0),
            Velocity::new(-10.0, 0.0),
            Radius(0.3),
            Projectile {
                owner: Owner::Enemy,
                damage: 9.0,
                lifetime: 2.0,
                ..Default::default()
            },
            Active(true),
        ));

        run(
            &mut world,
            |s| {
                s.add_systems((projectile_system, damage_apply_system).chain());
            },
            2,
        );

        let player = world.resource::<PlayerState>();
        assert_eq!(player.hp, 91.0);
        assert!(player.hurt_timer > 0.0);
    }

    #[test]
    fn test_melee_damages_target_at_most_once() {
        let mut world = test_world();
        let enemy = spawn_enemy(&mut world, 2.0, 0.0);
        world.spawn((
            Position::new(0.0, 0.0),
            MeleeSwing {
                owner: Owner::Player,
                start_angle: -1.0,
                total_sweep: TAU,
                duration: 1.0,
                reach: 4.0,
                damage: 6.0,
                ..Default::default()
            },
            Active(true),
        ));

        // The enemy sits inside the arc for the whole 10-tick swing
        run(
            &mut world,
            |s| {
                s.add_systems((melee_system, damage_apply_system).chain());
            },
            10,
        );

        assert_eq!(
            world.get::<Health>(enemy).unwrap().current,
            44.0,
            "one application of 6 damage, not ten"
        );
    }

    #[test]
    fn test_melee_respects_swept_angle() {
        let mut world = test_world();
        // Target sits behind the start of a narrow forward sweep
        let behind = spawn_enemy(&mut world, -2.0, 0.0);
        let ahead = spawn_enemy(&mut world, 2.0, 0.0);
        world.spawn((
            Position::new(0.0, 0.0),
            MeleeSwing {
                owner: Owner::Player,
                start_angle: -0.4,
                total_sweep: 0.8,
                duration: 0.3,
                reach: 4.0,
                damage: 6.0,
                ..Default::default()
            },
            Active(true),
        ));

        run(
            &mut world,
            |s| {
                s.add_systems((melee_system, damage_apply_system).chain());
            },
            4,
        );

        assert_eq!(world.get::<Health>(ahead).unwrap().current, 44.0);
        assert_eq!(
            world.get::<Health>(behind).unwrap().current,
            50.0,
            "outside the arc, never touched"
        );
    }

    #[test]
    fn test_hazard_ticks_damage_and_slow() {
        let mut world = test_world();
        let enemy = spawn_enemy(&mut world, 0.5, 0.0);
        world.spawn((
            Position::new(0.0, 0.0),
            Radius(2.0),
            HazardZone {
                owner: Owner::Player,
                damage_per_tick: 3.0,
                tick_interval: 0.25,
                tick_timer: 0.0,
                lifetime: 10.0,
                slow: Some(SlowEffect {
                    factor: 0.5,
                    duration: 1.0,
                }),
            },
            Active(true),
        ));

        // 0.4s: damage ticks on the first and third updates
        run(
            &mut world,
            |s| {
                s.add_systems((hazard_system, damage_apply_system).chain());
            },
            4,
        );

        assert_eq!(world.get::<Health>(enemy).unwrap().current, 44.0);
        assert!(world.get::<Slow>(enemy).unwrap().is_active());
    }

    #[test]
    fn test_contact_damage_respects_hurt_cooldown() {
        let mut world = test_world();
        spawn_enemy(&mut world, 0.3, 0.0);
        spawn_enemy(&mut world, -0.3, 0.0);

        run(
            &mut world,
            |s| {
                s.add_systems((contact_system, damage_apply_system).chain());
            },
            5,
        );

        // Two overlapping enemies, several ticks: exactly one hit of 8
        // lands inside the invulnerability window.
        let player = world.resource::<PlayerState>();
        assert_eq!(player.hp, 92.0);
    }

    #[test]
    fn test_invulnerable_enemy_rejects_damage() {
        let mut world = test_world();
        let enemy = spawn_enemy(&mut world, 2.0, 0.0);
        *world.get_mut::<Behavior>(enemy).unwrap() = Behavior::Flicker {
            interval: 10.0,
            timer: 10.0,
            invulnerable: true,
        };
        world.spawn((
            Position::new(1.0, 0.0),
            Velocity::new(10.0, 0.0),
            Radius(0.25),
            Projectile {
                owner: Owner::Player,
                damage: 7.0,
                lifetime: 2.0,
                ..Default::default()
            },
            Active(true),
        ));

        run(
            &mut world,
            |s| {
                s.add_systems((projectile_system, damage_apply_system).chain());
            },
            1,
        );

        assert_eq!(
            world.get::<Health>(enemy).unwrap().current,
            50.0,
            "all incoming damage rejected while invulnerable"
        );
    }

    #[test]
    fn test_crit_rolls_route_through_rng() {
        let mut world = test_world();
        let enemy = spawn_enemy(&mut world, 2.0, 0.0);
        world.spawn((
            Position::new(1.0, 0.0),
            Velocity::new(10.0, 0.0),
            Radius(0.25),
            Projectile {
                owner: Owner::Player,
                damage: 5.0,
                crit_chance: 1.0,
                crit_mult: 3.0,
                lifetime: 2.0,
                ..Default::default()
            },
            Active(true),
        ));

        run(
            &mut world,
            |s| {
                s.add_systems((projectile_system, damage_apply_system).chain());
            },
            1,
        );

        assert_eq!(
            world.get::<Health>(enemy).unwrap().current,
            35.0,
            "guaranteed crit triples the damage"
        );
    }
}
