//! Archetype behavior state machines.
//!
//! Each archetype is a small state machine over counted-down timer fields
//! on its own [`Behavior`] component, resolved once at spawn. This phase
//! decides velocity and fires timed actions; it never moves entities
//! (movement integrates later) and never touches entity storage (spawns go
//! through the queue).

use std::f32::consts::TAU;

use bevy_ecs::prelude::*;

use crate::collision::normalize;
use crate::components::*;
use crate::rng::SimRng;
use crate::systems::lifecycle::{ProjectileSpec, SpawnQueue, SpawnRequest};
use crate::systems::movement::DeltaTime;

/// Distance at which a dash counts as arrived.
const DASH_ARRIVE_DIST: f32 = 0.5;

/// System that advances every active enemy's behavior state machine.
pub fn behavior_system(
    dt: Res<DeltaTime>,
    player: Res<PlayerState>,
    mut rng: ResMut<SimRng>,
    mut spawns: ResMut<SpawnQueue>,
    mut query: Query<
        (
            &Position,
            &mut Velocity,
            &mut Behavior,
            &mut Health,
            &mut EnemyStats,
            &Active,
        ),
        With<EnemyKind>,
    >,
) {
    let delta = dt.0;

    for (pos, mut vel, mut behavior, mut health, mut stats, active) in query.iter_mut() {
        if !active.0 {
            continue;
        }

        let to_player = normalize(player.x - pos.x, player.y - pos.y);
        let chase = |vel: &mut Velocity, speed: f32| match to_player {
            Some((nx, ny)) => {
                vel.vx = nx * speed;
                vel.vy = ny * speed;
            }
            None => vel.zero(),
        };

        match &mut *behavior {
            Behavior::Chaser => chase(&mut vel, stats.move_speed),

            Behavior::Flicker {
                interval,
                timer,
                invulnerable,
            } => {
                *timer -= delta;
                while *timer <= 0.0 {
                    *invulnerable = !*invulnerable;
                    // A non-positive interval from bad table data must not spin.
                    *timer += interval.max(delta.max(1e-3));
                }
                chase(&mut vel, stats.move_speed);
            }

            Behavior::Kiter {
                range,
                fire_interval,
                fire_timer,
                projectile_speed,
                projectile_damage,
            } => {
                let dx = player.x - pos.x;
                let dy = player.y - pos.y;
                if dx * dx + dy * dy <= *range * *range {
                    vel.zero();
                    *fire_timer -= delta;
                    if *fire_timer <= 0.0 {
                        *fire_timer += *fire_interval;
                        if let Some((nx, ny)) = to_player {
                            spawns.0.push(SpawnRequest::Projectile(ProjectileSpec {
                                owner: Owner::Enemy,
                                x: pos.x,
                                y: pos.y,
                                dir_x: nx,
                                dir_y: ny,
                                speed: *projectile_speed,
                                radius: 0.3,
                                damage: *projectile_damage,
                                pierce: 0,
                                lifetime: 4.0,
                                crit_chance: 0.0,
                                crit_mult: 1.0,
                                slow: None,
                            }));
                        }
                    }
                } else {
                    chase(&mut vel, stats.move_speed);
                }
            }

            Behavior::Charger {
                cooldown,
                telegraph,
                duration,
                speed_mult,
                state,
            } => match state {
                ChargeState::Cooldown(timer) => {
                    *timer -= delta;
                    if *timer <= 0.0 {
                        *state = ChargeState::Telegraph(*telegraph);
                        vel.zero();
                    } else {
                        chase(&mut vel, stats.move_speed);
                    }
                }
                ChargeState::Telegraph(timer) => {
                    // Wind-up is visual only; direction locks when it ends.
                    vel.zero();
                    *timer -= delta;
                    if *timer <= 0.0 {
                        let (dir_x, dir_y) = to_player.unwrap_or((1.0, 0.0));
                        *state = ChargeState::Charging {
                            timer: *duration,
                            dir_x,
                            dir_y,
                        };
                        vel.vx = dir_x * stats.move_speed * *speed_mult;
                        vel.vy = dir_y * stats.move_speed * *speed_mult;
                    }
                }
                ChargeState::Charging { timer, dir_x, dir_y } => {
                    vel.vx = *dir_x * stats.move_speed * *speed_mult;
                    vel.vy = *dir_y * stats.move_speed * *speed_mult;
                    *timer -= delta;
                    if *timer <= 0.0 {
                        *state = ChargeState::Cooldown(*cooldown);
                    }
                }
            },

            Behavior::Dasher {
                cooldown,
                delay,
                dash_speed,
                max_duration,
                state,
            } => match state {
                DashState::Cooldown(timer) => {
                    *timer -= delta;
                    if *timer <= 0.0 {
                        // Remember where the player was when the fade began.
                        *state = DashState::Fading {
                            timer: *delay,
                            target_x: player.x,
                            target_y: player.y,
                        };
                        vel.zero();
                    } else {
                        chase(&mut vel, stats.move_speed);
                    }
                }
                DashState::Fading {
                    timer,
                    target_x,
                    target_y,
                } => {
                    vel.zero();
                    *timer -= delta;
                    if *timer <= 0.0 {
                        let (tx, ty) = (*target_x, *target_y);
                        *state = DashState::Dashing {
                            timer: *max_duration,
                            target_x: tx,
                            target_y: ty,
                        };
                        if let Some((nx, ny)) = normalize(tx - pos.x, ty - pos.y) {
                            vel.vx = nx * *dash_speed;
                            vel.vy = ny * *dash_speed;
                        }
                    }
                }
                DashState::Dashing {
                    timer,
                    target_x,
                    target_y,
                } => {
                    *timer -= delta;
                    let dx = *target_x - pos.x;
                    let dy = *target_y - pos.y;
                    let arrived = dx * dx + dy * dy <= DASH_ARRIVE_DIST * DASH_ARRIVE_DIST;
                    if arrived || *timer <= 0.0 {
                        *state = DashState::Cooldown(*cooldown);
                        vel.zero();
                    } else {
                        match normalize(dx, dy) {
                            Some((nx, ny)) => {
                                vel.vx = nx * *dash_speed;
                                vel.vy = ny * *dash_speed;
                            }
                            None => vel.zero(),
                        }
                    }
                }
            },

            Behavior::Healer {
                enrage_threshold,
                enrage_speed_mult,
                enrage_damage_mult,
                heal_fraction,
                heal_interval,
                heal_timer,
                enraged,
            } => {
                if !*enraged && health.fraction() < *enrage_threshold {
                    // One-shot stat boost, never re-applied.
                    *enraged = true;
                    stats.move_speed *= *enrage_speed_mult;
                    stats.contact_damage *= *enrage_damage_mult;
                }
                if health.current < health.max {
                    *heal_timer -= delta;
                    if *heal_timer <= 0.0 {
                        *heal_timer += *heal_interval;
                        let amount = health.max * *heal_fraction;
                        health.heal(amount);
                    }
                }
                chase(&mut vel, stats.move_speed);
            }

            Behavior::Summoner {
                interval,
                timer,
                count,
                child,
                scatter_radius,
            } => {
                *timer -= delta;
                if *timer <= 0.0 {
                    *timer += *interval;
                    for _ in 0..*count {
                        let angle = rng.range(0.0, TAU);
                        let dist = rng.range(0.5, *scatter_radius);
                        spawns.0.push(SpawnRequest::Enemy {
                            kind: *child,
                            x: pos.x + angle.cos() * dist,
                            y: pos.y + angle.sin() * dist,
                            elite: false,
                            difficulty: 1.0,
                        });
                    }
                }
                chase(&mut vel, stats.move_speed);
            }
        }
    }
}
