//! Boss multi-phase ability controller.
//!
//! Phases are keyed by descending HP% thresholds defined in the content
//! tables. The phase index only ever increases for a given boss instance,
//! entry hooks fire exactly once per phase, and ability cooldowns are
//! seeded at half their configured value on entry so a boss never idles
//! right after a transition.
//!
//! Abilities execute against a narrow context (boss pose, player pose,
//! damage multiplier, spawn queue, RNG); the controller itself is generic
//! over ability sets, so different bosses share this code with different
//! phase tables.

use std::f32::consts::TAU;

use bevy_ecs::prelude::*;

use crate::collision::normalize;
use crate::components::*;
use crate::config::{BossAbility, BossPhaseDef, ContentTables};
use crate::rng::SimRng;
use crate::systems::lifecycle::{HazardSpec, ProjectileSpec, SpawnQueue, SpawnRequest};
use crate::systems::movement::DeltaTime;

/// Everything an ability is allowed to see and do.
pub struct AbilityCtx<'a> {
    pub boss_x: f32,
    pub boss_y: f32,
    pub player_x: f32,
    pub player_y: f32,
    pub damage_mult: f32,
    pub spawns: &'a mut SpawnQueue,
    pub rng: &'a mut SimRng,
}

/// System that advances every active boss's phase machine and abilities.
pub fn boss_phase_system(
    dt: Res<DeltaTime>,
    content: Res<ContentTables>,
    player: Res<PlayerState>,
    mut rng: ResMut<SimRng>,
    mut spawns: ResMut<SpawnQueue>,
    mut query: Query<(&Position, &EnemyKind, &Health, &mut BossPhaseState, &Active)>,
) {
    let delta = dt.0;

    for (pos, kind, health, mut state, active) in query.iter_mut() {
        if !active.0 {
            continue;
        }
        let Some(def) = content.archetype(kind.0).and_then(|a| a.boss.as_ref()) else {
            continue;
        };
        if def.phases.is_empty() {
            continue;
        }

        let mut ctx = AbilityCtx {
            boss_x: pos.x,
            boss_y: pos.y,
            player_x: player.x,
            player_y: player.y,
            damage_mult: state.damage_mult,
            spawns: &mut spawns,
            rng: &mut rng,
        };

        if !state.initialized {
            state.initialized = true;
            enter_phase(&mut state, &def.phases[0], 0, &mut ctx);
        }

        // Transitions are forward-only; healing never rolls a phase back.
        let hp_pct = health.fraction();
        while state.phase + 1 < def.phases.len()
            && def.phases[state.phase + 1].hp_threshold >= hp_pct
        {
            let next = state.phase + 1;
            enter_phase(&mut state, &def.phases[next], next, &mut ctx);
        }

        state.charge_timer = (state.charge_timer - delta).max(0.0);

        // Each ability ticks down independently.
        let phase = &def.phases[state.phase];
        for (i, ability_def) in phase.abilities.iter().enumerate() {
            let Some(cooldown) = state.cooldowns.get_mut(i) else {
                continue;
            };
            *cooldown -= delta;
            if *cooldown <= 0.0 {
                *cooldown = ability_def.cooldown;
                let (charge_timer, charge_mult) =
                    execute_ability(&ability_def.ability, &mut ctx);
                if charge_timer > 0.0 {
                    state.charge_timer = charge_timer;
                    state.charge_mult = charge_mult;
                }
            }
        }
    }
}

fn enter_phase(
    state: &mut BossPhaseState,
    phase: &BossPhaseDef,
    index: usize,
    ctx: &mut AbilityCtx,
) {
    state.phase = index;
    state.speed_mult = phase.speed_mult;
    state.damage_mult = phase.damage_mult;
    ctx.damage_mult = phase.damage_mult;
    // Half-seeded cooldowns keep the boss busy right after the transition.
    state.cooldowns.clear();
    state
        .cooldowns
        .extend(phase.abilities.iter().map(|a| a.cooldown * 0.5));
    if let Some(on_enter) = &phase.on_enter {
        let (charge_timer, charge_mult) = execute_ability(on_enter, ctx);
        if charge_timer > 0.0 {
            state.charge_timer = charge_timer;
            state.charge_mult = charge_mult;
        }
    }
}

/// Run one ability. Returns `(charge_timer, charge_mult)`; zero timer means
/// no movement burst was requested.
fn execute_ability(ability: &BossAbility, ctx: &mut AbilityCtx) -> (f32, f32) {
    match *ability {
        BossAbility::RadialBurst { count, speed, damage } => {
            let start = ctx.rng.range(0.0, TAU);
            for i in 0..count {
                let angle = start + TAU * i as f32 / count.max(1) as f32;
                ctx.spawns.0.push(SpawnRequest::Projectile(ProjectileSpec {
                    owner: Owner::Enemy,
                    x: ctx.boss_x,
                    y: ctx.boss_y,
                    dir_x: angle.cos(),
                    dir_y: angle.sin(),
                    speed,
                    radius: 0.35,
                    damage: damage * ctx.damage_mult,
                    pierce: 0,
                    lifetime: 5.0,
                    crit_chance: 0.0,
                    crit_mult: 1.0,
                    slow: None,
                }));
            }
            (0.0, 1.0)
        }
        BossAbility::AimedVolley {
            count,
            spread,
            speed,
            damage,
        } => {
            let base = match normalize(ctx.player_x - ctx.boss_x, ctx.player_y - ctx.boss_y) {
                Some((nx, ny)) => ny.atan2(nx),
                // Player standing on the boss: pick an arbitrary fixed aim.
                None => 0.0,
            };
            for _ in 0..count {
                let angle = base + ctx.rng.range(-spread * 0.5, spread * 0.5);
                ctx.spawns.0.push(SpawnRequest::Projectile(ProjectileSpec {
                    owner: Owner::Enemy,
                    x: ctx.boss_x,
                    y: ctx.boss_y,
                    dir_x: angle.cos(),
                    dir_y: angle.sin(),
                    speed,
                    radius: 0.35,
                    damage: damage * ctx.damage_mult,
                    pierce: 0,
                    lifetime: 5.0,
                    crit_chance: 0.0,
                    crit_mult: 1.0,
                    slow: None,
                }));
            }
            (0.0, 1.0)
        }
        BossAbility::SummonMinions {
            kind,
            count,
            scatter_radius,
        } => {
            for _ in 0..count {
                let angle = ctx.rng.range(0.0, TAU);
                let dist = ctx.rng.range(1.0, scatter_radius.max(1.0));
                ctx.spawns.0.push(SpawnRequest::Enemy {
                    kind,
                    x: ctx.boss_x + angle.cos() * dist,
                    y: ctx.boss_y + angle.sin() * dist,
                    elite: false,
                    difficulty: 1.0,
                });
            }
            (0.0, 1.0)
        }
        BossAbility::HazardRing {
            count,
            distance,
            radius,
            damage_per_tick,
            tick_interval,
            lifetime,
            slow,
        } => {
            let start = ctx.rng.range(0.0, TAU);
            for i in 0..count {
                let angle = start + TAU * i as f32 / count.max(1) as f32;
                ctx.spawns.0.push(SpawnRequest::Hazard(HazardSpec {
                    owner: Owner::Enemy,
                    x: ctx.boss_x + angle.cos() * distance,
                    y: ctx.boss_y + angle.sin() * distance,
                    radius,
                    damage_per_tick: damage_per_tick * ctx.damage_mult,
                    tick_interval,
                    lifetime,
                    slow,
                }));
            }
            (0.0, 1.0)
        }
        BossAbility::Charge { speed_mult, duration } => (duration, speed_mult),
    }
}
