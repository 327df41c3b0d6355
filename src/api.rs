//! Public API for the simulation.
//!
//! `SimWorld` owns the ECS world, the chained system schedule, and every
//! entity collection. External callers drive it with `step(dt)` plus a
//! per-tick input stream and pull read-only snapshots afterward.
//!
//! ## Fixed timestep
//!
//! `step(dt)` accumulates real time and runs fixed updates as needed, so
//! simulation behavior is independent of the caller's frame rate.
//!
//! ## Determinism contract
//!
//! Given the same seed, the same configuration, and the same sequence of
//! API calls per tick, two `SimWorld`s produce identical snapshots at every
//! tick. Everything that could diverge is pinned down: one seeded RNG
//! stream, a single-threaded chained schedule, and structural mutation
//! confined to the end-of-tick queue drain below.

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;

use crate::collision::normalize;
use crate::components::*;
use crate::config::{ContentTables, SimConfig};
use crate::pool::EntityPool;
use crate::rng::SimRng;
use crate::spatial::{spatial_index_rebuild_system, Rect, SpatialIndex};
use crate::systems::*;
use crate::world::{super_scale, Snapshot};

/// The main simulation container.
pub struct SimWorld {
    world: World,
    schedule: Schedule,
    tick: u64,
    time: f32,
    /// Accumulated time for the fixed timestep.
    time_accumulator: f32,
}

impl SimWorld {
    /// Create a simulation with default tuning and the built-in roster.
    pub fn new(seed: u64) -> Self {
        Self::with_config(SimConfig::default(), ContentTables::default_roster(), seed)
    }

    /// Create a simulation with explicit configuration and content tables.
    pub fn with_config(config: SimConfig, content: ContentTables, seed: u64) -> Self {
        let mut world = World::new();

        world.insert_resource(DeltaTime(config.fixed_timestep));
        world.insert_resource(SimRng::new(seed));
        world.insert_resource(SpatialIndex::new(
            Rect::centered(config.world_half_extent),
            config.spatial_capacity,
        ));
        world.insert_resource(EntityPool::new());
        world.insert_resource(PlayerState {
            x: 0.0,
            y: 0.0,
            radius: config.player.radius,
            hp: config.player.max_hp,
            max_hp: config.player.max_hp,
            move_speed: config.player.move_speed,
            input_x: 0.0,
            input_y: 0.0,
            hurt_timer: 0.0,
            pickup_radius: config.player.pickup_radius,
            xp: 0.0,
        });
        world.insert_resource(SpawnQueue::default());
        world.insert_resource(DespawnQueue::default());
        world.insert_resource(MergeQueue::default());
        world.insert_resource(DeathEvents::default());
        world.insert_resource(DamageEvents::default());
        world.insert_resource(ClusterClock::default());
        world.insert_resource(content);
        world.insert_resource(config);

        // The phase order is load-bearing for determinism; every system is
        // chained and the executor is pinned to a single thread.
        let mut schedule = Schedule::default();
        schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        schedule.add_systems(
            (
                spatial_index_rebuild_system,
                player_movement_system,
                behavior_system,
                boss_phase_system,
                enemy_movement_system,
                separation_system,
                projectile_system,
            )
                .chain(),
        );
        schedule.add_systems(
            (
                melee_system,
                hazard_system,
                contact_system,
                damage_apply_system,
                pickup_system,
                cluster_system,
                obstacle_expiry_system,
                death_system,
            )
                .chain()
                .after(projectile_system),
        );

        Self {
            world,
            schedule,
            tick: 0,
            time: 0.0,
            time_accumulator: 0.0,
        }
    }

    /// A small populated world for demos and smoke tests.
    pub fn new_demo_world(seed: u64) -> Self {
        let mut sim = Self::new(seed);
        use crate::config::*;

        // A loose ring of mixed enemies around the player
        for i in 0..12 {
            let angle = i as f32 / 12.0 * std::f32::consts::TAU;
            let kind = match i % 4 {
                0 => KIND_SLIME,
                1 => KIND_BAT,
                2 => KIND_GHOST,
                _ => KIND_SKELETON_ARCHER,
            };
            sim.spawn_enemy(kind, angle.cos() * 25.0, angle.sin() * 25.0, false, 1.0);
        }
        sim.spawn_enemy(KIND_BOAR, 30.0, 0.0, true, 1.0);
        sim.spawn_enemy(KIND_TREANT, -30.0, 0.0, false, 1.0);
        sim.spawn_enemy(KIND_WARDEN, 0.0, 45.0, false, 1.0);
        sim.spawn_obstacle(10.0, 10.0, 1.5, None);
        sim.spawn_obstacle(-10.0, -10.0, 1.5, None);
        sim
    }

    /// Step the simulation forward by `dt` seconds of real time.
    pub fn step(&mut self, dt: f32) {
        let fixed_dt = self.world.resource::<SimConfig>().fixed_timestep;
        self.time_accumulator += dt;
        while self.time_accumulator >= fixed_dt {
            self.fixed_update(fixed_dt);
            self.time_accumulator -= fixed_dt;
        }
    }

    /// Run exactly one fixed update, ignoring the accumulator. Handy for
    /// tests that want tick-precise control.
    pub fn tick_once(&mut self) {
        let fixed_dt = self.world.resource::<SimConfig>().fixed_timestep;
        self.fixed_update(fixed_dt);
    }

    fn fixed_update(&mut self, dt: f32) {
        self.world.resource_mut::<DeltaTime>().0 = dt;
        self.schedule.run(&mut self.world);
        self.apply_pending();
        self.tick += 1;
        self.time += dt;
    }

    /// Drain the queues the systems filled during the tick. This is the
    /// only place entities are created, recycled, or handed back to pools.
    fn apply_pending(&mut self) {
        // Cluster merges validate member liveness at the last possible
        // moment; any member gone inactive abandons the merge this tick.
        let merges = std::mem::take(&mut self.world.resource_mut::<MergeQueue>().0);
        for merge in merges {
            let all_live = merge.members.iter().all(|&member| {
                self.world.get::<Active>(member).is_some_and(|a| a.0)
                    && self.world.get::<Health>(member).is_some_and(|h| h.is_alive())
            });
            if !all_live {
                continue;
            }
            // A merge is not a set of kills: members despawn silently, with
            // no death events and no reward.
            for &member in &merge.members {
                self.release(member);
            }
            self.spawn_super_enemy(
                merge.kind,
                merge.x,
                merge.y,
                merge.combined_hp,
                merge.members.len() as u32,
            );
        }

        let spawns = std::mem::take(&mut self.world.resource_mut::<SpawnQueue>().0);
        for request in spawns {
            match request {
                SpawnRequest::Enemy {
                    kind,
                    x,
                    y,
                    elite,
                    difficulty,
                } => {
                    self.spawn_enemy(kind, x, y, elite, difficulty);
                }
                SpawnRequest::Projectile(spec) => {
                    self.spawn_projectile(spec);
                }
                SpawnRequest::Hazard(spec) => {
                    self.spawn_hazard_zone(spec);
                }
            }
        }

        let deaths = std::mem::take(&mut self.world.resource_mut::<DeathEvents>().0);
        for death in deaths {
            if death.xp > 0.0 {
                self.spawn_gem(death.x, death.y, death.xp);
            }
        }

        let despawns = std::mem::take(&mut self.world.resource_mut::<DespawnQueue>().0);
        for entity in despawns {
            self.release(entity);
        }
    }

    /// Reset an entity to pool-neutral state and park its id. Safe to call
    /// twice on the same entity in one tick; the second call is a no-op.
    fn release(&mut self, entity: Entity) {
        let Some(active) = self.world.get::<Active>(entity) else {
            return;
        };
        if !active.0 {
            return;
        }

        if let Some(kind) = self.world.get::<EnemyKind>(entity).copied() {
            if let Some(mut vel) = self.world.get_mut::<Velocity>(entity) {
                vel.zero();
            }
            if let Some(mut health) = self.world.get_mut::<Health>(entity) {
                health.reset();
            }
            if let Some(mut slow) = self.world.get_mut::<Slow>(entity) {
                slow.reset();
            }
            if let Some(mut stats) = self.world.get_mut::<EnemyStats>(entity) {
                *stats = EnemyStats::default();
            }
            if let Some(mut flags) = self.world.get_mut::<EnemyFlags>(entity) {
                *flags = EnemyFlags::default();
            }
            if let Some(mut behavior) = self.world.get_mut::<Behavior>(entity) {
                *behavior = Behavior::Chaser;
            }
            if let Some(mut boss) = self.world.get_mut::<BossPhaseState>(entity) {
                boss.reset();
            }
            self.deactivate(entity);
            self.world
                .resource_mut::<EntityPool>()
                .release_enemy(kind.0, entity);
        } else if self.world.get::<Projectile>(entity).is_some() {
            if let Some(mut projectile) = self.world.get_mut::<Projectile>(entity) {
                projectile.reset();
            }
            if let Some(mut vel) = self.world.get_mut::<Velocity>(entity) {
                vel.zero();
            }
            self.deactivate(entity);
            self.world
                .resource_mut::<EntityPool>()
                .release_projectile(entity);
        } else if self.world.get::<MeleeSwing>(entity).is_some() {
            if let Some(mut swing) = self.world.get_mut::<MeleeSwing>(entity) {
                swing.reset();
            }
            self.deactivate(entity);
            self.world.resource_mut::<EntityPool>().release_swing(entity);
        } else if self.world.get::<HazardZone>(entity).is_some() {
            if let Some(mut hazard) = self.world.get_mut::<HazardZone>(entity) {
                hazard.reset();
            }
            self.deactivate(entity);
            self.world.resource_mut::<EntityPool>().release_hazard(entity);
        } else if self.world.get::<Gem>(entity).is_some() {
            if let Some(mut gem) = self.world.get_mut::<Gem>(entity) {
                gem.xp = 0.0;
            }
            self.deactivate(entity);
            self.world.resource_mut::<EntityPool>().release_gem(entity);
        } else if self.world.get::<Obstacle>(entity).is_some() {
            // Obstacles are not pooled; expiry removes them for real.
            self.world.despawn(entity);
        }
    }

    fn deactivate(&mut self, entity: Entity) {
        if let Some(mut active) = self.world.get_mut::<Active>(entity) {
            active.0 = false;
        }
    }

    // ========================================================================
    // INPUT
    // ========================================================================

    /// Record the player's movement input for the coming ticks. This is the
    /// stream a replay feeds back in.
    pub fn set_player_input(&mut self, dx: f32, dy: f32) {
        let mut player = self.world.resource_mut::<PlayerState>();
        player.input_x = dx;
        player.input_y = dy;
    }

    // ========================================================================
    // SPAWNING
    // ========================================================================

    /// Spawn an enemy of the given archetype. Unknown archetype ids are a
    /// no-op with a diagnostic, never fatal.
    pub fn spawn_enemy(
        &mut self,
        kind: u32,
        x: f32,
        y: f32,
        elite: bool,
        difficulty: f32,
    ) -> Option<Entity> {
        let Some(def) = self.world.resource::<ContentTables>().archetype(kind).cloned() else {
            log::warn!("spawn_enemy: unknown archetype id {kind}");
            return None;
        };
        let config = self.world.resource::<SimConfig>();
        let hp_mult = if elite { config.elite_hp_mult } else { 1.0 };
        let damage_mult = if elite { config.elite_damage_mult } else { 1.0 };
        let reward_mult = if elite { config.elite_xp_mult } else { 1.0 };

        let bundle = EnemyBundle {
            kind: EnemyKind(kind),
            position: Position::new(x, y),
            velocity: Velocity::default(),
            radius: Radius(def.radius),
            health: Health::new(def.max_hp * difficulty * hp_mult),
            stats: EnemyStats {
                move_speed: def.move_speed,
                contact_damage: def.contact_damage * difficulty * damage_mult,
                xp_value: def.xp_value,
            },
            flags: EnemyFlags {
                elite,
                boss: def.boss.is_some(),
                super_enemy: false,
                merged_count: 1,
                reward_mult,
            },
            behavior: def.behavior.instantiate(),
            slow: Slow::default(),
            active: Active(true),
        };
        let entity = self.insert_enemy(kind, bundle);
        if def.boss.is_some() {
            self.ensure_boss_state(entity);
        }
        Some(entity)
    }

    /// Spawn a merged super enemy, as produced by a validated cluster. Total
    /// threat is conserved: its HP is the members' summed current HP, and
    /// its reward multiplier reflects the merge size.
    pub fn spawn_super_enemy(
        &mut self,
        kind: u32,
        x: f32,
        y: f32,
        combined_hp: f32,
        merged_count: u32,
    ) -> Option<Entity> {
        let Some(def) = self.world.resource::<ContentTables>().archetype(kind).cloned() else {
            log::warn!("spawn_super_enemy: unknown archetype id {kind}");
            return None;
        };

        let bundle = EnemyBundle {
            kind: EnemyKind(kind),
            position: Position::new(x, y),
            velocity: Velocity::default(),
            radius: Radius(def.radius * super_scale(merged_count)),
            health: Health {
                current: combined_hp,
                max: combined_hp,
            },
            stats: EnemyStats {
                move_speed: def.move_speed,
                contact_damage: def.contact_damage,
                xp_value: def.xp_value,
            },
            flags: EnemyFlags {
                elite: false,
                boss: false,
                super_enemy: true,
                merged_count,
                reward_mult: merged_count as f32,
            },
            behavior: def.behavior.instantiate(),
            slow: Slow::default(),
            active: Active(true),
        };
        Some(self.insert_enemy(kind, bundle))
    }

    fn insert_enemy(&mut self, kind: u32, bundle: EnemyBundle) -> Entity {
        match self.world.resource_mut::<EntityPool>().acquire_enemy(kind) {
            Some(entity) => {
                debug_assert!(
                    !self.world.get::<Active>(entity).is_some_and(|a| a.0),
                    "pool handed out a live entity"
                );
                self.world.entity_mut(entity).insert(bundle);
                entity
            }
            None => self.world.spawn(bundle).id(),
        }
    }

    fn ensure_boss_state(&mut self, entity: Entity) {
        if let Some(mut state) = self.world.get_mut::<BossPhaseState>(entity) {
            state.reset();
        } else {
            self.world.entity_mut(entity).insert(BossPhaseState::default());
        }
    }

    /// Spawn a projectile. A degenerate direction vector is rejected with a
    /// diagnostic rather than normalized into NaN.
    pub fn spawn_projectile(&mut self, spec: ProjectileSpec) -> Option<Entity> {
        let Some((nx, ny)) = normalize(spec.dir_x, spec.dir_y) else {
            log::debug!("spawn_projectile: zero-length direction, dropped");
            return None;
        };
        let bundle = (
            Position::new(spec.x, spec.y),
            Velocity::new(nx * spec.speed, ny * spec.speed),
            Radius(spec.radius),
            Projectile {
                owner: spec.owner,
                damage: spec.damage,
                crit_chance: spec.crit_chance,
                crit_mult: spec.crit_mult,
                lifetime: spec.lifetime,
                pierce: spec.pierce,
                slow: spec.slow,
                hit: Vec::new(),
            },
            Active(true),
        );
        let entity = match self.world.resource_mut::<EntityPool>().acquire_projectile() {
            Some(entity) => {
                self.world.entity_mut(entity).insert(bundle);
                entity
            }
            None => self.world.spawn(bundle).id(),
        };
        Some(entity)
    }

    /// Spawn a melee sweep.
    pub fn spawn_melee_swing(&mut self, spec: SwingSpec) -> Entity {
        let bundle = (
            Position::new(spec.x, spec.y),
            MeleeSwing {
                owner: Owner::Player,
                start_angle: spec.start_angle,
                total_sweep: spec.total_sweep,
                duration: spec.duration,
                elapsed: 0.0,
                reach: spec.reach,
                damage: spec.damage,
                crit_chance: spec.crit_chance,
                crit_mult: spec.crit_mult,
                hit: Vec::new(),
            },
            Active(true),
        );
        match self.world.resource_mut::<EntityPool>().acquire_swing() {
            Some(entity) => {
                self.world.entity_mut(entity).insert(bundle);
                entity
            }
            None => self.world.spawn(bundle).id(),
        }
    }

    /// Spawn a hazard zone. Its first damage tick lands on the next update.
    pub fn spawn_hazard_zone(&mut self, spec: HazardSpec) -> Entity {
        let bundle = (
            Position::new(spec.x, spec.y),
            Radius(spec.radius),
            HazardZone {
                owner: spec.owner,
                damage_per_tick: spec.damage_per_tick,
                tick_interval: spec.tick_interval,
                tick_timer: 0.0,
                lifetime: spec.lifetime,
                slow: spec.slow,
            },
            Active(true),
        );
        match self.world.resource_mut::<EntityPool>().acquire_hazard() {
            Some(entity) => {
                self.world.entity_mut(entity).insert(bundle);
                entity
            }
            None => self.world.spawn(bundle).id(),
        }
    }

    /// Spawn a static or temporary obstacle collider.
    pub fn spawn_obstacle(
        &mut self,
        x: f32,
        y: f32,
        radius: f32,
        lifetime: Option<f32>,
    ) -> Entity {
        self.world
            .spawn((
                Position::new(x, y),
                Radius(radius),
                Obstacle { lifetime },
                Active(true),
            ))
            .id()
    }

    /// Spawn an experience gem.
    pub fn spawn_gem(&mut self, x: f32, y: f32, xp: f32) -> Entity {
        let bundle = (Position::new(x, y), Gem { xp }, Active(true));
        match self.world.resource_mut::<EntityPool>().acquire_gem() {
            Some(entity) => {
                self.world.entity_mut(entity).insert(bundle);
                entity
            }
            None => self.world.spawn(bundle).id(),
        }
    }

    // ========================================================================
    // READ-ONLY ACCESS
    // ========================================================================

    /// Get a snapshot of the current simulation state.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::from_world(&mut self.world, self.tick, self.time)
    }

    /// Get the snapshot as a JSON string.
    pub fn snapshot_json(&mut self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    /// Current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Elapsed simulation time.
    pub fn current_time(&self) -> f32 {
        self.time
    }

    /// Copy of the player state.
    pub fn player(&self) -> PlayerState {
        self.world.resource::<PlayerState>().clone()
    }

    /// Number of live, simulated enemies.
    pub fn active_enemy_count(&mut self) -> usize {
        let mut query = self.world.query::<(&EnemyKind, &Active)>();
        query.iter(&self.world).filter(|(_, a)| a.0).count()
    }

    /// Number of ids currently parked across all pools.
    pub fn pooled_count(&self) -> usize {
        self.world.resource::<EntityPool>().pooled_count()
    }

    /// Spatial index reference (for debugging and visualization).
    pub fn spatial_index(&self) -> &SpatialIndex {
        self.world.resource::<SpatialIndex>()
    }

    /// Direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}
