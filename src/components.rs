//! ECS components and the player resource for the swarm simulation.
//!
//! Components are pure data. All behavior lives in systems; the archetype
//! state machines carry their own counted-down timer fields here so no
//! delay ever depends on wall-clock time or a scheduled callback.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// 2D position on the ground plane.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 2D velocity vector.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub vx: f32,
    pub vy: f32,
}

impl Velocity {
    pub fn new(vx: f32, vy: f32) -> Self {
        Self { vx, vy }
    }

    pub fn magnitude(&self) -> f32 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }

    pub fn zero(&mut self) {
        self.vx = 0.0;
        self.vy = 0.0;
    }
}

/// Collision radius.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Radius(pub f32);

// ============================================================================
// LIFECYCLE COMPONENTS
// ============================================================================

/// Liveness flag. An entity is either active (simulated, collidable) or
/// pooled; pooled entities keep their components but every system skips
/// them. Mid-effect code must check this before acting on pending state,
/// since pool release is the only way an in-flight effect gets aborted.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Active(pub bool);

// ============================================================================
// ENEMY COMPONENTS
// ============================================================================

/// Archetype id, an index into the content table roster.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnemyKind(pub u32);

/// Hit points.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    pub fn fraction(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            (self.current / self.max).clamp(0.0, 1.0)
        }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    pub fn damage(&mut self, amount: f32) {
        self.current = (self.current - amount).max(0.0);
    }

    pub fn heal(&mut self, amount: f32) {
        self.current = (self.current + amount).min(self.max);
    }

    /// Pool-neutral state.
    pub fn reset(&mut self) {
        self.current = 0.0;
        self.max = 0.0;
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Per-instance combat stats, resolved from the archetype definition at
/// spawn time (difficulty and elite multipliers already applied).
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EnemyStats {
    pub move_speed: f32,
    pub contact_damage: f32,
    pub xp_value: f32,
}

/// Enemy classification flags.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EnemyFlags {
    pub elite: bool,
    pub boss: bool,
    pub super_enemy: bool,
    /// How many plain enemies were collapsed into this one (1 if unmerged).
    pub merged_count: u32,
    /// Multiplier applied to the XP reward on death.
    pub reward_mult: f32,
}

impl Default for EnemyFlags {
    fn default() -> Self {
        Self {
            elite: false,
            boss: false,
            super_enemy: false,
            merged_count: 1,
            reward_mult: 1.0,
        }
    }
}

/// Movement slow applied by hazard payloads. Neutral when `remaining <= 0`.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Slow {
    /// Fraction of speed removed, in `[0, 1)`.
    pub factor: f32,
    pub remaining: f32,
}

impl Slow {
    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }

    /// Keep whichever slow bites harder; refresh duration either way.
    pub fn apply(&mut self, effect: SlowEffect) {
        if !self.is_active() || effect.factor >= self.factor {
            self.factor = effect.factor;
        }
        self.remaining = self.remaining.max(effect.duration);
    }

    pub fn reset(&mut self) {
        self.factor = 0.0;
        self.remaining = 0.0;
    }
}

/// Slow payload carried by projectiles and hazard zones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlowEffect {
    pub factor: f32,
    pub duration: f32,
}

// ============================================================================
// ARCHETYPE STATE MACHINES
// ============================================================================

/// Charge attack cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChargeState {
    /// Chasing normally until the timer expires.
    Cooldown(f32),
    /// Halted wind-up, visual only.
    Telegraph(f32),
    /// High-speed run along a locked direction.
    Charging { timer: f32, dir_x: f32, dir_y: f32 },
}

/// Dash-invisible cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DashState {
    Cooldown(f32),
    /// Turned transparent, waiting out the fixed delay before moving.
    Fading { timer: f32, target_x: f32, target_y: f32 },
    /// Rapid movement toward the remembered point, bounded by a timeout.
    Dashing { timer: f32, target_x: f32, target_y: f32 },
}

/// Per-archetype behavior state machine, resolved once at spawn from the
/// content table so the per-tick update never re-dispatches on type.
///
/// Every delay in here is a counted-down field decremented by the tick's
/// delta time.
#[derive(Component, Debug, Clone)]
pub enum Behavior {
    /// Walks straight at the player.
    Chaser,
    /// Toggles invulnerability on a fixed interval.
    Flicker {
        interval: f32,
        timer: f32,
        invulnerable: bool,
    },
    /// Halts and fires at range, chases otherwise.
    Kiter {
        range: f32,
        fire_interval: f32,
        fire_timer: f32,
        projectile_speed: f32,
        projectile_damage: f32,
    },
    /// Cooldown, telegraph, then a locked high-speed charge.
    Charger {
        cooldown: f32,
        telegraph: f32,
        duration: f32,
        speed_mult: f32,
        state: ChargeState,
    },
    /// Goes untargetable, then dashes to a remembered point.
    Dasher {
        cooldown: f32,
        delay: f32,
        dash_speed: f32,
        max_duration: f32,
        state: DashState,
    },
    /// One-shot enrage below an HP threshold plus periodic self-heal.
    Healer {
        enrage_threshold: f32,
        enrage_speed_mult: f32,
        enrage_damage_mult: f32,
        heal_fraction: f32,
        heal_interval: f32,
        heal_timer: f32,
        enraged: bool,
    },
    /// Periodically spawns children around itself through the spawn queue.
    Summoner {
        interval: f32,
        timer: f32,
        count: u32,
        child: u32,
        scatter_radius: f32,
    },
}

impl Behavior {
    /// Incoming damage is rejected entirely while this returns true.
    pub fn rejects_damage(&self) -> bool {
        match self {
            Behavior::Flicker { invulnerable, .. } => *invulnerable,
            Behavior::Dasher { state, .. } => {
                matches!(state, DashState::Fading { .. } | DashState::Dashing { .. })
            }
            _ => false,
        }
    }

    /// Invisible entities neither deal contact damage nor get targeted.
    pub fn is_untargetable(&self) -> bool {
        matches!(
            self,
            Behavior::Dasher {
                state: DashState::Fading { .. } | DashState::Dashing { .. },
                ..
            }
        )
    }
}

impl Default for Behavior {
    fn default() -> Self {
        Behavior::Chaser
    }
}

// ============================================================================
// BOSS COMPONENTS
// ============================================================================

/// Runtime state for a boss's HP%-gated phase machine. Phase definitions
/// live in the content tables; this holds only the mutable side.
#[derive(Component, Debug, Clone)]
pub struct BossPhaseState {
    /// Index into the boss definition's phase list. Never decreases over
    /// the lifetime of one boss instance.
    pub phase: usize,
    /// False until the first update has run phase 0's entry hook.
    pub initialized: bool,
    /// One countdown per ability of the current phase.
    pub cooldowns: Vec<f32>,
    pub speed_mult: f32,
    pub damage_mult: f32,
    /// Remaining time of a charge ability, if one is running.
    pub charge_timer: f32,
    pub charge_mult: f32,
}

impl Default for BossPhaseState {
    fn default() -> Self {
        Self {
            phase: 0,
            initialized: false,
            cooldowns: Vec::new(),
            speed_mult: 1.0,
            damage_mult: 1.0,
            charge_timer: 0.0,
            charge_mult: 1.0,
        }
    }
}

impl BossPhaseState {
    pub fn reset(&mut self) {
        self.phase = 0;
        self.initialized = false;
        self.cooldowns.clear();
        self.speed_mult = 1.0;
        self.damage_mult = 1.0;
        self.charge_timer = 0.0;
        self.charge_mult = 1.0;
    }

    /// Effective movement multiplier including a running charge.
    pub fn movement_mult(&self) -> f32 {
        if self.charge_timer > 0.0 {
            self.speed_mult * self.charge_mult
        } else {
            self.speed_mult
        }
    }
}

// ============================================================================
// EFFECT COMPONENTS (projectiles, sweeps, hazards)
// ============================================================================

/// Who an effect belongs to, deciding what it can hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Owner {
    Player,
    Enemy,
}

impl Default for Owner {
    fn default() -> Self {
        Owner::Player
    }
}

/// Straight-flying projectile. Pooled generically; geometry and payload are
/// per-instance data, not per-type.
#[derive(Component, Debug, Clone, Default)]
pub struct Projectile {
    pub owner: Owner,
    pub damage: f32,
    pub crit_chance: f32,
    pub crit_mult: f32,
    pub lifetime: f32,
    /// Extra targets this projectile may pass through after the first hit.
    pub pierce: u32,
    pub slow: Option<SlowEffect>,
    /// Targets already struck, so piercing never hits twice.
    pub hit: Vec<Entity>,
}

impl Projectile {
    pub fn reset(&mut self) {
        self.owner = Owner::Player;
        self.damage = 0.0;
        self.crit_chance = 0.0;
        self.crit_mult = 1.0;
        self.lifetime = 0.0;
        self.pierce = 0;
        self.slow = None;
        self.hit.clear();
    }
}

/// Melee arc sweep. The swept angle advances along an easing curve over the
/// swing's duration; `hit` enforces at most one damage application per
/// target per swing instance.
#[derive(Component, Debug, Clone, Default)]
pub struct MeleeSwing {
    pub owner: Owner,
    pub start_angle: f32,
    /// Total signed sweep; negative sweeps clockwise.
    pub total_sweep: f32,
    pub duration: f32,
    pub elapsed: f32,
    pub reach: f32,
    pub damage: f32,
    pub crit_chance: f32,
    pub crit_mult: f32,
    pub hit: Vec<Entity>,
}

impl MeleeSwing {
    pub fn reset(&mut self) {
        self.owner = Owner::Player;
        self.start_angle = 0.0;
        self.total_sweep = 0.0;
        self.duration = 0.0;
        self.elapsed = 0.0;
        self.reach = 0.0;
        self.damage = 0.0;
        self.crit_chance = 0.0;
        self.crit_mult = 1.0;
        self.hit.clear();
    }
}

/// Stationary area effect dealing periodic damage and optional slows.
#[derive(Component, Debug, Clone, Default)]
pub struct HazardZone {
    pub owner: Owner,
    pub damage_per_tick: f32,
    pub tick_interval: f32,
    pub tick_timer: f32,
    pub lifetime: f32,
    pub slow: Option<SlowEffect>,
}

impl HazardZone {
    pub fn reset(&mut self) {
        self.owner = Owner::Player;
        self.damage_per_tick = 0.0;
        self.tick_interval = 0.0;
        self.tick_timer = 0.0;
        self.lifetime = 0.0;
        self.slow = None;
    }
}

/// Experience pickup dropped by dying enemies.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Gem {
    pub xp: f32,
}

/// Static or temporary circular collider enemies are pushed out of.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Obstacle {
    /// Temporary obstacles expire; `None` means permanent.
    pub lifetime: Option<f32>,
}

// ============================================================================
// PLAYER RESOURCE
// ============================================================================

/// The player avatar. A resource rather than an entity: there is exactly
/// one, it is driven by the recorded input stream, and half the systems
/// need cheap access to it.
#[derive(Resource, Debug, Clone)]
pub struct PlayerState {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub hp: f32,
    pub max_hp: f32,
    pub move_speed: f32,
    /// Raw input for the current tick, normalized before integration.
    pub input_x: f32,
    pub input_y: f32,
    /// Invulnerability window after taking a hit.
    pub hurt_timer: f32,
    pub pickup_radius: f32,
    pub xp: f32,
}

impl PlayerState {
    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    pub fn hp_fraction(&self) -> f32 {
        if self.max_hp <= 0.0 {
            0.0
        } else {
            (self.hp / self.max_hp).clamp(0.0, 1.0)
        }
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Full component set for an enemy entity. Spawning through the pool
/// re-inserts this bundle over the recycled entity, so every field is
/// re-initialized regardless of what the previous occupant left behind.
#[derive(Bundle, Default)]
pub struct EnemyBundle {
    pub kind: EnemyKind,
    pub position: Position,
    pub velocity: Velocity,
    pub radius: Radius,
    pub health: Health,
    pub stats: EnemyStats,
    pub flags: EnemyFlags,
    pub behavior: Behavior,
    pub slow: Slow,
    pub active: Active,
}

impl Default for EnemyKind {
    fn default() -> Self {
        Self(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_damage_and_heal() {
        let mut hp = Health::new(100.0);
        hp.damage(30.0);
        assert_eq!(hp.current, 70.0);
        hp.heal(50.0);
        assert_eq!(hp.current, 100.0);
        hp.damage(500.0);
        assert_eq!(hp.current, 0.0);
        assert!(!hp.is_alive());
        assert_eq!(Health::new(0.0).fraction(), 0.0);
    }

    #[test]
    fn test_slow_keeps_strongest_factor() {
        let mut slow = Slow::default();
        slow.apply(SlowEffect { factor: 0.5, duration: 2.0 });
        slow.apply(SlowEffect { factor: 0.2, duration: 4.0 });
        assert_eq!(slow.factor, 0.5);
        assert_eq!(slow.remaining, 4.0);
        // Once expired, a weaker slow takes over cleanly
        slow.remaining = 0.0;
        slow.apply(SlowEffect { factor: 0.1, duration: 1.0 });
        assert_eq!(slow.factor, 0.1);
    }

    #[test]
    fn test_behavior_damage_gates() {
        let flicker = Behavior::Flicker {
            interval: 1.0,
            timer: 0.5,
            invulnerable: true,
        };
        assert!(flicker.rejects_damage());
        assert!(!flicker.is_untargetable());

        let dasher = Behavior::Dasher {
            cooldown: 3.0,
            delay: 0.25,
            dash_speed: 20.0,
            max_duration: 1.0,
            state: DashState::Dashing {
                timer: 0.5,
                target_x: 0.0,
                target_y: 0.0,
            },
        };
        assert!(dasher.rejects_damage());
        assert!(dasher.is_untargetable());

        assert!(!Behavior::Chaser.rejects_damage());
    }

    #[test]
    fn test_boss_state_reset() {
        let mut state = BossPhaseState {
            phase: 3,
            initialized: true,
            cooldowns: vec![1.0, 2.0],
            speed_mult: 1.5,
            damage_mult: 2.0,
            charge_timer: 0.4,
            charge_mult: 3.0,
        };
        state.reset();
        assert_eq!(state.phase, 0);
        assert!(!state.initialized);
        assert!(state.cooldowns.is_empty());
        assert_eq!(state.movement_mult(), 1.0);
    }
}
