//! Static configuration and content tables.
//!
//! Everything here is read-only data supplied at startup: simulation tuning
//! knobs, per-archetype base stats and behavior parameters, and boss phase
//! definitions. The core never edits or persists these tables. All of it is
//! serde-deserializable so a host can load the roster from JSON; the
//! built-in roster exists for tests and demos.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::components::{Behavior, ChargeState, DashState, SlowEffect};
use crate::spatial::DEFAULT_NODE_CAPACITY;

// ============================================================================
// SIMULATION TUNING
// ============================================================================

/// Player tuning values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub move_speed: f32,
    pub radius: f32,
    pub max_hp: f32,
    /// Invulnerability window after taking a hit, in seconds.
    pub hurt_cooldown: f32,
    /// Distance at which gems start homing in.
    pub pickup_radius: f32,
    /// Speed of a homing gem.
    pub magnet_speed: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            move_speed: 9.0,
            radius: 0.6,
            max_hp: 100.0,
            hurt_cooldown: 0.6,
            pickup_radius: 4.0,
            magnet_speed: 18.0,
        }
    }
}

/// Global simulation configuration, passed to the orchestrator at
/// construction. There is deliberately no process-wide mutable state.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Fixed timestep in seconds (1/60 for 60 Hz).
    pub fixed_timestep: f32,
    /// Play area covers `[-world_half_extent, world_half_extent]` per axis.
    /// The spatial index is sized from this, so it always covers the play
    /// area by construction.
    pub world_half_extent: f32,
    /// Quadtree node capacity before subdivision.
    pub spatial_capacity: usize,
    /// Repulsion strength for enemy-enemy crowding.
    pub separation_strength: f32,
    /// Push-out strength for enemy-obstacle resolution.
    pub obstacle_push_strength: f32,
    /// Seconds between cluster-merge scans.
    pub cluster_interval: f32,
    /// Members per merge (K).
    pub cluster_size: usize,
    /// Maximum centroid distance for cluster membership (R).
    pub cluster_radius: f32,
    pub elite_hp_mult: f32,
    pub elite_damage_mult: f32,
    pub elite_xp_mult: f32,
    pub player: PlayerConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 60.0,
            world_half_extent: 120.0,
            spatial_capacity: DEFAULT_NODE_CAPACITY,
            separation_strength: 14.0,
            obstacle_push_strength: 20.0,
            cluster_interval: 0.5,
            cluster_size: 10,
            cluster_radius: 6.0,
            elite_hp_mult: 4.0,
            elite_damage_mult: 2.0,
            elite_xp_mult: 5.0,
            player: PlayerConfig::default(),
        }
    }
}

// ============================================================================
// ARCHETYPE DEFINITIONS
// ============================================================================

/// Declarative behavior parameters for one archetype. Resolved into a
/// runtime [`Behavior`] state machine once at spawn time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BehaviorSpec {
    Chaser,
    Flicker {
        interval: f32,
    },
    Kiter {
        range: f32,
        fire_interval: f32,
        projectile_speed: f32,
        projectile_damage: f32,
    },
    Charger {
        cooldown: f32,
        telegraph: f32,
        duration: f32,
        speed_mult: f32,
    },
    Dasher {
        cooldown: f32,
        delay: f32,
        dash_speed: f32,
        max_duration: f32,
    },
    Healer {
        enrage_threshold: f32,
        enrage_speed_mult: f32,
        enrage_damage_mult: f32,
        heal_fraction: f32,
        heal_interval: f32,
    },
    Summoner {
        interval: f32,
        count: u32,
        child: u32,
        scatter_radius: f32,
    },
}

impl BehaviorSpec {
    /// Build the runtime state machine with all timers at their initial
    /// values.
    pub fn instantiate(&self) -> Behavior {
        match *self {
            BehaviorSpec::Chaser => Behavior::Chaser,
            BehaviorSpec::Flicker { interval } => Behavior::Flicker {
                interval,
                timer: interval,
                invulnerable: false,
            },
            BehaviorSpec::Kiter {
                range,
                fire_interval,
                projectile_speed,
                projectile_damage,
            } => Behavior::Kiter {
                range,
                fire_interval,
                fire_timer: fire_interval,
                projectile_speed,
                projectile_damage,
            },
            BehaviorSpec::Charger {
                cooldown,
                telegraph,
                duration,
                speed_mult,
            } => Behavior::Charger {
                cooldown,
                telegraph,
                duration,
                speed_mult,
                state: ChargeState::Cooldown(cooldown),
            },
            BehaviorSpec::Dasher {
                cooldown,
                delay,
                dash_speed,
                max_duration,
            } => Behavior::Dasher {
                cooldown,
                delay,
                dash_speed,
                max_duration,
                state: DashState::Cooldown(cooldown),
            },
            BehaviorSpec::Healer {
                enrage_threshold,
                enrage_speed_mult,
                enrage_damage_mult,
                heal_fraction,
                heal_interval,
            } => Behavior::Healer {
                enrage_threshold,
                enrage_speed_mult,
                enrage_damage_mult,
                heal_fraction,
                heal_interval,
                heal_timer: heal_interval,
                enraged: false,
            },
            BehaviorSpec::Summoner {
                interval,
                count,
                child,
                scatter_radius,
            } => Behavior::Summoner {
                interval,
                timer: interval,
                count,
                child,
                scatter_radius,
            },
        }
    }
}

/// One boss ability: what it does plus how often it fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossAbilityDef {
    pub cooldown: f32,
    pub ability: BossAbility,
}

/// Data-driven boss ability payloads. Execution lives in the boss system;
/// different bosses reuse the same controller with different ability sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BossAbility {
    /// Ring of projectiles around the boss; start angle is rolled so rings
    /// do not align between casts.
    RadialBurst {
        count: u32,
        speed: f32,
        damage: f32,
    },
    /// Volley aimed at the player with random spread.
    AimedVolley {
        count: u32,
        spread: f32,
        speed: f32,
        damage: f32,
    },
    /// Spawns minions scattered around the boss.
    SummonMinions {
        kind: u32,
        count: u32,
        scatter_radius: f32,
    },
    /// Ring of hazard zones at a fixed distance.
    HazardRing {
        count: u32,
        distance: f32,
        radius: f32,
        damage_per_tick: f32,
        tick_interval: f32,
        lifetime: f32,
        slow: Option<SlowEffect>,
    },
    /// Temporary movement burst toward the player.
    Charge {
        speed_mult: f32,
        duration: f32,
    },
}

/// One boss phase, gated by a descending HP% threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossPhaseDef {
    /// Phase is entered once HP% falls to this value or below. The first
    /// phase conventionally uses 1.0.
    pub hp_threshold: f32,
    pub speed_mult: f32,
    pub damage_mult: f32,
    /// Fired exactly once when the phase is entered.
    pub on_enter: Option<BossAbility>,
    pub abilities: Vec<BossAbilityDef>,
}

/// Boss phase list. Thresholds must be strictly descending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossDef {
    pub phases: Vec<BossPhaseDef>,
}

/// Base definition for one enemy archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeDef {
    pub name: String,
    pub max_hp: f32,
    pub move_speed: f32,
    pub contact_damage: f32,
    pub xp_value: f32,
    pub radius: f32,
    pub behavior: BehaviorSpec,
    #[serde(default)]
    pub boss: Option<BossDef>,
}

// ============================================================================
// CONTENT TABLES
// ============================================================================

/// Built-in roster ids.
pub const KIND_SLIME: u32 = 0;
pub const KIND_BAT: u32 = 1;
pub const KIND_GHOST: u32 = 2;
pub const KIND_SKELETON_ARCHER: u32 = 3;
pub const KIND_BOAR: u32 = 4;
pub const KIND_SHADE: u32 = 5;
pub const KIND_TREANT: u32 = 6;
pub const KIND_ACOLYTE: u32 = 7;
pub const KIND_WARDEN: u32 = 8;

/// The full read-only content roster, indexed by archetype id.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct ContentTables {
    pub archetypes: Vec<ArchetypeDef>,
}

impl ContentTables {
    /// Look up an archetype; `None` for unknown ids.
    pub fn archetype(&self, kind: u32) -> Option<&ArchetypeDef> {
        self.archetypes.get(kind as usize)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Built-in roster covering every behavior archetype plus one boss.
    pub fn default_roster() -> Self {
        let archetypes = vec![
            ArchetypeDef {
                name: "slime".into(),
                max_hp: 12.0,
                move_speed: 3.0,
                contact_damage: 6.0,
                xp_value: 1.0,
                radius: 0.5,
                behavior: BehaviorSpec::Chaser,
                boss: None,
            },
            ArchetypeDef {
                name: "bat".into(),
                max_hp: 6.0,
                move_speed: 6.5,
                contact_damage: 4.0,
                xp_value: 1.0,
                radius: 0.4,
                behavior: BehaviorSpec::Chaser,
                boss: None,
            },
            ArchetypeDef {
                name: "ghost".into(),
                max_hp: 18.0,
                move_speed: 3.8,
                contact_damage: 8.0,
                xp_value: 3.0,
                radius: 0.5,
                behavior: BehaviorSpec::Flicker { interval: 1.5 },
                boss: None,
            },
            ArchetypeDef {
                name: "skeleton_archer".into(),
                max_hp: 14.0,
                move_speed: 3.2,
                contact_damage: 5.0,
                xp_value: 3.0,
                radius: 0.5,
                behavior: BehaviorSpec::Kiter {
                    range: 12.0,
                    fire_interval: 2.2,
                    projectile_speed: 14.0,
                    projectile_damage: 7.0,
                },
                boss: None,
            },
            ArchetypeDef {
                name: "boar".into(),
                max_hp: 30.0,
                move_speed: 2.8,
                contact_damage: 12.0,
                xp_value: 4.0,
                radius: 0.7,
                behavior: BehaviorSpec::Charger {
                    cooldown: 3.5,
                    telegraph: 0.8,
                    duration: 1.1,
                    speed_mult: 4.0,
                },
                boss: None,
            },
            ArchetypeDef {
                name: "shade".into(),
                max_hp: 16.0,
                move_speed: 3.5,
                contact_damage: 9.0,
                xp_value: 4.0,
                radius: 0.5,
                behavior: BehaviorSpec::Dasher {
                    cooldown: 4.0,
                    delay: 0.35,
                    dash_speed: 22.0,
                    max_duration: 0.9,
                },
                boss: None,
            },
            ArchetypeDef {
                name: "treant".into(),
                max_hp: 60.0,
                move_speed: 1.6,
                contact_damage: 10.0,
                xp_value: 8.0,
                radius: 0.9,
                behavior: BehaviorSpec::Summoner {
                    interval: 5.0,
                    count: 3,
                    child: KIND_SLIME,
                    scatter_radius: 2.5,
                },
                boss: None,
            },
            ArchetypeDef {
                name: "acolyte".into(),
                max_hp: 26.0,
                move_speed: 3.0,
                contact_damage: 7.0,
                xp_value: 5.0,
                radius: 0.5,
                behavior: BehaviorSpec::Healer {
                    enrage_threshold: 0.4,
                    enrage_speed_mult: 1.6,
                    enrage_damage_mult: 1.5,
                    heal_fraction: 0.08,
                    heal_interval: 3.0,
                },
                boss: None,
            },
            ArchetypeDef {
                name: "warden".into(),
                max_hp: 1800.0,
                move_speed: 2.2,
                contact_damage: 20.0,
                xp_value: 200.0,
                radius: 1.6,
                behavior: BehaviorSpec::Chaser,
                boss: Some(BossDef {
                    phases: vec![
                        BossPhaseDef {
                            hp_threshold: 1.0,
                            speed_mult: 1.0,
                            damage_mult: 1.0,
                            on_enter: None,
                            abilities: vec![BossAbilityDef {
                                cooldown: 4.0,
                                ability: BossAbility::AimedVolley {
                                    count: 3,
                                    spread: 0.35,
                                    speed: 12.0,
                                    damage: 10.0,
                                },
                            }],
                        },
                        BossPhaseDef {
                            hp_threshold: 0.6,
                            speed_mult: 1.25,
                            damage_mult: 1.25,
                            on_enter: Some(BossAbility::SummonMinions {
                                kind: KIND_BAT,
                                count: 8,
                                scatter_radius: 4.0,
                            }),
                            abilities: vec![
                                BossAbilityDef {
                                    cooldown: 5.0,
                                    ability: BossAbility::RadialBurst {
                                        count: 12,
                                        speed: 10.0,
                                        damage: 9.0,
                                    },
                                },
                                BossAbilityDef {
                                    cooldown: 7.0,
                                    ability: BossAbility::Charge {
                                        speed_mult: 3.0,
                                        duration: 1.2,
                                    },
                                },
                            ],
                        },
                        BossPhaseDef {
                            hp_threshold: 0.25,
                            speed_mult: 1.5,
                            damage_mult: 1.6,
                            on_enter: Some(BossAbility::HazardRing {
                                count: 6,
                                distance: 6.0,
                                radius: 2.0,
                                damage_per_tick: 4.0,
                                tick_interval: 0.5,
                                lifetime: 8.0,
                                slow: Some(SlowEffect {
                                    factor: 0.4,
                                    duration: 1.0,
                                }),
                            }),
                            abilities: vec![
                                BossAbilityDef {
                                    cooldown: 3.0,
                                    ability: BossAbility::RadialBurst {
                                        count: 20,
                                        speed: 12.0,
                                        damage: 11.0,
                                    },
                                },
                                BossAbilityDef {
                                    cooldown: 6.0,
                                    ability: BossAbility::SummonMinions {
                                        kind: KIND_SLIME,
                                        count: 6,
                                        scatter_radius: 5.0,
                                    },
                                },
                            ],
                        },
                    ],
                }),
            },
        ];
        Self { archetypes }
    }
}
