//! Horde Sim - deterministic swarm-combat simulation core.
//!
//! A fixed-timestep ECS simulation for survivor-style swarm combat:
//! thousands of pooled enemies, projectiles, melee sweeps, hazard zones,
//! and pickups per tick, with a rebuilt-per-tick quadtree for proximity
//! queries and a single seeded RNG stream so recorded sessions replay
//! bit-for-bit. Uses `bevy_ecs` for the entity-component-system
//! architecture.

pub mod api;
pub mod collision;
pub mod components;
pub mod config;
pub mod pool;
pub mod profiler;
pub mod rng;
pub mod spatial;
pub mod systems;
pub mod world;

pub use api::SimWorld;
pub use components::*;
pub use config::{ArchetypeDef, BehaviorSpec, BossAbility, BossDef, ContentTables, SimConfig};
pub use pool::EntityPool;
pub use rng::SimRng;
pub use spatial::{Rect, SpatialEntry, SpatialIndex};
pub use systems::*;
pub use world::Snapshot;
