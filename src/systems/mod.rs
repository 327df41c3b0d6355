//! ECS systems for the swarm simulation.
//!
//! The per-tick phase order is fixed and load-bearing: changing it changes
//! simulation outcomes, which breaks recorded replays. The orchestrator
//! chains every group; nothing below may assume any other ordering.
//!
//! **Phase order per tick:**
//! 1. `spatial_index_rebuild_system` - fresh quadtree from active enemies
//! 2. `player_movement_system` - input stream integration
//! 3. `behavior_system` - archetype state machines (may enqueue spawns)
//! 4. `boss_phase_system` - HP%-gated phases and abilities
//! 5. `enemy_movement_system` - velocity integration
//! 6. `separation_system` - enemy-enemy and enemy-obstacle resolution
//! 7. `projectile_system` - advance and hit-test projectiles
//! 8. `melee_system` - arc sweeps
//! 9. `hazard_system` - periodic area damage
//! 10. `contact_system` - player-enemy contact damage
//! 11. `damage_apply_system` - apply gathered damage and status
//! 12. `pickup_system` - gem magnetism and collection
//! 13. `cluster_system` - periodic swarm collapse (own cadence)
//! 14. `death_system` - collect death events for the orchestrator
//!
//! After the schedule runs, the orchestrator drains the spawn, merge,
//! death, and despawn queues; structural mutation never happens mid-tick.

pub mod behavior;
pub mod boss;
pub mod cluster;
pub mod combat;
pub mod lifecycle;
pub mod movement;
pub mod pickup;
pub mod separation;

pub use behavior::*;
pub use boss::*;
pub use cluster::*;
pub use combat::*;
pub use lifecycle::*;
pub use movement::*;
pub use pickup::*;
pub use separation::*;
