//! Periodic swarm collapse: dense same-archetype clusters merge into one
//! super enemy.
//!
//! Runs on its own cadence, not every tick. Only plain enemies are
//! candidates: no bosses, no elites, and never an existing super enemy, so
//! a merged entity can never be merged again. The merge preserves total
//! threat (HP sums) but deliberately skips the members' kill rewards; the
//! super enemy carries a reward multiplier instead.
//!
//! Policy: the first validated cluster per archetype per scan wins.
//! Candidates are collected in query order and archetypes visited in
//! sorted-id order, so the choice is deterministic and replay-stable.

use bevy_ecs::prelude::*;

use crate::components::*;
use crate::config::SimConfig;
use crate::systems::lifecycle::{MergeQueue, MergeRequest};
use crate::systems::movement::DeltaTime;

/// Accumulated time since the last scan.
#[derive(Resource, Debug, Default)]
pub struct ClusterClock(pub f32);

#[derive(Clone, Copy)]
struct Candidate {
    entity: Entity,
    x: f32,
    y: f32,
    hp: f32,
}

/// System that scans for mergeable clusters on a fixed interval.
pub fn cluster_system(
    dt: Res<DeltaTime>,
    config: Res<SimConfig>,
    mut clock: ResMut<ClusterClock>,
    mut merges: ResMut<MergeQueue>,
    query: Query<(Entity, &Position, &Health, &EnemyKind, &EnemyFlags, &Active)>,
) {
    clock.0 += dt.0;
    if clock.0 < config.cluster_interval {
        return;
    }
    clock.0 -= config.cluster_interval;

    let k = config.cluster_size;
    let radius = config.cluster_radius;
    if k < 2 {
        return;
    }

    // Group candidates by archetype, preserving query order within a group.
    let mut kinds: Vec<u32> = Vec::new();
    let mut groups: std::collections::HashMap<u32, Vec<Candidate>> =
        std::collections::HashMap::new();
    for (entity, pos, health, kind, flags, active) in query.iter() {
        if !active.0 || !health.is_alive() {
            continue;
        }
        if flags.boss || flags.elite || flags.super_enemy {
            continue;
        }
        let group = groups.entry(kind.0).or_insert_with(|| {
            kinds.push(kind.0);
            Vec::new()
        });
        group.push(Candidate {
            entity,
            x: pos.x,
            y: pos.y,
            hp: health.current,
        });
    }
    // Sorted-id visit order keeps the scan independent of map layout.
    kinds.sort_unstable();

    for kind in kinds {
        let candidates = &groups[&kind];
        if candidates.len() < k {
            continue;
        }
        if let Some(request) = find_cluster(kind, candidates, k, radius) {
            merges.0.push(request);
        }
    }
}

/// Find the first validated group of exactly `k` members within `radius`
/// of a shared centroid.
fn find_cluster(kind: u32, candidates: &[Candidate], k: usize, radius: f32) -> Option<MergeRequest> {
    let radius_sq = radius * radius;
    let mut gathered: Vec<Candidate> = Vec::with_capacity(k);

    for center in candidates {
        gathered.clear();
        for other in candidates {
            let dx = other.x - center.x;
            let dy = other.y - center.y;
            if dx * dx + dy * dy <= radius_sq {
                gathered.push(*other);
                if gathered.len() == k {
                    break;
                }
            }
        }
        if gathered.len() < k {
            continue;
        }

        // Recompute the centroid from the gathered members, then make sure
        // every member is still inside the radius of that centroid.
        let inv = 1.0 / k as f32;
        let cx = gathered.iter().map(|c| c.x).sum::<f32>() * inv;
        let cy = gathered.iter().map(|c| c.y).sum::<f32>() * inv;
        let all_valid = gathered.iter().all(|c| {
            let dx = c.x - cx;
            let dy = c.y - cy;
            dx * dx + dy * dy <= radius_sq
        });
        if !all_valid {
            continue;
        }

        return Some(MergeRequest {
            kind,
            x: cx,
            y: cy,
            combined_hp: gathered.iter().map(|c| c.hp).sum(),
            members: gathered.iter().map(|c| c.entity).collect(),
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_world(interval: f32, k: usize, radius: f32) -> World {
        let mut world = World::new();
        world.insert_resource(DeltaTime(0.1));
        world.insert_resource(SimConfig {
            cluster_interval: interval,
            cluster_size: k,
            cluster_radius: radius,
            ..Default::default()
        });
        world.insert_resource(ClusterClock::default());
        world.insert_resource(MergeQueue::default());
        world
    }

    fn plain_enemy(world: &mut World, kind: u32, x: f32, y: f32, hp: f32) -> Entity {
        world
            .spawn((
                EnemyKind(kind),
                Position::new(x, y),
                Health {
                    current: hp,
                    max: hp,
                },
                EnemyFlags::default(),
                Active(true),
            ))
            .id()
    }

    fn run(world: &mut World, ticks: usize) {
        let mut schedule = Schedule::default();
        schedule.add_systems(cluster_system);
        for _ in 0..ticks {
            schedule.run(world);
        }
    }

    #[test]
    fn test_dense_cluster_produces_one_merge() {
        let mut world = test_world(0.5, 4, 5.0);
        for i in 0..4 {
            plain_enemy(&mut world, 0, i as f32 * 0.5, 0.0, 10.0);
        }

        // Interval not yet elapsed: no scan
        run(&mut world, 4);
        assert!(world.resource::<MergeQueue>().0.is_empty());

        run(&mut world, 1);
        let merges = world.resource::<MergeQueue>();
        assert_eq!(merges.0.len(), 1);
        let merge = &merges.0[0];
        assert_eq!(merge.kind, 0);
        assert_eq!(merge.members.len(), 4);
        assert_eq!(merge.combined_hp, 40.0);
        assert!((merge.x - 0.75).abs() < 1e-4);
    }

    #[test]
    fn test_sparse_enemies_never_merge() {
        let mut world = test_world(0.1, 3, 2.0);
        plain_enemy(&mut world, 0, 0.0, 0.0, 10.0);
        plain_enemy(&mut world, 0, 20.0, 0.0, 10.0);
        plain_enemy(&mut world, 0, 40.0, 0.0, 10.0);

        run(&mut world, 5);
        assert!(world.resource::<MergeQueue>().0.is_empty());
    }

    #[test]
    fn test_mixed_kinds_do_not_merge_together() {
        let mut world = test_world(0.1, 4, 5.0);
        plain_enemy(&mut world, 0, 0.0, 0.0, 10.0);
        plain_enemy(&mut world, 0, 0.5, 0.0, 10.0);
        plain_enemy(&mut world, 1, 1.0, 0.0, 10.0);
        plain_enemy(&mut world, 1, 1.5, 0.0, 10.0);

        run(&mut world, 2);
        assert!(
            world.resource::<MergeQueue>().0.is_empty(),
            "two of each kind, never four of one"
        );
    }

    #[test]
    fn test_special_enemies_are_excluded() {
        let mut world = test_world(0.1, 3, 5.0);
        plain_enemy(&mut world, 0, 0.0, 0.0, 10.0);
        plain_enemy(&mut world, 0, 0.5, 0.0, 10.0);
        let elite = plain_enemy(&mut world, 0, 1.0, 0.0, 10.0);
        world.get_mut::<EnemyFlags>(elite).unwrap().elite = true;

        run(&mut world, 2);
        assert!(world.resource::<MergeQueue>().0.is_empty());
    }

    #[test]
    fn test_super_enemy_never_reclusters() {
        let mut world = test_world(0.1, 2, 5.0);
        let a = plain_enemy(&mut world, 0, 0.0, 0.0, 10.0);
        let b = plain_enemy(&mut world, 0, 0.5, 0.0, 10.0);
        world.get_mut::<EnemyFlags>(a).unwrap().super_enemy = true;
        world.get_mut::<EnemyFlags>(b).unwrap().super_enemy = true;

        run(&mut world, 2);
        assert!(world.resource::<MergeQueue>().0.is_empty());
    }

    #[test]
    fn test_dead_candidates_are_filtered() {
        let mut world = test_world(0.1, 3, 5.0);
        plain_enemy(&mut world, 0, 0.0, 0.0, 10.0);
        plain_enemy(&mut world, 0, 0.5, 0.0, 10.0);
        let dead = plain_enemy(&mut world, 0, 1.0, 0.0, 10.0);
        world.get_mut::<Health>(dead).unwrap().current = 0.0;

        run(&mut world, 2);
        assert!(world.resource::<MergeQueue>().0.is_empty());
    }

    #[test]
    fn test_first_validated_cluster_wins() {
        let mut world = test_world(0.1, 2, 1.0);
        // Two separate pairs; the one containing the first-spawned candidate
        // is chosen.
        let first = plain_enemy(&mut world, 0, 0.0, 0.0, 10.0);
        plain_enemy(&mut world, 0, 0.4, 0.0, 10.0);
        plain_enemy(&mut world, 0, 30.0, 0.0, 10.0);
        plain_enemy(&mut world, 0, 30.4, 0.0, 10.0);

        run(&mut world, 1);
        let merges = world.resource::<MergeQueue>();
        assert_eq!(merges.0.len(), 1);
        assert!(merges.0[0].members.contains(&first));
    }
}
