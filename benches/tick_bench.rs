//! Tick throughput benchmarks at swarm densities.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use horde_sim::config::{KIND_BAT, KIND_GHOST, KIND_SKELETON_ARCHER, KIND_SLIME};
use horde_sim::SimWorld;

fn populated_sim(enemies: u32) -> SimWorld {
    let mut sim = SimWorld::new(42);
    let kinds = [KIND_SLIME, KIND_BAT, KIND_GHOST, KIND_SKELETON_ARCHER];
    for i in 0..enemies {
        let angle = i as f32 * 0.137;
        let dist = 15.0 + (i % 100) as f32;
        sim.spawn_enemy(
            kinds[(i % 4) as usize],
            angle.cos() * dist,
            angle.sin() * dist,
            false,
            1.0,
        );
    }
    // Settle pools and index
    sim.tick_once();
    sim
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for &count in &[500u32, 1000, 2000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut sim = populated_sim(count);
            sim.set_player_input(1.0, 0.0);
            b.iter(|| sim.tick_once());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
