//! Basic demonstration of the swarm simulation.
//!
//! Run with: cargo run --example basic_demo

use horde_sim::{Owner, ProjectileSpec, SimWorld};

fn main() {
    env_logger::init();
    println!("=== Horde Sim - Swarm Combat Demo ===\n");

    let mut sim = SimWorld::new_demo_world(0xC0FFEE);

    println!("Initial state:");
    print_snapshot(&mut sim);

    // Run 10 seconds of simulated time at 60 Hz, walking east and firing
    // a piercing shot every half second.
    println!("\nRunning 600 ticks (10 seconds at 60 Hz)...\n");
    for tick in 0..600u32 {
        sim.set_player_input(1.0, 0.2);
        if tick % 30 == 0 {
            let player = sim.player();
            sim.spawn_projectile(ProjectileSpec {
                owner: Owner::Player,
                x: player.x,
                y: player.y,
                dir_x: 1.0,
                dir_y: 0.0,
                speed: 20.0,
                damage: 10.0,
                pierce: 2,
                crit_chance: 0.15,
                crit_mult: 2.0,
                lifetime: 2.0,
                ..Default::default()
            });
        }
        sim.tick_once();

        if (tick + 1) % 120 == 0 {
            println!(
                "--- Tick {} (t={:.1}s) ---",
                sim.current_tick(),
                sim.current_time()
            );
            print_snapshot(&mut sim);
        }
    }

    println!("\n=== Final State (JSON) ===\n");
    println!("{}", sim.snapshot().to_json_pretty().unwrap());
}

fn print_snapshot(sim: &mut SimWorld) {
    let snapshot = sim.snapshot();
    println!(
        "  player: pos=({:.1}, {:.1}) hp={:.0}/{:.0} xp={:.0}",
        snapshot.player.x,
        snapshot.player.y,
        snapshot.player.hp,
        snapshot.player.hp_max,
        snapshot.player.xp
    );
    println!(
        "  {} enemies, {} projectiles, {} gems, {} hazards",
        snapshot.enemies.len(),
        snapshot.projectiles.len(),
        snapshot.gems.len(),
        snapshot.hazards.len()
    );
    for enemy in snapshot.enemies.iter().filter(|e| e.boss || e.super_enemy) {
        println!(
            "    {} kind={} pos=({:.1}, {:.1}) hp={:.0}/{:.0}",
            if enemy.boss { "boss" } else { "super" },
            enemy.kind,
            enemy.x,
            enemy.y,
            enemy.hp,
            enemy.hp_max
        );
    }
}
