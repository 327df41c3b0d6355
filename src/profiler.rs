//! Lightweight phase profiling for stress tests.
//!
//! Measures wall-clock cost per named tick phase and reports it against the
//! 60 Hz frame budget. This is test tooling, not simulation state: nothing
//! here feeds back into gameplay, so timing jitter cannot break replay
//! determinism.
//!
//! Enable the `profile` feature (or use directly in stress tests):
//! ```bash
//! cargo test --release --features profile
//! ```

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Frame budget at the target tick rate.
pub const TICK_BUDGET: Duration = Duration::from_micros(16_667);

/// Accumulated timing for one named phase.
#[derive(Default, Clone)]
pub struct PhaseStats {
    pub total: Duration,
    pub calls: u64,
    pub max: Duration,
}

impl PhaseStats {
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

/// Collects per-phase timings across many ticks.
#[derive(Default)]
pub struct Profiler {
    phases: HashMap<&'static str, PhaseStats>,
    ticks: u64,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time a phase through a closure.
    pub fn time<F, R>(&mut self, phase: &'static str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        self.record(phase, start.elapsed());
        result
    }

    /// Record an externally measured duration.
    pub fn record(&mut self, phase: &'static str, elapsed: Duration) {
        let stats = self.phases.entry(phase).or_default();
        stats.total += elapsed;
        stats.calls += 1;
        stats.max = stats.max.max(elapsed);
    }

    /// Mark a completed tick.
    pub fn end_tick(&mut self) {
        self.ticks += 1;
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseStats> {
        self.phases.get(name)
    }

    /// Average cost of one full tick across all phases.
    pub fn avg_tick(&self) -> Duration {
        if self.ticks == 0 {
            return Duration::ZERO;
        }
        let total: Duration = self.phases.values().map(|s| s.total).sum();
        total / self.ticks as u32
    }

    /// True while the average tick fits the 60 Hz budget.
    pub fn within_budget(&self) -> bool {
        self.avg_tick() <= TICK_BUDGET
    }

    /// Print a per-phase summary, most expensive first.
    pub fn print_summary(&self, entity_count: usize) {
        let mut phases: Vec<_> = self.phases.iter().collect();
        phases.sort_by(|a, b| b.1.total.cmp(&a.1.total));
        let total: Duration = phases.iter().map(|(_, s)| s.total).sum();

        println!(
            "\n=== Tick profile: {} entities, {} ticks ===",
            entity_count, self.ticks
        );
        println!(
            "{:<22} {:>12} {:>12} {:>12} {:>7}",
            "Phase", "Total", "Avg/tick", "Max", "% Time"
        );
        for (name, stats) in &phases {
            let avg_per_tick = if self.ticks > 0 {
                stats.total / self.ticks as u32
            } else {
                Duration::ZERO
            };
            let pct = if total.as_nanos() > 0 {
                stats.total.as_nanos() as f64 / total.as_nanos() as f64 * 100.0
            } else {
                0.0
            };
            println!(
                "{:<22} {:>12.2?} {:>12.2?} {:>12.2?} {:>6.1}%",
                name, stats.total, avg_per_tick, stats.max, pct
            );
        }
        let avg = self.avg_tick();
        println!(
            "avg tick {:.2?} of {:.2?} budget ({})",
            avg,
            TICK_BUDGET,
            if self.within_budget() { "ok" } else { "OVER" }
        );
    }

    pub fn reset(&mut self) {
        self.phases.clear();
        self.ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_records_phase_timing() {
        let mut profiler = Profiler::new();
        profiler.time("separation", || sleep(Duration::from_millis(5)));
        profiler.end_tick();

        let stats = profiler.phase("separation").unwrap();
        assert_eq!(stats.calls, 1);
        assert!(stats.total >= Duration::from_millis(5));
        assert_eq!(profiler.ticks(), 1);
    }

    #[test]
    fn test_avg_tick_spans_phases() {
        let mut profiler = Profiler::new();
        for _ in 0..3 {
            profiler.time("behavior", || sleep(Duration::from_millis(1)));
            profiler.time("combat", || sleep(Duration::from_millis(2)));
            profiler.end_tick();
        }
        assert_eq!(profiler.ticks(), 3);
        assert!(profiler.avg_tick() >= Duration::from_millis(3));
        let combat = profiler.phase("combat").unwrap();
        let behavior = profiler.phase("behavior").unwrap();
        assert!(combat.total > behavior.total);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut profiler = Profiler::new();
        profiler.time("x", || ());
        profiler.end_tick();
        profiler.reset();
        assert_eq!(profiler.ticks(), 0);
        assert!(profiler.phase("x").is_none());
    }
}
