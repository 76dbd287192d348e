//! ECS scenario benchmarks using Criterion.
//!
//! These benchmarks measure realistic workloads:
//! - Particle system (high entity count, simple components, command-driven respawn)
//! - Teams (shared components and filters over fragmented ranges)

use std::time::{Duration, Instant};

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use strata_bench::{
    components::{Lifetime, Position},
    memory::measure_memory,
    scenarios::{ParticleConfig, ParticleScenario, Scenario, TeamConfig, TeamScenario},
};

// =============================================================================
// Particle System Benchmarks
// =============================================================================

fn bench_particles(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenario/particles");

    for count in [10_000, 50_000, 100_000] {
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("frame", count), &count, |b, &n| {
            let mut scenario = ParticleScenario::with_config(ParticleConfig {
                particle_count: n,
                ..Default::default()
            });
            scenario.setup();

            b.iter(|| {
                scenario.update();
            });
        });
    }

    group.finish();
}

// =============================================================================
// Team Benchmarks
// =============================================================================

fn bench_teams(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenario/teams");

    for block_size in [1, 16, 256] {
        let config = TeamConfig {
            block_size,
            ..Default::default()
        };
        group.throughput(Throughput::Elements(config.entity_count as u64));

        group.bench_with_input(
            BenchmarkId::new("frame", block_size),
            &block_size,
            |b, &block_size| {
                let mut scenario = TeamScenario::with_config(TeamConfig {
                    block_size,
                    ..Default::default()
                });
                scenario.setup();

                b.iter(|| {
                    scenario.update();
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// Frame Time Benchmarks (longer running, statistical)
// =============================================================================

fn bench_frame_times(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_times");
    group.sample_size(20); // Fewer samples since each runs many frames

    group.bench_function("particles_1000_frames", |b| {
        b.iter_custom(|iters| {
            let mut total = Duration::ZERO;

            for _ in 0..iters {
                let mut scenario = ParticleScenario::with_config(ParticleConfig {
                    particle_count: 50_000,
                    ..Default::default()
                });
                scenario.setup();

                let start = Instant::now();
                for _ in 0..1000 {
                    scenario.update();
                }
                total += start.elapsed();
            }

            total
        });
    });

    group.finish();
}

// =============================================================================
// Memory
// =============================================================================

fn report_particle_memory(_c: &mut Criterion) {
    let count = 50_000;
    let (_, stats) = measure_memory(|counter| {
        let mut scenario = ParticleScenario::with_config(ParticleConfig {
            particle_count: count,
            ..Default::default()
        });
        scenario.setup();
        scenario.update();
        let runtime = scenario.runtime_mut();
        runtime.set_memory_resource::<Position>(counter.clone());
        runtime.set_memory_resource::<Lifetime>(counter.clone());
        for _ in 0..100 {
            scenario.update();
        }
    });
    println!(
        "particles/{count}: {stats} ({:.1} bytes per entity)",
        stats.bytes_per_entity(count)
    );
}

criterion_group!(
    benches,
    bench_particles,
    bench_teams,
    bench_frame_times,
    report_particle_memory,
);

criterion_main!(benches);
