//! Particle system benchmark scenario.
//!
//! Simulates a high-volume particle system with:
//! - 100,000 particles in one contiguous id block
//! - Simple components: Position, Velocity, Lifetime, Color and the `Particle` tag
//! - Systems: movement, lifetime decay, fade, respawn of expired particles
//!
//! This scenario tests:
//! - High entity count iteration over a handful of long ranges
//! - Scope-free global reads (`DeltaTime`) mixed into per-entity systems
//! - Command throughput (expired particles are re-seeded through `Commands`)

use rand::{Rng, SeedableRng, rngs::StdRng};
use strata::ecs::{Commands, Entity, Runtime, RuntimeConfig, With};

use crate::components::{Color, DeltaTime, Expired, Lifetime, Particle, Position, Velocity};
use crate::scenarios::Scenario;

/// Configuration for the particle benchmark.
pub struct ParticleConfig {
    /// Total number of particles to maintain.
    pub particle_count: usize,
    /// Simulated delta time per frame.
    pub delta_time: f32,
    /// Random seed for reproducibility.
    pub seed: u64,
    /// The number of worker threads the runtime uses.
    pub worker_threads: usize,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            particle_count: 100_000,
            delta_time: 1.0 / 60.0, // 60 FPS
            seed: 12345,
            worker_threads: 4,
        }
    }
}

fn random_position(rng: &mut impl Rng) -> Position {
    Position {
        x: rng.gen_range(-100.0..100.0),
        y: rng.gen_range(-100.0..100.0),
        z: rng.gen_range(-100.0..100.0),
    }
}

fn random_velocity(rng: &mut impl Rng) -> Velocity {
    Velocity {
        x: rng.gen_range(-10.0..10.0),
        y: rng.gen_range(-10.0..10.0),
        z: rng.gen_range(-10.0..10.0),
    }
}

fn random_lifetime(rng: &mut impl Rng) -> Lifetime {
    Lifetime {
        remaining: rng.gen_range(1.0..5.0),
        total: 5.0,
    }
}

/// Generators run per entity, so each seeds its own generator from the entity id.
fn entity_rng(seed: u64, entity: Entity) -> StdRng {
    StdRng::seed_from_u64(seed ^ (entity.id() as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// System: Update particle positions based on velocity.
fn system_movement(pos: &mut Position, vel: &Velocity, dt: &DeltaTime) {
    pos.x += vel.x * dt.0;
    pos.y += vel.y * dt.0;
    pos.z += vel.z * dt.0;
}

/// System: Decay particle lifetimes.
fn system_lifetime_decay(lifetime: &mut Lifetime, dt: &DeltaTime) {
    lifetime.remaining -= dt.0;
}

/// System: Fade particles based on remaining lifetime.
fn system_fade(lifetime: &Lifetime, color: &mut Color) {
    color.a = (lifetime.remaining / lifetime.total).max(0.0);
}

/// System: Particles respawned last frame start fully opaque.
fn system_flash(_expired: With<Expired>, color: &mut Color) {
    color.a = 1.0;
}

/// Particle system benchmark scenario.
pub struct ParticleScenario {
    config: ParticleConfig,
    runtime: Runtime,
}

impl ParticleScenario {
    /// Create a new particle scenario with default config.
    pub fn new() -> Self {
        Self::with_config(ParticleConfig::default())
    }

    /// Create a new particle scenario with custom config.
    pub fn with_config(config: ParticleConfig) -> Self {
        Self {
            runtime: Runtime::with_config(
                RuntimeConfig::default().worker_threads(config.worker_threads),
            ),
            config,
        }
    }

    /// Get current particle count.
    pub fn current_count(&self) -> usize {
        self.runtime.entity_count::<Particle>()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }
}

impl Default for ParticleScenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario for ParticleScenario {
    fn name(&self) -> &'static str {
        "particles"
    }

    fn description(&self) -> &'static str {
        "High-volume particle system with movement, lifetime, and respawn"
    }

    fn entity_count(&self) -> usize {
        self.config.particle_count
    }

    fn setup(&mut self) {
        if self.config.particle_count == 0 {
            return;
        }
        let last = self.config.particle_count as u32 - 1;
        let seed = self.config.seed;

        self.runtime.add_component(
            0..=last,
            (
                Particle,
                Color {
                    r: 1.0,
                    g: 0.5,
                    b: 0.2,
                    a: 1.0,
                },
            ),
        );
        self.runtime
            .add_component_with(0..=last, move |e| random_position(&mut entity_rng(seed, e)));
        self.runtime
            .add_component_with(0..=last, move |e| random_velocity(&mut entity_rng(seed, e)));
        self.runtime
            .add_component_with(0..=last, move |e| random_lifetime(&mut entity_rng(seed, e)));
        self.runtime.set_global(DeltaTime(self.config.delta_time));

        let systems = [
            self.runtime.make_system(system_movement).map(|_| ()),
            self.runtime.make_system(system_lifetime_decay).map(|_| ()),
            self.runtime.make_system(system_fade).map(|_| ()),
            self.runtime.make_system(system_flash).map(|_| ()),
        ];
        debug_assert!(systems.iter().all(Result::is_ok));

        let mut rng = StdRng::seed_from_u64(seed);
        let respawn = self.runtime.make_system(
            move |e: Entity, lifetime: &Lifetime, mut commands: Commands<'_>| {
                if lifetime.remaining <= 0.0 {
                    commands.add_component(
                        e,
                        (random_position(&mut rng), random_lifetime(&mut rng), Expired),
                    );
                }
            },
        );
        debug_assert!(respawn.is_ok());
    }

    fn update(&mut self) {
        self.runtime.update();
    }

    fn teardown(&mut self) {
        self.runtime.reset();
    }
}
