//! Component types used across benchmarks.
//!
//! Sizes are representative of real simulation components.

use strata_macros::Component;

// =============================================================================
// Transform Components
// =============================================================================

/// 3D position component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 3D velocity component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 4x4 transformation matrix (64 bytes).
#[derive(Component, Clone, Copy, Debug)]
pub struct Transform {
    pub matrix: [[f32; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }
}

/// Simulation step, read by every system that integrates over time.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
#[component(global)]
pub struct DeltaTime(pub f32);

// =============================================================================
// Game Components
// =============================================================================

/// Health component for damageable entities.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

/// Team shared by every member entity.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
#[component(shared)]
pub struct Team {
    pub id: u32,
}

/// Entities that are never moved.
#[derive(Component, Clone, Copy, Debug)]
#[component(tag)]
pub struct Static;

// =============================================================================
// Particle System Components
// =============================================================================

/// Particle marker.
#[derive(Component, Clone, Copy, Debug)]
#[component(tag)]
pub struct Particle;

/// Particle lifetime tracking.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Lifetime {
    pub remaining: f32,
    pub total: f32,
}

/// RGBA color (16 bytes).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Set for one cycle on particles that expired.
#[derive(Component, Clone, Copy, Debug)]
#[component(tag, transient)]
pub struct Expired;
