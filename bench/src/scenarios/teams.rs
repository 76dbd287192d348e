//! Team benchmark scenario.
//!
//! Entities are laid out in alternating blocks: even blocks belong to the team, odd blocks do
//! not. A sparse set of entities is tagged `Static`. This fragments every selection into many
//! short ranges, which is the worst case for the range-based argument builder.
//!
//! Systems:
//! - regeneration for team members, reading the shared `Team` value
//! - damage for everyone outside the team that is not `Static`

use strata::ecs::{Runtime, RuntimeConfig, Without};

use crate::components::{Health, Static, Team};
use crate::scenarios::Scenario;

/// Configuration for the team benchmark.
pub struct TeamConfig {
    /// Total number of entities.
    pub entity_count: usize,
    /// Length of each membership block.
    pub block_size: usize,
    /// Every n-th entity is tagged `Static`.
    pub static_every: usize,
    pub worker_threads: usize,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            entity_count: 50_000,
            block_size: 64,
            static_every: 7,
            worker_threads: 4,
        }
    }
}

fn system_regenerate(health: &mut Health, team: &Team) {
    health.current = (health.current + 0.5 + team.id as f32 * 0.01).min(health.max);
}

fn system_damage(health: &mut Health, _team: Without<Team>, _static: Without<Static>) {
    health.current = (health.current - 0.5).max(0.0);
}

pub struct TeamScenario {
    config: TeamConfig,
    runtime: Runtime,
}

impl TeamScenario {
    pub fn new() -> Self {
        Self::with_config(TeamConfig::default())
    }

    pub fn with_config(config: TeamConfig) -> Self {
        Self {
            runtime: Runtime::with_config(
                RuntimeConfig::default().worker_threads(config.worker_threads),
            ),
            config,
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }
}

impl Default for TeamScenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario for TeamScenario {
    fn name(&self) -> &'static str {
        "teams"
    }

    fn description(&self) -> &'static str {
        "Shared component and tag filters over fragmented entity ranges"
    }

    fn entity_count(&self) -> usize {
        self.config.entity_count
    }

    fn setup(&mut self) {
        let count = self.config.entity_count as u32;
        if count == 0 {
            return;
        }
        let block = self.config.block_size.max(1) as u32;

        self.runtime.add_component(
            0..=count - 1,
            Health {
                current: 50.0,
                max: 100.0,
            },
        );

        let mut first = 0;
        while first < count {
            let last = (first + block - 1).min(count - 1);
            self.runtime.add_component(first..=last, Team { id: 3 });
            first += block * 2;
        }

        let step = self.config.static_every.max(1);
        for id in (0..count).step_by(step) {
            self.runtime.add_component(id, Static);
        }

        let regenerate = self.runtime.make_system(system_regenerate);
        let damage = self.runtime.make_system(system_damage);
        debug_assert!(regenerate.is_ok() && damage.is_ok());
    }

    fn update(&mut self) {
        self.runtime.update();
    }

    fn teardown(&mut self) {
        self.runtime.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_regenerate_and_others_take_damage() {
        // Given
        let mut scenario = TeamScenario::with_config(TeamConfig {
            entity_count: 40,
            block_size: 10,
            static_every: 5,
            worker_threads: 2,
        });
        scenario.setup();

        // When
        scenario.update();

        // Then
        let runtime = scenario.runtime();
        assert_eq!(runtime.entity_count::<Team>(), 20);
        assert_eq!(runtime.component_count::<Team>(), 1);
        // 22 is a team member
        assert!(runtime.get_component::<Health>(22).unwrap().current > 50.0);
        // 11 is outside the team and not static
        assert_eq!(runtime.get_component::<Health>(11).unwrap().current, 49.5);
        // 15 is outside the team but static
        assert_eq!(runtime.get_component::<Health>(15).unwrap().current, 50.0);
    }
}
