//! Runtime configuration.

use std::{num::NonZeroUsize, thread};

use crate::ecs::schedule::{LayeredPlanner, Planner, SequentialPlanner};

/// Which planner orders the runtime's systems.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PlannerKind {
    /// Group systems with disjoint footprints; see [`LayeredPlanner`].
    #[default]
    Layered,
    /// One system at a time, in registration order.
    Sequential,
}

impl PlannerKind {
    pub(crate) fn build(self) -> Box<dyn Planner> {
        match self {
            PlannerKind::Layered => Box::new(LayeredPlanner),
            PlannerKind::Sequential => Box::new(SequentialPlanner),
        }
    }
}

/// Settings fixed when a runtime is created.
///
/// ```rust,ignore
/// let runtime = Runtime::with_config(
///     RuntimeConfig::default()
///         .worker_threads(2)
///         .planner(PlannerKind::Sequential),
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    worker_threads: usize,
    planner: PlannerKind,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: thread::available_parallelism().map_or(1, NonZeroUsize::get),
            planner: PlannerKind::default(),
        }
    }
}

impl RuntimeConfig {
    /// Number of executor threads. Clamped to at least one.
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.worker_threads = count.max(1);
        self
    }

    pub fn planner(mut self, planner: PlannerKind) -> Self {
        self.planner = planner;
        self
    }

    pub fn get_worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn get_planner(&self) -> PlannerKind {
        self.planner
    }
}
