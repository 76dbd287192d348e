use crate::ecs::world::Access;

/// Trait for planning the execution of a runtime's systems.
///
/// The input is every schedulable system with its footprint, in registration order. The
/// output is a list of groups that run one after another. Systems in the same group may run at
/// the same time, so a planner must never put two conflicting systems in one group.
pub trait Planner: Send + Sync {
    fn plan(&self, tasks: &[Task]) -> Vec<Group>;
}

/// A single system to be scheduled.
#[derive(Debug, Clone)]
pub struct Task {
    /// Index of the system in the schedule.
    system_index: usize,

    /// Read/write footprint of the system.
    access: Access,
}

impl Task {
    pub fn new(system_index: usize, access: Access) -> Self {
        Self {
            system_index,
            access,
        }
    }

    #[inline]
    pub fn system_index(&self) -> usize {
        self.system_index
    }

    #[inline]
    pub fn access(&self) -> &Access {
        &self.access
    }
}

/// Systems that may run concurrently.
///
/// ```text
///   Group 0            Group 1            Group 2
///   ┌───────────┐      ┌───────────┐      ┌───────────┐
///   │ read  A   │      │ write A   │      │ exclusive │
///   │ read  A   │ ───▶ │ write B   │ ───▶ │           │
///   │ write B   │      └───────────┘      └───────────┘
///   └───────────┘
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Group {
    system_indexes: Vec<usize>,
}

impl Group {
    #[inline]
    pub const fn new(system_indexes: Vec<usize>) -> Self {
        Self { system_indexes }
    }

    #[inline]
    pub fn single(system_index: usize) -> Self {
        Self::new(vec![system_index])
    }

    #[inline]
    pub fn push(&mut self, system_index: usize) {
        self.system_indexes.push(system_index);
    }

    /// Systems in this group, in registration order.
    pub fn system_indexes(&self) -> &[usize] {
        &self.system_indexes
    }
}

/// One group per system, in registration order. No parallelism.
///
/// Useful on single threaded targets and for debugging ordering issues.
pub struct SequentialPlanner;

impl Planner for SequentialPlanner {
    fn plan(&self, tasks: &[Task]) -> Vec<Group> {
        tasks
            .iter()
            .map(|task| Group::single(task.system_index))
            .collect()
    }
}

/// Order preserving layered planner.
///
/// Each system is placed one group after the latest group holding an earlier system it
/// conflicts with, or in the first group if it conflicts with none. For any two conflicting
/// systems the one registered first therefore always runs first, while independent systems
/// are pulled into the earliest group they fit.
///
/// # Complexity
///
/// O(n²) footprint comparisons for n systems, done once per registration change.
pub struct LayeredPlanner;

impl Planner for LayeredPlanner {
    fn plan(&self, tasks: &[Task]) -> Vec<Group> {
        let mut layers: Vec<usize> = Vec::with_capacity(tasks.len());
        let mut groups: Vec<Group> = Vec::new();

        for (i, task) in tasks.iter().enumerate() {
            let layer = tasks[..i]
                .iter()
                .zip(&layers)
                .filter(|(earlier, _)| earlier.access.conflicts_with(&task.access))
                .map(|(_, layer)| layer + 1)
                .max()
                .unwrap_or(0);
            layers.push(layer);

            if layer == groups.len() {
                groups.push(Group::default());
            }
            groups[layer].push(task.system_index);
        }

        groups
    }
}
