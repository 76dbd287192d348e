//! Schedule: ordering and parallel execution of a runtime's systems.
//!
//! # Architecture
//!
//! ```text
//! Schedule
//!   ├── systems  [movement, collide, render, manual_tool]
//!   └── plan     Group 0 ─► [movement, render]      (disjoint footprints, concurrent)
//!                Group 1 ─► [collide]               (writes what movement reads)
//! ```
//!
//! Manual systems are kept out of the plan; they only run through [`Schedule::run_one`].
//!
//! # Execution model
//!
//! Running the schedule walks the plan one group at a time:
//!
//! 1. **Prepare** each system of the group on the calling thread, in registration order. This
//!    is the only step that touches the world: selections are rebuilt and parameter cursors
//!    bound. Systems denied by their rate limit drop out here.
//! 2. **Run** the prepared systems. A single ready system runs inline; several are spawned on
//!    the executor and the group completes when every one of them returned.
//!
//! After the last group, commands queued by system bodies are moved into the pools' pending
//! queues and transient pools are pruned.
//!
//! # Safety Invariants
//!
//! 1. **Group disjointness**: the planner never groups systems whose footprints conflict, so
//!    concurrently running systems never alias a value mutably.
//! 2. **Stable storage**: between prepare and the end of the group nothing commits, prunes or
//!    otherwise restructures a pool, so every bound cursor stays valid.
//! 3. **Stable systems**: the system list is not modified while a group runs; each index
//!    appears in at most one group.

mod plan;

use std::time::Instant;

use log::{debug, trace, warn};

pub use plan::{Group, LayeredPlanner, Planner, SequentialPlanner, Task};

use crate::{
    core::tasks::Executor,
    ecs::{
        system::{System, SystemHandle},
        world::World,
    },
};

/// The systems of a runtime and their execution plan.
pub struct Schedule {
    systems: Vec<System>,
    plan: Vec<Group>,
    planner: Box<dyn Planner>,
    dirty: bool,
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    /// Create an empty schedule using the [`LayeredPlanner`].
    #[inline]
    pub fn new() -> Self {
        Self::with_planner(Box::new(LayeredPlanner))
    }

    #[inline]
    pub fn with_planner(planner: Box<dyn Planner>) -> Self {
        Self {
            systems: Vec::new(),
            plan: Vec::new(),
            planner,
            dirty: false,
        }
    }

    /// Add a system. The plan is recomputed before the next run.
    pub fn add_system(&mut self, system: System) -> SystemHandle {
        let handle = SystemHandle::new(self.systems.len());
        self.systems.push(system);
        self.dirty = true;
        handle
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn system(&self, handle: SystemHandle) -> Option<&System> {
        self.systems.get(handle.index())
    }

    /// The current plan, recomputed if systems were added since the last one.
    pub fn plan(&mut self) -> &[Group] {
        if self.dirty {
            self.replan();
        }
        &self.plan
    }

    fn replan(&mut self) {
        let tasks = self
            .systems
            .iter()
            .enumerate()
            .filter(|(_, system)| !system.is_manual())
            .map(|(index, system)| Task::new(index, system.access().clone()))
            .collect::<Vec<_>>();
        self.plan = self.planner.plan(&tasks);
        self.dirty = false;
        debug!(
            "planned {} systems into {} groups",
            tasks.len(),
            self.plan.len()
        );
    }

    /// Run every planned system once, then flush commands and prune transient pools.
    ///
    /// Returns the number of systems that ran.
    pub fn run(&mut self, world: &mut World, executor: &Executor) -> usize {
        if self.dirty {
            self.replan();
        }

        let mut ran = 0;
        for group in self.plan.iter() {
            ran += run_group(&mut self.systems, world, group, executor);
        }

        let flushed = world.flush_commands();
        let pruned = world.prune_transient();
        trace!("ran {ran} systems, flushed {flushed} commands, pruned {pruned} pools");
        ran
    }

    /// Run one system on the calling thread, manual or not, then flush the commands it queued.
    ///
    /// Returns `None` for an unknown handle, otherwise whether the system ran.
    pub fn run_one(&mut self, handle: SystemHandle, world: &mut World) -> Option<bool> {
        let system = self.systems.get_mut(handle.index())?;
        let ran = prepare(system, handle.index(), world);
        if ran {
            // SAFETY: prepared just above with exclusive world access.
            unsafe { system.run() };
            world.flush_commands();
        }
        Some(ran)
    }

    /// Remove every system.
    pub fn clear(&mut self) {
        self.systems.clear();
        self.plan.clear();
        self.dirty = false;
    }
}

/// Prepare the system at `index`, reporting binding failures to the world's diagnostics.
fn prepare(system: &mut System, index: usize, world: &mut World) -> bool {
    world.commands_mut().set_origin(index as u32);
    match system.prepare(world, Instant::now()) {
        Ok(ready) => {
            if !ready {
                trace!("system {} skipped by its rate limit", system.name());
            }
            ready
        }
        Err(error) => {
            warn!("system {} not run: {error}", system.name());
            world.report::<()>(Err(error));
            false
        }
    }
}

/// Prepare and run one group.
fn run_group(
    systems: &mut [System],
    world: &mut World,
    group: &Group,
    executor: &Executor,
) -> usize {
    let mut ready = Vec::with_capacity(group.system_indexes().len());
    for &index in group.system_indexes() {
        if let Some(system) = systems.get_mut(index)
            && prepare(system, index, world)
        {
            ready.push(index);
        }
    }

    match ready.as_slice() {
        [] => {}
        [index] => {
            // SAFETY: prepared above and nothing else runs.
            unsafe { systems[*index].run() };
        }
        indexes => {
            // SAFETY: indexes are unique and in bounds; the slice outlives the scope.
            let handles: Vec<SystemPtr> = indexes
                .iter()
                .map(|&index| SystemPtr(unsafe { systems.as_mut_ptr().add(index) }))
                .collect();
            executor.scope(|scope| {
                for handle in handles {
                    scope.spawn(move || unsafe { handle.run() });
                }
            });
        }
    }
    ready.len()
}

/// Raw pointer to a prepared system, sent to a worker for the duration of one group.
///
/// # Safety Contract
///
/// 1. The pointer targets a live element of the schedule's system list, which is neither
///    resized nor dropped until the executor scope that received the pointer has ended.
/// 2. No two pointers to the same system exist at once.
/// 3. The system was prepared and the world is left untouched until the scope ends.
struct SystemPtr(*mut System);

// SAFETY: System owns only Send data; see the safety contract above.
unsafe impl Send for SystemPtr {}

impl SystemPtr {
    #[inline]
    unsafe fn run(self) {
        unsafe { (*self.0).run() }
    }
}
