//! The runtime: a world, its systems and the threads that run them.
//!
//! # Cycle
//!
//! ```text
//!            ┌──────────────── update() ────────────────┐
//!            │                                          │
//!  add/remove ──▶ pending ──commit_changes()──▶ committed ──run_systems()──▶ callbacks
//!            ▲                                                     │
//!            └──────────────── Commands ◀──────────────────────────┘
//! ```
//!
//! - `add_component`/`remove_component`/`set_global` only stage changes.
//! - [`Runtime::commit_changes`] makes every staged change visible at once.
//! - [`Runtime::run_systems`] runs every eligible system once. Systems see committed data only;
//!   changes they request through [`Commands`](crate::ecs::system::Commands) are staged at the
//!   end of the run and become visible at the next commit. Transient components are cleared
//!   at the end of the run that saw them.
//!
//! # Example
//!
//! ```rust,ignore
//! use strata::ecs::{Component, Entity, Runtime};
//!
//! #[derive(Component, Clone)]
//! struct Greeting(&'static str);
//!
//! let mut runtime = Runtime::new();
//! runtime.add_component(0..=2, Greeting("alright"));
//! runtime.make_system(|g: &Greeting| print!("{} ", g.0))?;
//! runtime.update();
//! ```

use std::sync::Arc;

use log::debug;

use crate::{
    core::tasks::Executor,
    ecs::{
        component::{Component, Set, Types},
        config::RuntimeConfig,
        contract::{Violation, ViolationHandler},
        entity::{Entity, Range},
        schedule::Schedule,
        storage::MemoryResource,
        system::{IntoSystem, Options, System, SystemHandle},
        world::World,
    },
};

/// Owner of all pools and systems of one ECS instance.
pub struct Runtime {
    world: World,
    schedule: Schedule,
    executor: Executor,
    config: RuntimeConfig,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        debug!(
            "starting runtime with {} workers and the {:?} planner",
            config.get_worker_threads(),
            config.get_planner()
        );
        Self {
            world: World::new(),
            schedule: Schedule::with_planner(config.get_planner().build()),
            executor: Executor::new(config.get_worker_threads()),
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Register a system with default options.
    ///
    /// An invalid parameter list is reported to the violation handler and returned.
    pub fn make_system<M>(&mut self, system: impl IntoSystem<M>) -> Result<SystemHandle, Violation> {
        self.make_system_with(Options::new(), system)
    }

    /// Register a system with options.
    pub fn make_system_with<M>(
        &mut self,
        options: Options,
        system: impl IntoSystem<M>,
    ) -> Result<SystemHandle, Violation> {
        match system.into_system(options, &mut self.world) {
            Ok(system) => Ok(self.schedule.add_system(system)),
            Err(violation) => {
                self.world.diagnostics().report(violation.clone());
                Err(violation)
            }
        }
    }

    /// Run one system now, whether or not it is manual. Its rate limit still applies.
    ///
    /// Returns whether the system ran. Commands it queued are staged for the next commit.
    pub fn run_system(&mut self, handle: SystemHandle) -> bool {
        match self.schedule.run_one(handle, &mut self.world) {
            Some(ran) => ran,
            None => {
                self.world
                    .diagnostics()
                    .precondition(format!("unknown system handle {}", handle.index()));
                false
            }
        }
    }

    /// Commit staged changes, then run one system.
    pub fn update_system(&mut self, handle: SystemHandle) -> bool {
        self.commit_changes();
        self.run_system(handle)
    }

    pub fn system(&self, handle: SystemHandle) -> Option<&System> {
        self.schedule.system(handle)
    }

    pub fn system_count(&self) -> usize {
        self.schedule.len()
    }

    /// Stage one component or a tuple of components for every entity in `range`.
    pub fn add_component<S: Set>(&mut self, range: impl Into<Range>, set: S) {
        self.world.add_components(range, set);
    }

    /// Stage a component computed per entity at commit time.
    pub fn add_component_with<C, F>(&mut self, range: impl Into<Range>, generator: F)
    where
        C: Component,
        F: Fn(Entity) -> C + Send + Sync + 'static,
    {
        self.world.add_component_with(range, generator);
    }

    /// Stage removal of one component type or a tuple of types.
    pub fn remove_component<T: Types>(&mut self, range: impl Into<Range>) {
        self.world.remove_components::<T>(range);
    }

    /// Stage a new value for a global component.
    pub fn set_global<C: Component>(&mut self, value: C) {
        self.world.set_global(value);
    }

    /// Make every staged change visible.
    pub fn commit_changes(&mut self) {
        self.world.commit();
    }

    /// Run every eligible system once.
    pub fn run_systems(&mut self) -> usize {
        self.schedule.run(&mut self.world, &self.executor)
    }

    /// [`commit_changes`](Self::commit_changes) followed by [`run_systems`](Self::run_systems).
    pub fn update(&mut self) -> usize {
        self.commit_changes();
        self.run_systems()
    }

    /// Drop every component and system. The violation handler and configuration are kept.
    pub fn reset(&mut self) {
        self.schedule.clear();
        self.world.clear();
        debug!("runtime reset");
    }

    pub fn entity_count<C: Component>(&self) -> usize {
        self.world.entity_count::<C>()
    }

    pub fn component_count<C: Component>(&self) -> usize {
        self.world.component_count::<C>()
    }

    pub fn has_component<C: Component>(&self, entity: impl Into<Entity>) -> bool {
        self.world.has_component::<C>(entity.into())
    }

    /// Reports a precondition violation if the entity lacks `C`.
    pub fn get_component<C: Component>(&self, entity: impl Into<Entity>) -> Option<&C> {
        self.world.get::<C>(entity.into())
    }

    pub fn get_component_mut<C: Component>(&mut self, entity: impl Into<Entity>) -> Option<&mut C> {
        self.world.get_mut::<C>(entity.into())
    }

    pub fn get_shared<C: Component>(&self) -> Option<&C> {
        self.world.shared::<C>()
    }

    pub fn get_global<C: Component>(&self) -> Option<&C> {
        self.world.global::<C>()
    }

    pub fn get_global_mut<C: Component>(&mut self) -> Option<&mut C> {
        self.world.global_mut::<C>()
    }

    pub fn has_changed<C: Component>(&self) -> bool {
        self.world.has_changed::<C>()
    }

    pub fn set_violation_handler(&mut self, handler: impl ViolationHandler + 'static) {
        self.world.diagnostics_mut().set_handler(handler);
    }

    pub fn reset_violation_handler(&mut self) {
        self.world.diagnostics_mut().reset_handler();
    }

    /// Allocate the values of `C` from `resource`. Existing values are moved.
    pub fn set_memory_resource<C: Component>(&mut self, resource: Arc<dyn MemoryResource>) {
        self.world.set_memory_resource::<C>(resource);
    }

    pub fn reset_memory_resource<C: Component>(&mut self) {
        self.world.reset_memory_resource::<C>();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use strata_macros::Component;

    use super::*;
    use crate::ecs::{config::PlannerKind, contract::ViolationKind};

    #[derive(Component, Clone, Debug, PartialEq)]
    struct Counter(u32);

    #[derive(Component, Clone, Debug, PartialEq, Default)]
    #[component(global)]
    struct Frame(u32);

    fn runtime() -> Runtime {
        Runtime::with_config(
            RuntimeConfig::default()
                .worker_threads(2)
                .planner(PlannerKind::Layered),
        )
    }

    fn collect_violations(runtime: &mut Runtime) -> Arc<Mutex<Vec<Violation>>> {
        let violations = Arc::new(Mutex::new(Vec::new()));
        let sink = violations.clone();
        runtime.set_violation_handler(move |v: &Violation| sink.lock().unwrap().push(v.clone()));
        violations
    }

    #[test]
    fn update_commits_then_runs() {
        // Given
        let mut runtime = runtime();
        runtime.add_component(0..=3, Counter(0));
        runtime.make_system(|c: &mut Counter| c.0 += 1).unwrap();
        runtime.make_system(|f: &mut Frame| f.0 += 1).unwrap();

        // When
        let ran = runtime.update();
        runtime.update();

        // Then
        assert_eq!(ran, 2);
        assert_eq!(runtime.get_component::<Counter>(3), Some(&Counter(2)));
        assert_eq!(runtime.get_global::<Frame>(), Some(&Frame(2)));
        assert_eq!(runtime.system_count(), 2);
    }

    #[test]
    fn invalid_system_is_reported() {
        // Given
        let mut runtime = runtime();
        let violations = collect_violations(&mut runtime);

        // When
        let result = runtime.make_system(|_a: &Counter, _b: &mut Counter| {});

        // Then
        assert!(result.is_err());
        assert_eq!(runtime.system_count(), 0);
        let violations = violations.lock().unwrap();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind(), ViolationKind::Precondition);
    }

    #[test]
    fn unknown_handle_is_a_precondition_violation() {
        let mut runtime = runtime();
        let violations = collect_violations(&mut runtime);

        assert!(!runtime.run_system(SystemHandle::new(3)));
        assert_eq!(violations.lock().unwrap().len(), 1);
    }

    #[test]
    fn update_system_commits_first() {
        // Given
        let mut runtime = runtime();
        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        let handle = runtime
            .make_system_with(Options::new().manual_update(), move |c: &Counter| {
                *sink.lock().unwrap() += c.0
            })
            .unwrap();
        runtime.add_component(0..=4, Counter(2));

        // When
        runtime.run_systems();
        let ran = runtime.update_system(handle);

        // Then
        assert!(ran);
        assert_eq!(*seen.lock().unwrap(), 10);
    }

    #[test]
    fn reset_returns_to_empty() {
        // Given
        let mut runtime = runtime();
        runtime.add_component(0..=4, Counter(0));
        runtime.make_system(|_c: &Counter| {}).unwrap();
        runtime.commit_changes();

        // When
        runtime.reset();

        // Then
        assert_eq!(runtime.system_count(), 0);
        assert_eq!(runtime.entity_count::<Counter>(), 0);
        assert_eq!(runtime.run_systems(), 0);
    }
}
