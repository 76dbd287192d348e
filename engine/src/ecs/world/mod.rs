//! The World owns every component pool of one runtime.
//!
//! A `World` maps component types to their [`Pool`]s, keeps the per-runtime type registry and
//! variant graph, and routes contract violations to the runtime's diagnostics hook. Pools are
//! created lazily the first time a type is used.
//!
//! # Architecture
//!
//! - **Type Registry**: dense [`TypeId`]s for every component type seen by this world
//! - **Pools**: one type-erased pool per registered type, indexed by id
//! - **Variant Graph**: which types are mutually exclusive variants of each other
//! - **Command Buffer**: structural changes queued by running systems
//! - **Diagnostics**: the violation hook
//!
//! # Example
//!
//! ```ignore
//! let mut world = World::new();
//!
//! world.add_components(Range::new(0, 9), (Position::default(), Velocity(1.0)));
//! world.commit();
//!
//! assert_eq!(world.entity_count::<Position>(), 10);
//! ```

mod access;
mod type_registry;
mod variant;

use std::sync::Arc;

pub use access::Access;
pub use type_registry::{TypeId, TypeInfo, TypeRegistry};
pub use variant::VariantGraph;

use crate::ecs::{
    component::{Component, Set, Shape, Target, TypeVisitor, Types},
    contract::Diagnostics,
    entity::{Entity, Range},
    error::Error,
    storage::{ErasedPool, MemoryResource, Pool, SystemResource},
    system::CommandBuffer,
};

/// Container of every component pool of one runtime.
#[derive(Default)]
pub struct World {
    /// Registry of all known component types.
    types: TypeRegistry,

    /// Pools indexed by type id. `None` for types registered only as variant targets.
    pools: Vec<Option<Box<dyn ErasedPool>>>,

    /// Mutual exclusion between variant types.
    variants: VariantGraph,

    /// Commands queued by systems.
    commands: CommandBuffer,

    /// The violation hook.
    diagnostics: Diagnostics,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    #[inline]
    pub fn variants(&self) -> &VariantGraph {
        &self.variants
    }

    #[inline]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    #[inline]
    pub fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    #[inline]
    pub fn commands(&self) -> &CommandBuffer {
        &self.commands
    }

    #[inline]
    pub fn commands_mut(&mut self) -> &mut CommandBuffer {
        &mut self.commands
    }

    /// Register `C` and create its pool if needed.
    pub fn register<C: Component>(&mut self) -> TypeId {
        let id = self.types.register::<C>();
        let index = id.index();
        if self.pools.get(index).is_some_and(Option::is_some) {
            return id;
        }
        if index >= self.pools.len() {
            self.pools.resize_with(index + 1, || None);
        }
        self.pools[index] = Some(Box::new(Pool::<C>::new(TypeInfo::of::<C>(id))));
        self.link_variants(id);
        id
    }

    /// Walk the `variant_of` chain starting at `id`, adding every edge to the graph.
    fn link_variants(&mut self, id: TypeId) {
        let mut current = id;
        while let Some(info) = self.types.info(current)
            && let Some(parent) = info.variant_of(&self.types)
            && self.variants.connect(current, parent)
        {
            log::debug!(
                "{} is a variant of {}",
                info.name(),
                self.types.name(parent)
            );
            current = parent;
        }
    }

    /// The pool for `C`, if it exists.
    pub fn pool<C: Component>(&self) -> Option<&Pool<C>> {
        let id = self.types.get::<C>()?;
        self.pool_by_id(id)?.as_any().downcast_ref::<Pool<C>>()
    }

    /// The pool for `C`, created if needed.
    pub fn pool_mut<C: Component>(&mut self) -> &mut Pool<C> {
        let id = self.register::<C>();
        match self.pools[id.index()]
            .as_mut()
            .and_then(|pool| pool.as_any_mut().downcast_mut::<Pool<C>>())
        {
            Some(pool) => pool,
            None => panic!("pool for {} has the wrong type", std::any::type_name::<C>()),
        }
    }

    /// The type-erased pool for `id`, if it exists.
    #[inline]
    pub fn pool_by_id(&self, id: TypeId) -> Option<&dyn ErasedPool> {
        self.pools.get(id.index())?.as_deref()
    }

    #[inline]
    pub fn pool_by_id_mut(&mut self, id: TypeId) -> Option<&mut (dyn ErasedPool + 'static)> {
        self.pools.get_mut(id.index())?.as_deref_mut()
    }

    /// Every existing pool, in type id order.
    pub fn pools(&self) -> impl Iterator<Item = &dyn ErasedPool> {
        self.pools.iter().filter_map(|pool| pool.as_deref())
    }

    /// Stage one component or a tuple of components for every entity in `range`.
    pub fn add_components<S: Set>(&mut self, range: impl Into<Range>, set: S) {
        let mut stager = Stager {
            world: self,
            range: range.into(),
        };
        set.apply(&mut stager);
    }

    /// Stage a component computed per entity by `generator`.
    pub fn add_component_with<C, F>(&mut self, range: impl Into<Range>, generator: F)
    where
        C: Component,
        F: Fn(Entity) -> C + Send + Sync + 'static,
    {
        let range = range.into();
        let result = self.pool_mut::<C>().queue_add_with(range, generator);
        self.report(result);
    }

    /// Stage removal of one component type or a tuple of types.
    pub fn remove_components<T: Types>(&mut self, range: impl Into<Range>) {
        let mut remover = Remover {
            world: self,
            range: range.into(),
        };
        T::visit(&mut remover);
    }

    /// Stage a new value for a global component.
    pub fn set_global<C: Component>(&mut self, value: C) {
        if C::FLAGS.shape() != Shape::Global {
            self.diagnostics.precondition(format!(
                "{} is not a global component",
                std::any::type_name::<C>()
            ));
            return;
        }
        let result = self.pool_mut::<C>().queue_global(value);
        self.report(result);
    }

    /// Move every command queued by systems into the pools' pending queues.
    ///
    /// Commands are applied in system index order and, within one system, in the order they
    /// were pushed.
    pub fn flush_commands(&mut self) -> usize {
        let commands = self.commands.drain();
        let count = commands.len();
        for command in commands {
            log::trace!("applying {command:?}");
            command.apply(self);
        }
        count
    }

    /// Commit every pool.
    ///
    /// Queued commands are flushed first, then adds of variant types stage removal of their
    /// siblings, then each pool commits exactly once.
    pub fn commit(&mut self) {
        self.flush_commands();
        self.stage_variant_removals();

        for index in 0..self.pools.len() {
            let Some(pool) = self.pools[index].as_mut() else {
                continue;
            };
            if let Err(error) = pool.commit() {
                self.report::<()>(Err(error));
            }
        }
    }

    fn stage_variant_removals(&mut self) {
        let mut removals: Vec<(TypeId, Vec<Range>)> = Vec::new();
        for pool in self.pools() {
            let id = pool.info().id();
            if !pool.has_pending() || !self.variants.has_variants(id) {
                continue;
            }
            let added = pool.pending_add_ranges();
            if added.is_empty() {
                continue;
            }
            for sibling in self.variants.closure(id) {
                removals.push((sibling, added.clone()));
            }
        }
        for (sibling, ranges) in removals {
            if let Some(pool) = self.pool_by_id_mut(sibling) {
                for range in ranges {
                    pool.queue_remove(range);
                }
            }
        }
    }

    /// Clear every transient pool. Returns the number of pools pruned.
    pub fn prune_transient(&mut self) -> usize {
        self.pools
            .iter_mut()
            .flatten()
            .filter(|pool| pool.is_transient())
            .map(|pool| pool.prune())
            .filter(|pruned| *pruned)
            .count()
    }

    /// Number of committed entities holding `C`.
    pub fn entity_count<C: Component>(&self) -> usize {
        self.pool::<C>().map_or(0, Pool::entity_count)
    }

    /// Number of stored `C` values. Shared, tag and global components report 0 or 1.
    pub fn component_count<C: Component>(&self) -> usize {
        self.pool::<C>().map_or(0, Pool::component_count)
    }

    pub fn has_component<C: Component>(&self, entity: Entity) -> bool {
        self.pool::<C>().is_some_and(|pool| pool.contains(entity))
    }

    /// Whether the entity count of `C` changed at the last commit or prune.
    pub fn has_changed<C: Component>(&self) -> bool {
        self.pool::<C>().is_some_and(Pool::has_changed)
    }

    /// The committed value of `C` on `entity`.
    ///
    /// Reports a precondition violation when the entity does not have the component.
    pub fn get<C: Component>(&self, entity: Entity) -> Option<&C> {
        let value = self.pool::<C>().and_then(|pool| pool.get(entity));
        if value.is_none() {
            self.report_missing::<C>(entity);
        }
        value
    }

    /// The committed value of `C` on `entity`.
    pub fn get_mut<C: Component>(&mut self, entity: Entity) -> Option<&mut C> {
        if !self.has_component::<C>(entity) {
            self.report_missing::<C>(entity);
            return None;
        }
        self.pool_mut::<C>().get_mut(entity)
    }

    /// The single value of a shared component, if any entity holds it.
    pub fn shared<C: Component>(&self) -> Option<&C> {
        self.pool::<C>()
            .filter(|pool| pool.shape() == Shape::Shared)
            .and_then(Pool::value)
    }

    /// The value of a global component.
    pub fn global<C: Component>(&self) -> Option<&C> {
        self.pool::<C>()
            .filter(|pool| pool.shape() == Shape::Global)
            .and_then(Pool::value)
    }

    /// The value of a global component.
    pub fn global_mut<C: Component>(&mut self) -> Option<&mut C> {
        if C::FLAGS.shape() != Shape::Global {
            return None;
        }
        self.pool_mut::<C>().value_mut()
    }

    /// Allocate the values of `C` from `resource`, moving existing values.
    pub fn set_memory_resource<C: Component>(&mut self, resource: Arc<dyn MemoryResource>) {
        self.pool_mut::<C>().set_memory_resource(resource);
    }

    /// Allocate the values of `C` from the global allocator again.
    pub fn reset_memory_resource<C: Component>(&mut self) {
        self.pool_mut::<C>()
            .set_memory_resource(Arc::new(SystemResource));
    }

    /// Drop every pool, type and command, keeping the diagnostics hook.
    pub fn clear(&mut self) {
        let diagnostics = std::mem::take(&mut self.diagnostics);
        *self = Self {
            diagnostics,
            ..Self::default()
        };
    }

    fn report_missing<C: Component>(&self, entity: Entity) {
        self.report::<()>(Err(Error::Missing {
            component: std::any::type_name::<C>(),
            entity,
        }));
    }

    /// Route a storage error to the diagnostics hook.
    pub(crate) fn report<T>(&self, result: Result<T, Error>) {
        use crate::ecs::contract::Violation;

        if let Err(error) = result {
            let violation = match error {
                Error::Conflict { .. } => Violation::assertion(error.to_string()),
                Error::Corrupt { .. } => Violation::postcondition(error.to_string()),
                Error::Missing { .. } | Error::Unset { .. } | Error::NotEntityScoped { .. } => {
                    Violation::precondition(error.to_string())
                }
            };
            self.diagnostics.report(violation);
        }
    }
}

/// Stages the members of a component set into their pools.
struct Stager<'w> {
    world: &'w mut World,
    range: Range,
}

impl Target for Stager<'_> {
    fn add<C: Component + Clone>(&mut self, value: C) {
        let result = self.world.pool_mut::<C>().queue_add(self.range, value);
        self.world.report(result);
    }
}

/// Stages removal of every type in a type list.
struct Remover<'w> {
    world: &'w mut World,
    range: Range,
}

impl TypeVisitor for Remover<'_> {
    fn visit<C: Component>(&mut self) {
        if C::FLAGS.shape() == Shape::Global {
            self.world.report::<()>(Err(Error::NotEntityScoped {
                component: std::any::type_name::<C>(),
                range: self.range,
            }));
            return;
        }
        self.world.pool_mut::<C>().queue_remove(self.range);
    }
}
