//! Range-addressed columnar storage for components.
//!
//! Every component type gets its own [`Pool`]. A pool stores the entities that have the
//! component as a sorted list of inclusive ranges, and (for per-entity shapes) the values in a
//! packed [`Column`] in the same order. Because entity sets in practice are highly contiguous,
//! a pool holding a million entities allocated as one block is a single range and a single
//! allocation.
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  World                                                          │
//! │  - TypeId → Box<dyn ErasedPool>                                 │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │
//! ┌────────────────────────────▼────────────────────────────────────┐
//! │  Pool<C>                                                        │
//! │  - Committed ranges + offsets                                   │
//! │  - Pending adds/removes, applied at commit                      │
//! └────────┬──────────────────────────────────────┬─────────────────┘
//!          │                                      │
//! ┌────────▼────────┐                    ┌────────▼─────────┐
//! │  Pending<C>     │                    │  Column<C>       │
//! │  - Values and   │                    │  - Packed values │
//! │    generators   │                    │  - Memory        │
//! └─────────────────┘                    │    resource      │
//!                                        └──────────────────┘
//! ```
//!
//! # Storage shapes
//!
//! | Shape    | Ranges | Values                        |
//! |----------|--------|-------------------------------|
//! | normal   | yes    | one per entity                |
//! | tag      | yes    | one prototype                 |
//! | shared   | yes    | one, aliased by all entities  |
//! | global   | no     | one                           |
//!
//! # Safety
//!
//! Systems reach into pools through raw pointers obtained from [`Pool::values_ptr`]. Those
//! pointers are only valid while the pool is neither committed nor pruned; the runtime
//! guarantees this by only committing and pruning outside of system execution.

pub mod column;
pub mod memory;
pub(crate) mod pending;
mod pool;

use std::{any::Any, sync::Arc};

pub use column::{Column, GrowthStrategy};
pub use memory::{MemoryResource, SystemResource};
pub use pending::Generator;
pub use pool::{Commit, Pool};

use crate::ecs::{
    component::Shape,
    entity::{Entity, Range},
    error::Error,
    world::TypeInfo,
};

/// Type-erased view of a [`Pool`], used by the world to drive every pool uniformly.
pub trait ErasedPool: Send + Sync {
    fn info(&self) -> &TypeInfo;

    fn shape(&self) -> Shape;

    fn is_transient(&self) -> bool;

    fn ranges(&self) -> &[Range];

    fn entity_count(&self) -> usize;

    fn component_count(&self) -> usize;

    fn contains(&self, entity: Entity) -> bool;

    fn has_changed(&self) -> bool;

    fn version(&self) -> u64;

    fn has_pending(&self) -> bool;

    /// Every range gaining the component at the next commit.
    fn pending_add_ranges(&self) -> Vec<Range>;

    fn queue_remove(&mut self, range: Range);

    fn commit(&mut self) -> Result<Commit, Error>;

    /// Clear a transient pool. Returns `true` if anything was removed.
    fn prune(&mut self) -> bool;

    fn set_memory_resource(&mut self, resource: Arc<dyn MemoryResource>);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
