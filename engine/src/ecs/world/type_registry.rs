//! Per-runtime type registry for component types.
//!
//! [`TypeRegistry`] maps Rust's [`std::any::TypeId`] to a dense [`TypeId`] that indexes the
//! world's pool table, the access bitsets used by the planner and the variant graph. Ids are
//! handed out in registration order and never reused, so they are stable for the lifetime of a
//! registry.
//!
//! # Thread Safety
//!
//! Lookups are lock-free via `DashMap`; registration of a new type takes a short write lock on
//! the info table. Registration only needs `&self`, which lets component hooks such as
//! [`Component::variant_of`](crate::ecs::Component::variant_of) resolve other types while the
//! registry is shared.
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = TypeRegistry::new();
//!
//! let pos = registry.register::<Position>();
//! assert_eq!(registry.get::<Position>(), Some(pos));
//! assert_eq!(registry.info(pos).unwrap().shape(), Shape::Normal);
//! ```

use std::{
    alloc::Layout,
    any::TypeId as StdTypeId,
    fmt,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicU32, Ordering},
    },
};

use dashmap::DashMap;

use crate::ecs::component::{Component, Flags, Mutability, Shape};

/// A dense identifier for a registered component type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u32);

impl TypeId {
    /// Construct a new Id from a raw u32 value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the index of this ID for use in indexable storage (e.g., Vec, bitset).
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for TypeId {
    #[inline]
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<usize> for TypeId {
    #[inline]
    fn from(value: usize) -> Self {
        Self::new(value as u32)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Metadata about a registered component type.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    /// The dense type ID.
    id: TypeId,

    /// Human readable type name, used in diagnostics.
    name: &'static str,

    /// The Rust TypeId for runtime type checking.
    type_id: StdTypeId,

    /// The memory layout of the type.
    layout: Layout,

    /// Storage flags declared by the component.
    flags: Flags,

    /// Whether systems may bind the type mutably.
    mutable: bool,

    /// Resolves the component this type is a variant of.
    variant_of: fn(&TypeRegistry) -> Option<TypeId>,
}

impl TypeInfo {
    pub(crate) fn of<C: Component>(id: TypeId) -> Self {
        Self {
            id,
            name: std::any::type_name::<C>(),
            type_id: StdTypeId::of::<C>(),
            layout: Layout::new::<C>(),
            flags: C::FLAGS,
            mutable: <C::Mutability as Mutability>::MUTABLE,
            variant_of: C::variant_of,
        }
    }

    /// Get the type ID.
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Get the type name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the Rust TypeId.
    #[inline]
    pub fn type_id(&self) -> StdTypeId {
        self.type_id
    }

    /// Get the memory layout.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Get the declared storage flags.
    #[inline]
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Get the storage shape selected by the flags.
    #[inline]
    pub fn shape(&self) -> Shape {
        self.flags.shape()
    }

    /// Check if systems may bind this type as `&mut`.
    #[inline]
    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// The component this type declares itself a variant of, registering it if needed.
    #[inline]
    pub fn variant_of(&self, registry: &TypeRegistry) -> Option<TypeId> {
        (self.variant_of)(registry)
    }

    /// Check if this is a zero-sized type.
    #[inline]
    pub fn is_zero_sized(&self) -> bool {
        self.layout.size() == 0
    }
}

/// A thread-safe registry of component types.
pub struct TypeRegistry {
    /// Map from Rust TypeId to our Id. Lock-free reads via sharded concurrent hashmap.
    type_map: DashMap<StdTypeId, TypeId>,

    /// Registered type entries indexed by id. Protected by RwLock for rare writes.
    types: RwLock<Vec<Option<TypeInfo>>>,

    /// Next available type identifier.
    next_id: AtomicU32,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a new, empty type registry.
    #[inline]
    pub fn new() -> Self {
        Self {
            type_map: DashMap::new(),
            types: RwLock::new(Vec::new()),
            next_id: AtomicU32::new(0),
        }
    }

    /// Register a component type, returning its id.
    ///
    /// Registering a type that is already known returns the existing id.
    pub fn register<C: Component>(&self) -> TypeId {
        let std_type_id = StdTypeId::of::<C>();

        // Fast path: already registered (lock-free read)
        if let Some(existing) = self.type_map.get(&std_type_id) {
            return *existing;
        }

        // Slow path: use the entry API so concurrent registrations agree on one id
        match self.type_map.entry(std_type_id) {
            dashmap::Entry::Occupied(occupied) => *occupied.get(),
            dashmap::Entry::Vacant(vacant) => {
                let id_value = self.next_id.fetch_add(1, Ordering::Relaxed);
                let id = TypeId(id_value);

                let mut types = self.types.write().unwrap_or_else(PoisonError::into_inner);
                let index = id_value as usize;
                if index >= types.len() {
                    types.resize(index + 1, None);
                }
                types[index] = Some(TypeInfo::of::<C>(id));
                vacant.insert(id);

                log::debug!("registered component {} as {}", std::any::type_name::<C>(), id);
                id
            }
        }
    }

    /// Get the ID for a type, if registered.
    #[inline]
    pub fn get<T: 'static>(&self) -> Option<TypeId> {
        self.type_map
            .get(&StdTypeId::of::<T>())
            .map(|entry| *entry.value())
    }

    /// Get type info by ID.
    #[inline]
    pub fn info(&self, id: TypeId) -> Option<TypeInfo> {
        let types = self.types.read().unwrap_or_else(PoisonError::into_inner);
        types.get(id.index()).and_then(|opt| *opt)
    }

    /// Get type info for a type, if registered.
    #[inline]
    pub fn info_of<T: 'static>(&self) -> Option<TypeInfo> {
        self.info(self.get::<T>()?)
    }

    /// Get the name of a registered type, or a placeholder for unknown ids.
    pub fn name(&self, id: TypeId) -> &'static str {
        self.info(id).map_or("<unregistered>", |info| info.name())
    }

    /// Get the number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.next_id.load(Ordering::Relaxed) as usize
    }

    /// Check if the registry is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
