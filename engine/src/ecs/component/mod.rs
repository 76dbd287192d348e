//! Component declaration for the ECS.
//!
//! Components are plain value types attached to entity ranges through per-type pools. Besides
//! the value itself, every component type carries a set of [`Flags`] that select how its pool
//! stores data, and a [`Mutability`] marker that controls whether systems may bind it mutably.
//!
//! ## Storage shapes
//!
//! | Flags        | Shape            | Memory        | Notes                                      |
//! |--------------|------------------|---------------|--------------------------------------------|
//! | *(none)*     | [`Shape::Normal`] | O(entities)  | one value per entity                       |
//! | `tag`        | [`Shape::Tag`]    | O(1)         | presence only                              |
//! | `shared`     | [`Shape::Shared`] | O(1)         | every owning entity aliases one value      |
//! | `global`     | [`Shape::Global`] | O(1)         | not tied to entities, always satisfiable   |
//! | `transient`  | normal or tag    |               | pruned at the end of the exposing cycle    |
//! | `immutable`  | normal           |               | `&mut C` parameters fail to compile         |
//!
//! `tag`, `shared` and `global` are mutually exclusive and `transient` cannot be combined with
//! `global`. The derive macro rejects invalid combinations with a compile error, and
//! [`assert_valid`] rejects them for hand-written impls during monomorphization.
//!
//! ## Usage
//!
//! ```ignore
//! use strata::ecs::Component;
//!
//! #[derive(Component, Clone)]
//! struct Position { x: f32, y: f32 }
//!
//! #[derive(Component, Clone)]
//! #[component(transient, tag)]
//! struct Collided;
//!
//! #[derive(Component, Clone, Default, PartialEq)]
//! #[component(global)]
//! struct Gravity(f32);
//! ```

mod set;

pub use set::{Set, Target, TypeVisitor, Types};

use crate::ecs::world;

/// A trait representing a component in the ECS.
///
/// Prefer `#[derive(Component)]`; a manual implementation looks like:
///
/// ```ignore
/// struct Health(u32);
///
/// impl Component for Health {
///     const FLAGS: Flags = Flags::NONE;
///     type Mutability = Mutable;
/// }
/// ```
pub trait Component: 'static + Sized + Send + Sync {
    /// Storage flags of this component type. Read once when its pool is created.
    const FLAGS: Flags = Flags::NONE;

    /// Whether systems may bind this component as `&mut`.
    type Mutability: Mutability;

    /// The component this type is a variant of, if any.
    ///
    /// Variants connected through this relation are mutually exclusive on an entity: adding one
    /// removes the others.
    fn variant_of(_types: &world::TypeRegistry) -> Option<world::TypeId> {
        None
    }

    /// Compare two values staged for a single-value (shared or global) pool in the same cycle.
    ///
    /// Two staged values that are not the same are a conflict.
    fn same_value(&self, _other: &Self) -> bool {
        false
    }

    /// The value a global pool starts with.
    fn global_default() -> Option<Self> {
        None
    }
}

/// Export convenience type for component type information.
pub type Info = world::TypeInfo;

/// Reject invalid flag combinations for `C` at compile time.
///
/// This is evaluated when `C`'s pool type is instantiated, so a hand-written impl with, say,
/// both `tag` and `shared` fails to build as soon as it is used.
#[inline(always)]
pub const fn assert_valid<C: Component>() {
    const {
        assert!(
            C::FLAGS.is_valid(),
            "invalid component flags: tag, shared and global are exclusive, and transient cannot be global"
        )
    }
}

/// Storage and access flags for a component type.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flags {
    tag: bool,
    shared: bool,
    global: bool,
    transient: bool,
    immutable: bool,
}

impl Flags {
    /// A normal, mutable, persistent component.
    pub const NONE: Self = Self {
        tag: false,
        shared: false,
        global: false,
        transient: false,
        immutable: false,
    };
    /// Presence-only storage.
    pub const TAG: Self = Self {
        tag: true,
        ..Self::NONE
    };
    /// One value aliased by every owning entity.
    pub const SHARED: Self = Self {
        shared: true,
        ..Self::NONE
    };
    /// One value not tied to any entity.
    pub const GLOBAL: Self = Self {
        global: true,
        ..Self::NONE
    };
    /// Pruned at the end of the cycle that exposed it.
    pub const TRANSIENT: Self = Self {
        transient: true,
        ..Self::NONE
    };
    /// Systems may only read it.
    pub const IMMUTABLE: Self = Self {
        immutable: true,
        ..Self::NONE
    };

    /// Combine two flag sets.
    pub const fn with(self, other: Self) -> Self {
        Self {
            tag: self.tag || other.tag,
            shared: self.shared || other.shared,
            global: self.global || other.global,
            transient: self.transient || other.transient,
            immutable: self.immutable || other.immutable,
        }
    }

    /// Check the compatibility rules.
    pub const fn is_valid(&self) -> bool {
        let shapes = self.tag as u8 + self.shared as u8 + self.global as u8;
        shapes <= 1 && !(self.transient && self.global)
    }

    /// The storage shape selected by these flags.
    pub const fn shape(&self) -> Shape {
        if self.tag {
            Shape::Tag
        } else if self.shared {
            Shape::Shared
        } else if self.global {
            Shape::Global
        } else {
            Shape::Normal
        }
    }

    #[inline]
    pub const fn is_transient(&self) -> bool {
        self.transient
    }

    #[inline]
    pub const fn is_immutable(&self) -> bool {
        self.immutable
    }
}

/// How a pool lays out its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// One value per entity.
    Normal,
    /// No per-entity value.
    Tag,
    /// A single value aliased by all owning entities.
    Shared,
    /// A single value with no entities.
    Global,
}

impl Shape {
    /// Whether the pool tracks entity membership. Only globals do not.
    #[inline]
    pub const fn is_entity_scoped(&self) -> bool {
        !matches!(self, Shape::Global)
    }

    /// Whether the pool stores at most one value regardless of entity count.
    #[inline]
    pub const fn is_single_value(&self) -> bool {
        !matches!(self, Shape::Normal)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Marker trait for [`Component::Mutability`].
pub trait Mutability: sealed::Sealed + 'static {
    /// Whether the component can be bound as `&mut`.
    const MUTABLE: bool;
}

/// Systems may bind the component as `&mut C`.
pub enum Mutable {}

/// Systems may only bind the component as `&C`.
pub enum Immutable {}

impl sealed::Sealed for Mutable {}
impl sealed::Sealed for Immutable {}

impl Mutability for Mutable {
    const MUTABLE: bool = true;
}

impl Mutability for Immutable {
    const MUTABLE: bool = false;
}
