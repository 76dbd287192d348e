//! System parameters.
//!
//! A system is a plain function or closure; each of its arguments is a [`Parameter`]. The
//! parameter list doubles as the system's declaration of what it needs:
//!
//! | Parameter      | Meaning                                              |
//! |----------------|------------------------------------------------------|
//! | `&C`           | read `C`; only entities holding `C` are visited      |
//! | `&mut C`       | write `C`; only for `Mutability = Mutable` types      |
//! | `With<C>`      | presence filter, no data                             |
//! | `Without<C>`   | absence filter, no data                              |
//! | `Entity`       | the id of the visited entity                         |
//! | `Commands`     | deferred structural changes                          |
//!
//! Shared and global components are bound with the same `&C` / `&mut C` forms; the pool shape
//! routes them to the single value. A global does not restrict which entities are visited.
//!
//! # Cursors
//!
//! Before a run, every parameter is positioned at the first entity of each selected range with
//! [`Parameter::begin`], producing a cursor. Values for the rest of the range are reached by
//! offset from that cursor with [`Parameter::fetch`], so the per-entity cost is one pointer
//! addition per parameter. Single-value shapes use a stride of zero.

use std::{fmt, marker::PhantomData, ptr::NonNull};

use crate::ecs::{
    component::{Component, Mutable, Shape},
    entity::Entity,
    error::Error,
    storage::Pool,
    system::command::{CommandBuffer, Commands},
    world::{TypeId, World},
};

/// What a single parameter asks of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spec {
    Read(TypeId),
    Write(TypeId),
    With(TypeId),
    Without(TypeId),
    Entity,
    Commands,
}

impl Spec {
    /// The component type this parameter names, if any.
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Spec::Read(id) | Spec::Write(id) | Spec::With(id) | Spec::Without(id) => Some(*id),
            Spec::Entity | Spec::Commands => None,
        }
    }
}

/// A value that can be passed to a system.
pub trait Parameter: Sized {
    /// The type handed to the system, borrowing world data for `'w`.
    type Value<'w>;

    /// Position of this parameter within the current range.
    type Cursor: Copy + Send + Sync + 'static;

    /// Register the parameter's types and describe what it accesses.
    fn spec(world: &mut World) -> Spec;

    /// Position a cursor at `first`.
    ///
    /// Fails if a required value is not present, which means the selection is out of date.
    fn begin(world: &mut World, first: Entity) -> Result<Self::Cursor, Error>;

    /// Produce the value for the entity `offset` places after the cursor's first entity.
    ///
    /// # Safety
    ///
    /// The cursor must come from `begin` on a range of at least `offset + 1` selected entities,
    /// the pool must not have been committed or pruned since, and no other live reference may
    /// alias a value returned as mutable.
    unsafe fn fetch<'w>(cursor: Self::Cursor, offset: usize, entity: Entity) -> Self::Value<'w>;
}

/// Pointer to the value of the first entity of a range.
pub struct Cursor<C> {
    ptr: NonNull<C>,
    stride: usize,
}

impl<C> Clone for Cursor<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Cursor<C> {}

// SAFETY: components are Send + Sync; the schedule keeps writers exclusive.
unsafe impl<C: Component> Send for Cursor<C> {}
unsafe impl<C: Component> Sync for Cursor<C> {}

impl<C> fmt::Debug for Cursor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("ptr", &self.ptr)
            .field("stride", &self.stride)
            .finish()
    }
}

impl<C: Component> Cursor<C> {
    fn begin(pool: &mut Pool<C>, first: Entity) -> Result<Self, Error> {
        let index = match pool.shape() {
            Shape::Global => pool.value().map(|_| 0).ok_or(Error::Unset {
                component: std::any::type_name::<C>(),
            })?,
            _ => pool.locate(first).ok_or(Error::Missing {
                component: std::any::type_name::<C>(),
                entity: first,
            })?,
        };
        let stride = usize::from(pool.shape() == Shape::Normal);
        // SAFETY: index addresses a live value of the column.
        let ptr = unsafe { NonNull::new_unchecked(pool.values_ptr().add(index)) };
        Ok(Self { ptr, stride })
    }

    #[inline]
    unsafe fn at(self, offset: usize) -> NonNull<C> {
        unsafe { self.ptr.add(offset * self.stride) }
    }
}

impl<C: Component> Parameter for &C {
    type Value<'w> = &'w C;
    type Cursor = Cursor<C>;

    fn spec(world: &mut World) -> Spec {
        Spec::Read(world.register::<C>())
    }

    fn begin(world: &mut World, first: Entity) -> Result<Self::Cursor, Error> {
        Cursor::begin(world.pool_mut::<C>(), first)
    }

    #[inline]
    unsafe fn fetch<'w>(cursor: Self::Cursor, offset: usize, _entity: Entity) -> Self::Value<'w> {
        unsafe { cursor.at(offset).as_ref() }
    }
}

impl<C: Component<Mutability = Mutable>> Parameter for &mut C {
    type Value<'w> = &'w mut C;
    type Cursor = Cursor<C>;

    fn spec(world: &mut World) -> Spec {
        Spec::Write(world.register::<C>())
    }

    fn begin(world: &mut World, first: Entity) -> Result<Self::Cursor, Error> {
        Cursor::begin(world.pool_mut::<C>(), first)
    }

    #[inline]
    unsafe fn fetch<'w>(cursor: Self::Cursor, offset: usize, _entity: Entity) -> Self::Value<'w> {
        unsafe { cursor.at(offset).as_mut() }
    }
}

/// Presence filter: only visit entities that hold `C`.
///
/// Several `With` filters select entities holding *any* of the named types.
pub struct With<C>(PhantomData<fn() -> C>);

/// Absence filter: skip entities that hold `C`.
pub struct Without<C>(PhantomData<fn() -> C>);

impl<C> Default for With<C> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<C> Default for Without<C> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<C: Component> Parameter for With<C> {
    type Value<'w> = With<C>;
    type Cursor = ();

    fn spec(world: &mut World) -> Spec {
        Spec::With(world.register::<C>())
    }

    fn begin(_world: &mut World, _first: Entity) -> Result<(), Error> {
        Ok(())
    }

    #[inline]
    unsafe fn fetch<'w>(_cursor: Self::Cursor, _offset: usize, _entity: Entity) -> Self::Value<'w> {
        With(PhantomData)
    }
}

impl<C: Component> Parameter for Without<C> {
    type Value<'w> = Without<C>;
    type Cursor = ();

    fn spec(world: &mut World) -> Spec {
        Spec::Without(world.register::<C>())
    }

    fn begin(_world: &mut World, _first: Entity) -> Result<(), Error> {
        Ok(())
    }

    #[inline]
    unsafe fn fetch<'w>(_cursor: Self::Cursor, _offset: usize, _entity: Entity) -> Self::Value<'w> {
        Without(PhantomData)
    }
}

impl Parameter for Entity {
    type Value<'w> = Entity;
    type Cursor = ();

    fn spec(_world: &mut World) -> Spec {
        Spec::Entity
    }

    fn begin(_world: &mut World, _first: Entity) -> Result<(), Error> {
        Ok(())
    }

    #[inline]
    unsafe fn fetch<'w>(_cursor: Self::Cursor, _offset: usize, entity: Entity) -> Self::Value<'w> {
        entity
    }
}

/// Pointer to the world's command buffer.
#[derive(Clone, Copy)]
pub struct BufferCursor {
    buffer: NonNull<CommandBuffer>,
    origin: u32,
}

// SAFETY: the command buffer is a lock-free queue shared by all workers.
unsafe impl Send for BufferCursor {}
unsafe impl Sync for BufferCursor {}

impl Parameter for Commands<'_> {
    type Value<'w> = Commands<'w>;
    type Cursor = BufferCursor;

    fn spec(_world: &mut World) -> Spec {
        Spec::Commands
    }

    fn begin(world: &mut World, _first: Entity) -> Result<BufferCursor, Error> {
        let buffer = world.commands();
        Ok(BufferCursor {
            buffer: NonNull::from(buffer),
            origin: buffer.origin(),
        })
    }

    #[inline]
    unsafe fn fetch<'w>(cursor: Self::Cursor, _offset: usize, _entity: Entity) -> Self::Value<'w> {
        Commands::new(unsafe { cursor.buffer.as_ref() }, cursor.origin)
    }
}
