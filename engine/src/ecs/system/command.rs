//! Deferred command buffer for structural changes requested by systems.
//!
//! Systems run while pools are borrowed for iteration, so they can not stage adds or removes
//! directly. Instead they push commands into a shared, lock-free buffer through the
//! [`Commands`] parameter. The runtime moves every queued command into the pools' pending
//! queues at the end of `run_systems`, and the changes become visible at the next commit.
//!
//! # Lifecycle
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        run_systems                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  System A ──push──┐                                         │
//! │  System B ──push──┼──► CommandBuffer ──flush──► pending     │
//! │  System C ──push──┘                             queues      │
//! └─────────────────────────────────────────────────────────────┘
//!                                                   │
//!                         commit_changes ◄──────────┘
//! ```
//!
//! Systems in one group push from different workers at the same time. Every command is tagged
//! with the index of the system that queued it and a sequence number, and [`CommandBuffer::drain`]
//! returns them ordered by system index, then by push order. The outcome of a run therefore does
//! not depend on how the workers interleaved.
//!
//! # Example
//!
//! ```rust,ignore
//! runtime.make_system(|entity: Entity, _: &Timer, mut commands: Commands| {
//!     commands.remove_component::<Timer>(entity);
//!     commands.add_component(entity, Expired);
//! });
//! ```

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crossbeam::queue::SegQueue;

use crate::ecs::{
    component::{Component, Set, Types},
    entity::{Entity, Range},
    world::World,
};

type Apply = Box<dyn FnOnce(&mut World) + Send>;

/// A deferred structural change.
pub enum Command {
    /// Stage component values for a range of entities.
    AddComponents { range: Range, apply: Apply },
    /// Stage removal of component types from a range of entities.
    RemoveComponents { range: Range, apply: Apply },
    /// Stage a new value for a global component.
    SetGlobal { component: &'static str, apply: Apply },
}

impl Command {
    /// Apply the command to the world's pending queues.
    pub fn apply(self, world: &mut World) {
        match self {
            Command::AddComponents { apply, .. }
            | Command::RemoveComponents { apply, .. }
            | Command::SetGlobal { apply, .. } => apply(world),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::AddComponents { range, .. } => {
                f.debug_struct("AddComponents").field("range", range).finish()
            }
            Command::RemoveComponents { range, .. } => f
                .debug_struct("RemoveComponents")
                .field("range", range)
                .finish(),
            Command::SetGlobal { component, .. } => f
                .debug_struct("SetGlobal")
                .field("component", component)
                .finish(),
        }
    }
}

/// A command tagged with where and when it was queued.
struct Queued {
    origin: u32,
    seq: u64,
    command: Command,
}

/// Thread-safe command buffer using a lock-free queue.
///
/// `push()` is lock-free and can be called from any worker; `drain()` is called by the runtime
/// with exclusive world access.
#[derive(Default)]
pub struct CommandBuffer {
    commands: SegQueue<Queued>,
    seq: AtomicU64,
    origin: u32,
}

impl CommandBuffer {
    /// Create a new empty command buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the system index that [`Commands`] created from now on record as their origin.
    pub fn set_origin(&mut self, origin: u32) {
        self.origin = origin;
    }

    #[inline]
    pub fn origin(&self) -> u32 {
        self.origin
    }

    /// Push a command queued by the system with index `origin`.
    pub fn push(&self, origin: u32, command: Command) {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.commands.push(Queued {
            origin,
            seq,
            command,
        });
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drain all commands, ordered by origin and then by push order.
    pub fn drain(&self) -> Vec<Command> {
        let mut queued = Vec::with_capacity(self.commands.len());
        while let Some(entry) = self.commands.pop() {
            queued.push(entry);
        }
        queued.sort_unstable_by_key(|entry| (entry.origin, entry.seq));
        queued.into_iter().map(|entry| entry.command).collect()
    }
}

/// System parameter for staging structural changes from inside a system.
///
/// Each system invocation gets its own `Commands` pointing at the runtime's shared buffer.
/// The API mirrors the runtime's bulk mutation methods.
#[derive(Clone, Copy)]
pub struct Commands<'w> {
    buffer: &'w CommandBuffer,
    origin: u32,
}

impl<'w> Commands<'w> {
    pub(crate) fn new(buffer: &'w CommandBuffer, origin: u32) -> Self {
        Self { buffer, origin }
    }

    fn push(&self, command: Command) {
        self.buffer.push(self.origin, command);
    }

    /// Stage one component or a tuple of components for every entity in `range`.
    pub fn add_component<S: Set>(&mut self, range: impl Into<Range>, set: S) {
        let range = range.into();
        self.push(Command::AddComponents {
            range,
            apply: Box::new(move |world: &mut World| world.add_components(range, set)),
        });
    }

    /// Stage a component computed per entity by `generator`.
    pub fn add_component_with<C, F>(&mut self, range: impl Into<Range>, generator: F)
    where
        C: Component,
        F: Fn(Entity) -> C + Send + Sync + 'static,
    {
        let range = range.into();
        self.push(Command::AddComponents {
            range,
            apply: Box::new(move |world: &mut World| world.add_component_with(range, generator)),
        });
    }

    /// Stage removal of one component type or a tuple of types.
    pub fn remove_component<T: Types>(&mut self, range: impl Into<Range>) {
        let range = range.into();
        self.push(Command::RemoveComponents {
            range,
            apply: Box::new(move |world: &mut World| world.remove_components::<T>(range)),
        });
    }

    /// Stage a new value for a global component.
    pub fn set_global<C: Component>(&mut self, value: C) {
        self.push(Command::SetGlobal {
            component: std::any::type_name::<C>(),
            apply: Box::new(move |world: &mut World| world.set_global(value)),
        });
    }
}
