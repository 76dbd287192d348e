//! Systems: user callbacks bound to component parameters.
//!
//! # Overview
//!
//! A system is a function whose arguments are [`Parameter`]s. Registering it records what it
//! reads, writes and filters on; running it calls the function once per selected entity.
//!
//! ```rust,ignore
//! use strata::ecs::{Entity, Runtime, system::{Options, Without}};
//!
//! #[derive(Component, Clone)]
//! struct Position { x: f32 }
//!
//! #[derive(Component, Clone)]
//! struct Velocity { dx: f32 }
//!
//! #[derive(Component, Clone)]
//! #[component(tag)]
//! struct Frozen;
//!
//! fn movement(pos: &mut Position, vel: &Velocity, _: Without<Frozen>) {
//!     pos.x += vel.dx;
//! }
//!
//! let mut runtime = Runtime::new();
//! runtime.make_system(movement)?;
//! runtime.make_system_with(Options::new().frequency(10.0), |e: Entity, pos: &Position| {
//!     println!("{e}: {}", pos.x);
//! })?;
//! ```
//!
//! # Life cycle
//!
//! ```text
//!   registered ──prepare──▶ built ──run──▶ ready
//!        ▲                     │
//!        └── pool versions ────┘
//! ```
//!
//! - **Registration** validates the parameter list and computes the system's [`Access`].
//! - **Prepare** checks the rate limit, rebuilds the entity selection when any pool it depends
//!   on has a new version, sorts it if a comparator was given, and binds parameter cursors.
//! - **Run** calls the function. It needs no world access, so prepared systems with disjoint
//!   footprints can run on different threads.
//!
//! # Scope
//!
//! A system is *entity scoped* when at least one `&C` or `&mut C` parameter names a normal, tag
//! or shared type. Scoped systems are called once per selected entity. All other systems
//! (globals only, `Commands` only, or no parameters) are called exactly once per run.

use std::time::Instant;

use log::debug;

use crate::ecs::{
    contract::Violation,
    entity::{Entity, Range},
    error::Error,
    world::{Access, TypeId, World},
};

mod command;
mod function;
mod options;
mod param;
mod selection;

pub use command::{Command, CommandBuffer, Commands};
pub use function::WithSystemParams;
pub use options::{Options, Policy};
pub use param::{Parameter, Spec, With, Without};

use function::{FunctionRunner, Runner};
use options::{Gate, Sorter};
use selection::Selection;

/// Index of a registered system within its runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SystemHandle(u32);

impl SystemHandle {
    #[inline]
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Get the index of this system in the runtime's system list.
    #[inline]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A registered system.
pub struct System {
    name: String,
    specs: Vec<Spec>,
    access: Access,
    policy: Policy,
    gate: Gate,
    sorter: Option<Sorter>,
    scoped: bool,
    selection: Selection,
    sorted: Vec<Range>,
    runner: Box<dyn Runner>,
}

impl System {
    fn new(
        name: String,
        specs: Vec<Spec>,
        options: Options,
        runner: Box<dyn Runner>,
        world: &mut World,
    ) -> Result<Self, Violation> {
        if !options.policy.is_valid() {
            return Err(Violation::precondition(format!(
                "system {name}: invalid policy {:?}",
                options.policy
            )));
        }

        let mut access = Access::new();
        let mut seen: Vec<TypeId> = Vec::new();
        let mut bound: Vec<TypeId> = Vec::new();
        let (mut required, mut with, mut without) = (Vec::new(), Vec::new(), Vec::new());
        let mut scoped = false;
        let mut needs_scope = None;

        for spec in &specs {
            if let Some(id) = spec.type_id() {
                if seen.contains(&id) {
                    return Err(Violation::precondition(format!(
                        "system {name}: component {} is named more than once",
                        world.types().name(id)
                    )));
                }
                seen.push(id);
            }
            match *spec {
                Spec::Read(id) | Spec::Write(id) => {
                    if matches!(spec, Spec::Write(_)) {
                        access.add_write(id);
                    } else {
                        access.add_read(id);
                    }
                    bound.push(id);
                    let shape = world.types().info(id).map(|info| info.shape());
                    if shape.is_some_and(|shape| shape.is_entity_scoped()) {
                        scoped = true;
                        required.push(id);
                    }
                }
                Spec::With(id) => {
                    with.push(id);
                    needs_scope = needs_scope.or(Some("With"));
                }
                Spec::Without(id) => {
                    without.push(id);
                    needs_scope = needs_scope.or(Some("Without"));
                }
                Spec::Entity => needs_scope = needs_scope.or(Some("Entity")),
                Spec::Commands => {}
            }
        }

        if let Some(parameter) = needs_scope
            && !scoped
        {
            return Err(Violation::precondition(format!(
                "system {name}: {parameter} parameter without an entity scoped component"
            )));
        }

        for (i, a) in bound.iter().enumerate() {
            for b in &bound[i + 1..] {
                if world.variants().connected(*a, *b) {
                    return Err(Violation::precondition(format!(
                        "system {name}: {} and {} are variants and never coexist",
                        world.types().name(*a),
                        world.types().name(*b)
                    )));
                }
            }
        }

        if let Some(sorter) = &options.sorter {
            let id = sorter.register(world);
            if !bound.contains(&id) {
                return Err(Violation::precondition(format!(
                    "system {name}: sort type {} is not a parameter",
                    world.types().name(id)
                )));
            }
        }

        if options.not_parallel || options.sorter.is_some() || options.policy == Policy::Manual {
            access.set_exclusive();
        }

        debug!("registered system {name}: {specs:?}");
        Ok(Self {
            name,
            specs,
            access,
            policy: options.policy,
            gate: Gate::new(&options.policy),
            sorter: options.sorter,
            scoped,
            selection: Selection::new(required, with, without),
            sorted: Vec::new(),
            runner,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn specs(&self) -> &[Spec] {
        &self.specs
    }

    /// Read and write footprint used for planning.
    pub fn access(&self) -> &Access {
        &self.access
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn is_manual(&self) -> bool {
        self.policy == Policy::Manual
    }

    pub fn is_scoped(&self) -> bool {
        self.scoped
    }

    /// Get ready to run at `now`.
    ///
    /// Returns `Ok(false)` when the rate limit denies this tick. On `Ok(true)` the system must
    /// be [run](System::run) before the world changes again.
    pub(crate) fn prepare(&mut self, world: &mut World, now: Instant) -> Result<bool, Error> {
        if !self.gate.check(now) {
            return Ok(false);
        }

        if self.scoped && self.selection.is_stale(world) {
            self.selection.rebuild(world);
        }

        let chunks = match &self.sorter {
            Some(sorter) if self.scoped => {
                let mut entities: Vec<Entity> =
                    self.selection.ranges().iter().flat_map(Range::iter).collect();
                sorter.sort(world, &mut entities);
                self.sorted = runs(&entities);
                &self.sorted[..]
            }
            _ => self.selection.ranges(),
        };

        if let Err(error) = self.runner.prepare(world, chunks, self.scoped) {
            self.selection.invalidate();
            return Err(error);
        }
        Ok(true)
    }

    /// Call the function for every prepared entity.
    ///
    /// # Safety
    ///
    /// The system must have been prepared and the world left untouched since. Systems that run
    /// at the same time must not conflict.
    pub(crate) unsafe fn run(&mut self) {
        unsafe { self.runner.run() };
    }

    /// Number of calls the next run will make.
    pub fn pending_calls(&self) -> usize {
        self.runner.pending_calls()
    }
}

impl std::fmt::Debug for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name)
            .field("specs", &self.specs)
            .field("policy", &self.policy)
            .field("scoped", &self.scoped)
            .finish_non_exhaustive()
    }
}

/// Split an ordered entity list into maximal runs of consecutive ascending ids.
fn runs(entities: &[Entity]) -> Vec<Range> {
    let mut runs: Vec<Range> = Vec::new();
    for entity in entities {
        match runs.last_mut() {
            Some(run) if run.last().id().checked_add(1) == Some(entity.id()) => {
                *run = Range::new(run.first(), *entity);
            }
            _ => runs.push(Range::single(*entity)),
        }
    }
    runs
}

/// Conversion of functions into systems.
pub trait IntoSystem<Marker> {
    /// Validate the parameter list against `world` and build the system.
    fn into_system(self, options: Options, world: &mut World) -> Result<System, Violation>;
}

impl<F, P> IntoSystem<P> for F
where
    F: WithSystemParams<P>,
    P: 'static,
{
    fn into_system(self, mut options: Options, world: &mut World) -> Result<System, Violation> {
        let name = options
            .name
            .take()
            .unwrap_or_else(|| std::any::type_name::<F>().to_string());
        let specs = F::specs(world);
        let runner = Box::new(FunctionRunner::<F, P>::new(self));
        System::new(name, specs, options, runner, world)
    }
}
