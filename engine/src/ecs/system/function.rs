//! Function systems.
//!
//! Any function or closure whose arguments all implement [`Parameter`] can be registered as a
//! system:
//!
//! ```rust,ignore
//! fn movement(pos: &mut Position, vel: &Velocity) {
//!     pos.x += vel.dx;
//! }
//!
//! runtime.make_system(movement)?;
//! ```
//!
//! [`WithSystemParams`] bridges the elided lifetimes of the written signature and the world
//! lifetime used when the system runs. Its implementations rely on a Higher-Ranked Trait Bound:
//!
//! ```rust,ignore
//! for<'w> &'w mut Func: FnMut(A, B) + FnMut(A::Value<'w>, B::Value<'w>)
//! ```
//!
//! The function must accept both the parameter types as written and the runtime values for
//! any world lifetime `'w`.
//!
//! # Running
//!
//! A function system runs in two steps. [`Runner::prepare`] binds cursors for every selected
//! range while holding `&mut World`. [`Runner::run`] then walks those ranges without touching
//! the world, which lets the schedule run several prepared systems on worker threads at once.

use std::marker::PhantomData;

use crate::{
    all_tuples,
    ecs::{
        entity::{Entity, Range},
        error::Error,
        system::param::{Parameter, Spec},
        world::World,
    },
};

/// Trait enabling functions to be called with system parameters.
///
/// Implemented for functions of 0 to 16 parameters. Not meant to be implemented by hand.
pub trait WithSystemParams<Params>: Send + 'static {
    /// Cursor tuple for every parameter.
    type Cursors: Copy + Send + Sync + 'static;

    /// Describe every parameter, registering its types.
    fn specs(world: &mut World) -> Vec<Spec>;

    /// Bind every parameter at `first`.
    fn begin(world: &mut World, first: Entity) -> Result<Self::Cursors, Error>;

    /// Call the function for the entity `offset` places after the cursors' first entity.
    ///
    /// # Safety
    ///
    /// See [`Parameter::fetch`].
    unsafe fn call(&mut self, cursors: Self::Cursors, offset: usize, entity: Entity);
}

impl<Func> WithSystemParams<()> for Func
where
    Func: FnMut() + Send + 'static,
{
    type Cursors = ();

    fn specs(_world: &mut World) -> Vec<Spec> {
        Vec::new()
    }

    fn begin(_world: &mut World, _first: Entity) -> Result<(), Error> {
        Ok(())
    }

    unsafe fn call(&mut self, _cursors: (), _offset: usize, _entity: Entity) {
        self();
    }
}

macro_rules! system_param_function {
    ($($param:ident),*) => {
        impl<Func, $($param: Parameter),*> WithSystemParams<($($param,)*)> for Func
        where
            Func: Send + 'static,
            for<'w> &'w mut Func: FnMut($($param),*) + FnMut($($param::Value<'w>),*),
        {
            type Cursors = ($($param::Cursor,)*);

            fn specs(world: &mut World) -> Vec<Spec> {
                vec![$($param::spec(world)),*]
            }

            fn begin(world: &mut World, first: Entity) -> Result<Self::Cursors, Error> {
                Ok(($($param::begin(world, first)?,)*))
            }

            unsafe fn call(&mut self, cursors: Self::Cursors, offset: usize, entity: Entity) {
                // Calling self directly does not pick the runtime signature.
                #[allow(clippy::too_many_arguments, non_snake_case)]
                fn call_it<$($param),*>(mut func: impl FnMut($($param),*), $($param: $param),*) {
                    func($($param),*);
                }

                #[allow(non_snake_case)]
                let ($($param,)*) = cursors;
                $(
                    #[allow(non_snake_case)]
                    let $param = unsafe { $param::fetch($param, offset, entity) };
                )*
                call_it(self, $($param),*);
            }
        }
    };
}

all_tuples!(system_param_function);

/// Type-erased system body.
pub(crate) trait Runner: Send {
    /// Bind cursors for every chunk. Systems that are not entity scoped are bound once.
    fn prepare(&mut self, world: &mut World, chunks: &[Range], scoped: bool)
    -> Result<(), Error>;

    /// Number of function calls the next run will make.
    fn pending_calls(&self) -> usize;

    /// Call the function for every prepared entity, then forget the bindings.
    ///
    /// # Safety
    ///
    /// The world must not have been committed, pruned or otherwise restructured since
    /// `prepare`, and no system with conflicting access may run at the same time.
    unsafe fn run(&mut self);
}

/// Runner for a [`WithSystemParams`] function.
pub(crate) struct FunctionRunner<F, P>
where
    F: WithSystemParams<P>,
{
    func: F,
    prepared: Vec<(Range, F::Cursors)>,
    marker: PhantomData<fn() -> P>,
}

impl<F, P> FunctionRunner<F, P>
where
    F: WithSystemParams<P>,
{
    pub(crate) fn new(func: F) -> Self {
        Self {
            func,
            prepared: Vec::new(),
            marker: PhantomData,
        }
    }
}

impl<F, P> Runner for FunctionRunner<F, P>
where
    F: WithSystemParams<P>,
{
    fn prepare(
        &mut self,
        world: &mut World,
        chunks: &[Range],
        scoped: bool,
    ) -> Result<(), Error> {
        self.prepared.clear();
        if !scoped {
            let origin = Range::single(Entity::default());
            self.prepared.push((origin, F::begin(world, origin.first())?));
            return Ok(());
        }
        self.prepared.reserve(chunks.len());
        for chunk in chunks {
            let cursors = F::begin(world, chunk.first())?;
            self.prepared.push((*chunk, cursors));
        }
        Ok(())
    }

    fn pending_calls(&self) -> usize {
        self.prepared.iter().map(|(range, _)| range.count()).sum()
    }

    unsafe fn run(&mut self) {
        for (range, cursors) in self.prepared.drain(..) {
            for (offset, entity) in range.iter().enumerate() {
                unsafe { self.func.call(cursors, offset, entity) };
            }
        }
    }
}
