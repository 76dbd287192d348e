//! Per-system registration options.

use std::{
    cmp::Ordering,
    fmt,
    time::{Duration, Instant},
};

use crate::ecs::{component::Component, entity::Entity, world::TypeId, world::World};

/// When a system is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Policy {
    /// Every cycle.
    #[default]
    Always,
    /// Only through an explicit `run_system`/`update_system` call.
    Manual,
    /// At most this many times per second.
    Frequency(f64),
    /// At most once per interval.
    Interval(Duration),
}

impl Policy {
    /// Minimum time between two runs, if the policy caps it.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Policy::Frequency(hz) => Some(Duration::from_secs_f64(1.0 / hz)),
            Policy::Interval(interval) => Some(*interval),
            Policy::Always | Policy::Manual => None,
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        match self {
            Policy::Frequency(hz) => hz.is_finite() && *hz > 0.0,
            _ => true,
        }
    }
}

type Compare = Box<dyn Fn(&World, Entity, Entity) -> Ordering + Send + Sync>;

/// Comparator ordering a system's entities by the values of one component type.
pub struct Sorter {
    register: fn(&mut World) -> TypeId,
    compare: Compare,
}

impl Sorter {
    fn new<C, F>(compare: F) -> Self
    where
        C: Component,
        F: Fn(&C, &C) -> Ordering + Send + Sync + 'static,
    {
        Self {
            register: |world| world.register::<C>(),
            compare: Box::new(move |world, a, b| {
                let pool = world.pool::<C>();
                match (pool.and_then(|p| p.get(a)), pool.and_then(|p| p.get(b))) {
                    (Some(a), Some(b)) => compare(a, b),
                    _ => Ordering::Equal,
                }
            }),
        }
    }

    /// Register the sorted component type and return its id.
    pub(crate) fn register(&self, world: &mut World) -> TypeId {
        (self.register)(world)
    }

    /// Stable sort of `entities`; ties keep their current order.
    pub(crate) fn sort(&self, world: &World, entities: &mut [Entity]) {
        entities.sort_by(|a, b| (self.compare)(world, *a, *b));
    }
}

impl fmt::Debug for Sorter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sorter").finish_non_exhaustive()
    }
}

/// Optional configuration supplied with a system.
///
/// ```rust,ignore
/// let options = Options::new()
///     .sort_by::<Depth>(|a, b| a.0.cmp(&b.0))
///     .frequency(10.0)
///     .not_parallel();
/// ```
#[derive(Debug, Default)]
pub struct Options {
    pub(crate) policy: Policy,
    pub(crate) not_parallel: bool,
    pub(crate) sorter: Option<Sorter>,
    pub(crate) name: Option<String>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visit entities ordered by `compare` over their `C` values instead of by id.
    ///
    /// `C` must also be a parameter of the system.
    pub fn sort_by<C, F>(mut self, compare: F) -> Self
    where
        C: Component,
        F: Fn(&C, &C) -> Ordering + Send + Sync + 'static,
    {
        self.sorter = Some(Sorter::new(compare));
        self
    }

    /// Skip the system in `run_systems`; it only runs when invoked through its handle.
    pub fn manual_update(mut self) -> Self {
        self.policy = Policy::Manual;
        self
    }

    /// Run at most `hz` times per second.
    pub fn frequency(mut self, hz: f64) -> Self {
        self.policy = Policy::Frequency(hz);
        self
    }

    /// Run at most once per `interval`.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.policy = Policy::Interval(interval);
        self
    }

    /// Never run alongside other systems.
    pub fn not_parallel(mut self) -> Self {
        self.not_parallel = true;
        self
    }

    /// Name used in logs and diagnostics instead of the function's type name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }
}

/// Rate limiter for frequency and interval policies.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Gate {
    period: Option<Duration>,
    last: Option<Instant>,
}

impl Gate {
    pub(crate) fn new(policy: &Policy) -> Self {
        Self {
            period: policy.period(),
            last: None,
        }
    }

    /// Whether the system may run at `now`. Records `now` as the last run if so.
    pub(crate) fn check(&mut self, now: Instant) -> bool {
        let open = match (self.period, self.last) {
            (Some(period), Some(last)) => now.saturating_duration_since(last) >= period,
            _ => true,
        };
        if open {
            self.last = Some(now);
        }
        open
    }
}
