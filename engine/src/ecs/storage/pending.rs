//! Staged changes for one component pool.
//!
//! Adds and removes are queued here and only applied when the pool commits. Per-entity shapes
//! keep every staged add with its source; single-value shapes keep the staged member ranges
//! and at most one staged value.

use std::{cmp::Reverse, collections::BinaryHeap, fmt};

use crate::ecs::entity::{self, Entity, Range};

/// Produces a component value for one entity at commit time.
pub type Generator<C> = Box<dyn Fn(Entity) -> C + Send + Sync>;

/// Where the values of a staged add come from.
pub enum Source<C> {
    /// One literal value, cloned for every entity of the range.
    Value { value: C, clone: fn(&C) -> C },
    /// A function evaluated once per entity of the range.
    Generator(Generator<C>),
}

impl<C> Source<C> {
    /// Stage a literal value.
    pub fn value(value: C) -> Self
    where
        C: Clone,
    {
        Source::Value {
            value,
            clone: C::clone,
        }
    }

    /// Stage a generator.
    pub fn generator(generator: impl Fn(Entity) -> C + Send + Sync + 'static) -> Self {
        Source::Generator(Box::new(generator))
    }

    /// Produce the value for `entity`.
    #[inline]
    pub fn make(&self, entity: Entity) -> C {
        match self {
            Source::Value { value, clone } => clone(value),
            Source::Generator(generator) => generator(entity),
        }
    }

    /// Consume the source, producing the value for `entity`.
    pub fn into_value(self, entity: Entity) -> C {
        match self {
            Source::Value { value, .. } => value,
            Source::Generator(generator) => generator(entity),
        }
    }
}

impl<C> fmt::Debug for Source<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Value { .. } => write!(f, "Value"),
            Source::Generator(_) => write!(f, "Generator"),
        }
    }
}

/// A staged add for a per-entity pool.
#[derive(Debug)]
pub struct Add<C> {
    pub range: Range,
    pub source: Source<C>,
}

/// The queue of staged changes of one pool.
#[derive(Debug)]
pub struct Pending<C> {
    /// Per-entity adds, in staging order.
    pub adds: Vec<Add<C>>,
    /// Ranges joining a single-value pool.
    pub members: Vec<Range>,
    /// The staged value of a single-value pool.
    pub value: Option<C>,
    /// Ranges to remove after the adds are applied.
    pub removes: Vec<Range>,
}

impl<C> Default for Pending<C> {
    fn default() -> Self {
        Self {
            adds: Vec::new(),
            members: Vec::new(),
            value: None,
            removes: Vec::new(),
        }
    }
}

impl<C> Pending<C> {
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty()
            && self.members.is_empty()
            && self.value.is_none()
            && self.removes.is_empty()
    }

    /// Every range that gains the component in this cycle.
    pub fn added_ranges(&self) -> impl Iterator<Item = Range> + '_ {
        self.adds
            .iter()
            .map(|add| add.range)
            .chain(self.members.iter().copied())
    }

    /// Resolve overlapping adds so that the latest add wins.
    ///
    /// Returns disjoint pieces sorted by range, each tagged with the index of the add that
    /// supplies its values, plus the coalesced union of all added ranges.
    pub fn resolve_adds(&self) -> (Vec<(Range, usize)>, Vec<Range>) {
        let mut order: Vec<usize> = (0..self.adds.len()).collect();
        order.sort_unstable_by_key(|&index| (self.adds[index].range.first(), Reverse(index)));

        let disjoint = order
            .windows(2)
            .all(|pair| self.adds[pair[0]].range.last() < self.adds[pair[1]].range.first());
        let pieces: Vec<(Range, usize)> = if disjoint {
            order
                .iter()
                .map(|&index| (self.adds[index].range, index))
                .collect()
        } else {
            self.sweep(&order)
        };

        let mut covered: Vec<Range> = pieces.iter().map(|(range, _)| *range).collect();
        entity::coalesce(&mut covered);
        (pieces, covered)
    }

    /// Cut overlapping adds into pieces owned by the highest covering add index.
    ///
    /// `order` lists add indices by first entity, latest add first on ties.
    fn sweep(&self, order: &[usize]) -> Vec<(Range, usize)> {
        let start = |index: usize| u64::from(self.adds[index].range.first().id());
        let end = |index: usize| u64::from(self.adds[index].range.last().id());

        let mut pieces: Vec<(Range, usize)> = Vec::with_capacity(order.len() * 2);
        // Adds covering the cursor, latest on top. Entries that ended are popped lazily.
        let mut active: BinaryHeap<(usize, u64)> = BinaryHeap::new();
        let mut cursor = 0u64;
        let mut next = 0;
        loop {
            if active.is_empty() {
                let Some(&index) = order.get(next) else {
                    break;
                };
                cursor = cursor.max(start(index));
            }
            while let Some(&index) = order.get(next)
                && start(index) <= cursor
            {
                active.push((index, end(index)));
                next += 1;
            }
            while active.peek().is_some_and(|&(_, last)| last < cursor) {
                active.pop();
            }
            let Some(&(owner, last)) = active.peek() else {
                continue;
            };

            // The piece stops where the next add starts, since that add may be later
            let stop = match order.get(next) {
                Some(&index) => last.min(start(index) - 1),
                None => last,
            };
            let piece = Range::new(cursor as u32, stop as u32);
            match pieces.last_mut() {
                Some((prev, index)) if *index == owner && prev.adjacent(&piece) => {
                    *prev = Range::new(prev.first(), piece.last());
                }
                _ => pieces.push((piece, owner)),
            }
            cursor = stop + 1;
        }
        pieces
    }
}
