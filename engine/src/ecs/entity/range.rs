//! Inclusive entity ranges and sorted range-list algebra.
//!
//! A [`Range`] is the addressing unit for all bulk operations. Pools store their committed
//! entities as a sorted, coalesced list of ranges, and the argument builder computes system
//! selections by intersecting and subtracting those lists.
//!
//! # Range lists
//!
//! The free functions in this module operate on *range lists*: slices of ranges sorted by
//! `first` with no overlaps. Lists produced by [`coalesce`] additionally have no adjacent ranges.
//! All list operations run in linear time over the combined input length.
//!
//! ```rust,ignore
//! let a = vec![Range::new(0, 9)];
//! let b = vec![Range::new(3, 4), Range::new(8, 12)];
//!
//! assert_eq!(intersect_lists(&a, &b), vec![Range::new(3, 4), Range::new(8, 9)]);
//! assert_eq!(subtract_lists(&a, &b), vec![Range::new(0, 2), Range::new(5, 7)]);
//! ```

use std::ops::RangeInclusive;

use crate::ecs::entity::Entity;

/// An inclusive interval of entities, `[first, last]`.
///
/// # Invariants
///
/// `first <= last` always holds; constructing a range that violates it panics.
///
/// Equality and ordering are lexicographic on `(first, last)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Range {
    first: Entity,
    last: Entity,
}

impl Range {
    /// Create a new range covering `first..=last`.
    ///
    /// # Panics
    ///
    /// Panics if `first > last`.
    #[inline]
    pub fn new(first: impl Into<Entity>, last: impl Into<Entity>) -> Self {
        let (first, last) = (first.into(), last.into());
        assert!(
            first <= last,
            "invalid entity range: first ({first}) is greater than last ({last})"
        );
        Self { first, last }
    }

    /// Create a range containing a single entity.
    #[inline]
    pub const fn single(entity: Entity) -> Self {
        Self {
            first: entity,
            last: entity,
        }
    }

    /// The first entity in the range.
    #[inline]
    pub const fn first(&self) -> Entity {
        self.first
    }

    /// The last entity in the range.
    #[inline]
    pub const fn last(&self) -> Entity {
        self.last
    }

    /// Number of entities in the range. Never zero.
    #[inline]
    pub const fn count(&self) -> usize {
        (self.last.id() - self.first.id()) as usize + 1
    }

    /// Check if the entity is inside this range.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.first <= entity && entity <= self.last
    }

    /// Check if `other` lies entirely inside this range.
    #[inline]
    pub fn contains_range(&self, other: &Range) -> bool {
        self.first <= other.first && other.last <= self.last
    }

    /// Check if the two ranges share at least one entity.
    #[inline]
    pub fn overlaps(&self, other: &Range) -> bool {
        self.first <= other.last && other.first <= self.last
    }

    /// Check if the two ranges touch without overlapping (`a.last + 1 == b.first` in either
    /// direction).
    #[inline]
    pub fn adjacent(&self, other: &Range) -> bool {
        let touches = |a: &Range, b: &Range| a.last.id() as u64 + 1 == b.first.id() as u64;
        touches(self, other) || touches(other, self)
    }

    /// Merge two overlapping or adjacent ranges into one spanning both.
    ///
    /// Returns `None` when the ranges are disjoint and not adjacent.
    #[inline]
    pub fn merge(&self, other: &Range) -> Option<Range> {
        if !self.overlaps(other) && !self.adjacent(other) {
            return None;
        }
        Some(Range {
            first: self.first.min(other.first),
            last: self.last.max(other.last),
        })
    }

    /// The entities common to both ranges, if any.
    ///
    /// The result, when present, satisfies `result.first >= max(firsts)` and
    /// `result.last <= min(lasts)`.
    #[inline]
    pub fn intersect(&self, other: &Range) -> Option<Range> {
        let first = self.first.max(other.first);
        let last = self.last.min(other.last);
        (first <= last).then_some(Range { first, last })
    }

    /// Remove `other` from this range.
    ///
    /// Returns the piece before `other` and the piece after it. A range that does not overlap
    /// `other` is returned unchanged as the first piece.
    pub fn difference(&self, other: &Range) -> (Option<Range>, Option<Range>) {
        if !self.overlaps(other) {
            return (Some(*self), None);
        }
        let before = (other.first > self.first).then(|| Range {
            first: self.first,
            last: Entity::new(other.first.id() - 1),
        });
        let after = (other.last < self.last).then(|| Range {
            first: Entity::new(other.last.id() + 1),
            last: self.last,
        });
        (before, after)
    }

    /// Position of `entity` within this range.
    #[inline]
    pub fn offset_of(&self, entity: Entity) -> usize {
        debug_assert!(self.contains(entity), "{entity} is not in {self:?}");
        (entity.id() - self.first.id()) as usize
    }

    /// Iterate over every entity in the range, in ascending order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = Entity> + use<> {
        (self.first.id()..=self.last.id()).map(Entity::new)
    }
}

impl From<Entity> for Range {
    #[inline]
    fn from(entity: Entity) -> Self {
        Range::single(entity)
    }
}

impl From<u32> for Range {
    #[inline]
    fn from(id: u32) -> Self {
        Range::single(Entity::new(id))
    }
}

impl From<RangeInclusive<u32>> for Range {
    #[inline]
    fn from(range: RangeInclusive<u32>) -> Self {
        Range::new(*range.start(), *range.end())
    }
}

/// Total number of entities in a range list.
#[inline]
pub fn count_entities(ranges: &[Range]) -> usize {
    ranges.iter().map(Range::count).sum()
}

/// Sort ranges and merge every overlapping or adjacent pair.
pub fn coalesce(ranges: &mut Vec<Range>) {
    if ranges.len() < 2 {
        return;
    }
    ranges.sort_unstable();
    let mut write = 0;
    for read in 1..ranges.len() {
        match ranges[write].merge(&ranges[read]) {
            Some(merged) => ranges[write] = merged,
            None => {
                write += 1;
                ranges[write] = ranges[read];
            }
        }
    }
    ranges.truncate(write + 1);
}

/// Entities present in both lists.
pub fn intersect_lists(a: &[Range], b: &[Range]) -> Vec<Range> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if let Some(common) = a[i].intersect(&b[j]) {
            out.push(common);
        }
        if a[i].last < b[j].last {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

/// Entities present in either list. The result is coalesced.
pub fn union_lists(a: &[Range], b: &[Range]) -> Vec<Range> {
    let mut out: Vec<Range> = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        let next = if j >= b.len() || (i < a.len() && a[i] <= b[j]) {
            i += 1;
            a[i - 1]
        } else {
            j += 1;
            b[j - 1]
        };
        if let Some(prev) = out.last_mut()
            && let Some(merged) = prev.merge(&next)
        {
            *prev = merged;
            continue;
        }
        out.push(next);
    }
    out
}

/// Entities present in `a` but not in `b`.
pub fn subtract_lists(a: &[Range], b: &[Range]) -> Vec<Range> {
    let mut out = Vec::with_capacity(a.len());
    let mut start = 0;
    for &range in a {
        while start < b.len() && b[start].last < range.first {
            start += 1;
        }
        let mut current = Some(range);
        let mut k = start;
        while let Some(piece) = current {
            if k >= b.len() || b[k].first > piece.last {
                out.push(piece);
                break;
            }
            let (before, after) = piece.difference(&b[k]);
            if let Some(before) = before {
                out.push(before);
            }
            current = after;
            k += 1;
        }
    }
    out
}
