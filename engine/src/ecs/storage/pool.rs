//! Per-type component pools.
//!
//! A [`Pool`] owns every value of one component type. Committed entities are kept as a sorted,
//! coalesced list of ranges; per-entity values are packed in a [`Column`] in the same order, so
//! range `i` owns the values `offsets[i] .. offsets[i] + ranges[i].count()`.
//!
//! ```text
//! ranges:  [ 0..=2 ]        [ 10..=11 ]
//! offsets:   0                3
//! column:  [ v0 | v1 | v2 | v10 | v11 ]
//! ```
//!
//! Single-value shapes (tag, shared, global) keep the entity ranges but at most one value.
//!
//! # Commit
//!
//! Changes are staged in a [`Pending`] queue and applied by [`Pool::commit`] in one sorted pass:
//!
//! 1. Staged adds are resolved so that the latest add wins on overlap.
//! 2. Committed entities covered by an add are replaced; the rest keep their values.
//! 3. Staged removes are applied to the merged result.
//! 4. Surviving pieces are written into a fresh column in entity order and adjacent ranges are
//!    coalesced.
//!
//! Generators run once for every entity that survives the commit and never for entities that
//! are overwritten or removed in the same commit.

use std::{any::Any, sync::Arc};

use crate::ecs::{
    component::{self, Component, Shape},
    entity::{self, Entity, Range},
    error::Error,
    storage::{
        ErasedPool,
        column::Column,
        memory::{MemoryResource, system_resource},
        pending::{Add, Pending, Source},
    },
    world::TypeInfo,
};

/// Summary of a single commit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Commit {
    /// Entities that received a value from a staged add.
    pub added: usize,
    /// Entity count before the commit minus the count after, if positive.
    pub removed: usize,
    /// Whether the committed entity count changed.
    pub changed: bool,
}

/// Where the values of a merged piece come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    /// Existing values starting at this column offset.
    Committed(usize),
    /// The staged add with this index.
    Staged(usize),
}

fn staged_count(pieces: &[(Range, Origin)]) -> usize {
    pieces
        .iter()
        .filter(|(_, origin)| matches!(origin, Origin::Staged(_)))
        .map(|(range, _)| range.count())
        .sum()
}

/// Storage for every value of component `C`.
pub struct Pool<C: Component> {
    info: TypeInfo,
    shape: Shape,
    transient: bool,
    ranges: Vec<Range>,
    offsets: Vec<usize>,
    column: Column<C>,
    pending: Pending<C>,
    changed: bool,
    version: u64,
}

impl<C: Component> Pool<C> {
    /// Create an empty pool allocating from the system resource.
    pub fn new(info: TypeInfo) -> Self {
        Self::with_resource(info, system_resource())
    }

    /// Create an empty pool allocating from `resource`.
    pub fn with_resource(info: TypeInfo, resource: Arc<dyn MemoryResource>) -> Self {
        component::assert_valid::<C>();
        debug_assert_eq!(info.type_id(), std::any::TypeId::of::<C>());

        let shape = C::FLAGS.shape();
        let mut column = Column::new(resource);
        if shape == Shape::Global
            && let Some(value) = C::global_default()
        {
            column.push(value);
        }
        Self {
            info,
            shape,
            transient: C::FLAGS.is_transient(),
            ranges: Vec::new(),
            offsets: Vec::new(),
            column,
            pending: Pending::default(),
            changed: false,
            version: 0,
        }
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Stage `value` for every entity in `range`.
    ///
    /// For shared and global pools, a second staged value in the same cycle must be the
    /// [same value](Component::same_value) as the first; otherwise [`Error::Conflict`] is
    /// returned and the first value stays staged.
    pub fn queue_add(&mut self, range: Range, value: C) -> Result<(), Error>
    where
        C: Clone,
    {
        self.queue_source(range, Source::value(value))
    }

    /// Stage a generator evaluated for every entity in `range` at commit.
    ///
    /// Single-value pools evaluate the generator once, for `range.first()`, when it is staged.
    pub fn queue_add_with(
        &mut self,
        range: Range,
        generator: impl Fn(Entity) -> C + Send + Sync + 'static,
    ) -> Result<(), Error> {
        self.queue_source(range, Source::generator(generator))
    }

    pub(crate) fn queue_source(&mut self, range: Range, source: Source<C>) -> Result<(), Error> {
        match self.shape {
            Shape::Normal => {
                self.pending.adds.push(Add { range, source });
                Ok(())
            }
            Shape::Global => Err(Error::NotEntityScoped {
                component: self.info.name(),
                range,
            }),
            Shape::Tag | Shape::Shared => {
                self.stage_value(source.into_value(range.first()))?;
                self.pending.members.push(range);
                Ok(())
            }
        }
    }

    /// Stage a new value for a global pool.
    pub fn queue_global(&mut self, value: C) -> Result<(), Error> {
        debug_assert_eq!(self.shape, Shape::Global);
        self.stage_value(value)
    }

    fn stage_value(&mut self, value: C) -> Result<(), Error> {
        match (&self.pending.value, self.shape) {
            // Tags carry no data; the latest prototype wins.
            (_, Shape::Tag) | (None, _) => {
                self.pending.value = Some(value);
                Ok(())
            }
            (Some(staged), _) if staged.same_value(&value) => Ok(()),
            (Some(_), _) => Err(Error::Conflict {
                component: self.info.name(),
            }),
        }
    }

    /// Stage removal of every entity in `range`. Absent entities are ignored.
    #[inline]
    pub fn queue_remove(&mut self, range: Range) {
        self.pending.removes.push(range);
    }

    /// Apply every staged change.
    ///
    /// An empty queue leaves the pool untouched apart from clearing the changed flag.
    pub fn commit(&mut self) -> Result<Commit, Error> {
        if self.pending.is_empty() {
            self.changed = false;
            return Ok(Commit::default());
        }

        let before = self.entity_count();
        let pending = std::mem::take(&mut self.pending);
        let added = match self.shape {
            Shape::Normal => self.commit_values(pending),
            _ => self.commit_single(pending),
        };

        let after = self.entity_count();
        self.changed = before != after;
        self.version += 1;

        if self.shape == Shape::Normal && self.column.len() != after {
            return Err(Error::Corrupt {
                component: self.info.name(),
                entities: after,
                values: self.column.len(),
            });
        }

        log::trace!(
            "committed {}: {} -> {} entities",
            self.info.name(),
            before,
            after
        );
        Ok(Commit {
            added,
            removed: before.saturating_sub(after),
            changed: self.changed,
        })
    }

    fn commit_values(&mut self, pending: Pending<C>) -> usize {
        let (staged, covered) = pending.resolve_adds();

        // Committed pieces not overwritten by an add keep their values
        let kept = entity::subtract_lists(&self.ranges, &covered);
        let mut pieces = Vec::with_capacity(kept.len() + staged.len());
        let mut owner = 0;
        for piece in kept {
            while self.ranges[owner].last() < piece.first() {
                owner += 1;
            }
            let range = self.ranges[owner];
            let offset = self.offsets[owner] + range.offset_of(piece.first());
            pieces.push((piece, Origin::Committed(offset)));
        }
        pieces.extend(
            staged
                .into_iter()
                .map(|(range, index)| (range, Origin::Staged(index))),
        );
        pieces.sort_unstable_by_key(|(range, _)| *range);

        // Removes apply after adds
        let pieces = if pending.removes.is_empty() {
            pieces
        } else {
            let mut removes = pending.removes;
            entity::coalesce(&mut removes);
            let merged: Vec<Range> = pieces.iter().map(|(range, _)| *range).collect();
            let survivors = entity::subtract_lists(&merged, &removes);
            let mut trimmed = Vec::with_capacity(survivors.len());
            let mut owner = 0;
            for survivor in survivors {
                while pieces[owner].0.last() < survivor.first() {
                    owner += 1;
                }
                let (range, origin) = pieces[owner];
                let origin = match origin {
                    Origin::Committed(offset) => {
                        Origin::Committed(offset + range.offset_of(survivor.first()))
                    }
                    staged => staged,
                };
                trimmed.push((survivor, origin));
            }
            trimmed
        };

        // Generators run before the pool is touched, so a panic leaves it as it was
        let mut fresh = Vec::with_capacity(staged_count(&pieces));
        for (range, origin) in &pieces {
            if let Origin::Staged(index) = *origin {
                let source = &pending.adds[index].source;
                fresh.extend(range.iter().map(|entity| source.make(entity)));
            }
        }
        let added = fresh.len();

        // Write the surviving values into a fresh column in entity order
        let total: usize = pieces.iter().map(|(range, _)| range.count()).sum();
        let resource = self.column.resource().clone();
        let mut column = Column::with_capacity(total, resource.clone());
        let mut ranges: Vec<Range> = Vec::with_capacity(pieces.len());
        let mut offsets = Vec::with_capacity(pieces.len());
        let mut old = std::mem::replace(&mut self.column, Column::new(resource)).into_iter();
        let mut fresh = fresh.into_iter();
        let mut cursor = 0;

        for (range, origin) in pieces {
            match origin {
                Origin::Committed(offset) => {
                    // Values between committed pieces were overwritten or removed
                    while cursor < offset {
                        old.next();
                        cursor += 1;
                    }
                    for value in old.by_ref().take(range.count()) {
                        column.push(value);
                    }
                    cursor += range.count();
                }
                Origin::Staged(_) => {
                    for value in fresh.by_ref().take(range.count()) {
                        column.push(value);
                    }
                }
            }

            match ranges.last_mut() {
                Some(last) if last.adjacent(&range) => *last = Range::new(last.first(), range.last()),
                _ => {
                    offsets.push(column.len() - range.count());
                    ranges.push(range);
                }
            }
        }

        self.column = column;
        self.ranges = ranges;
        self.offsets = offsets;
        added
    }

    fn commit_single(&mut self, pending: Pending<C>) -> usize {
        if let Some(value) = pending.value {
            self.column.clear();
            self.column.push(value);
        }
        if self.shape == Shape::Global {
            return 0;
        }

        let mut members = pending.members;
        entity::coalesce(&mut members);
        let added = entity::count_entities(&members);
        let mut ranges = entity::union_lists(&self.ranges, &members);
        if !pending.removes.is_empty() {
            let mut removes = pending.removes;
            entity::coalesce(&mut removes);
            ranges = entity::subtract_lists(&ranges, &removes);
        }
        if ranges.is_empty() {
            self.column.clear();
        }
        self.offsets = vec![0; ranges.len()];
        self.ranges = ranges;
        added
    }

    /// Drop every entity of a transient pool.
    ///
    /// Returns `true` if anything was removed.
    pub fn prune(&mut self) -> bool {
        if !self.transient || self.ranges.is_empty() {
            return false;
        }
        self.ranges.clear();
        self.offsets.clear();
        self.column.clear();
        self.changed = true;
        self.version += 1;
        true
    }

    /// Index of the range containing `entity`.
    #[inline]
    fn find(&self, entity: Entity) -> Option<usize> {
        let index = self.ranges.partition_point(|range| range.last() < entity);
        (index < self.ranges.len() && self.ranges[index].contains(entity)).then_some(index)
    }

    /// Column index of the value of `entity`.
    #[inline]
    pub(crate) fn locate(&self, entity: Entity) -> Option<usize> {
        let index = self.find(entity)?;
        Some(match self.shape {
            Shape::Normal => self.offsets[index] + self.ranges[index].offset_of(entity),
            _ => 0,
        })
    }

    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.find(entity).is_some()
    }

    /// The value of `entity`, if committed.
    pub fn get(&self, entity: Entity) -> Option<&C> {
        self.locate(entity).and_then(|index| self.column.get(index))
    }

    /// The value of `entity`, if committed.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut C> {
        self.locate(entity).and_then(|index| self.column.get_mut(index))
    }

    /// The single value of a tag, shared or global pool.
    pub fn value(&self) -> Option<&C> {
        debug_assert!(self.shape.is_single_value());
        self.column.get(0)
    }

    /// The single value of a tag, shared or global pool.
    pub fn value_mut(&mut self) -> Option<&mut C> {
        debug_assert!(self.shape.is_single_value());
        self.column.get_mut(0)
    }

    /// Pointer to the first value, for system parameter cursors.
    ///
    /// Valid until the next commit, prune or memory resource change.
    #[inline]
    pub(crate) fn values_ptr(&mut self) -> *mut C {
        self.column.as_mut_ptr()
    }

    /// Number of stored values. Single-value shapes report 0 or 1.
    #[inline]
    pub fn component_count(&self) -> usize {
        self.column.len()
    }

    /// Committed entity ranges, sorted and coalesced.
    #[inline]
    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    #[inline]
    pub fn entity_count(&self) -> usize {
        entity::count_entities(&self.ranges)
    }

    #[inline]
    pub fn has_changed(&self) -> bool {
        self.changed
    }

    #[inline]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Iterate `(entity, value)` pairs in ascending entity order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &C)> + '_ {
        self.ranges.iter().flat_map(move |range| {
            range
                .iter()
                .filter_map(move |entity| self.get(entity).map(|value| (entity, value)))
        })
    }

    /// Move every value into memory from `resource`.
    pub fn set_memory_resource(&mut self, resource: Arc<dyn MemoryResource>) {
        self.column.move_to(resource);
    }
}

impl<C: Component> ErasedPool for Pool<C> {
    fn info(&self) -> &TypeInfo {
        &self.info
    }

    fn shape(&self) -> Shape {
        self.shape
    }

    fn is_transient(&self) -> bool {
        self.transient
    }

    fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    fn entity_count(&self) -> usize {
        Pool::entity_count(self)
    }

    fn component_count(&self) -> usize {
        Pool::component_count(self)
    }

    fn contains(&self, entity: Entity) -> bool {
        Pool::contains(self, entity)
    }

    fn has_changed(&self) -> bool {
        self.changed
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn pending_add_ranges(&self) -> Vec<Range> {
        self.pending.added_ranges().collect()
    }

    fn queue_remove(&mut self, range: Range) {
        Pool::queue_remove(self, range);
    }

    fn commit(&mut self) -> Result<Commit, Error> {
        Pool::commit(self)
    }

    fn prune(&mut self) -> bool {
        Pool::prune(self)
    }

    fn set_memory_resource(&mut self, resource: Arc<dyn MemoryResource>) {
        Pool::set_memory_resource(self, resource);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        time::{Duration, Instant},
    };

    use crate::ecs::{
        component::{Flags, Immutable, Mutable},
        storage::memory::tests::CountingResource,
        world::TypeRegistry,
    };

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health(u32);
    impl Component for Health {
        type Mutability = Mutable;
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Marker;
    impl Component for Marker {
        const FLAGS: Flags = Flags::TAG;
        type Mutability = Immutable;
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Team(&'static str);
    impl Component for Team {
        const FLAGS: Flags = Flags::SHARED;
        type Mutability = Mutable;
        fn same_value(&self, other: &Self) -> bool {
            self == other
        }
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Gravity(i32);
    impl Component for Gravity {
        const FLAGS: Flags = Flags::GLOBAL;
        type Mutability = Mutable;
        fn same_value(&self, other: &Self) -> bool {
            self == other
        }
        fn global_default() -> Option<Self> {
            Some(Self::default())
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Hit;
    impl Component for Hit {
        const FLAGS: Flags = Flags::TAG.with(Flags::TRANSIENT);
        type Mutability = Immutable;
    }

    fn pool<C: Component>() -> Pool<C> {
        let registry = TypeRegistry::new();
        let id = registry.register::<C>();
        Pool::new(registry.info(id).unwrap())
    }

    fn r(first: u32, last: u32) -> Range {
        Range::new(first, last)
    }

    fn values(pool: &Pool<Health>) -> Vec<(u32, u32)> {
        pool.iter().map(|(e, h)| (e.id(), h.0)).collect()
    }

    #[test]
    fn add_then_commit() {
        // Given
        let mut pool = pool::<Health>();
        pool.queue_add(r(0, 2), Health(5)).unwrap();

        // When
        let commit = pool.commit().unwrap();

        // Then
        assert_eq!(commit.added, 3);
        assert!(commit.changed);
        assert_eq!(pool.ranges(), &[r(0, 2)]);
        assert_eq!(pool.entity_count(), 3);
        assert_eq!(pool.component_count(), 3);
        assert_eq!(pool.get(Entity::new(1)), Some(&Health(5)));
        assert_eq!(pool.get(Entity::new(3)), None);
        assert!(pool.has_changed());
        assert_eq!(pool.version(), 1);
    }

    #[test]
    fn nothing_is_visible_before_commit() {
        let mut pool = pool::<Health>();
        pool.queue_add(r(0, 0), Health(1)).unwrap();
        assert_eq!(pool.entity_count(), 0);
        assert!(!pool.contains(Entity::new(0)));
    }

    #[test]
    fn empty_commit_is_a_no_op() {
        // Given
        let mut pool = pool::<Health>();
        pool.queue_add(r(0, 4), Health(1)).unwrap();
        pool.commit().unwrap();
        let version = pool.version();

        // When
        let commit = pool.commit().unwrap();

        // Then
        assert_eq!(commit, Commit::default());
        assert!(!pool.has_changed());
        assert_eq!(pool.version(), version);
        assert_eq!(pool.entity_count(), 5);
    }

    #[test]
    fn adjacent_adds_coalesce() {
        // Given
        let mut pool = pool::<Health>();
        pool.queue_add(r(5, 9), Health(2)).unwrap();
        pool.queue_add(r(0, 4), Health(1)).unwrap();
        pool.commit().unwrap();

        // When
        pool.queue_add(r(10, 10), Health(3)).unwrap();
        pool.commit().unwrap();

        // Then
        assert_eq!(pool.ranges(), &[r(0, 10)]);
        assert_eq!(pool.get(Entity::new(4)), Some(&Health(1)));
        assert_eq!(pool.get(Entity::new(5)), Some(&Health(2)));
        assert_eq!(pool.get(Entity::new(10)), Some(&Health(3)));
    }

    #[test]
    fn later_add_wins_over_staged_and_committed() {
        // Given
        let mut pool = pool::<Health>();
        pool.queue_add(r(0, 9), Health(1)).unwrap();
        pool.commit().unwrap();

        // When
        pool.queue_add(r(2, 3), Health(2)).unwrap();
        pool.queue_add(r(3, 12), Health(3)).unwrap();
        pool.commit().unwrap();

        // Then
        assert_eq!(pool.ranges(), &[r(0, 12)]);
        let all = values(&pool);
        assert_eq!(all[..5], [(0, 1), (1, 1), (2, 2), (3, 3), (4, 3)]);
        assert_eq!(all.last(), Some(&(12, 3)));
        assert!(pool.has_changed());
    }

    #[test]
    fn replacing_values_bumps_version_without_count_change() {
        // Given
        let mut pool = pool::<Health>();
        pool.queue_add(r(0, 1), Health(1)).unwrap();
        pool.commit().unwrap();

        // When
        pool.queue_add(r(0, 1), Health(2)).unwrap();
        pool.commit().unwrap();

        // Then
        assert!(!pool.has_changed());
        assert_eq!(pool.version(), 2);
        assert_eq!(values(&pool), vec![(0, 2), (1, 2)]);
    }

    #[test]
    fn removes_apply_after_adds() {
        // Given
        let mut pool = pool::<Health>();
        pool.queue_add(r(0, 9), Health(1)).unwrap();
        pool.commit().unwrap();

        // When
        pool.queue_remove(r(3, 4));
        pool.queue_add(r(4, 5), Health(7)).unwrap();
        pool.queue_remove(r(20, 30));
        let commit = pool.commit().unwrap();

        // Then
        assert_eq!(pool.ranges(), &[r(0, 2), r(5, 9)]);
        assert_eq!(commit.removed, 2);
        assert_eq!(pool.get(Entity::new(5)), Some(&Health(7)));
        assert_eq!(pool.get(Entity::new(6)), Some(&Health(1)));
        assert_eq!(pool.component_count(), 8);
    }

    #[test]
    fn splitting_a_range_keeps_values_aligned() {
        // Given
        let mut pool = pool::<Health>();
        pool.queue_add_with(r(0, 9), |e| Health(e.id() * 10))
            .unwrap();
        pool.commit().unwrap();

        // When
        pool.queue_remove(r(2, 2));
        pool.queue_remove(r(6, 7));
        pool.commit().unwrap();

        // Then
        assert_eq!(pool.ranges(), &[r(0, 1), r(3, 5), r(8, 9)]);
        assert_eq!(
            values(&pool),
            vec![(0, 0), (1, 10), (3, 30), (4, 40), (5, 50), (8, 80), (9, 90)]
        );
    }

    #[test]
    fn generators_run_once_per_surviving_entity() {
        // Given
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut pool = pool::<Health>();
        pool.queue_add_with(r(0, 9), move |e| {
            counter.fetch_add(1, Ordering::SeqCst);
            Health(e.id())
        })
        .unwrap();
        pool.queue_add(r(0, 1), Health(99)).unwrap();
        pool.queue_remove(r(9, 9));

        // When
        pool.commit().unwrap();

        // Then
        assert_eq!(calls.load(Ordering::SeqCst), 7);
        assert_eq!(pool.get(Entity::new(1)), Some(&Health(99)));
        assert_eq!(pool.get(Entity::new(8)), Some(&Health(8)));
    }

    #[test]
    fn panicking_generator_leaves_committed_values_in_place() {
        // Given
        let mut pool = pool::<Health>();
        pool.queue_add(r(0, 4), Health(1)).unwrap();
        pool.commit().unwrap();
        pool.queue_add_with(r(3, 9), |e| {
            assert!(e.id() < 6, "no health for {e}");
            Health(2)
        })
        .unwrap();

        // When
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| pool.commit()));

        // Then
        assert!(result.is_err());
        assert_eq!(pool.ranges(), &[r(0, 4)]);
        assert_eq!(pool.component_count(), 5);
        assert_eq!(values(&pool), vec![(0, 1), (1, 1), (2, 1), (3, 1), (4, 1)]);
    }

    #[test]
    fn many_spaced_adds_commit_in_bounded_time() {
        // Given
        let mut pool = pool::<Health>();
        for id in 0..100_000u32 {
            pool.queue_add(r(id * 2, id * 2), Health(id)).unwrap();
        }
        pool.queue_add(r(10, 20), Health(7)).unwrap();

        // When
        let start = Instant::now();
        pool.commit().unwrap();
        let elapsed = start.elapsed();

        // Then
        assert_eq!(pool.entity_count(), 100_000 + 5);
        assert_eq!(pool.get(Entity::new(15)), Some(&Health(7)));
        assert_eq!(pool.get(Entity::new(198)), Some(&Health(99)));
        assert!(elapsed < Duration::from_secs(2), "commit took {elapsed:?}");
    }

    #[test]
    fn removing_absent_entities_is_a_no_op() {
        let mut pool = pool::<Health>();
        pool.queue_remove(r(0, 100));
        let commit = pool.commit().unwrap();
        assert!(!commit.changed);
        assert_eq!(pool.entity_count(), 0);
    }

    #[test]
    fn tag_storage_is_constant() {
        // Given
        let mut pool = pool::<Marker>();

        // When
        pool.queue_add(r(0, 999_999), Marker).unwrap();
        pool.commit().unwrap();

        // Then
        assert_eq!(pool.entity_count(), 1_000_000);
        assert_eq!(pool.component_count(), 1);
        assert_eq!(pool.ranges().len(), 1);
        assert!(pool.contains(Entity::new(500_000)));
    }

    #[test]
    fn shared_value_is_aliased() {
        // Given
        let mut pool = pool::<Team>();
        pool.queue_add(r(0, 4), Team("red")).unwrap();
        pool.queue_add(r(10, 14), Team("red")).unwrap();
        pool.commit().unwrap();

        // When
        pool.value_mut().unwrap().0 = "blue";

        // Then
        assert_eq!(pool.component_count(), 1);
        assert_eq!(pool.entity_count(), 10);
        assert_eq!(pool.get(Entity::new(3)), Some(&Team("blue")));
        assert_eq!(pool.get(Entity::new(12)), Some(&Team("blue")));
    }

    #[test]
    fn conflicting_shared_values_are_rejected() {
        // Given
        let mut pool = pool::<Team>();
        pool.queue_add(r(0, 4), Team("red")).unwrap();

        // When
        let result = pool.queue_add(r(5, 9), Team("blue"));

        // Then
        assert!(matches!(result, Err(Error::Conflict { .. })));
        pool.commit().unwrap();
        assert_eq!(pool.value(), Some(&Team("red")));
        assert_eq!(pool.entity_count(), 5);
    }

    #[test]
    fn shared_value_can_change_across_cycles() {
        // Given
        let mut pool = pool::<Team>();
        pool.queue_add(r(0, 0), Team("red")).unwrap();
        pool.commit().unwrap();

        // When
        pool.queue_add(r(1, 1), Team("blue")).unwrap();
        pool.commit().unwrap();

        // Then
        assert_eq!(pool.get(Entity::new(0)), Some(&Team("blue")));
        assert_eq!(pool.component_count(), 1);
    }

    #[test]
    fn shared_value_dropped_with_last_owner() {
        let mut pool = pool::<Team>();
        pool.queue_add(r(0, 1), Team("red")).unwrap();
        pool.commit().unwrap();
        pool.queue_remove(r(0, 1));
        pool.commit().unwrap();
        assert_eq!(pool.component_count(), 0);
    }

    #[test]
    fn global_starts_with_default_and_has_no_entities() {
        // Given
        let mut pool = pool::<Gravity>();
        assert_eq!(pool.value(), Some(&Gravity(0)));

        // When
        pool.queue_global(Gravity(-10)).unwrap();
        assert!(matches!(
            pool.queue_global(Gravity(3)),
            Err(Error::Conflict { .. })
        ));
        pool.commit().unwrap();

        // Then
        assert_eq!(pool.value(), Some(&Gravity(-10)));
        assert_eq!(pool.entity_count(), 0);
        assert_eq!(pool.component_count(), 1);
        assert!(matches!(
            pool.queue_add(r(0, 0), Gravity(1)),
            Err(Error::NotEntityScoped { .. })
        ));
    }

    #[test]
    fn transient_pool_prunes() {
        // Given
        let mut pool = pool::<Hit>();
        pool.queue_add(r(0, 3), Hit).unwrap();
        pool.commit().unwrap();
        let version = pool.version();

        // When
        let pruned = pool.prune();

        // Then
        assert!(pruned);
        assert_eq!(pool.entity_count(), 0);
        assert_eq!(pool.component_count(), 0);
        assert!(pool.version() > version);
        assert!(!pool.prune());
    }

    #[test]
    fn prune_ignores_persistent_pools() {
        let mut pool = pool::<Health>();
        pool.queue_add(r(0, 0), Health(1)).unwrap();
        pool.commit().unwrap();
        assert!(!pool.prune());
        assert_eq!(pool.entity_count(), 1);
    }

    #[test]
    fn memory_resource_receives_values() {
        // Given
        let resource = Arc::new(CountingResource::default());
        let mut pool = pool::<Health>();
        pool.queue_add(r(0, 9), Health(1)).unwrap();
        pool.commit().unwrap();

        // When
        pool.set_memory_resource(resource.clone());
        pool.queue_add(r(10, 19), Health(2)).unwrap();
        pool.commit().unwrap();

        // Then
        assert_eq!(resource.live.load(Ordering::SeqCst), 1);
        assert_eq!(
            resource.live_bytes.load(Ordering::SeqCst),
            20 * std::mem::size_of::<Health>()
        );
        assert_eq!(pool.get(Entity::new(5)), Some(&Health(1)));
        drop(pool);
        assert_eq!(resource.live.load(Ordering::SeqCst), 0);
    }
}
