//! Typed, packed value storage allocated from a [`MemoryResource`].
//!
//! A [`Column`] is a growable array of `C` much like `Vec<C>`, except that its memory comes from
//! a pluggable resource instead of the global allocator. Component pools keep their per-entity
//! values in a column, in entity order, so iterating a committed range is a linear walk through
//! memory.
//!
//! # Layout
//!
//! ```text
//! ptr ──► [ C0 | C1 | C2 | .... | C(len-1) | uninit ... ]
//!          ◄──────── len ──────────────────►
//!          ◄──────────────────── capacity ────────────────►
//! ```
//!
//! Zero-sized types never allocate; their capacity is reported as `usize::MAX`.
//!
//! # Growth
//!
//! Capacity grows according to a [`GrowthStrategy`]. Pools rebuild their column at every commit
//! with the exact final size, so the strategy mostly matters for callers that push one value at
//! a time.

use std::{
    alloc::Layout,
    cmp, fmt,
    marker::PhantomData,
    mem,
    ptr::{self, NonNull},
    slice,
    sync::Arc,
};

use crate::ecs::storage::memory::MemoryResource;

/// How a column grows when it runs out of capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthStrategy {
    /// Grow in multiples of the current capacity.
    Multiply(usize),
    /// Grow by a fixed number of elements.
    Buffer(usize),
    /// Grow by exactly the requested amount.
    Exact,
}

impl GrowthStrategy {
    /// Calculate the new capacity from the current capacity and the required capacity.
    pub fn new_capacity(&self, current: usize, requested: usize) -> usize {
        match self {
            Self::Multiply(factor) => cmp::max(current.saturating_mul(*factor), requested),
            Self::Buffer(buffer) => cmp::max(current.saturating_add(*buffer), requested),
            Self::Exact => requested,
        }
    }
}

impl Default for GrowthStrategy {
    fn default() -> Self {
        Self::Multiply(2)
    }
}

/// A packed array of `C` backed by a memory resource.
pub struct Column<C> {
    ptr: NonNull<C>,
    len: usize,
    capacity: usize,
    growth: GrowthStrategy,
    resource: Arc<dyn MemoryResource>,
    _marker: PhantomData<C>,
}

// SAFETY: the column owns its values like a Vec does.
unsafe impl<C: Send> Send for Column<C> {}
unsafe impl<C: Sync> Sync for Column<C> {}

impl<C> Column<C> {
    const IS_ZST: bool = mem::size_of::<C>() == 0;

    /// Create an empty column that allocates from `resource`.
    pub fn new(resource: Arc<dyn MemoryResource>) -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            capacity: if Self::IS_ZST { usize::MAX } else { 0 },
            growth: GrowthStrategy::default(),
            resource,
            _marker: PhantomData,
        }
    }

    /// Create an empty column with room for exactly `capacity` values.
    pub fn with_capacity(capacity: usize, resource: Arc<dyn MemoryResource>) -> Self {
        let mut column = Self::new(resource);
        column.grow_to(capacity);
        column
    }

    /// Replace the growth strategy.
    pub fn with_growth(mut self, growth: GrowthStrategy) -> Self {
        self.growth = growth;
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The resource this column allocates from.
    #[inline]
    pub fn resource(&self) -> &Arc<dyn MemoryResource> {
        &self.resource
    }

    /// Append a value.
    pub fn push(&mut self, value: C) {
        if self.len == self.capacity {
            let requested = self.len + 1;
            self.grow_to(self.growth.new_capacity(self.capacity, requested));
        }
        // SAFETY: len < capacity after growing.
        unsafe { self.ptr.as_ptr().add(self.len).write(value) };
        self.len += 1;
    }

    /// Make room for at least `additional` more values.
    pub fn reserve(&mut self, additional: usize) {
        let requested = self.len + additional;
        if requested > self.capacity {
            self.grow_to(self.growth.new_capacity(self.capacity, requested));
        }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&C> {
        self.as_slice().get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        self.as_mut_slice().get_mut(index)
    }

    #[inline]
    pub fn as_slice(&self) -> &[C] {
        // SAFETY: the first len values are initialized.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [C] {
        // SAFETY: the first len values are initialized and we hold &mut self.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Raw pointer to the first value, for cursors that outlive a borrow of the column.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut C {
        self.ptr.as_ptr()
    }

    /// Drop every value, keeping the allocation.
    pub fn clear(&mut self) {
        let values: *mut [C] = self.as_mut_slice();
        // Reset len first so a panicking drop can not cause a double drop.
        self.len = 0;
        // SAFETY: the values were initialized and are no longer reachable.
        unsafe { ptr::drop_in_place(values) };
    }

    /// Move every value into memory from `resource`, releasing the old allocation.
    pub fn move_to(&mut self, resource: Arc<dyn MemoryResource>) {
        let mut moved = Column::with_capacity(self.len, resource).with_growth(self.growth);
        // SAFETY: the values are bitwise moved into fresh memory and self forgets them.
        unsafe {
            ptr::copy_nonoverlapping(self.ptr.as_ptr(), moved.ptr.as_ptr(), self.len);
        }
        moved.len = self.len;
        self.len = 0;
        *self = moved;
    }

    fn grow_to(&mut self, capacity: usize) {
        if Self::IS_ZST || capacity <= self.capacity {
            return;
        }
        let layout = Self::layout(capacity);
        let new_ptr = self.resource.allocate(layout).cast::<C>();
        if self.capacity > 0 {
            // SAFETY: both blocks hold at least len values and do not overlap.
            unsafe {
                ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), self.len);
                self.resource
                    .deallocate(self.ptr.cast(), Self::layout(self.capacity));
            }
        }
        self.ptr = new_ptr;
        self.capacity = capacity;
    }

    fn layout(capacity: usize) -> Layout {
        match Layout::array::<C>(capacity) {
            Ok(layout) => layout,
            Err(_) => panic!("column capacity overflow: {capacity} elements"),
        }
    }
}

impl<C> Drop for Column<C> {
    fn drop(&mut self) {
        self.clear();
        if !Self::IS_ZST && self.capacity > 0 {
            // SAFETY: ptr was allocated by this resource with this capacity.
            unsafe {
                self.resource
                    .deallocate(self.ptr.cast(), Self::layout(self.capacity));
            }
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for Column<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<C> IntoIterator for Column<C> {
    type Item = C;
    type IntoIter = IntoIter<C>;

    fn into_iter(mut self) -> IntoIter<C> {
        let end = self.len;
        // The iterator now owns the values; the column only frees memory when dropped.
        self.len = 0;
        IntoIter {
            column: self,
            next: 0,
            end,
        }
    }
}

/// Owning iterator over the values of a [`Column`].
pub struct IntoIter<C> {
    column: Column<C>,
    next: usize,
    end: usize,
}

impl<C> Iterator for IntoIter<C> {
    type Item = C;

    fn next(&mut self) -> Option<C> {
        if self.next >= self.end {
            return None;
        }
        // SAFETY: values in next..end are initialized and read exactly once.
        let value = unsafe { self.column.ptr.as_ptr().add(self.next).read() };
        self.next += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl<C> ExactSizeIterator for IntoIter<C> {}

impl<C> Drop for IntoIter<C> {
    fn drop(&mut self) {
        let remaining = self.end - self.next;
        // SAFETY: values in next..end were never read out.
        unsafe {
            let start = self.column.ptr.as_ptr().add(self.next);
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(start, remaining));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::ecs::storage::memory::{SystemResource, tests::CountingResource};

    use super::*;

    struct DropCounter<'a>(&'a AtomicUsize);

    impl Drop for DropCounter<'_> {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn growth_strategies() {
        assert_eq!(GrowthStrategy::Multiply(2).new_capacity(4, 5), 8);
        assert_eq!(GrowthStrategy::Multiply(2).new_capacity(0, 1), 1);
        assert_eq!(GrowthStrategy::Buffer(16).new_capacity(4, 5), 20);
        assert_eq!(GrowthStrategy::Exact.new_capacity(4, 5), 5);
    }

    #[test]
    fn push_and_read_back() {
        // Given
        let mut column = Column::new(Arc::new(SystemResource));

        // When
        for i in 0..100u32 {
            column.push(i * 2);
        }

        // Then
        assert_eq!(column.len(), 100);
        assert!(column.capacity() >= 100);
        assert_eq!(column.get(10), Some(&20));
        assert_eq!(column.get(100), None);
        *column.get_mut(0).unwrap() = 7;
        assert_eq!(column.as_slice()[..3], [7, 2, 4]);
    }

    #[test]
    fn allocates_from_resource_and_frees_on_drop() {
        // Given
        let resource = Arc::new(CountingResource::default());

        // When
        {
            let mut column = Column::with_capacity(8, resource.clone());
            column.extend_for_test(0..8u64);
            assert_eq!(resource.live_bytes.load(Ordering::Relaxed), 64);
        }

        // Then
        assert_eq!(resource.allocations.load(Ordering::Relaxed), 1);
        assert_eq!(resource.live.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn move_to_switches_resource_and_keeps_values() {
        // Given
        let first = Arc::new(CountingResource::default());
        let second = Arc::new(CountingResource::default());
        let mut column = Column::new(first.clone());
        column.extend_for_test([String::from("a"), String::from("b")]);

        // When
        column.move_to(second.clone());

        // Then
        assert_eq!(column.as_slice(), ["a", "b"]);
        assert_eq!(first.live.load(Ordering::Relaxed), 0);
        assert_eq!(second.live.load(Ordering::Relaxed), 1);
        drop(column);
        assert_eq!(second.live.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn values_are_dropped_exactly_once() {
        // Given
        let drops = AtomicUsize::new(0);
        let mut column = Column::new(Arc::new(SystemResource));
        for _ in 0..5 {
            column.push(DropCounter(&drops));
        }

        // When
        let mut iter = column.into_iter();
        let first = iter.next();
        drop(iter);

        // Then
        assert_eq!(drops.load(Ordering::Relaxed), 4);
        drop(first);
        assert_eq!(drops.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn clear_drops_values_and_keeps_capacity() {
        // Given
        let drops = AtomicUsize::new(0);
        let mut column = Column::with_capacity(3, Arc::new(SystemResource));
        for _ in 0..3 {
            column.push(DropCounter(&drops));
        }

        // When
        column.clear();

        // Then
        assert!(column.is_empty());
        assert_eq!(column.capacity(), 3);
        assert_eq!(drops.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn zero_sized_values_never_allocate() {
        // Given
        let resource = Arc::new(CountingResource::default());
        let mut column = Column::new(resource.clone());

        // When
        for _ in 0..1000 {
            column.push(());
        }

        // Then
        assert_eq!(column.len(), 1000);
        assert_eq!(resource.allocations.load(Ordering::Relaxed), 0);
    }

    impl<C> Column<C> {
        fn extend_for_test(&mut self, values: impl IntoIterator<Item = C>) {
            for value in values {
                self.push(value);
            }
        }
    }
}
