//! Data footprints of systems and conflict detection between them.
//!
//! An [`Access`] records which component types a system reads, which it writes, and whether it
//! must run alone. The schedule planner compares footprints pairwise: two systems may share a
//! parallel group only when their footprints do not conflict.
//!
//! # Conflict rules
//!
//! Two footprints conflict when either of them is exclusive, or when they touch the same type
//! and at least one of them writes it. Multiple readers of one type never conflict.
//!
//! ```rust,ignore
//! let read_pos = Access::new().with_read(pos_id);
//! let write_pos = Access::new().with_write(pos_id);
//! let write_vel = Access::new().with_write(vel_id);
//!
//! assert!(!read_pos.conflicts_with(&read_pos));
//! assert!(read_pos.conflicts_with(&write_pos));
//! assert!(!write_pos.conflicts_with(&write_vel));
//! ```
//!
//! Presence and absence filters are not part of a footprint: they only look at committed
//! ranges, which are never modified while systems run.

use fixedbitset::FixedBitSet;

use crate::ecs::world::TypeId;

/// Bitset of component type ids.
///
/// Bit N set means the type with index N is in the set. The bitset grows to fit any id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct TypeSet {
    bitset: FixedBitSet,
}

impl TypeSet {
    #[inline]
    fn insert(&mut self, id: TypeId) {
        let index = id.index();
        if index >= self.bitset.len() {
            self.bitset.grow(index + 1);
        }
        self.bitset.insert(index);
    }

    #[inline]
    fn contains(&self, id: TypeId) -> bool {
        self.bitset.contains(id.index())
    }

    #[inline]
    fn is_disjoint(&self, other: &Self) -> bool {
        self.bitset.is_disjoint(&other.bitset)
    }
}

/// The read set, write set and exclusivity of a system.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Access {
    reads: TypeSet,
    writes: TypeSet,
    exclusive: bool,
}

impl Access {
    /// An empty footprint that conflicts with nothing.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a read of `id`.
    #[inline]
    pub fn add_read(&mut self, id: TypeId) {
        self.reads.insert(id);
    }

    /// Add a write of `id`.
    #[inline]
    pub fn add_write(&mut self, id: TypeId) {
        self.writes.insert(id);
    }

    /// Mark the footprint as exclusive; it then conflicts with every other footprint.
    #[inline]
    pub fn set_exclusive(&mut self) {
        self.exclusive = true;
    }

    /// Builder form of [`Access::add_read`].
    #[inline]
    pub fn with_read(mut self, id: TypeId) -> Self {
        self.add_read(id);
        self
    }

    /// Builder form of [`Access::add_write`].
    #[inline]
    pub fn with_write(mut self, id: TypeId) -> Self {
        self.add_write(id);
        self
    }

    /// Builder form of [`Access::set_exclusive`].
    #[inline]
    pub fn exclusive(mut self) -> Self {
        self.set_exclusive();
        self
    }

    #[inline]
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    #[inline]
    pub fn reads(&self, id: TypeId) -> bool {
        self.reads.contains(id)
    }

    #[inline]
    pub fn writes(&self, id: TypeId) -> bool {
        self.writes.contains(id)
    }

    /// Check whether two footprints can not run at the same time.
    pub fn conflicts_with(&self, other: &Access) -> bool {
        if self.exclusive || other.exclusive {
            return true;
        }

        // A write conflicts with any access to the same type
        !self.writes.is_disjoint(&other.reads)
            || !self.writes.is_disjoint(&other.writes)
            || !other.writes.is_disjoint(&self.reads)
    }
}
