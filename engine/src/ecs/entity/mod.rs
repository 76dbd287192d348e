//! Entity identifiers and entity ranges.
//!
//! Entities in this runtime are plain integer keys. They are never allocated or recycled by the
//! runtime itself; callers pick ids (usually in contiguous blocks) and attach components to them.
//! Because component sets in practice are highly contiguous, every bulk operation is addressed by
//! an inclusive [`Range`] of ids rather than by single entities.
//!
//! # Architecture
//!
//! - **[`Entity`]**: An opaque `u32` used purely as an ordering key.
//! - **[`Range`]**: An inclusive `[first, last]` interval of entities.
//! - **Range lists**: Sorted, non-overlapping `Vec<Range>` values manipulated with
//!   [`intersect_lists`], [`union_lists`], [`subtract_lists`] and [`coalesce`]. These are the
//!   building blocks of both component pools and the system argument builder.

mod range;

pub use range::{Range, coalesce, count_entities, intersect_lists, subtract_lists, union_lists};

/// An entity identifier.
///
/// The value carries no meaning beyond its ordering: systems visit entities in ascending id order
/// unless a sort comparator says otherwise.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(u32);

impl Entity {
    /// Construct an entity from a raw id.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw id of this entity.
    #[inline]
    pub const fn id(&self) -> u32 {
        self.0
    }
}

impl From<u32> for Entity {
    #[inline]
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
