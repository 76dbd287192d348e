//! The set of entities a system visits.
//!
//! A selection is computed from committed pool ranges only:
//!
//! ```text
//! base = ∩ required            (normal, tag and shared pools)
//! base = base − ∪ without
//! base = base ∩ ∪ with         (only when at least one With filter exists)
//! ```
//!
//! Every pool carries a version that is bumped on each commit or prune that touched it. The
//! selection remembers the versions it was built from and is rebuilt only when one moved.

use log::trace;

use crate::ecs::{
    entity::{Range, intersect_lists, subtract_lists, union_lists},
    world::{TypeId, World},
};

#[derive(Debug, Default)]
pub(crate) struct Selection {
    required: Vec<TypeId>,
    with: Vec<TypeId>,
    without: Vec<TypeId>,
    versions: Vec<u64>,
    built: bool,
    ranges: Vec<Range>,
}

impl Selection {
    pub(crate) fn new(required: Vec<TypeId>, with: Vec<TypeId>, without: Vec<TypeId>) -> Self {
        Self {
            required,
            with,
            without,
            ..Self::default()
        }
    }

    fn dependencies(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.required
            .iter()
            .chain(self.with.iter())
            .chain(self.without.iter())
            .copied()
    }

    fn current_versions(&self, world: &World) -> Vec<u64> {
        self.dependencies()
            .map(|id| world.pool_by_id(id).map_or(0, |pool| pool.version()))
            .collect()
    }

    /// Whether a dependency changed since the last build.
    pub(crate) fn is_stale(&self, world: &World) -> bool {
        !self.built
            || self
                .dependencies()
                .zip(&self.versions)
                .any(|(id, version)| world.pool_by_id(id).map_or(0, |p| p.version()) != *version)
    }

    /// Recompute the selected ranges from committed pool state.
    pub(crate) fn rebuild(&mut self, world: &World) {
        let ranges_of = |id: TypeId| world.pool_by_id(id).map_or(&[][..], |pool| pool.ranges());

        let mut base = match self.required.split_first() {
            Some((first, rest)) => rest.iter().fold(ranges_of(*first).to_vec(), |acc, id| {
                intersect_lists(&acc, ranges_of(*id))
            }),
            None => Vec::new(),
        };
        for id in &self.without {
            if base.is_empty() {
                break;
            }
            base = subtract_lists(&base, ranges_of(*id));
        }
        if !self.with.is_empty() {
            let any = self
                .with
                .iter()
                .fold(Vec::new(), |acc, id| union_lists(&acc, ranges_of(*id)));
            base = intersect_lists(&base, &any);
        }

        trace!("selection rebuilt: {} ranges", base.len());
        self.ranges = base;
        self.versions = self.current_versions(world);
        self.built = true;
    }

    pub(crate) fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub(crate) fn invalidate(&mut self) {
        self.built = false;
    }
}
