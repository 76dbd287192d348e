//! The variant-of relation between component types.
//!
//! Component types declaring `variant_of = Other` form an undirected graph. Every connected
//! group of types is a set of mutually exclusive variants: an entity holds at most one of them,
//! and adding one stages the removal of all the others.

use fixedbitset::FixedBitSet;

use crate::ecs::world::TypeId;

/// Undirected graph of variant edges, indexed by [`TypeId`].
#[derive(Debug, Default, Clone)]
pub struct VariantGraph {
    edges: Vec<FixedBitSet>,
}

impl VariantGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect two types. Returns `false` if they already were directly connected.
    pub fn connect(&mut self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return false;
        }
        let size = a.index().max(b.index()) + 1;
        if self.edges.len() < size {
            self.edges.resize_with(size, FixedBitSet::new);
        }
        for edges in &mut self.edges {
            if edges.len() < size {
                edges.grow(size);
            }
        }
        let added = !self.edges[a.index()].contains(b.index());
        self.edges[a.index()].insert(b.index());
        self.edges[b.index()].insert(a.index());
        added
    }

    /// Every type reachable from `id`, excluding `id` itself, in id order.
    pub fn closure(&self, id: TypeId) -> Vec<TypeId> {
        let Some(start) = self.edges.get(id.index()) else {
            return Vec::new();
        };
        let mut seen = FixedBitSet::with_capacity(self.edges.len());
        seen.insert(id.index());
        let mut frontier: Vec<usize> = start.ones().collect();
        while let Some(next) = frontier.pop() {
            if seen.put(next) {
                continue;
            }
            frontier.extend(self.edges[next].ones().filter(|n| !seen.contains(*n)));
        }
        seen.set(id.index(), false);
        seen.ones().map(TypeId::from).collect()
    }

    /// Check whether two distinct types are variants of each other.
    pub fn connected(&self, a: TypeId, b: TypeId) -> bool {
        a != b && self.closure(a).contains(&b)
    }

    /// Check whether `id` has any variant at all.
    pub fn has_variants(&self, id: TypeId) -> bool {
        self.edges
            .get(id.index())
            .is_some_and(|edges| !edges.is_clear())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> TypeId {
        TypeId::new(n)
    }

    #[test]
    fn closure_is_transitive_and_undirected() {
        // Given a chain 0 - 1 - 2 and an unrelated pair 3 - 4
        let mut graph = VariantGraph::new();
        graph.connect(id(1), id(0));
        graph.connect(id(2), id(1));
        graph.connect(id(4), id(3));

        // Then
        assert_eq!(graph.closure(id(0)), vec![id(1), id(2)]);
        assert_eq!(graph.closure(id(2)), vec![id(0), id(1)]);
        assert_eq!(graph.closure(id(3)), vec![id(4)]);
        assert!(graph.connected(id(0), id(2)));
        assert!(!graph.connected(id(0), id(3)));
        assert!(!graph.connected(id(0), id(0)));
    }

    #[test]
    fn unknown_and_isolated_types_have_no_variants() {
        let mut graph = VariantGraph::new();
        graph.connect(id(0), id(1));
        assert!(graph.closure(id(9)).is_empty());
        assert!(!graph.has_variants(id(9)));
        assert!(graph.has_variants(id(1)));
    }

    #[test]
    fn connect_reports_new_edges() {
        let mut graph = VariantGraph::new();
        assert!(graph.connect(id(0), id(1)));
        assert!(!graph.connect(id(1), id(0)));
        assert!(!graph.connect(id(2), id(2)));
    }
}
