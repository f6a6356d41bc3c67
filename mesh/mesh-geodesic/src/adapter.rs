//! Mesh access consumed by the geodesic engines.
//!
//! The engines never own a mesh. They navigate it through [`MeshAdapter`],
//! which exposes vertex positions and half-edge navigation inside triangles.

use std::collections::VecDeque;
use std::ops::Range;

use nalgebra::Point3;
use smallvec::SmallVec;

/// One-ring neighbor list of a vertex.
pub type Neighbors = SmallVec<[usize; 8]>;

/// Read-only triangle mesh navigation.
///
/// Half-edges are identified by `usize` handles. A half-edge starts at
/// [`half_edge_vertex`](Self::half_edge_vertex) and belongs to exactly one
/// triangle; [`next`](Self::next) and [`previous`](Self::previous) walk that
/// triangle.
pub trait MeshAdapter {
    /// Number of vertices.
    fn vertex_count(&self) -> usize;

    /// Position of a vertex.
    fn position(&self, vertex: usize) -> Point3<f64>;

    /// Half-edges starting at `vertex`, one per incident triangle.
    fn incident_half_edges(&self, vertex: usize) -> impl Iterator<Item = usize> + '_;

    /// Origin vertex of a half-edge.
    fn half_edge_vertex(&self, half_edge: usize) -> usize;

    /// Next half-edge in the same triangle.
    fn next(&self, half_edge: usize) -> usize;

    /// Previous half-edge in the same triangle.
    fn previous(&self, half_edge: usize) -> usize;

    /// Iterate over all triangles as vertex index triples.
    fn faces(&self) -> impl Iterator<Item = [usize; 3]> + '_;

    /// Vertices sharing a triangle with `vertex`, without duplicates.
    fn neighbors(&self, vertex: usize) -> Neighbors {
        let mut out = Neighbors::new();
        for he in self.incident_half_edges(vertex) {
            for u in [
                self.half_edge_vertex(self.next(he)),
                self.half_edge_vertex(self.previous(he)),
            ] {
                if !out.contains(&u) {
                    out.push(u);
                }
            }
        }
        out
    }

    /// Breadth-first topological levels ("toplesets") from a source set.
    ///
    /// Sources must be valid vertex indices; duplicates are ignored.
    fn topological_levels(&self, sources: &[usize]) -> Toplesets {
        Toplesets::compute(self, sources)
    }
}

/// Vertices grouped by hop count from a source set.
///
/// Level `k` holds the vertices whose shortest edge path to any source has
/// `k` edges. Vertices that cannot be reached have no level and do not
/// appear in [`order`](Self::order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toplesets {
    level_of: Vec<Option<usize>>,
    order: Vec<usize>,
    boundaries: Vec<usize>,
}

impl Toplesets {
    fn compute<M: MeshAdapter + ?Sized>(mesh: &M, sources: &[usize]) -> Self {
        let mut level_of = vec![None; mesh.vertex_count()];
        let mut order = Vec::with_capacity(mesh.vertex_count());
        let mut queue = VecDeque::new();

        for &s in sources {
            if level_of[s].is_none() {
                level_of[s] = Some(0);
                queue.push_back((s, 0));
            }
        }

        let mut boundaries = vec![0];
        let mut current = 0;
        while let Some((v, level)) = queue.pop_front() {
            if level != current {
                boundaries.push(order.len());
                current = level;
            }
            order.push(v);
            for u in mesh.neighbors(v) {
                if level_of[u].is_none() {
                    level_of[u] = Some(level + 1);
                    queue.push_back((u, level + 1));
                }
            }
        }
        if !order.is_empty() {
            boundaries.push(order.len());
        }

        Self {
            level_of,
            order,
            boundaries,
        }
    }

    /// Level of a vertex, `None` if unreachable.
    #[must_use]
    pub fn level_of(&self, vertex: usize) -> Option<usize> {
        self.level_of.get(vertex).copied().flatten()
    }

    /// Reachable vertices ordered by level.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Offsets into [`order`](Self::order) where each level starts, followed
    /// by the total length.
    #[must_use]
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    /// Number of levels.
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.boundaries.len().saturating_sub(1)
    }

    /// Index range of level `level` inside [`order`](Self::order).
    ///
    /// # Panics
    ///
    /// Panics if `level >= self.level_count()`.
    #[must_use]
    pub fn level_range(&self, level: usize) -> Range<usize> {
        self.boundaries[level]..self.boundaries[level + 1]
    }

    /// Vertices of level `level`.
    ///
    /// # Panics
    ///
    /// Panics if `level >= self.level_count()`.
    #[must_use]
    pub fn level(&self, level: usize) -> &[usize] {
        &self.order[self.level_range(level)]
    }

    /// Number of reachable vertices.
    #[must_use]
    pub fn reachable_count(&self) -> usize {
        self.order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::TriMesh;
    use crate::test_meshes::{grid, two_components};

    #[test]
    fn grid_levels_from_corner() {
        // Diagonals run (i, j) -> (i + 1, j + 1), so the hop count is max(i, j).
        let mesh = grid(4, 4, 1.0);
        let sets = mesh.topological_levels(&[0]);

        assert_eq!(sets.level_count(), 4);
        assert_eq!(sets.level(0), &[0]);
        for v in 0..16 {
            let (i, j) = (v % 4, v / 4);
            assert_eq!(sets.level_of(v), Some(i.max(j)));
        }
        assert_eq!(sets.reachable_count(), 16);
    }

    #[test]
    fn duplicate_sources_are_merged() {
        let mesh = grid(3, 3, 1.0);
        let sets = mesh.topological_levels(&[4, 4]);
        assert_eq!(sets.level(0), &[4]);
        // (2, 0) and (0, 2) sit off the diagonals through the center.
        assert_eq!(sets.level_count(), 3);
        assert_eq!(sets.level(2).len(), 2);
    }

    #[test]
    fn unreachable_vertices_have_no_level() {
        let mesh = two_components();
        let sets = mesh.topological_levels(&[0]);

        assert_eq!(sets.reachable_count(), 3);
        assert_eq!(sets.level_of(3), None);
        assert_eq!(sets.level_of(5), None);
        assert!(!sets.order().contains(&4));
    }

    #[test]
    fn neighbors_of_boundary_vertex() {
        let mesh = TriMesh::from_raw(
            &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
            &[0, 1, 2, 0, 2, 3],
        )
        .unwrap();

        let mut n = mesh.neighbors(0).into_vec();
        n.sort_unstable();
        assert_eq!(n, vec![1, 2, 3]);

        let mut n = mesh.neighbors(1).into_vec();
        n.sort_unstable();
        assert_eq!(n, vec![0, 2]);
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn level_past_last_panics() {
        let sets = grid(3, 3, 1.0).topological_levels(&[0]);
        let _ = sets.level(sets.level_count());
    }
}
