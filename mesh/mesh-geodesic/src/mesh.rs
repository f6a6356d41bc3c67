//! Indexed triangle mesh with implicit half-edges.
//!
//! Half-edge `3 * f + k` starts at corner `k` of face `f`, so `next` and
//! `previous` are pure index arithmetic. Only the per-vertex star is stored.

use nalgebra::Point3;

use crate::adapter::MeshAdapter;
use crate::error::{GeodesicError, GeodesicResult};

/// Triangle mesh implementing [`MeshAdapter`].
///
/// # Example
///
/// ```
/// use mesh_geodesic::{MeshAdapter, TriMesh};
///
/// let mesh = TriMesh::from_raw(
///     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.5, 1.0, 0.0],
///     &[0, 1, 2],
/// )?;
/// assert_eq!(mesh.vertex_count(), 3);
/// assert_eq!(mesh.face_count(), 1);
/// # Ok::<(), mesh_geodesic::GeodesicError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TriMesh {
    positions: Vec<Point3<f64>>,
    faces: Vec<[u32; 3]>,
    /// `star[star_offsets[v]..star_offsets[v + 1]]` are the half-edges leaving `v`.
    star_offsets: Vec<usize>,
    star: Vec<usize>,
}

impl TriMesh {
    /// Build a mesh from positions and triangles.
    ///
    /// # Errors
    ///
    /// Returns [`GeodesicError::InvalidFace`] if a face references a vertex
    /// outside `positions`.
    pub fn new(positions: Vec<Point3<f64>>, faces: Vec<[u32; 3]>) -> GeodesicResult<Self> {
        let vertex_count = positions.len();

        let mut valence = vec![0usize; vertex_count + 1];
        for (f, face) in faces.iter().enumerate() {
            for &index in face {
                let index = index as usize;
                if index >= vertex_count {
                    return Err(GeodesicError::InvalidFace {
                        face: f,
                        index,
                        vertex_count,
                    });
                }
                valence[index + 1] += 1;
            }
        }

        // Prefix sum into CSR offsets, then scatter half-edges.
        for v in 0..vertex_count {
            valence[v + 1] += valence[v];
        }
        let star_offsets = valence;
        let mut cursor = star_offsets.clone();
        let mut star = vec![0; faces.len() * 3];
        for (f, face) in faces.iter().enumerate() {
            for (k, &v) in face.iter().enumerate() {
                let slot = &mut cursor[v as usize];
                star[*slot] = 3 * f + k;
                *slot += 1;
            }
        }

        Ok(Self {
            positions,
            faces,
            star_offsets,
            star,
        })
    }

    /// Build a mesh from flat coordinate and index arrays.
    ///
    /// `positions` is `[x0, y0, z0, x1, ...]`, `indices` is `[a0, b0, c0, a1, ...]`;
    /// trailing values that do not form a full vertex or face are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`GeodesicError::InvalidFace`] for out-of-range indices.
    pub fn from_raw(positions: &[f64], indices: &[u32]) -> GeodesicResult<Self> {
        let positions = positions
            .chunks_exact(3)
            .map(|p| Point3::new(p[0], p[1], p[2]))
            .collect();
        let faces = indices
            .chunks_exact(3)
            .map(|f| [f[0], f[1], f[2]])
            .collect();
        Self::new(positions, faces)
    }

    /// Number of triangles.
    #[must_use]
    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Vertex positions.
    #[must_use]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// Mutable vertex positions. Topology stays fixed.
    pub fn positions_mut(&mut self) -> &mut [Point3<f64>] {
        &mut self.positions
    }
}

impl MeshAdapter for TriMesh {
    #[inline]
    fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    fn position(&self, vertex: usize) -> Point3<f64> {
        self.positions[vertex]
    }

    fn incident_half_edges(&self, vertex: usize) -> impl Iterator<Item = usize> + '_ {
        self.star[self.star_offsets[vertex]..self.star_offsets[vertex + 1]]
            .iter()
            .copied()
    }

    #[inline]
    fn half_edge_vertex(&self, half_edge: usize) -> usize {
        self.faces[half_edge / 3][half_edge % 3] as usize
    }

    #[inline]
    fn next(&self, half_edge: usize) -> usize {
        if half_edge % 3 == 2 {
            half_edge - 2
        } else {
            half_edge + 1
        }
    }

    #[inline]
    fn previous(&self, half_edge: usize) -> usize {
        if half_edge % 3 == 0 {
            half_edge + 2
        } else {
            half_edge - 1
        }
    }

    fn faces(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.faces
            .iter()
            .map(|f| [f[0] as usize, f[1] as usize, f[2] as usize])
    }
}
