//! Small meshes shared by the unit tests.

use nalgebra::Point3;

use crate::mesh::TriMesh;

/// Planar `nx` x `ny` grid in the XY plane; vertex `(i, j)` has id `j * nx + i`.
/// Each cell is split along the `(i, j) -> (i + 1, j + 1)` diagonal.
pub fn grid(nx: usize, ny: usize, spacing: f64) -> TriMesh {
    let mut positions = Vec::with_capacity(nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            positions.push(Point3::new(i as f64 * spacing, j as f64 * spacing, 0.0));
        }
    }

    let id = |i: usize, j: usize| (j * nx + i) as u32;
    let mut faces = Vec::with_capacity(2 * (nx - 1) * (ny - 1));
    for j in 0..ny - 1 {
        for i in 0..nx - 1 {
            faces.push([id(i, j), id(i + 1, j), id(i + 1, j + 1)]);
            faces.push([id(i, j), id(i + 1, j + 1), id(i, j + 1)]);
        }
    }

    TriMesh::new(positions, faces).unwrap()
}

/// Right triangle with legs 3 (along X) and 4 (along Y).
pub fn right_triangle() -> TriMesh {
    TriMesh::from_raw(
        &[0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 4.0, 0.0],
        &[0, 1, 2],
    )
    .unwrap()
}

/// Two disjoint unit triangles: vertices 0..3 and 3..6.
pub fn two_components() -> TriMesh {
    TriMesh::from_raw(
        &[
            0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, //
            5.0, 0.0, 0.0, 6.0, 0.0, 0.0, 5.0, 1.0, 0.0,
        ],
        &[0, 1, 2, 3, 4, 5],
    )
    .unwrap()
}
