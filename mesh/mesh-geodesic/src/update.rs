//! Triangle update rule.
//!
//! Given distances at two corners of a triangle, estimate the distance at the
//! third corner. The triangle is unfolded into the plane of its two edges
//! from the unknown corner and a planar wavefront consistent with both known
//! distances is fitted. When that fit is not valid (a corner is still
//! unknown, the triangle is degenerate, or the wavefront would not enter the
//! triangle through the opposite edge) the estimate falls back to plain edge
//! propagation.

// Algorithm uses standard mathematical variable names
#![allow(clippy::many_single_char_names)]

use nalgebra::{Matrix3x2, Point3, Vector2, Vector3};

use crate::adapter::MeshAdapter;

/// Relative determinant below which the edge Gram matrix counts as singular.
const SINGULAR_EPS: f64 = 1e-12;

/// Which known corner an estimate was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contributor {
    /// The corner at the end of the first edge.
    First,
    /// The corner at the end of the second edge.
    Second,
}

/// Outcome of [`planar_update`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleUpdate {
    /// Candidate distance at the unknown corner, `f64::INFINITY` if none.
    pub distance: f64,
    /// Corner whose distance the estimate is built on.
    pub contributor: Contributor,
    /// Where the wavefront reaching the unknown corner crosses the opposite
    /// edge, as an offset from the unknown corner. For edge propagation this
    /// is the winning edge itself.
    pub crossing: Vector3<f64>,
    /// Whether the planar unfold was used (as opposed to edge propagation).
    pub planar: bool,
}

/// Estimate the distance at a corner from the two other corners.
///
/// `x0` and `x1` are the edge vectors from the unknown corner to the known
/// corners, `t0` and `t1` their current distances (possibly infinite).
///
/// # Example
///
/// ```
/// use mesh_geodesic::planar_update;
/// use nalgebra::Vector3;
///
/// // A plane wave travelling along -Y reaches both ends of the opposite
/// // edge at distance 1; the corner sits one unit further along.
/// let up = planar_update(
///     &Vector3::new(-0.5, 1.0, 0.0),
///     &Vector3::new(0.5, 1.0, 0.0),
///     1.0,
///     1.0,
/// );
/// assert!(up.planar);
/// assert!((up.distance - 2.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn planar_update(x0: &Vector3<f64>, x1: &Vector3<f64>, t0: f64, t1: f64) -> TriangleUpdate {
    if !(t0.is_finite() && t1.is_finite()) {
        return edge_update(x0, x1, t0, t1);
    }

    let x = Matrix3x2::from_columns(&[*x0, *x1]);
    let gram = x.transpose() * x;
    if gram.determinant() <= SINGULAR_EPS * gram[(0, 0)] * gram[(1, 1)] {
        return edge_update(x0, x1, t0, t1);
    }
    let Some(q) = gram.try_inverse() else {
        return edge_update(x0, x1, t0, t1);
    };

    let t = Vector2::new(t0, t1);
    let ones = Vector2::repeat(1.0);
    let q_ones = q * ones;
    let q_t = q * t;

    let k = ones.dot(&q_ones);
    let delta = ones.dot(&q_t);
    let disc = delta.mul_add(delta, -k * (t.dot(&q_t) - 1.0));
    if disc < 0.0 {
        return edge_update(x0, x1, t0, t1);
    }
    let p = (delta + disc.sqrt()) / k;

    // Q * X^T * n with n = X * Q * (t - p) reduces to Q * (t - p).
    let residual = t - ones * p;
    let cond = q * residual;
    if !(cond.x < 0.0 && cond.y < 0.0) || !p.is_finite() || p < t0.max(t1) {
        return edge_update(x0, x1, t0, t1);
    }

    let n = x * cond;
    let crossing = edge_crossing(&n, x0, x1).unwrap_or(*x0);

    TriangleUpdate {
        distance: p,
        contributor: if t1 < t0 {
            Contributor::Second
        } else {
            Contributor::First
        },
        crossing,
        planar: true,
    }
}

/// `min(t0 + |x0|, t1 + |x1|)`; the first corner wins ties.
fn edge_update(x0: &Vector3<f64>, x1: &Vector3<f64>, t0: f64, t1: f64) -> TriangleUpdate {
    let d0 = t0 + x0.norm();
    let d1 = t1 + x1.norm();

    let (distance, contributor, crossing) = if d1 < d0 {
        (d1, Contributor::Second, *x1)
    } else {
        (d0, Contributor::First, *x0)
    };

    TriangleUpdate {
        distance: if distance.is_nan() {
            f64::INFINITY
        } else {
            distance
        },
        contributor,
        crossing,
        planar: false,
    }
}

/// Intersect the line through the unknown corner along `-n` with the line
/// through `x0` and `x1` (least squares, the two lines are coplanar).
fn edge_crossing(n: &Vector3<f64>, x0: &Vector3<f64>, x1: &Vector3<f64>) -> Option<Vector3<f64>> {
    let edge = x1 - x0;
    let a = Matrix3x2::from_columns(&[-n, edge]);
    let ata = a.transpose() * a;
    let l = ata.try_inverse()? * (a.transpose() * -x0);
    Some(x0 + edge * l.y)
}

/// Outcome of [`update_step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexUpdate {
    /// Candidate distance at the half-edge's origin.
    pub distance: f64,
    /// Vertex whose distance the estimate is built on.
    pub contributor: usize,
    /// Point on the opposite edge the wavefront passes through.
    pub crossing: Point3<f64>,
}

/// Apply [`planar_update`] to the triangle of `half_edge`, updating its
/// origin from the two other corners.
#[must_use]
pub fn update_step<M: MeshAdapter + ?Sized>(
    mesh: &M,
    distances: &[f64],
    half_edge: usize,
) -> VertexUpdate {
    let v = mesh.half_edge_vertex(half_edge);
    let a = mesh.half_edge_vertex(mesh.next(half_edge));
    let b = mesh.half_edge_vertex(mesh.previous(half_edge));

    let origin = mesh.position(v);
    let up = planar_update(
        &(mesh.position(a) - origin),
        &(mesh.position(b) - origin),
        distances[a],
        distances[b],
    );

    VertexUpdate {
        distance: up.distance,
        contributor: match up.contributor {
            Contributor::First => a,
            Contributor::Second => b,
        },
        crossing: origin + up.crossing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_meshes::right_triangle;
    use approx::assert_relative_eq;

    fn below_unit_edge() -> (Vector3<f64>, Vector3<f64>) {
        // Unknown corner at (0.5, -1); known corners at (0, 0) and (1, 0).
        (Vector3::new(-0.5, 1.0, 0.0), Vector3::new(0.5, 1.0, 0.0))
    }

    #[test]
    fn plane_wave_through_opposite_edge() {
        let (x0, x1) = below_unit_edge();
        let up = planar_update(&x0, &x1, 1.0, 1.0);

        assert!(up.planar);
        assert_relative_eq!(up.distance, 2.0, epsilon = 1e-12);
        assert_relative_eq!(up.crossing, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn planar_estimate_beats_edge_propagation() {
        let (x0, x1) = below_unit_edge();
        let up = planar_update(&x0, &x1, 1.0, 1.2);

        let edge = 1.0 + x0.norm();
        assert!(up.planar);
        assert!(up.distance < edge);
        assert!(up.distance >= 1.2);
        assert_eq!(up.contributor, Contributor::First);
    }

    #[test]
    fn one_unknown_corner_propagates_along_edge() {
        let (x0, x1) = below_unit_edge();
        let up = planar_update(&x0, &x1, f64::INFINITY, 0.5);

        assert!(!up.planar);
        assert_eq!(up.contributor, Contributor::Second);
        assert_relative_eq!(up.distance, 0.5 + x1.norm());
        assert_eq!(up.crossing, x1);
    }

    #[test]
    fn both_unknown_is_infinite() {
        let (x0, x1) = below_unit_edge();
        let up = planar_update(&x0, &x1, f64::INFINITY, f64::INFINITY);
        assert!(up.distance.is_infinite());
    }

    #[test]
    fn degenerate_triangle_falls_back() {
        // Collinear corners: the Gram matrix is singular.
        let x0 = Vector3::new(1.0, 0.0, 0.0);
        let x1 = Vector3::new(2.0, 0.0, 0.0);
        let up = planar_update(&x0, &x1, 0.0, 0.5);

        assert!(!up.planar);
        assert_relative_eq!(up.distance, 1.0);
        assert_eq!(up.contributor, Contributor::First);
    }

    #[test]
    fn coincident_corner_falls_back() {
        let x0 = Vector3::zeros();
        let x1 = Vector3::new(0.0, 1.0, 0.0);
        let up = planar_update(&x0, &x1, 2.0, 0.0);

        assert!(!up.planar);
        assert_relative_eq!(up.distance, 1.0);
        assert_eq!(up.contributor, Contributor::Second);
    }

    #[test]
    fn wave_parallel_to_edge_is_rejected() {
        // Right angle at A: d(A) = 0 and d(B) = |AB| describe a wave moving
        // along AB, which never enters the triangle towards C.
        let mesh = right_triangle();
        let distances = [0.0, 3.0, f64::INFINITY];
        let he = mesh.incident_half_edges(2).next().unwrap();
        let up = update_step(&mesh, &distances, he);

        assert_relative_eq!(up.distance, 4.0);
        assert_eq!(up.contributor, 0);
        assert_relative_eq!(up.crossing, Point3::origin());
    }

    #[test]
    fn update_step_uses_triangle_corners() {
        let mesh = right_triangle();
        let distances = [f64::INFINITY, f64::INFINITY, 0.0];
        let he = mesh.incident_half_edges(0).next().unwrap();
        let up = update_step(&mesh, &distances, he);

        assert_relative_eq!(up.distance, 4.0);
        assert_eq!(up.contributor, 2);
    }
}
