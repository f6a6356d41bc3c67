//! Heat method.
//!
//! Heat is diffused from the sources for a short time, the normalized
//! negative gradient of the heat gives the direction of the distance
//! gradient, and a Poisson solve recovers the distance from its divergence.
//! Both linear systems go through a [`SparseSolver`].

use nalgebra::{Point3, Vector3};
use nalgebra_sparse::{CooMatrix, CscMatrix};
use tracing::debug;

use crate::adapter::MeshAdapter;
use crate::distance::DistanceField;
use crate::error::{GeodesicError, GeodesicResult};
use crate::linear::SparseSolver;
use crate::params::HeatParams;

/// Faces with twice their area below this are skipped.
const DEGENERATE_AREA: f64 = 1e-15;

/// Cotangents are clamped to this magnitude.
const MAX_COTANGENT: f64 = 1e4;

/// Lower bound on a vertex's lumped mass, keeps isolated vertices solvable.
const MIN_MASS: f64 = 1e-12;

/// Cotangent Laplacian and lumped mass of a mesh.
#[derive(Debug, Clone)]
struct Operators {
    /// Positive semi-definite Laplacian as triplets (duplicates are summed).
    laplacian: Vec<(usize, usize, f64)>,
    mass: Vec<f64>,
    mean_edge: f64,
}

impl Operators {
    fn build<M: MeshAdapter + ?Sized>(mesh: &M) -> Self {
        let n = mesh.vertex_count();
        let mut laplacian = Vec::new();
        let mut mass = vec![0.0; n];
        let mut edge_sum = 0.0;
        let mut edge_count = 0usize;

        for face in mesh.faces() {
            let p = face.map(|v| mesh.position(v));
            for k in 0..3 {
                edge_sum += (p[(k + 1) % 3] - p[k]).norm();
            }
            edge_count += 3;

            let area2 = (p[1] - p[0]).cross(&(p[2] - p[0])).norm();
            if area2 < DEGENERATE_AREA {
                continue;
            }
            for &v in &face {
                mass[v] += area2 / 6.0;
            }

            let cot = corner_cotangents(&p);
            for k in 0..3 {
                // Corner k is opposite edge (k + 1, k + 2).
                let i = face[(k + 1) % 3];
                let j = face[(k + 2) % 3];
                let w = 0.5 * cot[k];
                laplacian.extend([(i, j, -w), (j, i, -w), (i, i, w), (j, j, w)]);
            }
        }

        for m in &mut mass {
            *m = m.max(MIN_MASS);
        }

        #[allow(clippy::cast_precision_loss)]
        let mean_edge = if edge_count > 0 {
            edge_sum / edge_count as f64
        } else {
            1.0
        };

        Self {
            laplacian,
            mass,
            mean_edge,
        }
    }

    /// `mass_scale * M + laplacian_scale * L`.
    fn system(&self, mass_scale: f64, laplacian_scale: f64) -> CscMatrix<f64> {
        let n = self.mass.len();
        let mut coo = CooMatrix::new(n, n);
        for (i, &m) in self.mass.iter().enumerate() {
            coo.push(i, i, mass_scale * m);
        }
        for &(i, j, w) in &self.laplacian {
            coo.push(i, j, laplacian_scale * w);
        }
        CscMatrix::from(&coo)
    }
}

/// Cotangent of the interior angle at each corner, clamped.
fn corner_cotangents(p: &[Point3<f64>; 3]) -> [f64; 3] {
    std::array::from_fn(|k| {
        let a = p[(k + 1) % 3] - p[k];
        let b = p[(k + 2) % 3] - p[k];
        let sin = a.cross(&b).norm().max(DEGENERATE_AREA);
        (a.dot(&b) / sin).clamp(-MAX_COTANGENT, MAX_COTANGENT)
    })
}

/// Normalized negative heat gradient of one face, zero where it vanishes.
fn face_direction(p: &[Point3<f64>; 3], u: [f64; 3]) -> Vector3<f64> {
    let normal = (p[1] - p[0]).cross(&(p[2] - p[0]));
    let area2 = normal.norm();
    if area2 < DEGENERATE_AREA {
        return Vector3::zeros();
    }
    let n = normal / area2;

    let mut grad = Vector3::zeros();
    for k in 0..3 {
        let opposite = p[(k + 2) % 3] - p[(k + 1) % 3];
        grad += u[k] * n.cross(&opposite);
    }
    let grad = grad / area2;

    let norm = grad.norm();
    if norm > f64::EPSILON {
        -grad / norm
    } else {
        Vector3::zeros()
    }
}

/// Integrated divergence of the per-face field.
fn divergence<M: MeshAdapter + ?Sized>(mesh: &M, u: &[f64]) -> Vec<f64> {
    let mut div = vec![0.0; mesh.vertex_count()];
    for face in mesh.faces() {
        let p = face.map(|v| mesh.position(v));
        let x = face_direction(&p, face.map(|v| u[v]));
        if x == Vector3::zeros() {
            continue;
        }

        let cot = corner_cotangents(&p);
        for k in 0..3 {
            let (k1, k2) = ((k + 1) % 3, (k + 2) % 3);
            let e1 = p[k1] - p[k];
            let e2 = p[k2] - p[k];
            div[face[k]] += 0.5 * (cot[k2] * e1.dot(&x) + cot[k1] * e2.dot(&x));
        }
    }
    div
}

/// Run the heat method from `sources` with the given sparse solver.
///
/// # Errors
///
/// Returns [`GeodesicError::Solver`] if either linear solve fails.
pub(crate) fn heat_flow<M, S>(
    mesh: &M,
    sources: &[usize],
    params: &HeatParams,
    solver: &S,
) -> GeodesicResult<DistanceField>
where
    M: MeshAdapter + ?Sized,
    S: SparseSolver + ?Sized,
{
    let n = mesh.vertex_count();
    let ops = Operators::build(mesh);
    let t = params.time_factor * ops.mean_edge * ops.mean_edge;
    debug!(mean_edge = ops.mean_edge, time = t, "Built cotangent operators");

    let mut delta = vec![0.0; n];
    for &s in sources {
        delta[s] = 1.0;
    }
    let u = solver
        .solve(&ops.system(1.0, t), &delta)
        .map_err(|e| GeodesicError::Solver {
            stage: "heat diffusion",
            reason: e.reason,
        })?;

    let rhs: Vec<f64> = divergence(mesh, &u).into_iter().map(|d| -d).collect();
    let phi = solver
        .solve(&ops.system(params.regularization, 1.0), &rhs)
        .map_err(|e| GeodesicError::Solver {
            stage: "poisson",
            reason: e.reason,
        })?;

    let base = sources
        .iter()
        .map(|&s| phi[s])
        .fold(f64::INFINITY, f64::min);

    let sets = mesh.topological_levels(sources);
    let mut distances: Vec<f64> = phi
        .iter()
        .enumerate()
        .map(|(v, &p)| {
            if sets.level_of(v).is_some() {
                (p - base).max(0.0)
            } else {
                f64::INFINITY
            }
        })
        .collect();
    for &s in sources {
        distances[s] = 0.0;
    }

    Ok(DistanceField::from_distances(distances))
}
