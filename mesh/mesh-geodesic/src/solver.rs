//! Engine selection and input validation.

use std::time::Instant;

use tracing::{debug, info};

use crate::adapter::MeshAdapter;
use crate::distance::DistanceField;
use crate::error::{GeodesicError, GeodesicResult};
use crate::fast_marching::fast_marching;
use crate::heat::heat_flow;
use crate::linear::{CholeskySolver, SparseSolver};
use crate::params::{Algorithm, GeodesicParams};
use crate::ptp::parallel_toplesets_propagation_cpu;

/// Geodesic distance solver over a borrowed mesh.
///
/// The solver holds no state between calls; each [`compute`](Self::compute)
/// returns a fresh [`DistanceField`] owned by the caller.
///
/// # Example
///
/// ```
/// use mesh_geodesic::{GeodesicParams, GeodesicSolver, TriMesh};
///
/// // Right triangle with legs 3 and 4.
/// let mesh = TriMesh::from_raw(
///     &[0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 4.0, 0.0],
///     &[0, 1, 2],
/// )?;
///
/// let field = GeodesicSolver::new(&mesh).compute(&[0], &GeodesicParams::default())?;
/// assert_eq!(field.sorted_order(), &[0, 1, 2]);
/// assert!((field.distance(2) - 4.0).abs() < 1e-12);
/// # Ok::<(), mesh_geodesic::GeodesicError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GeodesicSolver<'a, M: ?Sized, S = CholeskySolver> {
    mesh: &'a M,
    sparse: S,
}

impl<'a, M: MeshAdapter + Sync + ?Sized> GeodesicSolver<'a, M> {
    /// Create a solver using sparse Cholesky for the heat method.
    #[must_use]
    pub const fn new(mesh: &'a M) -> Self {
        Self {
            mesh,
            sparse: CholeskySolver,
        }
    }
}

impl<'a, M: MeshAdapter + Sync + ?Sized, S: SparseSolver> GeodesicSolver<'a, M, S> {
    /// Replace the linear solver used by the heat method.
    #[must_use]
    pub fn with_sparse_solver<T: SparseSolver>(self, sparse: T) -> GeodesicSolver<'a, M, T> {
        GeodesicSolver {
            mesh: self.mesh,
            sparse,
        }
    }

    /// The mesh distances are computed on.
    #[must_use]
    pub const fn mesh(&self) -> &'a M {
        self.mesh
    }

    /// Compute distances from a single source vertex.
    ///
    /// # Errors
    ///
    /// See [`compute`](Self::compute).
    pub fn compute_from_vertex(
        &self,
        source: usize,
        params: &GeodesicParams,
    ) -> GeodesicResult<DistanceField> {
        self.compute(&[source], params)
    }

    /// Compute distances from a set of source vertices.
    ///
    /// Every source ends at distance 0. With clustering enabled, a repeated
    /// source belongs to the index of its first occurrence in `sources`.
    ///
    /// # Errors
    ///
    /// - [`GeodesicError::EmptyMesh`] if the mesh has no vertices
    /// - [`GeodesicError::NoSources`] if `sources` is empty
    /// - [`GeodesicError::InvalidVertex`] if a source is out of range
    /// - [`GeodesicError::Solver`] if a heat method solve fails
    /// - [`GeodesicError::Gpu`] if the GPU engine cannot run
    pub fn compute(
        &self,
        sources: &[usize],
        params: &GeodesicParams,
    ) -> GeodesicResult<DistanceField> {
        self.validate(sources)?;

        let start = Instant::now();
        info!(
            algorithm = %params.algorithm,
            vertices = self.mesh.vertex_count(),
            sources = sources.len(),
            "Starting geodesic computation"
        );

        if params.algorithm != Algorithm::FastMarching && params.has_budget() {
            debug!(algorithm = %params.algorithm, "Iteration and radius budgets only apply to fast marching");
        }

        let mut field = match params.algorithm {
            Algorithm::FastMarching => fast_marching(self.mesh, sources, params),
            Algorithm::PtpCpu => {
                parallel_toplesets_propagation_cpu(self.mesh, sources, params.clusters, &params.ptp)
            }
            #[cfg(feature = "gpu")]
            Algorithm::PtpGpu => crate::gpu::parallel_toplesets_propagation_gpu(
                self.mesh,
                sources,
                params.clusters,
                &params.ptp,
            )?,
            Algorithm::HeatFlow => {
                if params.clusters {
                    debug!("The heat method does not assign clusters");
                }
                heat_flow(self.mesh, sources, &params.heat, &self.sparse)?
            }
        };

        if params.normalize {
            field.normalize();
        }

        let time_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            finalized = field.count_finalized(),
            reachable = field.reachable_count(),
            time_ms = format!("{time_ms:.2}"),
            "Geodesic computation complete"
        );

        Ok(field)
    }

    fn validate(&self, sources: &[usize]) -> GeodesicResult<()> {
        let vertex_count = self.mesh.vertex_count();
        if vertex_count == 0 {
            return Err(GeodesicError::EmptyMesh);
        }
        if sources.is_empty() {
            return Err(GeodesicError::NoSources);
        }
        if let Some(&index) = sources.iter().find(|&&s| s >= vertex_count) {
            return Err(GeodesicError::InvalidVertex {
                index,
                vertex_count,
            });
        }
        Ok(())
    }
}
