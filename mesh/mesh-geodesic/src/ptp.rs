//! Parallel toplesets propagation (PTP).
//!
//! Vertices are grouped by hop count from the sources. One sweep relaxes the
//! levels in order; all vertices of a level are updated in parallel from the
//! state left by the previous level. A hop count is only a lower bound on
//! causal order, so several sweeps may be needed to reach the fast-marching
//! fixed point. Sweeps stop early once a full sweep changes nothing.
//!
//! The driver is written against [`LevelRelaxer`], which only knows how to
//! relax one contiguous range of the level order. [`CpuRelaxer`] does this
//! with rayon; the GPU backend lives in [`crate::gpu`].

use std::ops::Range;

use rayon::prelude::*;
use tracing::debug;

use crate::adapter::{MeshAdapter, Toplesets};
use crate::distance::DistanceField;
use crate::error::GeodesicResult;
use crate::fast_marching::best_update;
use crate::params::PtpParams;

/// Parallel relaxation of one topological level at a time.
///
/// Implementations must compute every vertex of the range from the state
/// before the call and only then write the results, so vertices of the same
/// level never observe each other's new values.
pub(crate) trait LevelRelaxer {
    /// Relax the vertices `order[range]` of the toplesets order.
    fn relax_level(&mut self, range: Range<usize>) -> GeodesicResult<()>;

    /// Close a sweep. Returns whether any distance dropped by more than the
    /// tolerance since the previous call.
    fn end_sweep(&mut self) -> GeodesicResult<bool>;
}

/// Run sweeps over the levels of `sets` until convergence or the sweep
/// limit. A limit of zero still runs one sweep. Returns the number of sweeps
/// performed.
pub(crate) fn propagate<R: LevelRelaxer + ?Sized>(
    relaxer: &mut R,
    sets: &Toplesets,
    params: &PtpParams,
) -> GeodesicResult<usize> {
    // Level 0 holds only sources, so one sweep is needed to reach the rest.
    let limit = params.sweeps.max(1);
    let mut sweeps = 0;
    while sweeps < limit {
        for level in 1..sets.level_count() {
            relaxer.relax_level(sets.level_range(level))?;
        }
        sweeps += 1;

        if !relaxer.end_sweep()? {
            debug!(sweeps, "PTP converged");
            break;
        }
    }
    Ok(sweeps)
}

/// Multi-core backend.
pub(crate) struct CpuRelaxer<'a, M: ?Sized> {
    mesh: &'a M,
    order: &'a [usize],
    distances: Vec<f64>,
    clusters: Option<Vec<Option<usize>>>,
    tolerance: f64,
    changed: bool,
}

impl<'a, M: MeshAdapter + Sync + ?Sized> CpuRelaxer<'a, M> {
    /// Seed the field with the sources at level 0.
    pub(crate) fn new(
        mesh: &'a M,
        sets: &'a Toplesets,
        sources: &[usize],
        clusters: bool,
        tolerance: f64,
    ) -> Self {
        let vertex_count = mesh.vertex_count();
        let (distances, clusters) = seed(vertex_count, sources, clusters);
        Self {
            mesh,
            order: sets.order(),
            distances,
            clusters,
            tolerance,
            changed: false,
        }
    }

    /// Consume the relaxer into a distance field ordered by level.
    pub(crate) fn into_field(self) -> DistanceField {
        let field = DistanceField::from_distances(self.distances).with_order(self.order.to_vec());
        match self.clusters {
            Some(clusters) => field.with_clusters(clusters),
            None => field,
        }
    }
}

impl<M: MeshAdapter + Sync + ?Sized> LevelRelaxer for CpuRelaxer<'_, M> {
    fn relax_level(&mut self, range: Range<usize>) -> GeodesicResult<()> {
        let vertices = &self.order[range];
        let mesh = self.mesh;
        let distances = &self.distances;
        let clusters = self.clusters.as_deref();

        let updates: Vec<_> = vertices
            .par_iter()
            .map(|&v| {
                best_update(mesh, distances, v).map(|up| {
                    let cluster = clusters.and_then(|c| c[up.contributor]);
                    (v, up.distance, cluster)
                })
            })
            .collect();

        for (v, distance, cluster) in updates.into_iter().flatten() {
            if self.distances[v] - distance > self.tolerance {
                self.changed = true;
            }
            self.distances[v] = distance;
            if let Some(clusters) = self.clusters.as_mut() {
                clusters[v] = cluster;
            }
        }
        Ok(())
    }

    fn end_sweep(&mut self) -> GeodesicResult<bool> {
        Ok(std::mem::take(&mut self.changed))
    }
}

/// Initial distances and clusters: zero at the sources, the first occurrence
/// of a repeated source owning its cluster.
pub(crate) fn seed(
    vertex_count: usize,
    sources: &[usize],
    clusters: bool,
) -> (Vec<f64>, Option<Vec<Option<usize>>>) {
    let mut distances = vec![f64::INFINITY; vertex_count];
    let mut cluster_of = clusters.then(|| vec![None; vertex_count]);
    for (i, &s) in sources.iter().enumerate() {
        distances[s] = 0.0;
        if let Some(c) = cluster_of.as_mut() {
            c[s].get_or_insert(i);
        }
    }
    (distances, cluster_of)
}

/// Run PTP on CPU threads.
pub(crate) fn parallel_toplesets_propagation_cpu<M: MeshAdapter + Sync + ?Sized>(
    mesh: &M,
    sources: &[usize],
    clusters: bool,
    params: &PtpParams,
) -> DistanceField {
    let sets = mesh.topological_levels(sources);
    let mut relaxer = CpuRelaxer::new(mesh, &sets, sources, clusters, params.tolerance);

    // The CPU relaxer never fails.
    let sweeps = propagate(&mut relaxer, &sets, params).unwrap_or(params.sweeps);
    debug!(
        levels = sets.level_count(),
        reachable = sets.reachable_count(),
        sweeps,
        "PTP (cpu) finished"
    );
    relaxer.into_field()
}
