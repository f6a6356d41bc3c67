//! Parameters for geodesic distance computation.

use std::fmt;

/// Engine used to compute a distance field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    /// Sequential fast marching. Exact causal order; the reference engine.
    #[default]
    FastMarching,
    /// Parallel toplesets propagation on CPU threads.
    PtpCpu,
    /// Parallel toplesets propagation on a GPU compute device.
    #[cfg(feature = "gpu")]
    PtpGpu,
    /// Heat diffusion followed by a Poisson solve.
    HeatFlow,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FastMarching => "fast marching",
            Self::PtpCpu => "ptp (cpu)",
            #[cfg(feature = "gpu")]
            Self::PtpGpu => "ptp (gpu)",
            Self::HeatFlow => "heat flow",
        };
        f.write_str(name)
    }
}

/// Relaxation settings for parallel toplesets propagation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PtpParams {
    /// Maximum number of sweeps over all levels, at least one is always
    /// run. Default: 16
    ///
    /// A single sweep visits each level once, which is not enough to reach
    /// the fast-marching fixed point on irregular meshes.
    pub sweeps: usize,

    /// A sweep that lowers no distance by more than this counts as
    /// converged and stops the relaxation. Default: 0.0
    pub tolerance: f64,
}

impl Default for PtpParams {
    fn default() -> Self {
        Self {
            sweeps: 16,
            tolerance: 0.0,
        }
    }
}

impl PtpParams {
    /// One pass per level, no convergence loop.
    #[must_use]
    pub fn single_pass() -> Self {
        Self {
            sweeps: 1,
            ..Default::default()
        }
    }

    /// Set the sweep limit.
    #[must_use]
    pub const fn with_sweeps(mut self, sweeps: usize) -> Self {
        self.sweeps = sweeps;
        self
    }

    /// Set the convergence tolerance.
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// Settings for the heat method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatParams {
    /// Diffusion time as a multiple of the squared mean edge length. Default: 1.0
    pub time_factor: f64,

    /// Mass shift added to the Laplacian so the Poisson system is positive
    /// definite. Default: 1e-8
    pub regularization: f64,
}

impl Default for HeatParams {
    fn default() -> Self {
        Self {
            time_factor: 1.0,
            regularization: 1e-8,
        }
    }
}

impl HeatParams {
    /// Set the diffusion time factor.
    #[must_use]
    pub const fn with_time_factor(mut self, time_factor: f64) -> Self {
        self.time_factor = time_factor;
        self
    }

    /// Set the Poisson regularization.
    #[must_use]
    pub const fn with_regularization(mut self, regularization: f64) -> Self {
        self.regularization = regularization;
        self
    }
}

/// Parameters for geodesic distance computation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeodesicParams {
    /// Engine to run. Default: [`Algorithm::FastMarching`]
    pub algorithm: Algorithm,

    /// Record for every vertex which source reached it first. Default: false
    pub clusters: bool,

    /// Stop fast marching after this many vertices are finalized.
    /// If None, no limit.
    pub max_iterations: Option<usize>,

    /// Stop fast marching once the next vertex would be finalized beyond
    /// this distance. Default: infinity
    pub radius: f64,

    /// Rescale the settled distances to `[0, 1]` before returning.
    /// Default: false
    pub normalize: bool,

    /// Parallel toplesets propagation settings.
    pub ptp: PtpParams,

    /// Heat method settings.
    pub heat: HeatParams,
}

impl Default for GeodesicParams {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::FastMarching,
            clusters: false,
            max_iterations: None,
            radius: f64::INFINITY,
            normalize: false,
            ptp: PtpParams::default(),
            heat: HeatParams::default(),
        }
    }
}

impl GeodesicParams {
    /// Default parameters for a given engine.
    #[must_use]
    pub fn with_algorithm(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            ..Default::default()
        }
    }

    /// Fast marching with clustering enabled.
    #[must_use]
    pub fn voronoi() -> Self {
        Self {
            clusters: true,
            ..Default::default()
        }
    }

    /// Set the clustering option.
    #[must_use]
    pub const fn with_clusters(mut self, clusters: bool) -> Self {
        self.clusters = clusters;
        self
    }

    /// Set the fast-marching iteration budget.
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Set the fast-marching radius budget.
    #[must_use]
    pub const fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    /// Set the normalize option.
    #[must_use]
    pub const fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Set the PTP settings.
    #[must_use]
    pub const fn with_ptp(mut self, ptp: PtpParams) -> Self {
        self.ptp = ptp;
        self
    }

    /// Set the heat method settings.
    #[must_use]
    pub const fn with_heat(mut self, heat: HeatParams) -> Self {
        self.heat = heat;
        self
    }

    /// Whether a fast-marching budget is set.
    #[must_use]
    pub fn has_budget(&self) -> bool {
        self.max_iterations.is_some() || self.radius < f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params() {
        let params = GeodesicParams::default();
        assert_eq!(params.algorithm, Algorithm::FastMarching);
        assert!(!params.clusters);
        assert!(!params.normalize);
        assert!(params.radius.is_infinite());
        assert!(!params.has_budget());
        assert_eq!(params.ptp.sweeps, 16);
    }

    #[test]
    fn builder() {
        let params = GeodesicParams::with_algorithm(Algorithm::PtpCpu)
            .with_clusters(true)
            .with_max_iterations(10)
            .with_radius(2.5)
            .with_ptp(PtpParams::single_pass().with_tolerance(1e-6));

        assert_eq!(params.algorithm, Algorithm::PtpCpu);
        assert!(params.clusters);
        assert_eq!(params.max_iterations, Some(10));
        assert!((params.radius - 2.5).abs() < f64::EPSILON);
        assert_eq!(params.ptp.sweeps, 1);
        assert!(params.has_budget());
    }

    #[test]
    fn voronoi_enables_clusters() {
        let params = GeodesicParams::voronoi();
        assert!(params.clusters);
        assert_eq!(params.algorithm, Algorithm::FastMarching);
    }

    #[test]
    fn heat_builder() {
        let heat = HeatParams::default()
            .with_time_factor(2.0)
            .with_regularization(1e-6);
        assert!((heat.time_factor - 2.0).abs() < f64::EPSILON);
        assert!((heat.regularization - 1e-6).abs() < f64::EPSILON);
    }

    #[test]
    fn algorithm_display() {
        assert_eq!(Algorithm::FastMarching.to_string(), "fast marching");
        assert_eq!(Algorithm::HeatFlow.to_string(), "heat flow");
    }
}
