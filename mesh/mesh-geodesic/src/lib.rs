//! Geodesic (surface) distance computation for triangle meshes.
//!
//! This crate computes, for every vertex of a triangle mesh, the distance
//! along the surface to the nearest of a set of source vertices. The
//! engines share one triangle update rule:
//!
//! - **Fast marching** - sequential, finalizes vertices in increasing
//!   distance order; supports iteration and radius budgets
//! - **Parallel toplesets propagation (PTP)** - relaxes breadth-first
//!   levels in parallel on CPU threads ([`Algorithm::PtpCpu`]) or, with the
//!   `gpu` feature, on a wgpu compute device ([`Algorithm::PtpGpu`])
//! - **Heat method** - two sparse linear solves with the cotangent Laplacian
//!
//! Every engine can optionally label each vertex with the source it is
//! closest to, which gives a discrete geodesic Voronoi partition (the heat
//! method is the exception, it has no notion of a contributing vertex).
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**. Meshes are
//! consumed through the [`MeshAdapter`] trait; [`TriMesh`] is a ready-made
//! implementation over indexed triangles.
//!
//! # Example
//!
//! ```
//! use mesh_geodesic::{Algorithm, GeodesicParams, GeodesicSolver, TriMesh};
//!
//! // Unit square split along its diagonal.
//! let mesh = TriMesh::from_raw(
//!     &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0],
//!     &[0, 1, 2, 0, 2, 3],
//! )?;
//! let solver = GeodesicSolver::new(&mesh);
//!
//! // Fast marching from vertex 0
//! let field = solver.compute_from_vertex(0, &GeodesicParams::default())?;
//! assert!(field.distance(0) < 1e-10);
//! assert!((field.distance(1) - 1.0).abs() < 1e-10);
//! assert!((field.distance(2) - 2.0_f64.sqrt()).abs() < 1e-10);
//!
//! // Same result with PTP on CPU threads
//! let params = GeodesicParams::with_algorithm(Algorithm::PtpCpu);
//! let ptp = solver.compute_from_vertex(0, &params)?;
//! assert!((ptp.distance(2) - field.distance(2)).abs() < 1e-10);
//! # Ok::<(), mesh_geodesic::GeodesicError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod adapter;
mod distance;
mod error;
mod fast_marching;
mod heat;
mod linear;
mod mesh;
mod params;
mod ptp;
mod solver;
mod update;

#[cfg(feature = "gpu")]
pub mod gpu;

#[cfg(test)]
mod test_meshes;

pub use adapter::{MeshAdapter, Neighbors, Toplesets};
pub use distance::DistanceField;
pub use error::{GeodesicError, GeodesicResult};
pub use linear::{CholeskySolver, SolveError, SparseSolver};
pub use mesh::TriMesh;
pub use params::{Algorithm, GeodesicParams, HeatParams, PtpParams};
pub use solver::GeodesicSolver;
pub use update::{Contributor, TriangleUpdate, VertexUpdate, planar_update, update_step};
