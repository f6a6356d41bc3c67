//! Error types for geodesic distance computation.

use thiserror::Error;

#[cfg(feature = "gpu")]
use crate::gpu::GpuError;

/// Result type for geodesic operations.
pub type GeodesicResult<T> = Result<T, GeodesicError>;

/// Errors that can occur during geodesic computation.
///
/// Numerical degeneracies inside the triangle update (singular systems,
/// zero-area faces) never surface here; they fall back to edge propagation.
/// An unreachable vertex is not an error either: it keeps an infinite distance.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GeodesicError {
    /// The mesh has no vertices.
    #[error("mesh is empty")]
    EmptyMesh,

    /// No source vertex was given.
    #[error("source set is empty")]
    NoSources,

    /// A source refers to a vertex that does not exist.
    #[error("invalid vertex index: {index} (mesh has {vertex_count} vertices)")]
    InvalidVertex {
        /// The invalid index.
        index: usize,
        /// Total number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A face refers to a vertex that does not exist.
    #[error("face {face} references vertex {index} (mesh has {vertex_count} vertices)")]
    InvalidFace {
        /// Index of the offending face.
        face: usize,
        /// The out-of-range vertex index.
        index: usize,
        /// Total number of vertices in the mesh.
        vertex_count: usize,
    },

    /// The sparse linear solve of the heat method failed.
    #[error("sparse solve failed during {stage}: {reason}")]
    Solver {
        /// Which solve failed (`"heat diffusion"` or `"poisson"`).
        stage: &'static str,
        /// Backend-specific failure description.
        reason: String,
    },

    /// A GPU operation failed.
    #[cfg(feature = "gpu")]
    #[error(transparent)]
    Gpu(#[from] GpuError),
}
