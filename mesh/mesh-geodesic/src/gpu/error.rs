//! GPU error types.

use thiserror::Error;

/// Errors that can occur while running propagation on a GPU.
///
/// # Example
///
/// ```
/// use mesh_geodesic::gpu::{GpuError, GpuResult};
///
/// fn check_gpu() -> GpuResult<()> {
///     Err(GpuError::NotAvailable)
/// }
/// assert!(check_gpu().is_err());
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GpuError {
    /// No compatible GPU adapter was found.
    ///
    /// Headless machines and CI runners without a software rasterizer
    /// usually end up here.
    #[error("GPU not available: no compatible device found")]
    NotAvailable,

    /// The propagation shader failed validation.
    #[error("shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// Command submission or execution failed.
    #[error("GPU execution failed: {0}")]
    Execution(String),

    /// Reading a buffer back to the host failed.
    #[error("buffer mapping failed: {0}")]
    BufferMapping(String),

    /// The mesh does not fit in the device's storage buffers or dispatch limits.
    #[error("mesh too large for GPU: {vertices} vertices, max supported: {max}")]
    MeshTooLarge {
        /// Number of vertices in the mesh.
        vertices: usize,
        /// Maximum supported vertices.
        max: usize,
    },
}

/// Result type for GPU operations.
pub type GpuResult<T> = Result<T, GpuError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_not_available() {
        let msg = format!("{}", GpuError::NotAvailable);
        assert!(msg.contains("not available"));
    }

    #[test]
    fn display_shader_compilation() {
        let err = GpuError::ShaderCompilation("unknown identifier".to_string());
        assert!(format!("{err}").contains("unknown identifier"));
    }

    #[test]
    fn display_mesh_too_large() {
        let err = GpuError::MeshTooLarge {
            vertices: 5_000_000,
            max: 4_194_240,
        };
        let msg = format!("{err}");
        assert!(msg.contains("5000000"));
        assert!(msg.contains("4194240"));
    }

    #[test]
    fn converts_into_geodesic_error() {
        let err: crate::GeodesicError = GpuError::BufferMapping("timeout".into()).into();
        assert!(format!("{err}").contains("timeout"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GpuError>();
    }
}
