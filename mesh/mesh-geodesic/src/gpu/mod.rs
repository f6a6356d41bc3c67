//! GPU backend for parallel toplesets propagation, built on wgpu compute
//! shaders.
//!
//! # GPU Availability
//!
//! The device is detected at runtime the first time it is needed. Selecting
//! [`Algorithm::PtpGpu`](crate::Algorithm::PtpGpu) on a machine without a
//! usable adapter fails with [`GpuError::NotAvailable`]; there is no silent
//! CPU fallback. Use [`GpuContext::is_available()`] to pick an engine up
//! front:
//!
//! ```no_run
//! use mesh_geodesic::gpu::GpuContext;
//! use mesh_geodesic::{Algorithm, GeodesicParams};
//!
//! let algorithm = if GpuContext::is_available() {
//!     Algorithm::PtpGpu
//! } else {
//!     Algorithm::PtpCpu
//! };
//! let params = GeodesicParams::with_algorithm(algorithm);
//! # let _ = params;
//! ```
//!
//! Distances are computed in `f32` on the device and widened on download,
//! so results agree with the CPU engines to single precision.

mod buffers;
mod context;
mod error;
mod ptp;

pub use context::{GpuAdapterInfo, GpuContext, PtpLimits};
pub use error::{GpuError, GpuResult};

pub(crate) use ptp::parallel_toplesets_propagation_gpu;
