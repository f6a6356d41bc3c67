//! Process-wide GPU device.
//!
//! The adapter is requested the first time any propagation asks for it. A
//! machine without a usable adapter is remembered as such, so the probe runs
//! at most once per process.
//!
//! ```no_run
//! use mesh_geodesic::gpu::GpuContext;
//!
//! match GpuContext::get() {
//!     Some(ctx) => println!("{} ({}), up to {} vertices",
//!         ctx.adapter_info.name, ctx.adapter_info.backend, ctx.limits.max_vertices),
//!     None => println!("PTP will run on the CPU only"),
//! }
//! ```

use std::sync::OnceLock;

use tracing::{debug, info, warn};

use super::buffers::WORKGROUP_SIZE;
use super::error::{GpuError, GpuResult};

static GPU_CONTEXT: OnceLock<Option<GpuContext>> = OnceLock::new();

/// Identification of the selected adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuAdapterInfo {
    /// Adapter name as reported by the driver.
    pub name: String,
    /// Discrete, integrated, virtual, software.
    pub device_type: String,
    /// Graphics API behind the adapter.
    pub backend: String,
}

impl From<wgpu::AdapterInfo> for GpuAdapterInfo {
    fn from(info: wgpu::AdapterInfo) -> Self {
        Self {
            device_type: format!("{:?}", info.device_type),
            backend: format!("{:?}", info.backend),
            name: info.name,
        }
    }
}

/// Device limits that bound one propagation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PtpLimits {
    /// Largest mesh, in vertices, that fits one storage binding and one
    /// dispatch of a single level.
    pub max_vertices: usize,
    /// Alignment of dynamic uniform offsets, in bytes.
    pub uniform_alignment: u32,
}

impl PtpLimits {
    fn from_device(limits: &wgpu::Limits) -> Self {
        // Positions are the widest per-vertex array: one vec4<f32>.
        let by_storage = limits.max_storage_buffer_binding_size as usize / 16;
        let by_dispatch =
            limits.max_compute_workgroups_per_dimension as usize * WORKGROUP_SIZE as usize;
        Self {
            max_vertices: by_storage.min(by_dispatch),
            uniform_alignment: limits.min_uniform_buffer_offset_alignment,
        }
    }
}

/// Device and queue shared by every GPU propagation in the process.
pub struct GpuContext {
    /// Device for buffers and pipelines.
    pub device: wgpu::Device,
    /// Queue for submissions and buffer writes.
    pub queue: wgpu::Queue,
    /// Selected adapter.
    pub adapter_info: GpuAdapterInfo,
    /// Limits derived from the device.
    pub limits: PtpLimits,
}

impl GpuContext {
    /// The shared context, or `None` if no adapter could be opened.
    #[must_use]
    pub fn get() -> Option<&'static Self> {
        GPU_CONTEXT
            .get_or_init(|| {
                pollster::block_on(Self::open())
                    .inspect(|ctx| {
                        info!(
                            adapter = %ctx.adapter_info.name,
                            backend = %ctx.adapter_info.backend,
                            max_vertices = ctx.limits.max_vertices,
                            "GPU device opened"
                        );
                    })
                    .inspect_err(|e| warn!(error = %e, "No GPU device, PTP on GPU disabled"))
                    .ok()
            })
            .as_ref()
    }

    /// The shared context.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::NotAvailable`] if no adapter could be opened.
    pub fn try_get() -> GpuResult<&'static Self> {
        Self::get().ok_or(GpuError::NotAvailable)
    }

    /// Whether a device is usable. Probes on first call.
    #[must_use]
    pub fn is_available() -> bool {
        Self::get().is_some()
    }

    async fn open() -> GpuResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NotAvailable)?;

        let info = adapter.get_info();
        debug!(
            name = %info.name,
            device_type = ?info.device_type,
            backend = ?info.backend,
            "Requesting device"
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("mesh-geodesic"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|e| GpuError::Execution(format!("device request failed: {e}")))?;

        let limits = PtpLimits::from_device(&device.limits());
        Ok(Self {
            device,
            queue,
            adapter_info: info.into(),
            limits,
        })
    }
}

impl std::fmt::Debug for GpuContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuContext")
            .field("adapter_info", &self.adapter_info)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
