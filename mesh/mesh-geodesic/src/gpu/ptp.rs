//! Parallel toplesets propagation on a GPU.
//!
//! Each level is relaxed with two dispatches: `relax_level` computes the new
//! values into a staging array and `commit_level` writes them back. All
//! levels of a sweep are recorded into one command buffer; the host only
//! synchronizes at the end of a sweep to read the convergence flag.

use std::ops::Range;
use std::time::Instant;

use tracing::{debug, info};
use wgpu::{BindGroup, BindGroupLayout, CommandEncoder, ComputePipeline};

use super::buffers::{DeviceLayout, GpuLevel, PtpBuffers, WORKGROUP_SIZE};
use super::context::GpuContext;
use super::error::{GpuError, GpuResult};
use crate::adapter::MeshAdapter;
use crate::distance::DistanceField;
use crate::error::GeodesicResult;
use crate::params::PtpParams;
use crate::ptp::{LevelRelaxer, propagate};

/// Shader source for level relaxation.
const PTP_SHADER: &str = include_str!("shaders/ptp_relax.wgsl");

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Compiled relax and commit pipelines.
pub(crate) struct PtpPipeline {
    relax: ComputePipeline,
    commit: ComputePipeline,
    bind_group_layout: BindGroupLayout,
}

impl PtpPipeline {
    /// Compile the shader and create both pipelines.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::ShaderCompilation`] if validation fails.
    pub(crate) fn new(ctx: &GpuContext) -> GpuResult<Self> {
        debug!("Creating PTP compute pipelines");
        let device = &ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("ptp_relax"),
            source: wgpu::ShaderSource::Wgsl(PTP_SHADER.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("ptp_bind_group_layout"),
            entries: &[
                storage_entry(0, true),  // positions
                storage_entry(1, true),  // star offsets
                storage_entry(2, true),  // star
                storage_entry(3, true),  // level order
                storage_entry(4, false), // distances
                storage_entry(5, false), // clusters
                storage_entry(6, false), // pending
                storage_entry(7, false), // changed flag
                wgpu::BindGroupLayoutEntry {
                    binding: 8,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: wgpu::BufferSize::new(size_of::<GpuLevel>() as u64),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("ptp_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |entry_point: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        };
        let relax = pipeline("relax_level");
        let commit = pipeline("commit_level");

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::ShaderCompilation(err.to_string()));
        }

        Ok(Self {
            relax,
            commit,
            bind_group_layout,
        })
    }

    fn bind_group(&self, ctx: &GpuContext, buffers: &PtpBuffers) -> BindGroup {
        let storage = [
            &buffers.positions,
            &buffers.star_offsets,
            &buffers.star,
            &buffers.order,
            &buffers.distances,
            &buffers.clusters,
            &buffers.pending,
            &buffers.changed,
        ];
        let mut entries: Vec<_> = storage
            .iter()
            .zip(0u32..)
            .map(|(buffer, binding)| wgpu::BindGroupEntry {
                binding,
                resource: buffer.as_entire_binding(),
            })
            .collect();
        entries.push(wgpu::BindGroupEntry {
            binding: 8,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffers.levels,
                offset: 0,
                size: wgpu::BufferSize::new(size_of::<GpuLevel>() as u64),
            }),
        });

        ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("ptp_bind_group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        })
    }
}

/// Device backend of the level relaxation.
struct GpuRelaxer<'a> {
    ctx: &'a GpuContext,
    pipeline: &'a PtpPipeline,
    buffers: &'a PtpBuffers,
    bind_group: BindGroup,
    boundaries: &'a [usize],
    encoder: Option<CommandEncoder>,
}

impl<'a> GpuRelaxer<'a> {
    fn new(
        ctx: &'a GpuContext,
        pipeline: &'a PtpPipeline,
        buffers: &'a PtpBuffers,
        boundaries: &'a [usize],
    ) -> Self {
        Self {
            ctx,
            pipeline,
            buffers,
            bind_group: pipeline.bind_group(ctx, buffers),
            boundaries,
            encoder: None,
        }
    }
}

impl LevelRelaxer for GpuRelaxer<'_> {
    // Truncation: level offsets and counts fit the device limits checked at upload.
    #[allow(clippy::cast_possible_truncation)]
    fn relax_level(&mut self, range: Range<usize>) -> GeodesicResult<()> {
        let level = self.boundaries.binary_search(&range.start).map_err(|_| {
            GpuError::Execution(format!("range {range:?} does not start a level"))
        })?;
        let offset = (level as u64 * self.buffers.level_stride) as u32;
        let workgroups = (range.len() as u32).div_ceil(WORKGROUP_SIZE);

        let ctx = self.ctx;
        let encoder = self.encoder.get_or_insert_with(|| {
            ctx.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("ptp_sweep_encoder"),
                })
        });

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("ptp_level_pass"),
            timestamp_writes: None,
        });
        pass.set_bind_group(0, &self.bind_group, &[offset]);
        pass.set_pipeline(&self.pipeline.relax);
        pass.dispatch_workgroups(workgroups, 1, 1);
        pass.set_pipeline(&self.pipeline.commit);
        pass.dispatch_workgroups(workgroups, 1, 1);
        Ok(())
    }

    fn end_sweep(&mut self) -> GeodesicResult<bool> {
        if let Some(encoder) = self.encoder.take() {
            self.ctx.queue.submit([encoder.finish()]);
        }
        Ok(self.buffers.take_changed(self.ctx)?)
    }
}

/// Run PTP on the process-wide GPU.
///
/// # Errors
///
/// - [`GpuError::NotAvailable`] if there is no usable device
/// - [`GpuError::MeshTooLarge`] if the mesh exceeds device limits
/// - other [`GpuError`] variants if compilation or execution fails
pub(crate) fn parallel_toplesets_propagation_gpu<M: MeshAdapter + ?Sized>(
    mesh: &M,
    sources: &[usize],
    clusters: bool,
    params: &PtpParams,
) -> GeodesicResult<DistanceField> {
    let ctx = GpuContext::try_get()?;
    let start = Instant::now();

    let sets = mesh.topological_levels(sources);
    let layout = if sets.level(0).len() == 1 {
        DeviceLayout::coalesced(&sets, mesh.vertex_count())
    } else {
        DeviceLayout::identity()
    };
    debug!(
        levels = sets.level_count(),
        coalesced = layout.is_coalesced(),
        adapter = %ctx.adapter_info.name,
        "Uploading PTP buffers"
    );

    #[allow(clippy::cast_possible_truncation)]
    let tolerance = params.tolerance as f32;
    let buffers = PtpBuffers::upload(ctx, mesh, &sets, sources, tolerance, layout)?;
    let pipeline = PtpPipeline::new(ctx)?;

    let mut relaxer = GpuRelaxer::new(ctx, &pipeline, &buffers, sets.boundaries());
    let sweeps = propagate(&mut relaxer, &sets, params)?;

    let (mut distances, cluster_of) = buffers.download_field(ctx)?;
    for &s in sources {
        distances[s] = 0.0;
    }

    let time_ms = start.elapsed().as_secs_f64() * 1000.0;
    info!(
        sweeps,
        reachable = sets.reachable_count(),
        time_ms = format!("{time_ms:.2}"),
        "PTP (gpu) finished"
    );

    let field = DistanceField::from_distances(distances).with_order(sets.order().to_vec());
    Ok(if clusters {
        field.with_clusters(cluster_of)
    } else {
        field
    })
}
