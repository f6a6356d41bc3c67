//! Device buffers for parallel toplesets propagation.
//!
//! # Memory Layout
//!
//! - positions: `vec4<f32>` per vertex (w unused)
//! - star: CSR offsets plus one `vec2<u32>` per incident triangle holding
//!   the two other corners
//! - levels: one [`GpuLevel`] per topological level, each at a multiple of
//!   the device's dynamic uniform offset alignment
//!
//! Distances are `f32` on the device; [`INFINITY_SENTINEL`] stands for an
//! unreached vertex.

// Truncation: vertex ids and counts are checked against device limits before upload.
#![allow(clippy::cast_possible_truncation)]

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;
use wgpu::{Buffer, BufferUsages};

use super::context::GpuContext;
use super::error::{GpuError, GpuResult};
use crate::adapter::{MeshAdapter, Toplesets};

/// Invocations per workgroup, must match the shader.
pub(crate) const WORKGROUP_SIZE: u32 = 64;

/// Finite stand-in for infinity on the device.
pub(crate) const INFINITY_SENTINEL: f32 = 3.0e38;

/// Cluster value of a vertex no source has reached.
pub(crate) const NO_CLUSTER: u32 = u32::MAX;

/// Range of the level order relaxed by one dispatch.
///
/// Total size: 16 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuLevel {
    /// First index into the level order.
    pub start: u32,
    /// One past the last index.
    pub end: u32,
    /// Improvement below which the `changed` flag is not raised.
    pub tolerance: f32,
    _padding: u32,
}

impl GpuLevel {
    /// Create a level entry.
    #[must_use]
    pub const fn new(start: u32, end: u32, tolerance: f32) -> Self {
        Self {
            start,
            end,
            tolerance,
            _padding: 0,
        }
    }
}

/// Relaxed value waiting for the commit dispatch.
///
/// Total size: 8 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GpuPending {
    /// New distance.
    pub distance: f32,
    /// New cluster.
    pub cluster: u32,
}

/// Vertex numbering used on the device.
///
/// With a single source, vertices are renumbered in level order so that
/// every level is a contiguous run of ids and neighboring invocations touch
/// neighboring memory. Otherwise host ids are used unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeviceLayout {
    /// Host id to device id, `None` for the identity.
    to_device: Option<Vec<u32>>,
    /// Device id to host id, `None` for the identity.
    to_host: Option<Vec<usize>>,
}

impl DeviceLayout {
    pub(crate) const fn identity() -> Self {
        Self {
            to_device: None,
            to_host: None,
        }
    }

    /// Level order first, then unreachable vertices in host order.
    pub(crate) fn coalesced(sets: &Toplesets, vertex_count: usize) -> Self {
        let mut to_host = Vec::with_capacity(vertex_count);
        to_host.extend_from_slice(sets.order());
        to_host.extend((0..vertex_count).filter(|&v| sets.level_of(v).is_none()));

        let mut to_device = vec![0; vertex_count];
        for (device, &host) in to_host.iter().enumerate() {
            to_device[host] = device as u32;
        }

        Self {
            to_device: Some(to_device),
            to_host: Some(to_host),
        }
    }

    pub(crate) const fn is_coalesced(&self) -> bool {
        self.to_device.is_some()
    }

    pub(crate) fn device(&self, host: usize) -> u32 {
        self.to_device
            .as_ref()
            .map_or(host as u32, |map| map[host])
    }

    pub(crate) fn host(&self, device: usize) -> usize {
        self.to_host.as_ref().map_or(device, |map| map[device])
    }
}

/// Star of every vertex in device numbering, as CSR.
pub(crate) fn pack_star<M: MeshAdapter + ?Sized>(
    mesh: &M,
    layout: &DeviceLayout,
) -> (Vec<u32>, Vec<[u32; 2]>) {
    let vertex_count = mesh.vertex_count();
    let mut offsets = Vec::with_capacity(vertex_count + 1);
    let mut star = Vec::new();

    offsets.push(0);
    for device in 0..vertex_count {
        let v = layout.host(device);
        for he in mesh.incident_half_edges(v) {
            let a = mesh.half_edge_vertex(mesh.next(he));
            let b = mesh.half_edge_vertex(mesh.previous(he));
            star.push([layout.device(a), layout.device(b)]);
        }
        offsets.push(star.len() as u32);
    }
    (offsets, star)
}

/// Level entries laid out at `stride` bytes apart.
pub(crate) fn level_bytes(sets: &Toplesets, tolerance: f32, stride: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; sets.level_count().max(1) * stride];
    for level in 0..sets.level_count() {
        let range = sets.level_range(level);
        let entry = GpuLevel::new(range.start as u32, range.end as u32, tolerance);
        let at = level * stride;
        bytes[at..at + size_of::<GpuLevel>()].copy_from_slice(bytemuck::bytes_of(&entry));
    }
    bytes
}

/// All device state of one propagation run.
pub(crate) struct PtpBuffers {
    pub(crate) positions: Buffer,
    pub(crate) star_offsets: Buffer,
    pub(crate) star: Buffer,
    pub(crate) order: Buffer,
    pub(crate) distances: Buffer,
    pub(crate) clusters: Buffer,
    pub(crate) pending: Buffer,
    pub(crate) changed: Buffer,
    pub(crate) levels: Buffer,
    /// Byte distance between level entries in `levels`.
    pub(crate) level_stride: u64,
    pub(crate) layout: DeviceLayout,
}

impl PtpBuffers {
    /// Upload mesh, levels and the seeded field.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::MeshTooLarge`] if the mesh exceeds device limits.
    pub(crate) fn upload<M: MeshAdapter + ?Sized>(
        ctx: &GpuContext,
        mesh: &M,
        sets: &Toplesets,
        sources: &[usize],
        tolerance: f32,
        layout: DeviceLayout,
    ) -> GpuResult<Self> {
        let vertex_count = mesh.vertex_count();
        let max = ctx.limits.max_vertices;
        if vertex_count > max {
            return Err(GpuError::MeshTooLarge {
                vertices: vertex_count,
                max,
            });
        }

        let mut positions = vec![[0.0f32; 4]; vertex_count];
        for (device, slot) in positions.iter_mut().enumerate() {
            let p = mesh.position(layout.host(device));
            *slot = [p.x as f32, p.y as f32, p.z as f32, 0.0];
        }

        let (star_offsets, mut star) = pack_star(mesh, &layout);
        // Zero-sized bindings are invalid.
        if star.is_empty() {
            star.push([0, 0]);
        }

        let order: Vec<u32> = sets.order().iter().map(|&v| layout.device(v)).collect();

        let mut distances = vec![INFINITY_SENTINEL; vertex_count];
        let mut clusters = vec![NO_CLUSTER; vertex_count];
        for (i, &s) in sources.iter().enumerate() {
            let d = layout.device(s) as usize;
            distances[d] = 0.0;
            if clusters[d] == NO_CLUSTER {
                clusters[d] = i as u32;
            }
        }

        let alignment = u64::from(ctx.limits.uniform_alignment);
        let level_stride = (size_of::<GpuLevel>() as u64).next_multiple_of(alignment);
        let levels = level_bytes(sets, tolerance, level_stride as usize);

        let device = &ctx.device;
        let storage = |label: &str, contents: &[u8], extra: BufferUsages| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: BufferUsages::STORAGE | extra,
            })
        };

        Ok(Self {
            positions: storage(
                "ptp_positions",
                bytemuck::cast_slice(&positions),
                BufferUsages::empty(),
            ),
            star_offsets: storage(
                "ptp_star_offsets",
                bytemuck::cast_slice(&star_offsets),
                BufferUsages::empty(),
            ),
            star: storage("ptp_star", bytemuck::cast_slice(&star), BufferUsages::empty()),
            order: storage("ptp_order", bytemuck::cast_slice(&order), BufferUsages::empty()),
            distances: storage(
                "ptp_distances",
                bytemuck::cast_slice(&distances),
                BufferUsages::COPY_SRC,
            ),
            clusters: storage(
                "ptp_clusters",
                bytemuck::cast_slice(&clusters),
                BufferUsages::COPY_SRC,
            ),
            pending: storage(
                "ptp_pending",
                bytemuck::cast_slice(&vec![GpuPending::zeroed(); order.len()]),
                BufferUsages::empty(),
            ),
            changed: storage(
                "ptp_changed",
                bytemuck::bytes_of(&0u32),
                BufferUsages::COPY_SRC | BufferUsages::COPY_DST,
            ),
            levels: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("ptp_levels"),
                contents: &levels,
                usage: BufferUsages::UNIFORM,
            }),
            level_stride,
            layout,
        })
    }

    /// Read the `changed` flag and reset it for the next sweep.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::BufferMapping`] if the readback fails.
    pub(crate) fn take_changed(&self, ctx: &GpuContext) -> GpuResult<bool> {
        let flag: Vec<u32> = download(ctx, &self.changed)?;
        ctx.queue
            .write_buffer(&self.changed, 0, bytemuck::bytes_of(&0u32));
        Ok(flag.first().is_some_and(|&f| f != 0))
    }

    /// Download distances and clusters in host numbering.
    ///
    /// # Errors
    ///
    /// Returns [`GpuError::BufferMapping`] if the readback fails.
    pub(crate) fn download_field(
        &self,
        ctx: &GpuContext,
    ) -> GpuResult<(Vec<f64>, Vec<Option<usize>>)> {
        let device_distances: Vec<f32> = download(ctx, &self.distances)?;
        let device_clusters: Vec<u32> = download(ctx, &self.clusters)?;

        let mut distances = vec![f64::INFINITY; device_distances.len()];
        let mut clusters = vec![None; device_clusters.len()];
        for (device, (&d, &c)) in device_distances.iter().zip(&device_clusters).enumerate() {
            let host = self.layout.host(device);
            if d < 0.5 * INFINITY_SENTINEL {
                distances[host] = f64::from(d);
            }
            if c != NO_CLUSTER {
                clusters[host] = Some(c as usize);
            }
        }
        Ok((distances, clusters))
    }
}

/// Copy a device buffer to host memory through a staging buffer.
fn download<T: Pod>(ctx: &GpuContext, buffer: &Buffer) -> GpuResult<Vec<T>> {
    let buffer_size = buffer.size();

    let staging = ctx.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("ptp_staging"),
        size: buffer_size,
        usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let mut encoder = ctx
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("ptp_download"),
        });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, buffer_size);
    ctx.queue.submit([encoder.finish()]);

    let slice = staging.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        // The receiver outlives the poll below.
        let _ = tx.send(result);
    });

    ctx.device.poll(wgpu::Maintain::Wait);

    rx.recv()
        .map_err(|_| GpuError::BufferMapping("channel closed".into()))?
        .map_err(|e| GpuError::BufferMapping(format!("{e:?}")))?;

    let data = slice.get_mapped_range();
    let values: Vec<T> = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging.unmap();

    Ok(values)
}
