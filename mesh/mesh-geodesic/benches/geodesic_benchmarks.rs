//! Benchmarks for mesh-geodesic.
//!
//! Run with: `cargo bench -p mesh-geodesic`
//!
//! These benchmarks compare the engines on icospheres of growing size.

#![allow(missing_docs, clippy::cast_possible_truncation, clippy::unwrap_used)]

use std::collections::HashMap;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use nalgebra::Point3;

use mesh_geodesic::{Algorithm, GeodesicParams, GeodesicSolver, TriMesh};

/// Create a unit icosphere.
/// Subdivisions: 0 = 20 faces, 1 = 80 faces, 2 = 320 faces, etc.
fn create_icosphere(subdivisions: u32) -> TriMesh {
    let phi = f64::midpoint(1.0, 5.0_f64.sqrt());
    let norm = (1.0 + phi * phi).sqrt();
    let a = 1.0 / norm;
    let b = phi / norm;

    let mut positions = vec![
        Point3::new(-a, b, 0.0),
        Point3::new(a, b, 0.0),
        Point3::new(-a, -b, 0.0),
        Point3::new(a, -b, 0.0),
        Point3::new(0.0, -a, b),
        Point3::new(0.0, a, b),
        Point3::new(0.0, -a, -b),
        Point3::new(0.0, a, -b),
        Point3::new(b, 0.0, -a),
        Point3::new(b, 0.0, a),
        Point3::new(-b, 0.0, -a),
        Point3::new(-b, 0.0, a),
    ];

    let mut faces: Vec<[u32; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut midpoint = |i0: u32, i1: u32, positions: &mut Vec<Point3<f64>>| {
            let key = (i0.min(i1), i0.max(i1));
            *midpoints.entry(key).or_insert_with(|| {
                let p0 = positions[i0 as usize].coords;
                let p1 = positions[i1 as usize].coords;
                positions.push(Point3::from(((p0 + p1) / 2.0).normalize()));
                (positions.len() - 1) as u32
            })
        };

        let mut next = Vec::with_capacity(faces.len() * 4);
        for &[i0, i1, i2] in &faces {
            let m01 = midpoint(i0, i1, &mut positions);
            let m12 = midpoint(i1, i2, &mut positions);
            let m20 = midpoint(i2, i0, &mut positions);
            next.push([i0, m01, m20]);
            next.push([i1, m12, m01]);
            next.push([i2, m20, m12]);
            next.push([m01, m12, m20]);
        }
        faces = next;
    }

    TriMesh::new(positions, faces).unwrap()
}

fn bench_engines(c: &mut Criterion) {
    let mut group = c.benchmark_group("Geodesic - Engines");

    for subdivisions in [2, 3, 4] {
        let mesh = create_icosphere(subdivisions);
        let solver = GeodesicSolver::new(&mesh);
        group.throughput(Throughput::Elements(mesh.positions().len() as u64));

        for algorithm in [Algorithm::FastMarching, Algorithm::PtpCpu, Algorithm::HeatFlow] {
            let params = GeodesicParams::with_algorithm(algorithm);
            group.bench_with_input(
                BenchmarkId::new(algorithm.to_string(), subdivisions),
                &params,
                |b, params| b.iter(|| solver.compute(black_box(&[0usize][..]), params).unwrap()),
            );
        }
    }

    group.finish();
}

#[cfg(feature = "gpu")]
fn bench_ptp_gpu(c: &mut Criterion) {
    if !mesh_geodesic::gpu::GpuContext::is_available() {
        println!("Skipping GPU benchmarks - no GPU available");
        return;
    }

    let mut group = c.benchmark_group("Geodesic - PTP GPU");
    let params = GeodesicParams::with_algorithm(Algorithm::PtpGpu);

    for subdivisions in [3, 4, 5] {
        let mesh = create_icosphere(subdivisions);
        let solver = GeodesicSolver::new(&mesh);
        group.throughput(Throughput::Elements(mesh.positions().len() as u64));
        group.bench_function(BenchmarkId::from_parameter(subdivisions), |b| {
            b.iter(|| solver.compute(black_box(&[0usize][..]), &params).unwrap());
        });
    }

    group.finish();
}

#[cfg(not(feature = "gpu"))]
fn bench_ptp_gpu(_: &mut Criterion) {}

fn bench_voronoi(c: &mut Criterion) {
    let mesh = create_icosphere(4);
    let solver = GeodesicSolver::new(&mesh);
    let sources: Vec<usize> = (0..12).collect();

    c.bench_function("Geodesic - Voronoi (12 sources)", |b| {
        b.iter(|| solver.compute(black_box(&sources), &GeodesicParams::voronoi()).unwrap());
    });
}

criterion_group!(benches, bench_engines, bench_ptp_gpu, bench_voronoi);
criterion_main!(benches);
