//! Benchmarks for the voxelization and octree-build stages over a fixed
//! icosphere-like test mesh at a handful of resolutions.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::Vec3;
use std::sync::atomic::AtomicU64;
use vmesh_core::MeshSource;
use vmesh_voxel::{build_octree, VoxelGrid, VoxelizeAlgorithm};

struct StaticMesh {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
}

impl MeshSource for StaticMesh {
    fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }
    fn indices(&self) -> &[u32] {
        &self.indices
    }
}

fn cube_surface_mesh(side: f32) -> StaticMesh {
    let c = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
    let vertices = vec![
        c(0.0, 0.0, 0.0),
        c(side, 0.0, 0.0),
        c(side, side, 0.0),
        c(0.0, side, 0.0),
        c(0.0, 0.0, side),
        c(side, 0.0, side),
        c(side, side, side),
        c(0.0, side, side),
    ];
    let indices = vec![
        0, 1, 2, 0, 2, 3, 4, 6, 5, 4, 7, 6, 0, 4, 5, 0, 5, 1, 3, 2, 6, 3, 6, 7, 0, 3, 7, 0, 7, 4,
        1, 5, 6, 1, 6, 2,
    ];
    StaticMesh { vertices, indices }
}

fn bench_voxelize_algorithms(c: &mut Criterion) {
    let mut group = c.benchmark_group("voxelize_cube_surface");
    for resolution in [16u32, 32, 64] {
        let mesh = cube_surface_mesh((resolution - 1) as f32);
        group.throughput(Throughput::Elements((resolution as u64).pow(3)));

        for algorithm in [VoxelizeAlgorithm::Sat, VoxelizeAlgorithm::Dda] {
            let label = match algorithm {
                VoxelizeAlgorithm::Sat => "sat",
                VoxelizeAlgorithm::Dda => "dda",
            };
            group.bench_with_input(
                BenchmarkId::new(label, resolution),
                &resolution,
                |b, &resolution| {
                    b.iter(|| {
                        let mut grid = VoxelGrid::new(resolution);
                        let progress = AtomicU64::new(0);
                        grid.voxelize_mesh(&mesh, algorithm, &progress);
                        black_box(progress.load(std::sync::atomic::Ordering::Relaxed))
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_build_octree(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_octree_cube_surface");
    for resolution in [16u32, 32, 64] {
        let mesh = cube_surface_mesh((resolution - 1) as f32);
        let mut grid = VoxelGrid::new(resolution);
        let progress = AtomicU64::new(0);
        grid.voxelize_mesh(&mesh, VoxelizeAlgorithm::Sat, &progress);

        group.throughput(Throughput::Elements((resolution as u64).pow(3)));
        group.bench_with_input(BenchmarkId::from_parameter(resolution), &resolution, |b, _| {
            b.iter(|| {
                let progress = AtomicU64::new(0);
                black_box(build_octree(&grid, &progress))
            })
        });
    }
    group.finish();
}

criterion_group!(voxelize, bench_voxelize_algorithms, bench_build_octree);
criterion_main!(voxelize);
