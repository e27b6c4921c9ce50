//! Tile orchestrator: splits the domain into `(2^L)^3` sub-cubes, voxelizes
//! and builds an octree for each independently, and grafts each sub-octree
//! into a shared parent via the attach protocol. Bounds peak memory to one
//! sub-cube's grid rather than the full `R^3` bitset.

use std::sync::atomic::AtomicU64;

use glam::UVec3;
use vmesh_core::{encode_child_index, MeshSource};

use crate::grid::{VoxelGrid, VoxelizeAlgorithm};
use crate::octree::{build_octree, Octree, AIR, SOLID};

/// Build an octree over `mesh` at resolution `resolution`, tiled into
/// `(2^level)^3` independently-voxelized sub-cubes. `level == 0` voxelizes
/// the whole domain in one grid (no tiling).
pub fn build_tiled_octree<M: MeshSource>(
    mesh: &M,
    resolution: u32,
    level: u32,
    algorithm: VoxelizeAlgorithm,
    progress: &AtomicU64,
) -> Octree {
    let tiles_per_axis = 1u32 << level;
    debug_assert_eq!(resolution % tiles_per_axis, 0, "resolution must divide evenly by 2^level");
    let tile_size = resolution / tiles_per_axis;

    if tiles_per_axis == 1 {
        let mut grid = VoxelGrid::new(resolution);
        grid.voxelize_mesh(mesh, algorithm, progress);
        return build_octree(&grid, progress);
    }

    let mut parent = Octree::empty(resolution);

    for tx in 0..tiles_per_axis {
        for ty in 0..tiles_per_axis {
            for tz in 0..tiles_per_axis {
                let origin = UVec3::new(tx, ty, tz) * tile_size;
                let mut sub_grid = VoxelGrid::new(tile_size);
                sub_grid.set_origin(origin);
                sub_grid.voxelize_mesh(mesh, algorithm, progress);
                let sub_tree = build_octree(&sub_grid, progress);
                attach_svo(&mut parent, sub_tree, origin);
            }
        }
    }

    parent
}

/// Tile an already-materialized grid (the `--voxel-to-svdag` path has no
/// mesh to re-voxelize per tile, just the existing dense occupancy data).
pub fn build_tiled_octree_from_grid(grid: &VoxelGrid, level: u32, progress: &AtomicU64) -> Octree {
    let resolution = grid.resolution();
    let tiles_per_axis = 1u32 << level;
    debug_assert_eq!(resolution % tiles_per_axis, 0, "resolution must divide evenly by 2^level");
    let tile_size = resolution / tiles_per_axis;

    if tiles_per_axis == 1 {
        return build_octree(grid, progress);
    }

    let mut parent = Octree::empty(resolution);

    for tx in 0..tiles_per_axis {
        for ty in 0..tiles_per_axis {
            for tz in 0..tiles_per_axis {
                let origin = UVec3::new(tx, ty, tz) * tile_size;
                let sub_grid = grid.extract_region(origin, tile_size);
                let sub_tree = build_octree(&sub_grid, progress);
                attach_svo(&mut parent, sub_tree, origin);
            }
        }
    }

    parent
}

/// Graft `sub_tree` (covering `[o, o + sub_tree.size())`) into `parent`.
/// A no-op if `sub_tree` is entirely `AIR` — it would not change `parent`'s
/// structure and descending just to overwrite a slot with another empty
/// leaf wastes an arena allocation.
pub fn attach_svo(parent: &mut Octree, sub_tree: Octree, o: UVec3) {
    if sub_tree.root() == AIR {
        return;
    }

    if sub_tree.size() == parent.size() {
        let new_root = parent.graft(sub_tree);
        parent.set_root(new_root);
        return;
    }

    if matches!(parent.root(), AIR | SOLID) {
        let prior_size = parent.size();
        let r = parent.materialize_interior(UVec3::ZERO, prior_size);
        parent.set_root(r);
    }

    let mut current = parent.root();
    let mut current_origin = UVec3::ZERO;
    let mut node_size = parent.size();

    loop {
        node_size /= 2;
        let local = ((o - current_origin) / node_size).min(UVec3::ONE);
        let c = encode_child_index(local);
        let child_origin = current_origin + local * node_size;

        if node_size == sub_tree.size() {
            let new_child = parent.graft(sub_tree);
            *parent.node_mut_child(current, c) = new_child;
            return;
        }

        let slot = parent.node_child(current, c);
        current = if matches!(slot, AIR | SOLID) {
            let r = parent.materialize_interior(child_origin, node_size);
            *parent.node_mut_child(current, c) = r;
            r
        } else {
            slot
        };
        current_origin = child_origin;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

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

    fn cube_surface_mesh(min: f32, max: f32) -> StaticMesh {
        let c = |x: f32, y: f32, z: f32| Vec3::new(x, y, z);
        let vertices = vec![
            c(min, min, min),
            c(max, min, min),
            c(max, max, min),
            c(min, max, min),
            c(min, min, max),
            c(max, min, max),
            c(max, max, max),
            c(min, max, max),
        ];
        let indices = vec![
            0, 1, 2, 0, 2, 3, 4, 6, 5, 4, 7, 6, 0, 4, 5, 0, 5, 1, 3, 2, 6, 3, 6, 7, 0, 3, 7, 0, 7,
            4, 1, 5, 6, 1, 6, 2,
        ];
        StaticMesh { vertices, indices }
    }

    #[test]
    fn all_air_attach_is_a_no_op() {
        let mut parent = Octree::empty(8);
        let empty_sub = Octree::empty(4);
        attach_svo(&mut parent, empty_sub, UVec3::new(4, 0, 0));
        assert_eq!(parent.root(), AIR);
    }

    #[test]
    fn tiled_and_monolithic_builds_agree() {
        let mesh = cube_surface_mesh(0.5, 6.5);
        let progress_a = AtomicU64::new(0);
        let monolithic = build_tiled_octree(&mesh, 8, 0, VoxelizeAlgorithm::Sat, &progress_a);

        let progress_b = AtomicU64::new(0);
        let tiled = build_tiled_octree(&mesh, 8, 1, VoxelizeAlgorithm::Sat, &progress_b);

        for x in 0..8u32 {
            for y in 0..8u32 {
                for z in 0..8u32 {
                    let p = UVec3::new(x, y, z);
                    assert_eq!(
                        monolithic.query(p),
                        tiled.query(p),
                        "mismatch at {p:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn finer_tiling_also_agrees() {
        let mesh = cube_surface_mesh(1.0, 14.0);
        let progress_a = AtomicU64::new(0);
        let monolithic = build_tiled_octree(&mesh, 16, 0, VoxelizeAlgorithm::Sat, &progress_a);

        let progress_b = AtomicU64::new(0);
        let tiled = build_tiled_octree(&mesh, 16, 2, VoxelizeAlgorithm::Sat, &progress_b);

        for x in 0..16u32 {
            for y in 0..16u32 {
                for z in 0..16u32 {
                    let p = UVec3::new(x, y, z);
                    assert_eq!(monolithic.query(p), tiled.query(p), "mismatch at {p:?}");
                }
            }
        }
    }
}
