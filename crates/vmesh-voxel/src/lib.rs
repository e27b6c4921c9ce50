//! Dense voxel grid, sparse octree builder, tile orchestrator, and SVDAG
//! index/file emitters.

pub mod file;
pub mod grid;
pub mod index;
pub mod octree;
pub mod tile;

pub use file::write_octree_file;
pub use grid::{VoxelGrid, VoxelizeAlgorithm};
pub use index::{emit_indices, SENTINEL_AIR, SENTINEL_SOLID};
pub use octree::{build_octree, Node, NodeRef, Octree, AIR, SOLID};
pub use tile::{attach_svo, build_tiled_octree, build_tiled_octree_from_grid};
