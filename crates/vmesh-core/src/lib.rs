//! Geometry primitives, the mesh-fit transform, and error types shared by
//! the vmesh voxelization pipeline.

pub mod error;
pub mod geometry;
pub mod mesh;

pub use error::{Error, Result};
pub use geometry::{decode_child_index, encode_child_index, dda_walk, Aabb, Triangle};
pub use mesh::{fit_transform, FitTransform, MeshSource, ScaleMode};
