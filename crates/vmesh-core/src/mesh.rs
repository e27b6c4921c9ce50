//! The mesh-fit affine transform and the mesh collaborator contract.
//!
//! Loading a mesh file is out of this crate's scope; this module only
//! defines the interface a loader must satisfy and the transform that fits
//! a mesh into `[0, R-1]`.

use glam::Vec3;

use crate::error::{Error, Result};

/// How the mesh is fit into the `[0, R-1]` grid cube before voxelization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ScaleMode {
    /// Scale each axis independently so every axis exactly fills `R-1`.
    Stretch,
    /// Scale all axes uniformly by the smallest per-axis factor, preserving
    /// aspect ratio.
    #[default]
    Proportional,
    /// No scaling; only translate the mesh's minimum corner to the origin.
    None,
}

impl ScaleMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "stretch" => Ok(Self::Stretch),
            "proportional" => Ok(Self::Proportional),
            "none" => Ok(Self::None),
            other => Err(Error::ArgInvalid(format!(
                "unknown scale mode '{other}' (expected proportional, stretch, or none)"
            ))),
        }
    }
}

/// The mesh-fit transform: `v' = scale * (v - translate)`.
///
/// Matches the original sources' matrix composition exactly (translate the
/// minimum corner to the origin, then scale), expressed as two vectors
/// instead of a 4x4 matrix since no rotation ever enters the picture.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitTransform {
    pub scale: Vec3,
    pub translate: Vec3,
}

impl FitTransform {
    #[inline]
    pub fn apply(&self, v: Vec3) -> Vec3 {
        self.scale * (v - self.translate)
    }
}

/// Compute the fit transform for a mesh's referenced vertices at the given
/// grid resolution and scale mode. Returns `None` if `indices` is empty (no
/// vertices are referenced, so there is nothing to fit).
pub fn fit_transform(vertices: &[Vec3], indices: &[u32], resolution: u32, mode: ScaleMode) -> Option<FitTransform> {
    let mut iter = indices.iter().map(|&i| vertices[i as usize]);
    let first = iter.next()?;
    let mut min = first;
    let mut max = first;
    for v in iter {
        min = min.min(v);
        max = max.max(v);
    }

    let extent = max - min;
    let target = Vec3::splat((resolution.saturating_sub(1)) as f32);

    let scale = match mode {
        ScaleMode::Stretch => Vec3::new(
            safe_ratio(target.x, extent.x),
            safe_ratio(target.y, extent.y),
            safe_ratio(target.z, extent.z),
        ),
        ScaleMode::Proportional => {
            let ratios = [
                safe_ratio(target.x, extent.x),
                safe_ratio(target.y, extent.y),
                safe_ratio(target.z, extent.z),
            ];
            let uniform = ratios.into_iter().fold(f32::INFINITY, f32::min);
            Vec3::splat(uniform)
        }
        ScaleMode::None => Vec3::ONE,
    };

    Some(FitTransform { scale, translate: min })
}

/// Degenerate (zero-extent) axes would divide by zero; treat them as
/// already-fitting (factor 1) rather than producing infinities/NaNs.
fn safe_ratio(target: f32, extent: f32) -> f32 {
    if extent.abs() < f32::EPSILON {
        1.0
    } else {
        target / extent
    }
}

/// The fixed contract an external mesh loader must satisfy. This crate only
/// consumes it; parsing a concrete file format lives in the CLI binary.
pub trait MeshSource {
    fn vertices(&self) -> &[Vec3];
    fn indices(&self) -> &[u32];

    /// Number of triangles; `indices().len() / 3`.
    fn tri_count(&self) -> u32 {
        (self.indices().len() / 3) as u32
    }

    /// The `k`-th triangle's three vertex positions.
    fn triangle(&self, k: u32) -> (Vec3, Vec3, Vec3) {
        let base = k as usize * 3;
        let idx = self.indices();
        let verts = self.vertices();
        (
            verts[idx[base] as usize],
            verts[idx[base + 1] as usize],
            verts[idx[base + 2] as usize],
        )
    }
}
