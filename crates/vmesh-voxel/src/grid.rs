//! Dense `R`-cubed occupancy grid: triangle voxelization and the two file
//! formats (byte-packed, run-compressed).

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{IVec3, UVec3, Vec3};
use vmesh_core::mesh::MeshSource;
use vmesh_core::Triangle;

/// Which rasterization kernel [`VoxelGrid::voxelize_mesh`] uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoxelizeAlgorithm {
    /// Separating-axis triangle/AABB overlap over the triangle's bounding box.
    Sat,
    /// 3D DDA line walk over triangle edges and interior scanlines.
    Dda,
}

/// A dense `R x R x R` bit-per-voxel occupancy grid.
///
/// Internal storage order matches the on-disk byte format exactly: voxel
/// `(x, y, z)` lives at linear index `x*R^2 + y*R + z` (`z` is the
/// innermost/fastest-varying axis), so writing the byte format is a
/// direct dump of the backing words.
pub struct VoxelGrid {
    resolution: u32,
    origin: UVec3,
    words: Vec<u64>,
}

impl VoxelGrid {
    pub fn new(resolution: u32) -> Self {
        let total_bits = (resolution as u64).pow(3);
        let word_count = total_bits.div_ceil(64) as usize;
        Self {
            resolution,
            origin: UVec3::ZERO,
            words: vec![0u64; word_count],
        }
    }

    #[inline]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    #[inline]
    pub fn origin(&self) -> UVec3 {
        self.origin
    }

    /// Used only by the tile orchestrator: offsets incoming world-space
    /// triangle coordinates so they land in this (smaller) grid's local
    /// frame.
    pub fn set_origin(&mut self, origin: UVec3) {
        self.origin = origin;
    }

    #[inline]
    fn linear_index(&self, x: u32, y: u32, z: u32) -> u64 {
        let r = self.resolution as u64;
        x as u64 * r * r + y as u64 * r + z as u64
    }

    /// Reads outside `[0, R)` return `false`.
    pub fn query(&self, x: i32, y: i32, z: i32) -> bool {
        let r = self.resolution as i32;
        if x < 0 || y < 0 || z < 0 || x >= r || y >= r || z >= r {
            return false;
        }
        let k = self.linear_index(x as u32, y as u32, z as u32);
        (self.words[(k / 64) as usize] >> (k % 64)) & 1 != 0
    }

    /// Writes outside `[0, R)` are silently ignored.
    pub fn set(&mut self, x: i32, y: i32, z: i32) {
        let r = self.resolution as i32;
        if x < 0 || y < 0 || z < 0 || x >= r || y >= r || z >= r {
            return;
        }
        let k = self.linear_index(x as u32, y as u32, z as u32);
        self.words[(k / 64) as usize] |= 1 << (k % 64);
    }

    #[inline]
    pub fn query_u(&self, p: UVec3) -> bool {
        self.query(p.x as i32, p.y as i32, p.z as i32)
    }

    /// Copy the `size`-cubed sub-region starting at `origin` into a fresh,
    /// origin-tagged grid. Used by the tile orchestrator when tiling a grid
    /// that already exists in full (the `--voxel-to-svdag` path), where
    /// there is no mesh to re-voxelize per tile.
    pub fn extract_region(&self, origin: UVec3, size: u32) -> Self {
        let mut region = Self::new(size);
        region.set_origin(origin);
        for x in 0..size {
            for y in 0..size {
                for z in 0..size {
                    if self.query((origin.x + x) as i32, (origin.y + y) as i32, (origin.z + z) as i32) {
                        region.set(x as i32, y as i32, z as i32);
                    }
                }
            }
        }
        region
    }

    /// Rasterize every triangle of `mesh` into this grid. `progress` is
    /// incremented once per triangle processed, regardless of algorithm —
    /// the shared counter behind the CLI's "Voxelizing" progress bar.
    pub fn voxelize_mesh<M: MeshSource>(&mut self, mesh: &M, algorithm: VoxelizeAlgorithm, progress: &AtomicU64) {
        let origin = self.origin.as_vec3();
        for k in 0..mesh.tri_count() {
            let (a, b, c) = mesh.triangle(k);
            let tri = Triangle::new(a - origin, b - origin, c - origin);
            match algorithm {
                VoxelizeAlgorithm::Sat => self.voxelize_triangle_sat(tri),
                VoxelizeAlgorithm::Dda => self.voxelize_triangle_dda(tri),
            }
            progress.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn voxelize_triangle_sat(&mut self, tri: Triangle) {
        let Some((lo, hi)) = tri.aabb().voxel_range(self.resolution) else {
            return;
        };
        for x in lo.x..hi.x {
            for y in lo.y..hi.y {
                for z in lo.z..hi.z {
                    let cell = IVec3::new(x, y, z);
                    if tri.overlaps_voxel(cell) {
                        self.set(x, y, z);
                    }
                }
            }
        }
    }

    fn voxelize_triangle_dda(&mut self, tri: Triangle) {
        let mark = |cell: IVec3, grid: &mut Self| grid.set(cell.x, cell.y, cell.z);

        for (p0, p1) in [(tri.a, tri.b), (tri.b, tri.c), (tri.c, tri.a)] {
            vmesh_core::dda_walk(p0, p1, |cell| mark(cell, self));
        }

        // Fan of scanlines from the apex `a` to points sampled along the
        // opposite edge `b`-`c`, filling the triangle's interior.
        let span = (tri.b - tri.a).length().max((tri.c - tri.a).length());
        let steps = span.ceil().max(1.0) as i32;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let p = tri.b.lerp(tri.c, t);
            vmesh_core::dda_walk(tri.a, p, |cell| mark(cell, self));
        }
    }

    // ---- byte-packed format ----

    fn total_voxels(&self) -> u64 {
        (self.resolution as u64).pow(3)
    }

    pub fn write_to_file(&self, mut w: impl Write) -> io::Result<()> {
        w.write_all(&self.resolution.to_le_bytes())?;
        let total = self.total_voxels();
        let byte_count = total.div_ceil(8) as usize;
        let mut bytes = vec![0u8; byte_count];
        for k in 0..total {
            let bit = (self.words[(k / 64) as usize] >> (k % 64)) & 1;
            if bit != 0 {
                bytes[(k / 8) as usize] |= 1 << (k % 8);
            }
        }
        w.write_all(&bytes)
    }

    pub fn load_from_file(mut r: impl Read) -> io::Result<Self> {
        let mut res_bytes = [0u8; 4];
        r.read_exact(&mut res_bytes)?;
        let resolution = u32::from_le_bytes(res_bytes);
        let mut grid = Self::new(resolution);

        let total = grid.total_voxels();
        let byte_count = total.div_ceil(8) as usize;
        let mut bytes = vec![0u8; byte_count];
        r.read_exact(&mut bytes)?;

        for k in 0..total {
            let bit = (bytes[(k / 8) as usize] >> (k % 8)) & 1;
            if bit != 0 {
                grid.words[(k / 64) as usize] |= 1 << (k % 64);
            }
        }
        Ok(grid)
    }

    // ---- run-compressed format ----

    pub fn write_to_file_compressed(&self, mut w: impl Write) -> io::Result<()> {
        w.write_all(&self.resolution.to_le_bytes())?;
        let total = self.total_voxels();
        if total == 0 {
            return Ok(());
        }

        let bit_at = |k: u64| -> u32 { ((self.words[(k / 64) as usize] >> (k % 64)) & 1) as u32 };

        let mut current = bit_at(0);
        let mut run_len: u32 = 1;
        for k in 1..total {
            let v = bit_at(k);
            if v == current && run_len < u32::MAX {
                run_len += 1;
            } else {
                w.write_all(&current.to_le_bytes())?;
                w.write_all(&run_len.to_le_bytes())?;
                current = v;
                run_len = 1;
            }
        }
        w.write_all(&current.to_le_bytes())?;
        w.write_all(&run_len.to_le_bytes())
    }

    pub fn load_from_file_compressed(mut r: impl Read) -> io::Result<Self> {
        let mut res_bytes = [0u8; 4];
        r.read_exact(&mut res_bytes)?;
        let resolution = u32::from_le_bytes(res_bytes);
        let mut grid = Self::new(resolution);

        let total = grid.total_voxels();
        let mut filled: u64 = 0;
        let mut pair = [0u8; 8];
        while filled < total {
            r.read_exact(&mut pair)?;
            let value = u32::from_le_bytes(pair[0..4].try_into().unwrap());
            let run_len = u32::from_le_bytes(pair[4..8].try_into().unwrap()) as u64;
            if value != 0 {
                for k in filled..(filled + run_len).min(total) {
                    grid.words[(k / 64) as usize] |= 1 << (k % 64);
                }
            }
            filled += run_len;
        }
        Ok(grid)
    }
}
