//! Geometry primitives for mesh voxelization: triangle–AABB overlap (SAT),
//! the DDA line walk, axis-aligned bounding boxes, and octree child-index
//! encoding.

use glam::{IVec3, UVec3, Vec3};

/// Axis-aligned bounding box over `f32` coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    #[inline]
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Bounding box of the referenced vertices, or `None` if empty.
    pub fn of_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut aabb = Self::new(first, first);
        for p in iter {
            aabb.expand_to_include(p);
        }
        Some(aabb)
    }

    #[inline]
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Integer voxel-cell range `[lo, hi)` covering this box, clamped to
    /// `[0, resolution)` on every axis. Returns `None` if the clamped range
    /// is empty on any axis (the box lies entirely outside the grid).
    pub fn voxel_range(&self, resolution: u32) -> Option<(IVec3, IVec3)> {
        let res = resolution as i32;
        let lo = IVec3::new(
            self.min.x.floor() as i32,
            self.min.y.floor() as i32,
            self.min.z.floor() as i32,
        )
        .max(IVec3::ZERO);
        let hi = IVec3::new(
            self.max.x.ceil() as i32,
            self.max.y.ceil() as i32,
            self.max.z.ceil() as i32,
        )
        .min(IVec3::splat(res));
        if hi.x <= lo.x || hi.y <= lo.y || hi.z <= lo.z {
            None
        } else {
            Some((lo, hi))
        }
    }
}

/// A triangle in grid space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    #[inline]
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    #[inline]
    pub fn vertices(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }

    #[inline]
    pub fn edges(&self) -> [Vec3; 3] {
        [self.b - self.a, self.c - self.b, self.a - self.c]
    }

    /// Unnormalized face normal; zero for a degenerate (collinear) triangle.
    #[inline]
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a)
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::of_points(self.vertices()).expect("triangle always has 3 vertices")
    }

    /// Separating-axis test for triangle/unit-voxel overlap (Akenine-Möller).
    /// `cell` is the integer coordinate of the voxel; the cube tested is
    /// `[cell, cell + 1)`.
    pub fn overlaps_voxel(&self, cell: IVec3) -> bool {
        let box_center = cell.as_vec3() + Vec3::splat(0.5);
        let box_half = Vec3::splat(0.5);

        let v0 = self.a - box_center;
        let v1 = self.b - box_center;
        let v2 = self.c - box_center;
        let e0 = v1 - v0;
        let e1 = v2 - v1;
        let e2 = v0 - v2;

        // 9 axis tests: cross(edge, box-axis) for each of the 3 edges and 3 axes.
        let box_axes = [Vec3::X, Vec3::Y, Vec3::Z];
        let edges = [e0, e1, e2];
        let verts = [v0, v1, v2];
        for edge in edges {
            for axis in box_axes {
                let a = axis.cross(edge);
                if a.length_squared() < f32::EPSILON {
                    continue;
                }
                let p = verts.map(|v| v.dot(a));
                let p_min = p[0].min(p[1]).min(p[2]);
                let p_max = p[0].max(p[1]).max(p[2]);
                let r = box_half.x * a.x.abs() + box_half.y * a.y.abs() + box_half.z * a.z.abs();
                if p_min > r || p_max < -r {
                    return false;
                }
            }
        }

        // 3 box-axis tests: the triangle's AABB against the voxel's extent.
        for axis in 0..3 {
            let p = [v0[axis], v1[axis], v2[axis]];
            let p_min = p[0].min(p[1]).min(p[2]);
            let p_max = p[0].max(p[1]).max(p[2]);
            if p_min > box_half[axis] || p_max < -box_half[axis] {
                return false;
            }
        }

        // Triangle-normal/plane test.
        let normal = e0.cross(e1);
        if normal.length_squared() < f32::EPSILON {
            // Degenerate triangle: fall through, the box tests above already decided overlap.
            return true;
        }
        let r = box_half.x * normal.x.abs() + box_half.y * normal.y.abs() + box_half.z * normal.z.abs();
        let s = normal.dot(v0);
        s.abs() <= r
    }
}

/// Walk the 3D DDA line from `p0` to `p1`, visiting every integer cell the
/// segment passes through (inclusive of both endpoints).
pub fn dda_walk(p0: Vec3, p1: Vec3, mut visit: impl FnMut(IVec3)) {
    let delta = p1 - p0;
    let steps = delta
        .abs()
        .max_element()
        .ceil()
        .max(0.0) as i32;
    let steps = steps.max(1);
    for i in 0..=steps {
        let t = i as f32 / steps as f32;
        let p = p0 + delta * t;
        visit(p.floor().as_ivec3());
    }
}

/// Encode a child's `(x, y, z)` half-cube selector (each component `0` or
/// `1`) into the `[0, 8)` child index used throughout the octree.
#[inline]
pub fn encode_child_index(local: UVec3) -> u8 {
    debug_assert!(local.x <= 1 && local.y <= 1 && local.z <= 1);
    (local.x | (local.y << 1) | (local.z << 2)) as u8
}

/// Inverse of [`encode_child_index`].
#[inline]
pub fn decode_child_index(index: u8) -> UVec3 {
    debug_assert!(index < 8);
    UVec3::new(
        (index & 1) as u32,
        ((index >> 1) & 1) as u32,
        ((index >> 2) & 1) as u32,
    )
}
