//! The pointered sparse voxel octree, represented as an arena of nodes
//! instead of a graph of owned pointers.
//!
//! Index `0` is the shared `AIR` leaf, index `1` is the shared `SOLID` leaf;
//! both are process-local sentinels rather than aliased pointers, which
//! sidesteps the "two global singletons" footgun the original sources have
//! to work around. Interior nodes occupy indices `>= 2`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::UVec3;
use vmesh_core::geometry::decode_child_index;

use crate::grid::VoxelGrid;

/// Index into an [`Octree`]'s arena.
pub type NodeRef = u32;

/// The shared "all air" leaf.
pub const AIR: NodeRef = 0;
/// The shared "all solid" leaf.
pub const SOLID: NodeRef = 1;

/// One arena slot: a leaf sentinel or an interior node owning 8 children.
#[derive(Clone, Debug)]
pub enum Node {
    Air,
    Solid,
    Interior {
        origin: UVec3,
        size: u32,
        children: [NodeRef; 8],
    },
}

impl Node {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        !matches!(self, Node::Interior { .. })
    }
}

/// A pointered sparse voxel octree over a cubic domain of side `size`.
pub struct Octree {
    arena: Vec<Node>,
    root: NodeRef,
    size: u32,
}

impl Octree {
    /// An empty (all-`AIR`) octree of the given side length.
    pub fn empty(size: u32) -> Self {
        Self {
            arena: vec![Node::Air, Node::Solid],
            root: AIR,
            size,
        }
    }

    /// A fully solid octree of the given side length.
    pub fn full(size: u32) -> Self {
        Self {
            arena: vec![Node::Air, Node::Solid],
            root: SOLID,
            size,
        }
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn root(&self) -> NodeRef {
        self.root
    }

    #[inline]
    pub fn node(&self, r: NodeRef) -> &Node {
        &self.arena[r as usize]
    }

    /// Query occupancy at a point by descending from the root.
    pub fn query(&self, p: UVec3) -> bool {
        let mut node_ref = self.root;
        let mut origin = UVec3::ZERO;
        let mut size = self.size;
        loop {
            match self.node(node_ref) {
                Node::Air => return false,
                Node::Solid => return true,
                Node::Interior { children, .. } => {
                    size /= 2;
                    let local = (p - origin) / size;
                    let c = decode_child_index_inv(local);
                    node_ref = children[c as usize];
                    origin += local.min(UVec3::ONE) * size;
                }
            }
        }
    }

    /// Allocate a fresh interior node, returning its reference.
    fn push_interior(&mut self, origin: UVec3, size: u32) -> NodeRef {
        let r = self.arena.len() as NodeRef;
        self.arena.push(Node::Interior {
            origin,
            size,
            children: [AIR; 8],
        });
        r
    }

    pub(crate) fn arena(&self) -> &[Node] {
        &self.arena
    }

    /// Merge `other`'s non-reserved arena slots into `self`, remapping
    /// indices, and return `other`'s root translated into `self`'s arena.
    /// Used by the tile orchestrator to graft a tile's sub-octree into the
    /// parent tree.
    pub(crate) fn graft(&mut self, other: Octree) -> NodeRef {
        match other.root {
            AIR => AIR,
            SOLID => SOLID,
            _ => {
                let offset = self.arena.len() as i64 - 2;
                let remap = |r: NodeRef| -> NodeRef {
                    if r == AIR || r == SOLID {
                        r
                    } else {
                        (r as i64 + offset) as NodeRef
                    }
                };
                for node in other.arena.into_iter().skip(2) {
                    let remapped = match node {
                        Node::Air | Node::Solid => unreachable!("reserved slots only at 0/1"),
                        Node::Interior { origin, size, children } => Node::Interior {
                            origin,
                            size,
                            children: children.map(remap),
                        },
                    };
                    self.arena.push(remapped);
                }
                remap(other.root)
            }
        }
    }

    pub(crate) fn set_root(&mut self, root: NodeRef) {
        self.root = root;
    }

    pub(crate) fn node_mut_child(&mut self, node_ref: NodeRef, child_slot: u8) -> &mut NodeRef {
        match &mut self.arena[node_ref as usize] {
            Node::Interior { children, .. } => &mut children[child_slot as usize],
            _ => unreachable!("node_mut_child called on a leaf"),
        }
    }

    pub(crate) fn node_child(&self, node_ref: NodeRef, child_slot: u8) -> NodeRef {
        match self.node(node_ref) {
            Node::Interior { children, .. } => children[child_slot as usize],
            _ => unreachable!("node_child called on a leaf"),
        }
    }

    /// Replace a leaf slot with a freshly-materialized interior node,
    /// returning its reference. Used by the tile orchestrator's attach
    /// protocol when it must descend through a slot that is currently AIR.
    pub(crate) fn materialize_interior(&mut self, origin: UVec3, size: u32) -> NodeRef {
        self.push_interior(origin, size)
    }
}

#[inline]
fn decode_child_index_inv(local: UVec3) -> u8 {
    vmesh_core::encode_child_index(local.min(UVec3::ONE))
}

/// Build a sparse octree from a dense grid.
///
/// `progress` receives one increment of `childSize^3` per child scanned,
/// plus a "virtual work" credit of `log2(childSize) * childSize^3` whenever
/// a child collapses into a singleton leaf, so that the progress counter
/// tracks total potential work rather than realized work.
pub fn build_octree(grid: &VoxelGrid, progress: &AtomicU64) -> Octree {
    let size = grid.resolution();
    if size <= 1 {
        return if grid.query(0, 0, 0) {
            Octree::full(size)
        } else {
            Octree::empty(size)
        };
    }

    let mut tree = Octree::empty(size);
    let root_ref = tree.push_interior(UVec3::ZERO, size);
    tree.set_root(root_ref);

    let mut queue: VecDeque<NodeRef> = VecDeque::new();
    queue.push_back(root_ref);

    while let Some(node_ref) = queue.pop_front() {
        let (origin, node_size) = match tree.node(node_ref) {
            Node::Interior { origin, size, .. } => (*origin, *size),
            _ => unreachable!("only interior nodes are queued"),
        };
        let child_size = node_size / 2;
        let child_volume = (child_size as u64).pow(3);

        for c in 0u8..8 {
            let local = decode_child_index(c);
            let o = origin + local * child_size;

            let (all_zero, all_one) = scan_uniform(grid, o, child_size);
            progress.fetch_add(child_volume, Ordering::Relaxed);

            let child_ref = if all_zero {
                progress.fetch_add(virtual_work(child_size, child_volume), Ordering::Relaxed);
                AIR
            } else if all_one {
                progress.fetch_add(virtual_work(child_size, child_volume), Ordering::Relaxed);
                SOLID
            } else {
                let r = tree.push_interior(o, child_size);
                queue.push_back(r);
                r
            };

            *tree.node_mut_child(node_ref, c) = child_ref;
        }
    }

    tree
}

fn scan_uniform(grid: &VoxelGrid, origin: UVec3, size: u32) -> (bool, bool) {
    let mut all_zero = true;
    let mut all_one = true;
    'scan: for z in origin.z..origin.z + size {
        for y in origin.y..origin.y + size {
            for x in origin.x..origin.x + size {
                let v = grid.query(x as i32, y as i32, z as i32);
                all_zero &= !v;
                all_one &= v;
                if !all_zero && !all_one {
                    break 'scan;
                }
            }
        }
    }
    (all_zero, all_one)
}

fn virtual_work(child_size: u32, child_volume: u64) -> u64 {
    if child_size <= 1 {
        return 0;
    }
    let log2 = (child_size as f64).log2();
    (log2 * child_volume as f64) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::emit_indices;

    fn progress() -> AtomicU64 {
        AtomicU64::new(0)
    }

    #[test]
    fn empty_grid_collapses_to_single_air_record() {
        let grid = VoxelGrid::new(8);
        let tree = build_octree(&grid, &progress());
        assert_eq!(tree.root(), AIR);
        let indices = emit_indices(&tree);
        assert_eq!(indices.len(), 1);
        assert!(indices[0].iter().all(|&v| v == u32::MAX - 1));
    }

    #[test]
    fn full_grid_collapses_to_single_solid_record() {
        let mut grid = VoxelGrid::new(2);
        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    grid.set(x, y, z);
                }
            }
        }
        let tree = build_octree(&grid, &progress());
        assert_eq!(tree.root(), SOLID);
        let indices = emit_indices(&tree);
        assert_eq!(indices.len(), 1);
        assert!(indices[0].iter().all(|&v| v == u32::MAX));
    }

    #[test]
    fn half_space_along_x_r4() {
        // Voxels set iff x < 2; the x bit of the child index should split
        // the root's children evenly into SOLID/AIR halves.
        let mut grid = VoxelGrid::new(4);
        for x in 0..2 {
            for y in 0..4 {
                for z in 0..4 {
                    grid.set(x, y, z);
                }
            }
        }
        let tree = build_octree(&grid, &progress());
        let indices = emit_indices(&tree);
        assert_eq!(indices.len(), 1);
        let root = indices[0];
        for c in 0u8..8 {
            let x_bit = c & 1;
            if x_bit == 0 {
                assert_eq!(root[c as usize], u32::MAX, "child {c} should be SOLID");
            } else {
                assert_eq!(root[c as usize], u32::MAX - 1, "child {c} should be AIR");
            }
        }
    }

    #[test]
    fn octree_decodes_back_to_dense_grid() {
        let mut grid = VoxelGrid::new(16);
        let mut state: u32 = 98765;
        for x in 0..16 {
            for y in 0..16 {
                for z in 0..16 {
                    state = state.wrapping_mul(1103515245).wrapping_add(12345);
                    if (state >> 16) % 5 == 0 {
                        grid.set(x, y, z);
                    }
                }
            }
        }
        let tree = build_octree(&grid, &progress());
        for x in 0..16u32 {
            for y in 0..16u32 {
                for z in 0..16u32 {
                    assert_eq!(
                        grid.query(x as i32, y as i32, z as i32),
                        tree.query(UVec3::new(x, y, z))
                    );
                }
            }
        }
    }

    #[test]
    fn size_one_grid_builds_directly() {
        let mut grid = VoxelGrid::new(1);
        grid.set(0, 0, 0);
        let tree = build_octree(&grid, &progress());
        assert_eq!(tree.root(), SOLID);
    }
}
