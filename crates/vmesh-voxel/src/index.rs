//! Flattens a pointered [`Octree`] into the contiguous index-array wire
//! format: a two-pass BFS, assign then fill, with leaf sentinels in place
//! of the original's two shared singleton nodes.

use std::collections::{HashMap, VecDeque};

use crate::octree::{Node, NodeRef, Octree, AIR, SOLID};

/// Sentinel written for an `AIR` child.
pub const SENTINEL_AIR: u32 = u32::MAX - 1;
/// Sentinel written for a `SOLID` child.
pub const SENTINEL_SOLID: u32 = u32::MAX;

/// Above this many records a DAG this format's `u32` child slots can no
/// longer address unambiguously; logged as a warning, not an error.
const INDEX_OVERFLOW_THRESHOLD: usize = (SENTINEL_AIR - 1) as usize;

/// Two-pass BFS: assign a record row to every interior node reachable from
/// `tree`'s root, then fill each row with child record indices or sentinels.
/// Record 0 is always the root, whether it is itself a leaf or interior.
pub fn emit_indices(tree: &Octree) -> Vec<[u32; 8]> {
    let root = tree.root();

    // A uniform tree's root is itself a leaf; the wire format still needs
    // one row, all entries pointing at the same sentinel.
    if matches!(root, AIR | SOLID) {
        let sentinel = if root == SOLID { SENTINEL_SOLID } else { SENTINEL_AIR };
        return vec![[sentinel; 8]];
    }

    let mut temp_index: HashMap<NodeRef, u32> = HashMap::new();
    let mut indices: Vec<[u32; 8]> = Vec::new();
    let mut queue: VecDeque<NodeRef> = VecDeque::new();

    temp_index.insert(root, 0);
    indices.push([0; 8]);
    queue.push_back(root);

    while let Some(node_ref) = queue.pop_front() {
        let Node::Interior { children, .. } = tree.node(node_ref) else {
            unreachable!("only interior nodes are queued");
        };
        for &child in children {
            if matches!(child, AIR | SOLID) {
                continue;
            }
            if !temp_index.contains_key(&child) {
                let row = indices.len() as u32;
                temp_index.insert(child, row);
                indices.push([0; 8]);
                queue.push_back(child);
            }
        }
    }

    for (&node_ref, &row) in &temp_index {
        let Node::Interior { children, .. } = tree.node(node_ref) else {
            unreachable!("only interior nodes hold a temp index");
        };
        let mut record = [0u32; 8];
        for (c, &child) in children.iter().enumerate() {
            record[c] = match child {
                AIR => SENTINEL_AIR,
                SOLID => SENTINEL_SOLID,
                other => temp_index[&other],
            };
        }
        indices[row as usize] = record;
    }

    if indices.len() > INDEX_OVERFLOW_THRESHOLD {
        tracing::warn!(
            record_count = indices.len(),
            "index array approaches u32::MAX; SVDAG file will be corrupted on read"
        );
    }

    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::octree::build_octree;
    use crate::grid::VoxelGrid;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn uniform_trees_emit_single_record() {
        let empty = Octree::empty(8);
        let indices = emit_indices(&empty);
        assert_eq!(indices, vec![[SENTINEL_AIR; 8]]);

        let full = Octree::full(8);
        let indices = emit_indices(&full);
        assert_eq!(indices, vec![[SENTINEL_SOLID; 8]]);
    }

    #[test]
    fn record_zero_is_always_the_root() {
        let mut grid = VoxelGrid::new(4);
        grid.set(0, 0, 0);
        let tree = build_octree(&grid, &AtomicU64::new(0));
        let indices = emit_indices(&tree);
        // root is interior (mixed occupancy) so record 0 must reference
        // at least one SOLID-bearing subtree via further interior rows.
        assert!(indices.len() > 1);
        assert!(indices[0].iter().any(|&v| v != SENTINEL_AIR));
    }

    #[test]
    fn referenced_rows_precede_or_equal_their_first_reference_index() {
        let mut grid = VoxelGrid::new(8);
        let mut state: u32 = 777;
        for x in 0..8u32 {
            for y in 0..8u32 {
                for z in 0..8u32 {
                    state = state.wrapping_mul(1103515245).wrapping_add(12345);
                    if (state >> 20) % 3 == 0 {
                        grid.set(x as i32, y as i32, z as i32);
                    }
                }
            }
        }
        let tree = build_octree(&grid, &AtomicU64::new(0));
        let indices = emit_indices(&tree);
        for (row, record) in indices.iter().enumerate() {
            for &entry in record {
                if entry != SENTINEL_AIR && entry != SENTINEL_SOLID {
                    assert!((entry as usize) < indices.len());
                    assert_ne!(entry as usize, row, "a record cannot reference itself");
                }
            }
        }
    }
}
