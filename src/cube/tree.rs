//! Cube tree reconstruction
//!
//! Rebuilds the parent/child hierarchy from flat per-level query results. Level 0
//! holds the ungrouped root; level `L` groups by the first `L` dimensions. A row
//! is attached to the node of the previous level whose dimension values equal the
//! row's prefix. Rows whose prefix produced no node upstream are dropped.
//!
//! Preconditions: every level is sorted by dimension values, so parents precede
//! children and rows sharing a prefix are contiguous.

use crate::cube::dimensions::Dimensions;
use crate::cube::node::{CubeNode, NodeId};
use crate::cube::row::Row;
use std::collections::HashMap;
use tracing::{debug, warn};

pub struct CubeTreeBuilder;

impl CubeTreeBuilder {
    /// Builds one node vector per level, `0..=dimensions.len()`.
    ///
    /// # Panics
    ///
    /// Panics if `rows` has fewer than `dimensions.len() + 1` levels.
    pub fn build(rows: &[Vec<Row>], dimensions: &Dimensions) -> Vec<Vec<CubeNode>> {
        let depth = dimensions.len();
        let mut levels: Vec<Vec<CubeNode>> = (0..=depth)
            .map(|level| Vec::with_capacity(rows[level].len()))
            .collect();

        let Some(root_row) = rows[0].first() else {
            return levels;
        };
        levels[0].push(root_row.to_root_node());

        // Keyed by the dimension-value tuple itself; concatenated strings would
        // let ("ab", "c") and ("a", "bc") collide.
        let mut current_parents: HashMap<&[String], NodeId> = HashMap::new();
        current_parents.insert(&[], NodeId::ROOT);

        for level in 1..=depth {
            debug_assert!(
                Dimensions::new(dimensions.names_to_depth(level - 1))
                    .is_parent_of(&Dimensions::new(dimensions.names_to_depth(level))),
                "level {} does not extend level {}",
                level,
                level - 1
            );
            let mut next_parents: HashMap<&[String], NodeId> = HashMap::new();
            let mut dropped = 0usize;
            let mut malformed = 0usize;

            for row in &rows[level] {
                if row.level() != level {
                    malformed += 1;
                    continue;
                }
                let values = row.dimension_values.as_slice();
                let Some(&parent_id) = values
                    .get(..level - 1)
                    .and_then(|prefix| current_parents.get(prefix))
                else {
                    dropped += 1;
                    continue;
                };

                let index = levels[level].len();
                let node = row.to_node(level, index, parent_id);
                let node_id = node.id();
                levels[level].push(node);
                levels[parent_id.level][parent_id.index].push_child(node_id);

                if level < depth {
                    next_parents.insert(row.dimension_values.prefix(level), node_id);
                }
            }

            if malformed > 0 {
                warn!(
                    "Skipped {} rows at level {} with a wrong number of dimension values",
                    malformed, level
                );
            }
            if dropped > 0 {
                debug!(
                    "Dropped {} rows at level {} without a matching parent",
                    dropped, level
                );
            }
            current_parents = next_parents;
        }

        Self::sort_children_by_size(&mut levels);
        levels
    }

    /// Largest children first. The summary pass visits children in this order and
    /// extracts their values from the parent as it goes.
    fn sort_children_by_size(levels: &mut [Vec<CubeNode>]) {
        for level in 0..levels.len().saturating_sub(1) {
            let (upper, lower) = levels.split_at_mut(level + 1);
            let children_level = &lower[0];
            for node in upper[level].iter_mut() {
                node.children_mut().sort_by(|a, b| {
                    let size = |id: &NodeId| {
                        let child = &children_level[id.index];
                        child.baseline_size() + child.current_size()
                    };
                    size(b).total_cmp(&size(a))
                });
            }
        }
    }
}
