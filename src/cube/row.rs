//! Aggregated rows
//!
//! A `Row` is one data point of one grouping level: the dimension-value tuple of
//! that level plus baseline/current values and sizes.

use crate::cube::dimensions::DimensionValues;
use crate::cube::node::{CubeNode, NodeId};
use serde::{Deserialize, Serialize};

/// One aggregated data point at a specific level of grouping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Values of the level's dimensions, length = level
    pub dimension_values: DimensionValues,

    pub baseline_value: f64,

    pub current_value: f64,

    /// Denominator used for weighting; equals the value for additive metrics
    pub baseline_size: f64,

    pub current_size: f64,
}

impl Row {
    /// Row of an additive metric, whose sizes are its values.
    pub fn new(dimension_values: DimensionValues, baseline_value: f64, current_value: f64) -> Self {
        Self {
            dimension_values,
            baseline_value,
            current_value,
            baseline_size: baseline_value,
            current_size: current_value,
        }
    }

    /// Grouping level the row belongs to, i.e. the number of its dimension values.
    pub fn level(&self) -> usize {
        self.dimension_values.len()
    }

    /// Node for this row at `level`, `index` within that level, under `parent`.
    pub fn to_node(&self, level: usize, index: usize, parent: NodeId) -> CubeNode {
        CubeNode::new(level, index, self.clone(), Some(parent))
    }

    /// Root node: level 0, index 0, no parent.
    pub fn to_root_node(&self) -> CubeNode {
        CubeNode::new(0, 0, self.clone(), None)
    }
}
