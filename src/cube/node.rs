//! Cube tree nodes
//!
//! Nodes live in a per-level arena (`Vec<Vec<CubeNode>>`) owned by the cube.
//! Parent and children are `NodeId`s into that arena instead of references.

use crate::cube::dimensions::DimensionValues;
use crate::cube::row::Row;
use serde::{Deserialize, Serialize};

/// Position of a node in the level arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId {
    pub level: usize,
    pub index: usize,
}

impl NodeId {
    pub const ROOT: NodeId = NodeId { level: 0, index: 0 };

    pub fn new(level: usize, index: usize) -> Self {
        Self { level, index }
    }
}

/// Adjustable aggregates of a node
///
/// Starts as the node's row; the summary pass extracts the values of picked
/// descendants from their ancestors and adds them back when a pick is undone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeValues {
    pub baseline_value: f64,
    pub current_value: f64,
    pub baseline_size: f64,
    pub current_size: f64,
}

impl NodeValues {
    pub fn of(row: &Row) -> Self {
        Self {
            baseline_value: row.baseline_value,
            current_value: row.current_value,
            baseline_size: row.baseline_size,
            current_size: row.current_size,
        }
    }
}

/// A row placed in the cube hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeNode {
    level: usize,
    index: usize,
    data: Row,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    values: NodeValues,
    cost: f64,
}

impl CubeNode {
    pub(crate) fn new(level: usize, index: usize, data: Row, parent: Option<NodeId>) -> Self {
        debug_assert!(
            (level == 0) == parent.is_none(),
            "only the level-0 node may lack a parent"
        );
        Self {
            level,
            index,
            values: NodeValues::of(&data),
            data,
            parent,
            children: Vec::new(),
            cost: 0.0,
        }
    }

    pub fn id(&self) -> NodeId {
        NodeId::new(self.level, self.index)
    }

    /// Level in the cube; 0 is the root.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Position of this node within its level.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children sorted by size, largest first.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn data(&self) -> &Row {
        &self.data
    }

    pub fn dimension_values(&self) -> &DimensionValues {
        &self.data.dimension_values
    }

    pub fn values(&self) -> NodeValues {
        self.values
    }

    pub fn baseline_value(&self) -> f64 {
        self.values.baseline_value
    }

    pub fn current_value(&self) -> f64 {
        self.values.current_value
    }

    pub fn baseline_size(&self) -> f64 {
        self.values.baseline_size
    }

    pub fn current_size(&self) -> f64 {
        self.values.current_size
    }

    pub fn original_baseline_value(&self) -> f64 {
        self.data.baseline_value
    }

    pub fn original_current_value(&self) -> f64 {
        self.data.current_value
    }

    pub fn original_baseline_size(&self) -> f64 {
        self.data.baseline_size
    }

    pub fn original_current_size(&self) -> f64 {
        self.data.current_size
    }

    /// Latest cost assigned by the summary pass.
    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn set_cost(&mut self, cost: f64) {
        self.cost = cost;
    }

    /// Restores the aggregates of the underlying row.
    pub fn reset_values(&mut self) {
        self.values = NodeValues::of(&self.data);
    }

    /// Extracts a descendant's aggregates from this node.
    pub fn remove_node_values(&mut self, other: NodeValues) {
        self.values.baseline_value -= other.baseline_value;
        self.values.current_value -= other.current_value;
        self.values.baseline_size -= other.baseline_size;
        self.values.current_size -= other.current_size;
    }

    /// Adds an extracted descendant's aggregates back to this node.
    pub fn add_node_values(&mut self, other: NodeValues) {
        self.values.baseline_value += other.baseline_value;
        self.values.current_value += other.current_value;
        self.values.baseline_size += other.baseline_size;
        self.values.current_size += other.current_size;
    }

    /// True once every aggregate has been extracted by descendants.
    pub fn is_thinned_out(&self) -> bool {
        self.values.baseline_size == 0.0 && self.values.current_size == 0.0
    }

    /// `current_size / baseline_size` of the adjusted aggregates
    pub fn change_ratio(&self) -> f64 {
        self.current_size() / self.baseline_size()
    }

    /// `current_value / baseline_value` of the underlying row
    pub fn original_change_ratio(&self) -> f64 {
        self.data.current_value / self.data.baseline_value
    }

    /// A finite, non-zero change ratio pointing in the direction this node moved.
    ///
    /// Falls back to the original ratio, then to `parent_ratio` (the parent's safe
    /// ratio, `None` at the root), then to 1.
    pub fn safe_change_ratio<F>(&self, parent_ratio: F) -> f64
    where
        F: FnOnce() -> Option<f64>,
    {
        let usable = |ratio: f64| ratio.is_finite() && ratio != 0.0;

        let ratio = self.change_ratio();
        if usable(ratio) {
            return ratio;
        }
        let original = self.original_change_ratio();
        if usable(original) {
            return ensure_change_ratio_direction(self.baseline_size(), self.current_size(), original);
        }
        match parent_ratio() {
            Some(parent) => ensure_change_ratio_direction(self.baseline_size(), self.current_size(), parent),
            None => 1.0,
        }
    }

    /// True if the node increased, i.e. its change ratio is at least 1.
    /// A NaN ratio (both sizes zero) falls back to the original ratio.
    pub fn side(&self) -> bool {
        let ratio = self.change_ratio();
        if ratio.is_nan() {
            self.original_change_ratio() >= 1.0
        } else {
            ratio >= 1.0
        }
    }

    pub(crate) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.children
    }
}

/// Inverts `ratio` when it points against the change from `baseline` to `current`.
pub fn ensure_change_ratio_direction(baseline: f64, current: f64, ratio: f64) -> f64 {
    if (current > baseline && ratio < 1.0) || (current < baseline && ratio > 1.0) {
        1.0 / ratio
    } else {
        ratio
    }
}
