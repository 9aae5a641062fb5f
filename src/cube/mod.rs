//! Dimension root-cause cube
//!
//! Ranks candidate dimensions by how much of a metric's change they explain,
//! orders them around declared hierarchies and rebuilds the breakdown rows into
//! a tree whose nodes aggregate their descendants.

pub mod aggregator;
pub mod builder;
pub mod cost;
pub mod dimensions;
pub mod filter;
pub mod node;
pub mod orderer;
pub mod row;
pub mod tree;

pub use aggregator::{CostAggregator, Totals};
pub use builder::Cube;
pub use cost::{CostEntry, CostFunction, CostInput, DimensionCost};
pub use dimensions::{DimensionValues, Dimensions};
pub use filter::{shrink_dimensions_by_filters, DimensionFilter, FilterOperator};
pub use node::{CubeNode, NodeId, NodeValues};
pub use orderer::{DimensionOrderer, HierarchicalDimensionGroup};
pub use row::Row;
pub use tree::CubeTreeBuilder;
