//! Data access for the cube
//!
//! The cube consumes aggregates through `CubeFetcher` and never issues queries
//! itself. Implementations own query building, parallelism, timeouts and retries.

pub mod in_memory;
pub mod rows_builder;

pub use in_memory::*;
pub use rows_builder::*;

use crate::cube::dimensions::Dimensions;
use crate::cube::row::Row;
use crate::error::Result;

/// Supplies the aggregates a cube is built from
pub trait CubeFetcher {
    /// Top-level aggregate of the baseline period.
    fn baseline_total(&self) -> Result<f64>;

    /// Top-level aggregate of the current period.
    fn current_total(&self) -> Result<f64>;

    /// One-level breakdown of each dimension, index-aligned with `dimensions`.
    ///
    /// For `[country, browser]` this returns `[[US, IN, ...], [Chrome, Safari, ...]]`.
    fn aggregated_values_of_dimension(&self, dimensions: &Dimensions) -> Result<Vec<Vec<Row>>>;

    /// Rows of every level `0..=dimensions.len()`, level `L` grouped by the first
    /// `L` dimensions.
    ///
    /// For `[country, page]` this returns `[[()], [(US), (IN)], [(US, p1), (IN, p1), ...]]`.
    fn aggregated_values_of_levels(&self, dimensions: &Dimensions) -> Result<Vec<Vec<Row>>>;
}
