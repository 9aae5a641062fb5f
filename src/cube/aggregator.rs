//! One-dimension cost computation
//!
//! Scores every value of every candidate dimension against the top-level change,
//! then rolls the value costs up into one cost per dimension. The per-dimension
//! ranking drives the automatic dimension order.

use crate::cube::cost::{CostEntry, CostFunction, CostInput, DimensionCost};
use crate::cube::dimensions::Dimensions;
use crate::cube::row::Row;
use crate::error::{CubeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Top-level aggregates of the analyzed slice
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub baseline_value: f64,
    pub current_value: f64,
    pub baseline_size: f64,
    pub current_size: f64,
}

impl Totals {
    /// Totals of an additive metric, whose sizes are its values.
    pub fn new(baseline_value: f64, current_value: f64) -> Self {
        Self {
            baseline_value,
            current_value,
            baseline_size: baseline_value,
            current_size: current_value,
        }
    }

    pub fn change_ratio(&self) -> f64 {
        self.current_value / self.baseline_value
    }
}

/// Turns one-level breakdown rows into cost entries and dimension rankings
pub struct CostAggregator<'a> {
    cost_function: &'a dyn CostFunction,
    top_entries_to_log: usize,
}

impl<'a> CostAggregator<'a> {
    pub fn new(cost_function: &'a dyn CostFunction) -> Self {
        Self {
            cost_function,
            top_entries_to_log: 20,
        }
    }

    pub fn with_top_entries_to_log(mut self, count: usize) -> Self {
        self.top_entries_to_log = count;
        self
    }

    /// Computes a cost entry for every value of every dimension.
    ///
    /// `rows_of_dimensions[i]` holds the one-level rows of `dimensions[i]`. The
    /// result is sorted by cost, descending; equal costs keep computation order.
    pub fn compute_one_dimension_cost(
        &self,
        totals: &Totals,
        dimensions: &Dimensions,
        rows_of_dimensions: &[Vec<Row>],
    ) -> Result<Vec<CostEntry>> {
        if rows_of_dimensions.len() != dimensions.len() {
            return Err(CubeError::Fetch(format!(
                "Expected rows for {} dimensions, got {}",
                dimensions.len(),
                rows_of_dimensions.len()
            )));
        }

        let top_ratio = totals.change_ratio();
        info!(
            "topBaselineValue: {}, topCurrentValue: {}, changeRatio: {}",
            totals.baseline_value, totals.current_value, top_ratio
        );
        let total_size = totals.baseline_size + totals.current_size;

        let mut cost_set = Vec::new();
        for (dimension_name, rows) in dimensions.iter().zip(rows_of_dimensions) {
            for row in rows {
                let dimension_value = row.dimension_values.get(0).ok_or_else(|| {
                    CubeError::Fetch(format!(
                        "Row without a value for dimension {}",
                        dimension_name
                    ))
                })?;

                let input = CostInput {
                    top_ratio,
                    baseline_value: row.baseline_size,
                    current_value: row.current_size,
                    baseline_size: row.baseline_size,
                    current_size: row.current_size,
                    top_baseline_value: totals.baseline_value,
                    top_current_value: totals.current_value,
                    top_baseline_size: totals.baseline_size,
                    top_current_size: totals.current_size,
                };
                let cost = self.cost_function.compute_cost(&input)?;

                cost_set.push(CostEntry {
                    dim_name: dimension_name.to_string(),
                    dim_value: dimension_value.to_string(),
                    baseline_value: row.baseline_size,
                    current_value: row.current_size,
                    change_ratio: row.current_size / row.baseline_size,
                    change_diff: row.current_size - row.baseline_size,
                    baseline_size: row.baseline_size,
                    current_size: row.current_size,
                    size_factor: (row.baseline_size + row.current_size) / total_size,
                    cost,
                });
            }
        }

        cost_set.sort_by(|a, b| b.cmp_by_cost(a));

        info!("Top {} nodes (depth=1):", self.top_entries_to_log);
        for entry in cost_set.iter().take(self.top_entries_to_log) {
            info!(
                "\t{}={} cost: {}, change: {} -> {}, sizeFactor: {}",
                entry.dim_name,
                entry.dim_value,
                entry.cost,
                entry.baseline_value,
                entry.current_value,
                entry.size_factor
            );
        }

        Ok(cost_set)
    }

    /// Sums value costs per dimension and sorts dimensions by that sum, descending.
    ///
    /// Equal sums keep the order in which the dimensions first appear in `cost_set`.
    pub fn sorted_dimension_costs(cost_set: &[CostEntry]) -> Vec<DimensionCost> {
        let mut position: HashMap<&str, usize> = HashMap::new();
        let mut dimension_costs: Vec<DimensionCost> = Vec::new();

        for entry in cost_set {
            match position.get(entry.dim_name.as_str()) {
                Some(&idx) => dimension_costs[idx].cost += entry.cost,
                None => {
                    position.insert(entry.dim_name.as_str(), dimension_costs.len());
                    dimension_costs.push(DimensionCost::new(entry.dim_name.clone(), entry.cost));
                }
            }
        }

        dimension_costs.sort_by(|a, b| b.cost.total_cmp(&a.cost));
        dimension_costs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::dimensions::DimensionValues;

    fn entry(dim_name: &str, dim_value: &str, cost: f64) -> CostEntry {
        CostEntry {
            dim_name: dim_name.to_string(),
            dim_value: dim_value.to_string(),
            baseline_value: 0.0,
            current_value: 0.0,
            change_ratio: 0.0,
            change_diff: 0.0,
            baseline_size: 0.0,
            current_size: 0.0,
            size_factor: 0.0,
            cost,
        }
    }

    fn one_level(value: &str, baseline: f64, current: f64) -> Row {
        Row::new(DimensionValues::new([value]), baseline, current)
    }

    #[test]
    fn test_sorted_dimension_costs() {
        let cost_set = vec![
            entry("country", "US", 7.0),
            entry("country", "IN", 3.0),
            entry("continent", "N. America", 4.0),
            entry("continent", "S. America", 1.0),
            entry("page", "front_page", 4.0),
            entry("page", "page", 3.0),
            entry("page", "page2", 1.0),
        ];

        let costs = CostAggregator::sorted_dimension_costs(&cost_set);
        assert_eq!(
            costs,
            vec![
                DimensionCost::new("country", 10.0),
                DimensionCost::new("page", 8.0),
                DimensionCost::new("continent", 5.0),
            ]
        );
    }

    #[test]
    fn test_sorted_dimension_costs_ties_keep_first_appearance() {
        let cost_set = vec![
            entry("browser", "Chrome", 2.0),
            entry("country", "US", 2.0),
            entry("browser", "Safari", 1.0),
            entry("country", "IN", 1.0),
        ];
        let costs = CostAggregator::sorted_dimension_costs(&cost_set);
        assert_eq!(costs[0].name, "browser");
        assert_eq!(costs[1].name, "country");
    }

    #[test]
    fn test_compute_one_dimension_cost() {
        let change = |i: &CostInput| (i.current_size - i.baseline_size).abs();
        let aggregator = CostAggregator::new(&change);
        let totals = Totals::new(100.0, 150.0);
        let dimensions = Dimensions::new(["country", "browser"]);
        let rows = vec![
            vec![one_level("US", 60.0, 100.0), one_level("IN", 40.0, 50.0)],
            vec![one_level("Chrome", 70.0, 80.0), one_level("Safari", 30.0, 70.0)],
        ];

        let cost_set = aggregator
            .compute_one_dimension_cost(&totals, &dimensions, &rows)
            .unwrap();

        let costs: Vec<f64> = cost_set.iter().map(|e| e.cost).collect();
        assert_eq!(costs, vec![40.0, 40.0, 10.0, 10.0]);
        // equal costs keep computation order
        assert_eq!(cost_set[0].dim_value, "US");
        assert_eq!(cost_set[1].dim_value, "Safari");

        let us = &cost_set[0];
        assert_eq!(us.dim_name, "country");
        assert_eq!(us.change_diff, 40.0);
        assert!((us.change_ratio - 100.0 / 60.0).abs() < 1e-12);
        assert!((us.size_factor - 160.0 / 250.0).abs() < 1e-12);
    }

    #[test]
    fn test_cost_input_carries_top_values() {
        let check = |i: &CostInput| {
            assert_eq!(i.top_ratio, 1.5);
            assert_eq!(i.top_baseline_value, 100.0);
            assert_eq!(i.top_current_size, 150.0);
            assert_eq!(i.baseline_value, i.baseline_size);
            i.current_size
        };
        let aggregator = CostAggregator::new(&check);
        let rows = vec![vec![one_level("US", 10.0, 20.0)]];
        let cost_set = aggregator
            .compute_one_dimension_cost(&Totals::new(100.0, 150.0), &Dimensions::new(["country"]), &rows)
            .unwrap();
        assert_eq!(cost_set[0].cost, 20.0);
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let change = |i: &CostInput| i.current_size / i.top_current_size;
        let aggregator = CostAggregator::new(&change);
        let totals = Totals::new(10.0, 20.0);
        let dimensions = Dimensions::new(["a", "b"]);
        let rows = vec![
            vec![one_level("x", 4.0, 12.0), one_level("y", 6.0, 8.0)],
            vec![one_level("z", 10.0, 20.0)],
        ];

        let first = aggregator.compute_one_dimension_cost(&totals, &dimensions, &rows).unwrap();
        let second = aggregator.compute_one_dimension_cost(&totals, &dimensions, &rows).unwrap();
        assert_eq!(first, second);
        assert_eq!(
            CostAggregator::sorted_dimension_costs(&first),
            CostAggregator::sorted_dimension_costs(&second)
        );
    }

    #[test]
    fn test_misaligned_rows_are_rejected() {
        let zero = |_: &CostInput| 0.0;
        let aggregator = CostAggregator::new(&zero);
        let result = aggregator.compute_one_dimension_cost(
            &Totals::new(1.0, 1.0),
            &Dimensions::new(["a", "b"]),
            &[vec![]],
        );
        assert!(matches!(result, Err(CubeError::Fetch(_))));
    }
}
