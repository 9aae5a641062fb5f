//! Cost function contract and cost records
//!
//! The cube never computes a cost itself. It hands a `CostInput` to a pluggable
//! `CostFunction` and only relies on the returned scalar being totally ordered:
//! higher means the dimension value explains more of the change.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Arguments of one cost evaluation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostInput {
    /// `top_current_value / top_baseline_value`
    pub top_ratio: f64,
    pub baseline_value: f64,
    pub current_value: f64,
    pub baseline_size: f64,
    pub current_size: f64,
    pub top_baseline_value: f64,
    pub top_current_value: f64,
    pub top_baseline_size: f64,
    pub top_current_size: f64,
}

/// Scores how much a single dimension value contributes to the overall change
pub trait CostFunction {
    fn compute_cost(&self, input: &CostInput) -> Result<f64>;
}

impl<F> CostFunction for F
where
    F: Fn(&CostInput) -> f64,
{
    fn compute_cost(&self, input: &CostInput) -> Result<f64> {
        Ok(self(input))
    }
}

/// Contribution of one dimension/value pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEntry {
    pub dim_name: String,
    pub dim_value: String,
    pub baseline_value: f64,
    pub current_value: f64,
    pub change_ratio: f64,
    pub change_diff: f64,
    pub baseline_size: f64,
    pub current_size: f64,
    /// Share of the total size held by this value
    pub size_factor: f64,
    pub cost: f64,
}

impl CostEntry {
    /// Natural order: by cost, ascending.
    pub fn cmp_by_cost(&self, other: &Self) -> Ordering {
        self.cost.total_cmp(&other.cost)
    }
}

/// Aggregated cost of one dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionCost {
    pub name: String,
    pub cost: f64,
}

impl DimensionCost {
    pub fn new(name: impl Into<String>, cost: f64) -> Self {
        Self {
            name: name.into(),
            cost,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CostInput {
        CostInput {
            top_ratio: 1.5,
            baseline_value: 10.0,
            current_value: 20.0,
            baseline_size: 10.0,
            current_size: 20.0,
            top_baseline_value: 100.0,
            top_current_value: 150.0,
            top_baseline_size: 100.0,
            top_current_size: 150.0,
        }
    }

    #[test]
    fn test_closure_is_cost_function() {
        let diff = |i: &CostInput| i.current_size - i.baseline_size;
        assert_eq!(diff.compute_cost(&input()).unwrap(), 10.0);
    }

    #[test]
    fn test_cost_entry_orders_by_cost() {
        let entry = |cost: f64| CostEntry {
            dim_name: "country".to_string(),
            dim_value: "US".to_string(),
            baseline_value: 0.0,
            current_value: 0.0,
            change_ratio: 0.0,
            change_diff: 0.0,
            baseline_size: 0.0,
            current_size: 0.0,
            size_factor: 0.0,
            cost,
        };
        assert_eq!(entry(1.0).cmp_by_cost(&entry(2.0)), Ordering::Less);
        assert_eq!(entry(2.0).cmp_by_cost(&entry(2.0)), Ordering::Equal);
    }
}
