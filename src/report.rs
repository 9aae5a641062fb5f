//! Gainer/loser report
//!
//! The dimension values that moved the most, split by direction of change. Built
//! from a cube's cost set, which is already sorted by cost.
//!
//! Percentages are rounded to 4 decimals and are `None` (serialized as `null`)
//! when their denominator is zero.

use crate::cube::{CostEntry, Cube};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rounds to 4 decimal places.
pub fn round_up(number: f64) -> f64 {
    (number * 10_000.0).round() / 10_000.0
}

/// `(current - baseline) / baseline * 100`
pub fn percentage_change(baseline: f64, current: f64) -> Option<f64> {
    (baseline != 0.0).then(|| round_up((current - baseline) / baseline * 100.0))
}

/// Change of a value's share of the total, in percentage points.
pub fn contribution_change(baseline: f64, current: f64, baseline_total: f64, current_total: f64) -> Option<f64> {
    (baseline_total != 0.0 && current_total != 0.0)
        .then(|| round_up((current / current_total - baseline / baseline_total) * 100.0))
}

/// Share of the overall change carried by a value:
/// `(current - baseline) / |current_total - baseline_total| * 100`.
pub fn contribution_to_overall_change(
    baseline: f64,
    current: f64,
    baseline_total: f64,
    current_total: f64,
) -> Option<f64> {
    let overall_change = (current_total - baseline_total).abs();
    (baseline_total != 0.0 && overall_change != 0.0)
        .then(|| round_up((current - baseline) / overall_change * 100.0))
}

/// One dimension value in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GainerLoserRow {
    pub dimension_name: String,
    pub dimension_value: String,
    pub baseline_value: f64,
    pub current_value: f64,
    pub percentage_change: Option<f64>,
    pub contribution_change: Option<f64>,
    pub contribution_to_overall_change: Option<f64>,
    pub size_factor: f64,
    pub cost: f64,
}

impl GainerLoserRow {
    fn from_entry(entry: &CostEntry, baseline_total: f64, current_total: f64) -> Self {
        let baseline = entry.baseline_value;
        let current = entry.current_value;
        Self {
            dimension_name: entry.dim_name.clone(),
            dimension_value: entry.dim_value.clone(),
            baseline_value: baseline,
            current_value: current,
            percentage_change: percentage_change(baseline, current),
            contribution_change: contribution_change(baseline, current, baseline_total, current_total),
            contribution_to_overall_change: contribution_to_overall_change(
                baseline,
                current,
                baseline_total,
                current_total,
            ),
            size_factor: entry.size_factor,
            cost: round_up(entry.cost),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GainerLoserReport {
    pub gainers: Vec<GainerLoserRow>,
    pub losers: Vec<GainerLoserRow>,
}

impl GainerLoserReport {
    pub fn from_cube(cube: &Cube<'_>, max_count: usize) -> Self {
        build_gainer_loser_report(
            cube.cost_set(),
            cube.baseline_total(),
            cube.current_total(),
            max_count,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.gainers.is_empty() && self.losers.is_empty()
    }
}

/// Walks `cost_set` in order and keeps up to `max_count` gainers and losers.
///
/// Entries with a non-positive cost explain nothing and are skipped.
pub fn build_gainer_loser_report(
    cost_set: &[CostEntry],
    baseline_total: f64,
    current_total: f64,
    max_count: usize,
) -> GainerLoserReport {
    let mut report = GainerLoserReport::default();
    for entry in cost_set {
        if report.gainers.len() >= max_count && report.losers.len() >= max_count {
            break;
        }
        if entry.cost <= 0.0 {
            continue;
        }

        let side = if entry.current_value >= entry.baseline_value {
            &mut report.gainers
        } else {
            &mut report.losers
        };
        if side.len() < max_count {
            side.push(GainerLoserRow::from_entry(entry, baseline_total, current_total));
        }
    }
    report
}

impl fmt::Display for GainerLoserReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (title, rows) in [("Gainers", &self.gainers), ("Losers", &self.losers)] {
            writeln!(f, "{}:", title)?;
            for row in rows {
                write!(
                    f,
                    "  {}={}  {} -> {}",
                    row.dimension_name, row.dimension_value, row.baseline_value, row.current_value
                )?;
                match row.percentage_change {
                    Some(change) => writeln!(f, " ({:+.2}%)", change)?,
                    None => writeln!(f)?,
                }
            }
        }
        Ok(())
    }
}
