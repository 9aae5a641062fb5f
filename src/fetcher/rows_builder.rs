//! Merges baseline and current aggregate results into cube rows

use crate::cube::dimensions::DimensionValues;
use crate::cube::row::Row;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{error, warn};

/// One grouped aggregate returned by a data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    /// Values of the group-by dimensions, aligned with the level's dimension names
    pub dimension_values: Vec<Option<String>>,
    pub value: f64,
}

impl AggregateResult {
    pub fn new<I, S>(dimension_values: I, value: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dimension_values: dimension_values.into_iter().map(|v| Some(v.into())).collect(),
            value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Baseline,
    Current,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Baseline => write!(f, "baseline"),
            Period::Current => write!(f, "current"),
        }
    }
}

/// Joins the baseline and current results of one grouping level by their
/// dimension-value tuple
pub struct RowsBuilder {
    level_dimensions: Vec<String>,
    rows: BTreeMap<Vec<String>, Row>,
    query_limit: Option<usize>,
}

impl RowsBuilder {
    pub fn new(level_dimensions: &[String]) -> Self {
        Self {
            level_dimensions: level_dimensions.to_vec(),
            rows: BTreeMap::new(),
            query_limit: None,
        }
    }

    /// Warn when a result set reaches this many rows, since the source truncated it.
    pub fn with_query_limit(mut self, limit: usize) -> Self {
        self.query_limit = Some(limit);
        self
    }

    pub fn add_baseline_rows(mut self, results: &[AggregateResult]) -> Self {
        self.add_rows(Period::Baseline, results);
        self
    }

    pub fn add_current_rows(mut self, results: &[AggregateResult]) -> Self {
        self.add_rows(Period::Current, results);
        self
    }

    /// Rows sorted by dimension values.
    pub fn build(self) -> Vec<Row> {
        if self.rows.is_empty() {
            warn!(
                "Failed to retrieve non-zero results for dimensions {:?}.",
                self.level_dimensions
            );
        }
        self.rows.into_values().collect()
    }

    fn add_rows(&mut self, period: Period, results: &[AggregateResult]) {
        if results.is_empty() {
            warn!(
                "Got 0 rows for dimensions: {:?} for {} timeframe",
                self.level_dimensions, period
            );
            return;
        }
        if self.query_limit == Some(results.len()) {
            warn!(
                "Got {} rows for dimensions: {:?} for {} timeframe. This corresponds to the query limit; \
                 dimension analysis may not return the best results.",
                results.len(),
                self.level_dimensions,
                period
            );
        }

        for result in results {
            let dimension_values: Vec<String> = self
                .level_dimensions
                .iter()
                .enumerate()
                .map(|(idx, name)| match result.dimension_values.get(idx) {
                    Some(Some(value)) => value.clone(),
                    _ => {
                        error!(
                            "Null value for dimension {} in level {:?}; replacing with \"null\"",
                            name, self.level_dimensions
                        );
                        "null".to_string()
                    }
                })
                .collect();
            self.add_or_update_row(dimension_values, result.value, period);
        }
    }

    fn add_or_update_row(&mut self, dimension_values: Vec<String>, value: f64, period: Period) {
        if value <= 0.0 || value.is_nan() {
            warn!("Value not added: it is too small. Value: {}. Period: {}", value, period);
            return;
        }
        if value.is_infinite() {
            warn!("Value not added: it is infinite. Value: {}. Period: {}", value, period);
            return;
        }

        let row = self
            .rows
            .entry(dimension_values)
            .or_insert_with_key(|key| Row::new(DimensionValues::new(key.iter().cloned()), 0.0, 0.0));
        match period {
            Period::Baseline => {
                row.baseline_value = value;
                row.baseline_size = value;
            }
            Period::Current => {
                row.current_value = value;
                row.current_size = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_merges_baseline_and_current() {
        let rows = RowsBuilder::new(&dims(&["country"]))
            .add_baseline_rows(&[AggregateResult::new(["US"], 10.0), AggregateResult::new(["IN"], 5.0)])
            .add_current_rows(&[AggregateResult::new(["US"], 12.0), AggregateResult::new(["JP"], 3.0)])
            .build();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].dimension_values.as_slice(), &["IN"]);
        assert_eq!((rows[0].baseline_value, rows[0].current_value), (5.0, 0.0));
        assert_eq!(rows[1].dimension_values.as_slice(), &["JP"]);
        assert_eq!((rows[1].baseline_value, rows[1].current_value), (0.0, 3.0));
        assert_eq!(rows[2].dimension_values.as_slice(), &["US"]);
        assert_eq!((rows[2].baseline_size, rows[2].current_size), (10.0, 12.0));
    }

    #[test]
    fn test_skips_non_positive_and_infinite_values() {
        let rows = RowsBuilder::new(&dims(&["country"]))
            .add_baseline_rows(&[
                AggregateResult::new(["US"], 0.0),
                AggregateResult::new(["IN"], -1.0),
                AggregateResult::new(["JP"], f64::INFINITY),
            ])
            .build();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_null_dimension_value_is_replaced() {
        let result = AggregateResult {
            dimension_values: vec![None],
            value: 4.0,
        };
        let rows = RowsBuilder::new(&dims(&["country"]))
            .add_current_rows(&[result])
            .build();
        assert_eq!(rows[0].dimension_values.as_slice(), &["null"]);
    }

    #[test]
    fn test_root_level_has_empty_tuple() {
        let rows = RowsBuilder::new(&[])
            .add_baseline_rows(&[AggregateResult::new(Vec::<String>::new(), 100.0)])
            .add_current_rows(&[AggregateResult::new(Vec::<String>::new(), 150.0)])
            .build();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].dimension_values.is_empty());
        assert_eq!(rows[0].current_value, 150.0);
    }
}
