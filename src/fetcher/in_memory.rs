//! In-memory fetcher over flat records
//!
//! Aggregates a list of records the way an OLAP source would answer the cube's
//! group-by queries. Handy for tests, snapshots and offline analysis.

use crate::cube::dimensions::Dimensions;
use crate::cube::filter::DimensionFilter;
use crate::cube::row::Row;
use crate::error::{CubeError, Result};
use crate::fetcher::rows_builder::{AggregateResult, Period, RowsBuilder};
use crate::fetcher::CubeFetcher;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// One fact: dimension values with the metric in both periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub dimensions: BTreeMap<String, String>,
    #[serde(default)]
    pub baseline: f64,
    #[serde(default)]
    pub current: f64,
}

impl Record {
    pub fn new<I, K, V>(dimensions: I, baseline: f64, current: f64) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            dimensions: dimensions
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            baseline,
            current,
        }
    }
}

/// Records plus the filters of the analyzed slice, as stored on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub records: Vec<Record>,
    #[serde(default)]
    pub filters: Vec<DimensionFilter>,
}

impl Snapshot {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

pub struct InMemoryFetcher {
    records: Vec<Record>,
    filters: Vec<DimensionFilter>,
    query_limit: usize,
}

impl InMemoryFetcher {
    pub const DEFAULT_QUERY_LIMIT: usize = 100_000;

    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            filters: Vec::new(),
            query_limit: Self::DEFAULT_QUERY_LIMIT,
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::new(snapshot.records).with_filters(snapshot.filters)
    }

    pub fn with_filters(mut self, filters: Vec<DimensionFilter>) -> Self {
        self.filters = filters;
        self
    }

    pub fn filters(&self) -> &[DimensionFilter] {
        &self.filters
    }

    fn selected(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|record| {
            self.filters.iter().all(|filter| {
                filter.matches(record.dimensions.get(&filter.dimension).map(String::as_str))
            })
        })
    }

    fn total(&self, period: Period) -> Result<f64> {
        let mut selected = self.selected().peekable();
        if selected.peek().is_none() {
            return Err(CubeError::Fetch(format!(
                "No data found in {} timeframe. Cannot perform dimension analysis.",
                period
            )));
        }
        Ok(selected.map(|record| Self::value(record, period)).sum())
    }

    fn value(record: &Record, period: Period) -> f64 {
        match period {
            Period::Baseline => record.baseline,
            Period::Current => record.current,
        }
    }

    /// Group-by over the selected records; missing dimensions group as `None`.
    fn group_by(&self, group_by: &[String], period: Period) -> Vec<AggregateResult> {
        let mut sums: HashMap<Vec<Option<String>>, f64> = HashMap::new();
        for record in self.selected() {
            let key = group_by
                .iter()
                .map(|name| record.dimensions.get(name).cloned())
                .collect();
            *sums.entry(key).or_insert(0.0) += Self::value(record, period);
        }

        let mut results: Vec<AggregateResult> = sums
            .into_iter()
            .map(|(dimension_values, value)| AggregateResult {
                dimension_values,
                value,
            })
            .collect();
        results.sort_by(|a, b| b.value.total_cmp(&a.value));
        results.truncate(self.query_limit);
        results
    }

    fn rows(&self, group_by: &[String]) -> Vec<Row> {
        RowsBuilder::new(group_by)
            .with_query_limit(self.query_limit)
            .add_baseline_rows(&self.group_by(group_by, Period::Baseline))
            .add_current_rows(&self.group_by(group_by, Period::Current))
            .build()
    }
}

impl CubeFetcher for InMemoryFetcher {
    fn baseline_total(&self) -> Result<f64> {
        self.total(Period::Baseline)
    }

    fn current_total(&self) -> Result<f64> {
        self.total(Period::Current)
    }

    fn aggregated_values_of_dimension(&self, dimensions: &Dimensions) -> Result<Vec<Vec<Row>>> {
        Ok(dimensions
            .names()
            .iter()
            .map(|name| self.rows(std::slice::from_ref(name)))
            .collect())
    }

    fn aggregated_values_of_levels(&self, dimensions: &Dimensions) -> Result<Vec<Vec<Row>>> {
        Ok((0..=dimensions.len())
            .map(|level| self.rows(dimensions.names_to_depth(level)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<Record> {
        vec![
            Record::new([("country", "US"), ("browser", "Chrome")], 30.0, 50.0),
            Record::new([("country", "US"), ("browser", "Safari")], 30.0, 40.0),
            Record::new([("country", "IN"), ("browser", "Chrome")], 40.0, 60.0),
        ]
    }

    #[test]
    fn test_totals() {
        let fetcher = InMemoryFetcher::new(records());
        assert_eq!(fetcher.baseline_total().unwrap(), 100.0);
        assert_eq!(fetcher.current_total().unwrap(), 150.0);
    }

    #[test]
    fn test_totals_fail_without_data() {
        let fetcher = InMemoryFetcher::new(records())
            .with_filters(vec![DimensionFilter::eq("country", "JP")]);
        assert!(matches!(fetcher.baseline_total(), Err(CubeError::Fetch(_))));
    }

    #[test]
    fn test_values_of_dimension() {
        let fetcher = InMemoryFetcher::new(records());
        let rows = fetcher
            .aggregated_values_of_dimension(&Dimensions::new(["country", "browser"]))
            .unwrap();

        assert_eq!(rows.len(), 2);
        let country: Vec<_> = rows[0]
            .iter()
            .map(|r| (r.dimension_values.get(0).unwrap(), r.baseline_value, r.current_value))
            .collect();
        assert_eq!(country, vec![("IN", 40.0, 60.0), ("US", 60.0, 90.0)]);
        assert_eq!(rows[1].len(), 2);
    }

    #[test]
    fn test_values_of_levels() {
        let fetcher = InMemoryFetcher::new(records());
        let levels = fetcher
            .aggregated_values_of_levels(&Dimensions::new(["country", "browser"]))
            .unwrap();

        assert_eq!(levels.len(), 3);
        assert_eq!(levels[0].len(), 1);
        assert_eq!(levels[0][0].baseline_value, 100.0);
        assert_eq!(levels[1].len(), 2);
        assert_eq!(levels[2].len(), 3);
        assert!(levels[2].iter().all(|r| r.dimension_values.len() == 2));
    }

    #[test]
    fn test_filters_restrict_records() {
        let fetcher = InMemoryFetcher::new(records())
            .with_filters(vec![DimensionFilter::eq("browser", "Chrome")]);
        assert_eq!(fetcher.baseline_total().unwrap(), 70.0);
        assert_eq!(fetcher.current_total().unwrap(), 110.0);
    }

    #[test]
    fn test_snapshot_from_json() {
        let json = r#"{
            "records": [
                {"dimensions": {"country": "US"}, "baseline": 1.0, "current": 2.0}
            ],
            "filters": [
                {"dimension": "country", "operator": "eq", "values": ["US"]}
            ]
        }"#;
        let snapshot: Snapshot = serde_json::from_str(json).unwrap();
        let fetcher = InMemoryFetcher::from_snapshot(snapshot);
        assert_eq!(fetcher.filters().len(), 1);
        assert_eq!(fetcher.current_total().unwrap(), 2.0);
    }
}
