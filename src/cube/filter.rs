//! Dimension filters on the analyzed slice

use crate::cube::dimensions::Dimensions;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Eq,
    NotEq,
    In,
    NotIn,
}

/// Predicate on one dimension, e.g. `country IN (US, CA)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionFilter {
    pub dimension: String,
    pub operator: FilterOperator,
    pub values: Vec<String>,
}

impl DimensionFilter {
    pub fn eq(dimension: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            operator: FilterOperator::Eq,
            values: vec![value.into()],
        }
    }

    pub fn is_in<I, S>(dimension: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dimension: dimension.into(),
            operator: FilterOperator::In,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in<I, S>(dimension: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            dimension: dimension.into(),
            operator: FilterOperator::NotIn,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether a dimension value passes this filter; a missing value never matches
    /// an inclusive filter.
    pub fn matches(&self, value: Option<&str>) -> bool {
        let listed = value.map_or(false, |v| self.values.iter().any(|allowed| allowed == v));
        match self.operator {
            FilterOperator::Eq | FilterOperator::In => listed,
            FilterOperator::NotEq | FilterOperator::NotIn => !listed,
        }
    }
}

/// Removes dimensions that the filters pin to a single value.
///
/// A dimension is pinned when its `Eq`/`In` filters name exactly one distinct
/// value; grouping by it can only produce one row and explains nothing.
pub fn shrink_dimensions_by_filters(dimensions: &Dimensions, filters: &[DimensionFilter]) -> Dimensions {
    let mut inclusive_values: HashMap<&str, BTreeSet<&str>> = HashMap::new();
    for filter in filters {
        if matches!(filter.operator, FilterOperator::Eq | FilterOperator::In) {
            inclusive_values
                .entry(filter.dimension.as_str())
                .or_default()
                .extend(filter.values.iter().map(String::as_str));
        }
    }

    let pinned = inclusive_values
        .into_iter()
        .filter(|(_, values)| values.len() == 1)
        .map(|(dimension, _)| dimension);
    dimensions.without(pinned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pinned_dimensions_are_removed() {
        let dims = Dimensions::new(["country", "browser", "os", "page"]);
        let filters = vec![
            DimensionFilter::eq("country", "US"),
            DimensionFilter::is_in("browser", ["Chrome", "Safari"]),
            DimensionFilter::not_in("os", ["linux"]),
            DimensionFilter::is_in("page", ["home", "home"]),
        ];

        let shrunk = shrink_dimensions_by_filters(&dims, &filters);
        assert_eq!(shrunk, Dimensions::new(["browser", "os"]));
    }

    #[test]
    fn test_no_filters_keep_dimensions() {
        let dims = Dimensions::new(["country", "browser"]);
        assert_eq!(shrink_dimensions_by_filters(&dims, &[]), dims);
    }

    #[test]
    fn test_filter_matching() {
        assert!(DimensionFilter::eq("country", "US").matches(Some("US")));
        assert!(!DimensionFilter::eq("country", "US").matches(None));
        assert!(DimensionFilter::not_in("country", ["US"]).matches(Some("IN")));
        assert!(DimensionFilter::not_in("country", ["US"]).matches(None));
        assert!(!DimensionFilter::is_in("country", ["US", "IN"]).matches(Some("JP")));
    }
}
