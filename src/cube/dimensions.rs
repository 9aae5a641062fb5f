//! Dimension names and dimension-value tuples
//!
//! `Dimensions` fixes both the depth of a cube and the schema of each level:
//! level `L` groups by the first `L` names. `DimensionValues` is the tuple a row
//! carries for its level, ordered lexicographically so that a parent always sorts
//! before its children and siblings sharing a prefix are contiguous.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Ordered, deduplicated list of dimension names
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Dimensions {
    names: Vec<String>,
}

impl Dimensions {
    /// Builds a dimension list, keeping the first occurrence of repeated names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let names = names
            .into_iter()
            .map(Into::into)
            .filter(|name: &String| seen.insert(name.clone()))
            .collect();
        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Names of the first `depth` dimensions, i.e. the group-by of level `depth`.
    pub fn names_to_depth(&self, depth: usize) -> &[String] {
        &self.names[..depth.min(self.names.len())]
    }

    /// True when `other` strictly extends this list as a prefix.
    pub fn is_parent_of(&self, other: &Dimensions) -> bool {
        other.names.len() > self.names.len() && other.names.starts_with(&self.names)
    }

    /// Copy of this list with the given names removed, order preserved.
    pub fn without<'a, I>(&self, removed: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let removed: HashSet<&str> = removed.into_iter().collect();
        Self {
            names: self
                .names
                .iter()
                .filter(|name| !removed.contains(name.as_str()))
                .cloned()
                .collect(),
        }
    }
}

impl From<Vec<String>> for Dimensions {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl From<Dimensions> for Vec<String> {
    fn from(dimensions: Dimensions) -> Self {
        dimensions.names
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names.iter().join(", "))
    }
}

/// Values of a row's dimensions, e.g. `["US", "Chrome"]`
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionValues(Vec<String>);

impl DimensionValues {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// First `len` values; the parent lookup key of a row one level down.
    pub fn prefix(&self, len: usize) -> &[String] {
        &self.0[..len.min(self.0.len())]
    }
}

impl fmt::Display for DimensionValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimensions_are_deduplicated_in_order() {
        let dims = Dimensions::new(["country", "browser", "country", "os"]);
        assert_eq!(dims.names(), &["country", "browser", "os"]);
        assert_eq!(dims.len(), 3);
    }

    #[test]
    fn test_names_to_depth_and_parenthood() {
        let dims = Dimensions::new(["continent", "country", "page"]);
        assert_eq!(dims.names_to_depth(0).len(), 0);
        assert_eq!(dims.names_to_depth(2), &["continent", "country"]);
        assert_eq!(dims.names_to_depth(10).len(), 3);

        let parent = Dimensions::new(["continent"]);
        assert!(parent.is_parent_of(&dims));
        assert!(!dims.is_parent_of(&parent));
        assert!(!dims.is_parent_of(&dims));
        assert!(!Dimensions::new(["page"]).is_parent_of(&dims));
    }

    #[test]
    fn test_without_removes_names() {
        let dims = Dimensions::new(["country", "browser", "os"]);
        let shrunk = dims.without(["browser", "missing"]);
        assert_eq!(shrunk.names(), &["country", "os"]);
    }

    #[test]
    fn test_dimension_values_order_parent_first() {
        let mut values = vec![
            DimensionValues::new(["US", "Safari"]),
            DimensionValues::new(["IN"]),
            DimensionValues::new(["US"]),
            DimensionValues::new(["IN", "Chrome"]),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                DimensionValues::new(["IN"]),
                DimensionValues::new(["IN", "Chrome"]),
                DimensionValues::new(["US"]),
                DimensionValues::new(["US", "Safari"]),
            ]
        );
    }

    #[test]
    fn test_dimensions_serde_deduplicates() {
        let dims: Dimensions = serde_json::from_str(r#"["a", "b", "a"]"#).unwrap();
        assert_eq!(dims.names(), &["a", "b"]);
        assert_eq!(serde_json::to_string(&dims).unwrap(), r#"["a","b"]"#);
    }
}
