//! Hierarchy-aware dimension ordering
//!
//! Dimensions are ordered by cost, except that members of a declared hierarchy
//! (e.g. continent -> country -> postcode) stay adjacent and in declared order.
//! A hierarchy competes for its position with the mean cost of its members.

use crate::cube::cost::DimensionCost;
use crate::cube::dimensions::Dimensions;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Dimensions that must stay adjacent, with the mean cost of its members
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalDimensionGroup {
    pub dimension_names: Vec<String>,
    pub cost: f64,
}

pub struct DimensionOrderer;

impl DimensionOrderer {
    /// Final dimension order from costs sorted descending.
    ///
    /// Only the top `max(1, depth)` dimensions are kept.
    pub fn sort_dimensions(
        sorted_dimension_costs: &[DimensionCost],
        depth: usize,
        suggested_hierarchies: &[Vec<String>],
    ) -> Dimensions {
        let groups = Self::hierarchical_groups(sorted_dimension_costs, depth, suggested_hierarchies);
        Dimensions::new(groups.into_iter().flat_map(|group| group.dimension_names))
    }

    /// Groups of the trimmed dimensions, sorted by group cost, descending.
    pub fn hierarchical_groups(
        sorted_dimension_costs: &[DimensionCost],
        depth: usize,
        suggested_hierarchies: &[Vec<String>],
    ) -> Vec<HierarchicalDimensionGroup> {
        let keep = sorted_dimension_costs.len().min(depth.max(1));
        let trimmed = &sorted_dimension_costs[..keep];

        let mut groups = Self::initial_groups(trimmed, suggested_hierarchies);

        let cost_of: HashMap<&str, f64> = trimmed
            .iter()
            .map(|dimension_cost| (dimension_cost.name.as_str(), dimension_cost.cost))
            .collect();
        for group in &mut groups {
            let sum: f64 = group
                .dimension_names
                .iter()
                .filter_map(|name| cost_of.get(name.as_str()))
                .sum();
            group.cost = sum / group.dimension_names.len() as f64;
        }

        groups.sort_by(|a, b| b.cost.total_cmp(&a.cost));
        groups
    }

    /// Declared hierarchies restricted to the trimmed dimensions, then one
    /// singleton group per dimension no hierarchy claimed.
    ///
    /// Example: trimmed `[country, continent, page]` with hierarchies
    /// `[[continent, country, postcode], [pageGroup, page]]` gives
    /// `[[continent, country], [page]]`.
    fn initial_groups(
        trimmed: &[DimensionCost],
        suggested_hierarchies: &[Vec<String>],
    ) -> Vec<HierarchicalDimensionGroup> {
        let mut available: HashSet<&str> = trimmed.iter().map(|d| d.name.as_str()).collect();
        let mut groups = Vec::new();

        for hierarchy in suggested_hierarchies {
            if hierarchy.len() < 2 {
                continue;
            }
            let sanitized: Vec<String> = hierarchy
                .iter()
                .filter(|name| available.remove(name.as_str()))
                .cloned()
                .collect();
            if sanitized.is_empty() {
                continue;
            }
            groups.push(HierarchicalDimensionGroup {
                dimension_names: sanitized,
                cost: 0.0,
            });
        }

        for dimension_cost in trimmed {
            if available.contains(dimension_cost.name.as_str()) {
                groups.push(HierarchicalDimensionGroup {
                    dimension_names: vec![dimension_cost.name.clone()],
                    cost: 0.0,
                });
            }
        }

        groups
    }
}
