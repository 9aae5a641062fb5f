//! Diff summary
//!
//! Picks the nodes of a built cube that best explain the overall change. A
//! bottom-up dynamic program runs over the cube tree: every internal node merges
//! the best answers of its children, and a picked node's aggregates are extracted
//! from its ancestors so that each ancestor only speaks for the rest of its
//! subtree. The picked nodes are then arranged as a tree of response rows.
//!
//! The pass works on a copy of the cube's node arena; the cube stays untouched.

use crate::cube::{CostFunction, CostInput, Cube, CubeNode, DimensionCost, NodeId, NodeValues, Totals};
use crate::error::{CubeError, Result};
use crate::report::{
    contribution_change, contribution_to_overall_change, percentage_change, round_up,
    GainerLoserReport,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info, warn};

/// Name of a level the row aggregates entirely
pub const ALL: &str = "(ALL)";
/// Name of a level the row aggregates except for the rows listed below it
pub const NOT_ALL: &str = "(ALL)-";

const MAX_OTHER_DIMENSION_VALUES: usize = 10;

type Answer = BTreeSet<NodeId>;

/// One row of the summary: a picked node, named per level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponseRow {
    /// One name per summary level: a dimension value, `(ALL)`, `(ALL)-` or empty
    pub names: Vec<String>,
    /// Children not picked, when the row is `(ALL)-` at some level
    pub other_dimension_values: String,
    pub baseline_value: f64,
    pub current_value: f64,
    pub percentage_change: Option<f64>,
    pub size_factor: f64,
    pub contribution_change: Option<f64>,
    pub contribution_to_overall_change: Option<f64>,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub baseline_total: f64,
    pub current_total: f64,
    pub baseline_total_size: f64,
    pub current_total_size: f64,
    pub global_ratio: Option<f64>,
    /// Dimension names of the summary levels
    pub dimensions: Vec<String>,
    pub response_rows: Vec<SummaryResponseRow>,
    #[serde(flatten)]
    pub gainer_loser: GainerLoserReport,
    pub dimension_costs: Vec<DimensionCost>,
}

/// Summarizes a built cube
pub struct Summary<'c> {
    cube: &'c Cube<'c>,
    cost_function: &'c dyn CostFunction,
    max_gainer_loser_count: usize,
}

impl<'c> Summary<'c> {
    pub fn new(cube: &'c Cube<'c>, cost_function: &'c dyn CostFunction) -> Self {
        Self {
            cube,
            cost_function,
            max_gainer_loser_count: 5,
        }
    }

    pub fn with_max_gainer_loser_count(mut self, count: usize) -> Self {
        self.max_gainer_loser_count = count;
        self
    }

    /// Picks up to `answer_size` nodes below the root over the top `level_count`
    /// levels (0 or more than the cube's depth means all levels).
    ///
    /// With `one_side_error`, a node changing against the overall direction is
    /// only picked under a picked ancestor that follows it.
    pub fn compute_summary(
        &self,
        answer_size: usize,
        one_side_error: bool,
        level_count: usize,
    ) -> Result<SummaryResponse> {
        if answer_size < 1 {
            return Err(CubeError::InvalidArgument(format!(
                "answerSize is {}. Answer size must be >= 1",
                answer_size
            )));
        }
        let dimensions = self.cube.dimensions().ok_or_else(|| {
            CubeError::InvalidArgument("Cube must be built before it is summarized.".to_string())
        })?;
        if self.cube.root().is_none() {
            return Err(CubeError::InvalidArgument(
                "Cube has no root node to summarize.".to_string(),
            ));
        }

        let max_level_count = dimensions.len();
        let level_count = if level_count == 0 || level_count > max_level_count {
            max_level_count
        } else {
            level_count
        };

        let mut pass = SummaryPass::new(self.cube, self.cost_function, level_count, one_side_error);
        let answer = pass.run(answer_size)?;
        info!(
            "Summary picked {} nodes (answer size {}, levels {}, one side error {})",
            answer.len(),
            answer_size,
            level_count,
            one_side_error
        );

        let target_level_count = answer
            .iter()
            .map(|id| id.level)
            .max()
            .unwrap_or(0)
            .min(level_count);
        let ordered = pass.sort_response_tree(&answer)?;
        let response_rows = pass.response_rows(&ordered, target_level_count);

        let mismatches = pass.verify_node_values(&answer);
        if mismatches > 0 {
            warn!("{} picked nodes do not add back to their original values", mismatches);
        }

        let totals = self.cube.totals();
        Ok(SummaryResponse {
            baseline_total: totals.baseline_value,
            current_total: totals.current_value,
            baseline_total_size: totals.baseline_size,
            current_total_size: totals.current_size,
            global_ratio: (totals.baseline_value != 0.0)
                .then(|| round_up(totals.current_value / totals.baseline_value)),
            dimensions: dimensions.names_to_depth(target_level_count).to_vec(),
            response_rows,
            gainer_loser: GainerLoserReport::from_cube(self.cube, self.max_gainer_loser_count),
            dimension_costs: self.cube.sorted_dimension_costs().to_vec(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowInserter {
    Basic,
    /// Accepts a node on the `side` of the overall change, or under a picked
    /// ancestor on that side.
    OneSide { side: bool },
}

#[derive(Debug, Clone, Default)]
struct DpSlot {
    cost: f64,
    answer: Answer,
}

/// `slots[n]` holds the cheapest answer picking at most `n` nodes; its cost is
/// the cost left unexplained by the picks.
#[derive(Debug, Clone)]
struct DpArray {
    target_ratio: f64,
    slots: Vec<DpSlot>,
    shrink_size: usize,
}

impl DpArray {
    fn new(answer_size: usize) -> Self {
        let size = answer_size + 1;
        Self {
            target_ratio: 0.0,
            slots: vec![DpSlot::default(); size],
            shrink_size: size,
        }
    }

    fn size(&self) -> usize {
        self.shrink_size
    }

    fn set_shrink_size(&mut self, size: usize) {
        if size > 0 && size <= self.slots.len() {
            self.shrink_size = size;
        }
    }

    fn answer(&self) -> &Answer {
        &self.slots[self.shrink_size - 1].answer
    }

    fn answer_mut(&mut self) -> &mut Answer {
        &mut self.slots[self.shrink_size - 1].answer
    }

    fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.cost = 0.0;
            slot.answer.clear();
        }
    }

    fn full_reset(&mut self) {
        self.reset();
        self.target_ratio = 0.0;
        self.shrink_size = self.slots.len();
    }

    /// Either picks `id` or charges its cost, whichever leaves less unexplained.
    fn insert(&mut self, id: NodeId, cost: f64) {
        for n in (1..self.size()).rev() {
            let picked = self.slots[n - 1].cost;
            let skipped = self.slots[n].cost + cost;
            if picked.total_cmp(&skipped).is_lt() {
                let mut answer = self.slots[n - 1].answer.clone();
                answer.insert(id);
                self.slots[n].cost = picked;
                self.slots[n].answer = answer;
            } else {
                self.slots[n].cost = skipped;
            }
        }
        self.slots[0].cost += cost;
    }
}

/// Working state of one summary computation
struct SummaryPass<'c> {
    nodes: Vec<Vec<CubeNode>>,
    cost_function: &'c dyn CostFunction,
    globals: Totals,
    level_count: usize,
    one_side_inserter: RowInserter,
    leaf_inserter: RowInserter,
}

impl<'c> SummaryPass<'c> {
    fn new(cube: &Cube<'_>, cost_function: &'c dyn CostFunction, level_count: usize, one_side_error: bool) -> Self {
        let mut pass = Self {
            nodes: cube.hierarchical_nodes().to_vec(),
            cost_function,
            globals: cube.totals(),
            level_count,
            one_side_inserter: RowInserter::Basic,
            leaf_inserter: RowInserter::Basic,
        };
        if one_side_error {
            let side = pass.bootstrap_ratio(NodeId::ROOT) >= 1.0;
            pass.one_side_inserter = RowInserter::OneSide { side };
            // with a single level the other side is only reachable through leaves
            if level_count == 1 {
                pass.leaf_inserter = pass.one_side_inserter;
            }
        }
        pass
    }

    fn node(&self, id: NodeId) -> &CubeNode {
        &self.nodes[id.level][id.index]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut CubeNode {
        &mut self.nodes[id.level][id.index]
    }

    fn bootstrap_ratio(&self, id: NodeId) -> f64 {
        let node = self.node(id);
        node.safe_change_ratio(|| node.parent().map(|parent| self.bootstrap_ratio(parent)))
    }

    /// Ids ordered by dimension values: parents before their children.
    fn sorted_by_values<I>(&self, ids: I) -> Vec<NodeId>
    where
        I: IntoIterator<Item = NodeId>,
    {
        let mut ids: Vec<NodeId> = ids.into_iter().collect();
        ids.sort_by(|a, b| self.node(*a).dimension_values().cmp(self.node(*b).dimension_values()));
        ids
    }

    /// Closest ancestor of `id` in `targets`, searching up to but excluding `ceiling`.
    fn find_ancestor(&self, id: NodeId, ceiling: Option<NodeId>, targets: &Answer) -> Option<NodeId> {
        let mut current = self.node(id).parent();
        while let Some(ancestor) = current {
            if Some(ancestor) == ceiling {
                return None;
            }
            if targets.contains(&ancestor) {
                return Some(ancestor);
            }
            current = self.node(ancestor).parent();
        }
        None
    }

    fn cost_of(&self, id: NodeId, target_ratio: f64) -> Result<f64> {
        let node = self.node(id);
        self.cost_function.compute_cost(&CostInput {
            top_ratio: target_ratio,
            baseline_value: node.baseline_value(),
            current_value: node.current_value(),
            baseline_size: node.baseline_size(),
            current_size: node.current_size(),
            top_baseline_value: self.globals.baseline_value,
            top_current_value: self.globals.current_value,
            top_baseline_size: self.globals.baseline_size,
            top_current_size: self.globals.current_size,
        })
    }

    fn insert_row(&self, inserter: RowInserter, dp: &mut DpArray, id: NodeId, target_ratio: f64) -> Result<()> {
        let accepted = match inserter {
            RowInserter::Basic => true,
            RowInserter::OneSide { side } => {
                side == self.node(id).side()
                    || self
                        .find_ancestor(id, None, dp.answer())
                        .map_or(false, |ancestor| self.node(ancestor).side() == side)
            }
        };
        if accepted {
            let cost = self.cost_of(id, target_ratio)?;
            dp.insert(id, cost);
        }
        Ok(())
    }

    /// A node whose parent is already picked is scored against the parent's ratio.
    fn insert_with_adaptive_ratio(
        &self,
        fallback: RowInserter,
        dp: &mut DpArray,
        id: NodeId,
        target_ratio: f64,
    ) -> Result<()> {
        match self.node(id).parent() {
            Some(parent) if dp.answer().contains(&parent) => {
                let ratio = self.bootstrap_ratio(parent);
                self.insert_row(RowInserter::Basic, dp, id, ratio)
            }
            _ => self.insert_row(fallback, dp, id, target_ratio),
        }
    }

    /// Recomputes a node's aggregates with every other picked node extracted.
    fn update_values(&mut self, id: NodeId, answer: &Answer) {
        let extracted: Vec<NodeValues> = answer
            .iter()
            .filter(|&&other| other != id)
            .map(|&other| self.node(other).values())
            .collect();
        let node = self.node_mut(id);
        node.reset_values();
        for values in extracted {
            node.remove_node_values(values);
        }
    }

    /// Gives the aggregates of nodes dropped from the answer back to their closest
    /// picked ancestor below `ceiling`.
    fn restore_removed(&mut self, ceiling: Option<NodeId>, answer: &Answer, removed: &Answer) {
        for id in self.sorted_by_values(removed.iter().copied()) {
            if let Some(ancestor) = self.find_ancestor(id, ceiling, answer) {
                let values = self.node(id).values();
                self.node_mut(ancestor).add_node_values(values);
            }
        }
    }

    fn run(&mut self, answer_size: usize) -> Result<Vec<NodeId>> {
        let mut dp_arrays: Vec<DpArray> = (0..self.level_count).map(|_| DpArray::new(answer_size)).collect();
        self.compute_child_dp_array(NodeId::ROOT, &mut dp_arrays)?;
        Ok(dp_arrays[0].answer().iter().copied().collect())
    }

    /// Fills `dp_arrays[level of id]` with the best answer of the subtree of `id`.
    fn compute_child_dp_array(&mut self, id: NodeId, dp_arrays: &mut [DpArray]) -> Result<()> {
        let level = id.level;
        let parent = self.node(id).parent();
        let children = self.node(id).children().to_vec();

        dp_arrays[level].full_reset();
        dp_arrays[level].target_ratio = self.bootstrap_ratio(id);

        if level + 1 == self.level_count {
            for child in children {
                let ratio = self.bootstrap_ratio(id);
                self.insert_row(self.leaf_inserter, &mut dp_arrays[level], child, ratio)?;
                let answer = dp_arrays[level].answer().clone();
                self.update_values(id, &answer);
                dp_arrays[level].target_ratio = self.bootstrap_ratio(id);
            }
        } else {
            for child in children {
                self.compute_child_dp_array(child, dp_arrays)?;
                let (upper, lower) = dp_arrays.split_at_mut(level + 1);
                self.merge_dp_array(id, &mut upper[level], &lower[0])?;
                let answer = dp_arrays[level].answer().clone();
                self.update_values(id, &answer);
                dp_arrays[level].target_ratio = self.bootstrap_ratio(id);
            }
        }

        let Some(parent) = parent else {
            dp_arrays[level].answer_mut().insert(id);
            return Ok(());
        };

        // cost of the node itself as an aggregated row
        let dp = &mut dp_arrays[level];
        let answer = dp.answer().clone();
        self.update_values(parent, &answer);
        let target_ratio = self.bootstrap_ratio(parent);
        self.recompute_cost_and_remove_small_nodes(id, dp, target_ratio)?;
        dp.target_ratio = target_ratio;

        if !self.node(id).is_thinned_out() {
            // the answer holds size - 1 nodes; make room for the node itself
            if dp.size() == 1 {
                dp.set_shrink_size(2);
            }
            let before = dp.answer().clone();
            self.insert_row(RowInserter::Basic, dp, id, target_ratio)?;
            let after = dp.answer().clone();
            let removed: Answer = before.difference(&after).copied().collect();
            if !removed.is_empty() {
                self.restore_removed(Some(id), &after, &removed);
                self.update_values(id, &after);
            }
        }
        Ok(())
    }

    /// Merges the child answer into the parent's; nodes dropped by the merge give
    /// their aggregates back.
    fn merge_dp_array(&mut self, parent: NodeId, parent_array: &mut DpArray, child_array: &DpArray) -> Result<()> {
        let mut removed: Answer = parent_array.answer().union(child_array.answer()).copied().collect();
        let target_ratio = (parent_array.target_ratio + child_array.target_ratio) / 2.0;

        self.recompute_cost_and_remove_small_nodes(parent, parent_array, target_ratio)?;
        for child in self.sorted_by_values(child_array.answer().iter().copied()) {
            self.insert_with_adaptive_ratio(self.one_side_inserter, parent_array, child, target_ratio)?;
        }

        removed.retain(|id| !parent_array.answer().contains(id));
        let answer = parent_array.answer().clone();
        self.restore_removed(Some(parent), &answer, &removed);
        Ok(())
    }

    /// Re-scores the current answer against `target_ratio`, dropping nodes that no
    /// longer pay off.
    fn recompute_cost_and_remove_small_nodes(
        &mut self,
        parent: NodeId,
        dp: &mut DpArray,
        target_ratio: f64,
    ) -> Result<()> {
        let before = dp.answer().clone();
        let ordered = self.sorted_by_values(before.iter().copied());
        dp.reset();
        for id in ordered {
            self.insert_with_adaptive_ratio(RowInserter::Basic, dp, id, target_ratio)?;
        }

        let removed: Answer = before.difference(dp.answer()).copied().collect();
        if !removed.is_empty() {
            let mut answer = dp.answer().clone();
            answer.insert(parent);
            let ceiling = self.node(parent).parent();
            self.restore_removed(ceiling, &answer, &removed);
        }
        Ok(())
    }

    /// Orders the picked nodes depth-first, each under its closest picked ancestor,
    /// siblings by the cost of their response subtree (highest first).
    fn sort_response_tree(&mut self, answer: &[NodeId]) -> Result<Vec<NodeId>> {
        let Some(&first) = answer.first() else {
            return Ok(Vec::new());
        };
        let top = answer.iter().copied().find(|id| id.level == 0).unwrap_or(first);
        let selected: Answer = answer.iter().copied().collect();

        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut tops = Vec::new();
        for id in self.sorted_by_values(answer.iter().copied()) {
            match self.find_ancestor(id, None, &selected) {
                Some(ancestor) => children.entry(ancestor).or_default().push(id),
                None => tops.push(id),
            }
        }

        for &id in &tops {
            self.sort_response_children(id, &mut children, top)?;
        }

        let mut ordered = Vec::with_capacity(answer.len());
        for id in tops {
            flatten(id, &children, &mut ordered);
        }
        Ok(ordered)
    }

    fn sort_response_children(
        &mut self,
        id: NodeId,
        children: &mut HashMap<NodeId, Vec<NodeId>>,
        top: NodeId,
    ) -> Result<()> {
        let kids = children.get(&id).cloned().unwrap_or_default();
        if kids.is_empty() {
            return Ok(());
        }
        for &kid in &kids {
            self.sort_response_children(kid, children, top)?;
        }

        let ratio = self.node(id).change_ratio();
        let mut scored = Vec::with_capacity(kids.len());
        for kid in kids {
            let cost = self.assign_subtree_cost(kid, ratio, children, top)?;
            scored.push((kid, cost));
        }
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        children.insert(id, scored.into_iter().map(|(kid, _)| kid).collect());
        Ok(())
    }

    /// Scores `id` and its response descendants against `ratio`; returns the sum.
    fn assign_subtree_cost(
        &mut self,
        id: NodeId,
        ratio: f64,
        children: &HashMap<NodeId, Vec<NodeId>>,
        top: NodeId,
    ) -> Result<f64> {
        let top_node = self.node(top);
        let node = self.node(id);
        let cost = self.cost_function.compute_cost(&CostInput {
            top_ratio: ratio,
            baseline_value: node.baseline_value(),
            current_value: node.current_value(),
            baseline_size: node.baseline_size(),
            current_size: node.current_size(),
            top_baseline_value: top_node.original_baseline_value(),
            top_current_value: top_node.original_current_value(),
            top_baseline_size: top_node.original_baseline_size(),
            top_current_size: top_node.original_current_size(),
        })?;
        self.node_mut(id).set_cost(cost);

        let mut subtree_cost = cost;
        for &kid in children.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
            subtree_cost += self.assign_subtree_cost(kid, ratio, children, top)?;
        }
        Ok(subtree_cost)
    }

    /// Rows in response order. Precondition: ancestors precede descendants.
    fn response_rows(&self, ordered: &[NodeId], target_level_count: usize) -> Vec<SummaryResponseRow> {
        let selected: Answer = ordered.iter().copied().collect();
        let mut names: HashMap<NodeId, Vec<String>> = HashMap::new();
        let mut others: HashMap<NodeId, Vec<String>> = HashMap::new();

        for &id in ordered {
            let node = self.node(id);
            let mut tag = vec![ALL.to_string(); target_level_count];
            for (name, value) in tag.iter_mut().zip(node.dimension_values().as_slice()) {
                *name = value.clone();
            }
            names.insert(id, tag);

            // shown when the row becomes (ALL)-; picked children remove themselves
            let mut child_names: Vec<String> = Vec::new();
            for &child in node.children() {
                if let Some(value) = self.node(child).dimension_values().get(node.level()) {
                    if !value.trim().is_empty() && !child_names.iter().any(|n| n == value) {
                        child_names.push(value.to_string());
                    }
                }
            }
            others.insert(id, child_names);
        }

        for &id in ordered {
            let Some(ancestor) = self.find_ancestor(id, None, &selected) else {
                continue;
            };
            let not_all_level = ancestor.level;
            if let Some(tag) = names.get_mut(&ancestor) {
                if let Some(name) = tag.get_mut(not_all_level) {
                    *name = NOT_ALL.to_string();
                }
                for name in tag.iter_mut().skip(not_all_level + 1) {
                    name.clear();
                }
            }
            if let (Some(value), Some(other)) = (
                self.node(id).dimension_values().get(not_all_level),
                others.get_mut(&ancestor),
            ) {
                other.retain(|name| name != value);
            }
        }

        let total_size = self.globals.baseline_size + self.globals.current_size;
        ordered
            .iter()
            .map(|&id| {
                let node = self.node(id);
                let (baseline, current) = (node.baseline_value(), node.current_value());
                let other = others.remove(&id).unwrap_or_default();
                let mut other_dimension_values = other.iter().take(MAX_OTHER_DIMENSION_VALUES).join(", ");
                if other.len() > MAX_OTHER_DIMENSION_VALUES {
                    other_dimension_values.push_str(", and more...");
                }
                debug!("Summary row {}: cost {}", node.dimension_values(), node.cost());

                SummaryResponseRow {
                    names: names.remove(&id).unwrap_or_default(),
                    other_dimension_values,
                    baseline_value: baseline,
                    current_value: current,
                    percentage_change: percentage_change(baseline, current),
                    size_factor: (node.baseline_size() + node.current_size()) / total_size,
                    contribution_change: contribution_change(
                        baseline,
                        current,
                        self.globals.baseline_value,
                        self.globals.current_value,
                    ),
                    contribution_to_overall_change: contribution_to_overall_change(
                        baseline,
                        current,
                        self.globals.baseline_value,
                        self.globals.current_value,
                    ),
                    cost: round_up(node.cost()),
                }
            })
            .collect()
    }

    /// Adds every picked node back to its closest picked ancestor and counts the
    /// nodes that do not end up at their original aggregates. Consumes the
    /// adjusted values.
    fn verify_node_values(&mut self, answer: &[NodeId]) -> usize {
        let selected: Answer = answer.iter().copied().collect();
        let mut deepest_first = answer.to_vec();
        deepest_first.sort_by(|a, b| b.level.cmp(&a.level));

        for &id in &deepest_first {
            if let Some(ancestor) = self.find_ancestor(id, None, &selected) {
                let values = self.node(id).values();
                self.node_mut(ancestor).add_node_values(values);
            }
        }

        let close = |a: f64, b: f64| (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0);
        deepest_first
            .iter()
            .filter(|&&id| {
                let node = self.node(id);
                let restored = close(node.baseline_value(), node.original_baseline_value())
                    && close(node.current_value(), node.original_current_value());
                if !restored {
                    warn!(
                        "Wrong values at node {}: expected {},{} actual {},{}",
                        node.dimension_values(),
                        node.original_baseline_value(),
                        node.original_current_value(),
                        node.baseline_value(),
                        node.current_value()
                    );
                }
                !restored
            })
            .count()
    }
}

fn flatten(id: NodeId, children: &HashMap<NodeId, Vec<NodeId>>, ordered: &mut Vec<NodeId>) {
    ordered.push(id);
    for &kid in children.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
        flatten(kid, children, ordered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cube::{DimensionValues, Dimensions, Row};
    use crate::fetcher::CubeFetcher;

    /// Serves the same rows for the one-dimension pass and the levels
    struct LevelFetcher {
        levels: Vec<Vec<Row>>,
    }

    impl CubeFetcher for LevelFetcher {
        fn baseline_total(&self) -> Result<f64> {
            Ok(self.levels[0][0].baseline_value)
        }

        fn current_total(&self) -> Result<f64> {
            Ok(self.levels[0][0].current_value)
        }

        fn aggregated_values_of_dimension(&self, dimensions: &Dimensions) -> Result<Vec<Vec<Row>>> {
            Ok(self.levels[1..=dimensions.len()].to_vec())
        }

        fn aggregated_values_of_levels(&self, dimensions: &Dimensions) -> Result<Vec<Vec<Row>>> {
            Ok(self.levels[..=dimensions.len()].to_vec())
        }
    }

    fn row(values: &[&str], baseline: f64, current: f64) -> Row {
        Row::new(DimensionValues::new(values.iter().copied()), baseline, current)
    }

    fn deviation(input: &CostInput) -> f64 {
        (input.current_size - input.baseline_size * input.top_ratio).abs()
    }

    /// US grew, IN shrank, JP grew: 100 -> 150 overall
    fn country_fetcher() -> LevelFetcher {
        LevelFetcher {
            levels: vec![
                vec![row(&[], 100.0, 150.0)],
                vec![
                    row(&["IN"], 30.0, 20.0),
                    row(&["JP"], 20.0, 30.0),
                    row(&["US"], 50.0, 100.0),
                ],
            ],
        }
    }

    fn built(fetcher: &LevelFetcher) -> Cube<'_> {
        let mut cube = Cube::new(fetcher, &deviation);
        cube.build_with_manual_dimension_order(&Dimensions::new(["country"]))
            .unwrap();
        cube
    }

    fn row_names(response: &SummaryResponse) -> Vec<Vec<&str>> {
        response
            .response_rows
            .iter()
            .map(|row| row.names.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_dp_array_keeps_cheapest_answer() {
        let mut dp = DpArray::new(1);
        dp.insert(NodeId::new(1, 0), 5.0);
        dp.insert(NodeId::new(1, 1), 2.0);
        assert_eq!(dp.answer(), &BTreeSet::from([NodeId::new(1, 0)]));
        assert_eq!(dp.slots[1].cost, 2.0);
        assert_eq!(dp.slots[0].cost, 7.0);

        dp.full_reset();
        assert!(dp.answer().is_empty());
    }

    #[test]
    fn test_top_one_node() {
        let fetcher = country_fetcher();
        let cube = built(&fetcher);
        let response = Summary::new(&cube, &deviation).compute_summary(1, false, 0).unwrap();

        assert_eq!(response.dimensions, vec!["country"]);
        assert_eq!(row_names(&response), vec![vec![NOT_ALL], vec!["US"]]);

        let root = &response.response_rows[0];
        assert_eq!(root.other_dimension_values, "IN, JP");
        // the root only speaks for what US leaves over
        assert_eq!((root.baseline_value, root.current_value), (50.0, 50.0));

        let us = &response.response_rows[1];
        assert_eq!((us.baseline_value, us.current_value), (50.0, 100.0));
        assert_eq!(us.percentage_change, Some(100.0));
        assert_eq!(us.contribution_to_overall_change, Some(100.0));
        assert_eq!(response.global_ratio, Some(1.5));
    }

    #[test]
    fn test_top_two_nodes() {
        let fetcher = country_fetcher();
        let cube = built(&fetcher);
        let response = Summary::new(&cube, &deviation).compute_summary(2, false, 0).unwrap();

        let names = row_names(&response);
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], vec![NOT_ALL]);
        assert!(names.contains(&vec!["US"]));
        assert!(names.contains(&vec!["IN"]));
        assert_eq!(response.response_rows[0].other_dimension_values, "JP");
        assert_eq!(
            (response.response_rows[0].baseline_value, response.response_rows[0].current_value),
            (20.0, 30.0)
        );
    }

    #[test]
    fn test_one_side_error_skips_losers() {
        let fetcher = country_fetcher();
        let cube = built(&fetcher);
        let response = Summary::new(&cube, &deviation).compute_summary(2, true, 0).unwrap();

        let names = row_names(&response);
        assert_eq!(names.len(), 3);
        assert!(names.contains(&vec!["US"]));
        assert!(names.contains(&vec!["JP"]));
        assert!(!names.contains(&vec!["IN"]));
    }

    #[test]
    fn test_cube_is_left_untouched() {
        let fetcher = country_fetcher();
        let cube = built(&fetcher);
        Summary::new(&cube, &deviation).compute_summary(2, false, 0).unwrap();

        let root = cube.root().unwrap();
        assert_eq!((root.baseline_value(), root.current_value()), (100.0, 150.0));
    }

    #[test]
    fn test_picked_values_add_back() {
        let fetcher = country_fetcher();
        let cube = built(&fetcher);
        let mut pass = SummaryPass::new(&cube, &deviation, 1, false);
        let answer = pass.run(2).unwrap();
        assert_eq!(pass.verify_node_values(&answer), 0);
    }

    #[test]
    fn test_two_levels_name_not_all_rows() {
        let fetcher = LevelFetcher {
            levels: vec![
                vec![row(&[], 100.0, 200.0)],
                vec![row(&["IN"], 40.0, 40.0), row(&["US"], 60.0, 160.0)],
                vec![
                    row(&["IN", "p1"], 40.0, 40.0),
                    row(&["US", "p1"], 10.0, 10.0),
                    row(&["US", "p2"], 50.0, 150.0),
                ],
            ],
        };
        let mut cube = Cube::new(&fetcher, &deviation);
        cube.build_with_manual_dimension_order(&Dimensions::new(["country", "page"]))
            .unwrap();

        let response = Summary::new(&cube, &deviation).compute_summary(3, false, 2).unwrap();
        assert_eq!(response.dimensions, vec!["country", "page"]);

        let names = row_names(&response);
        assert_eq!(names[0].len(), 2);
        assert!(names.iter().all(|n| n.len() == 2));
        assert!(names.contains(&vec!["US", "p2"]));
        assert!(response.response_rows.len() <= 4);
    }

    #[test]
    fn test_rejects_empty_answer_and_unbuilt_cube() {
        let fetcher = country_fetcher();
        let cube = built(&fetcher);
        assert!(matches!(
            Summary::new(&cube, &deviation).compute_summary(0, false, 0),
            Err(CubeError::InvalidArgument(_))
        ));

        let unbuilt = Cube::new(&fetcher, &deviation);
        assert!(matches!(
            Summary::new(&unbuilt, &deviation).compute_summary(1, false, 0),
            Err(CubeError::InvalidArgument(_))
        ));
    }
}
