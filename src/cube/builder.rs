//! Cube orchestration
//!
//! A `Cube` is built once per root-cause request:
//! totals -> one-dimension costs -> dimension ranking and ordering -> full
//! multi-level fetch -> tree. It is mutated only by the single build call and is
//! read-only afterwards. Errors from the fetcher or the cost function are counted
//! on the telemetry and returned unchanged; the cube is then unusable.

use crate::cube::aggregator::{CostAggregator, Totals};
use crate::cube::cost::{CostEntry, CostFunction, DimensionCost};
use crate::cube::dimensions::Dimensions;
use crate::cube::filter::{shrink_dimensions_by_filters, DimensionFilter};
use crate::cube::node::{CubeNode, NodeId};
use crate::cube::orderer::DimensionOrderer;
use crate::cube::row::Row;
use crate::cube::tree::CubeTreeBuilder;
use crate::error::{CubeError, Result};
use crate::fetcher::CubeFetcher;
use crate::observability::{CubeTelemetry, NoopTelemetry};
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use tracing::info;

static NOOP_TELEMETRY: NoopTelemetry = NoopTelemetry;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cube<'a> {
    baseline_total: f64,
    current_total: f64,
    baseline_total_size: f64,
    current_total_size: f64,

    cost_set: Vec<CostEntry>,
    sorted_dimension_costs: Vec<DimensionCost>,
    dimensions: Option<Dimensions>,

    /// Rows of each level, sorted by dimension values
    hierarchical_rows: Vec<Vec<Row>>,

    /// Node arena over `hierarchical_rows`
    #[serde(skip)]
    hierarchical_nodes: Vec<Vec<CubeNode>>,

    #[serde(skip)]
    built: bool,
    #[serde(skip)]
    top_entries_to_log: usize,
    #[serde(skip)]
    fetcher: &'a dyn CubeFetcher,
    #[serde(skip)]
    cost_function: &'a dyn CostFunction,
    #[serde(skip)]
    telemetry: &'a dyn CubeTelemetry,
}

impl<'a> Cube<'a> {
    pub fn new(fetcher: &'a dyn CubeFetcher, cost_function: &'a dyn CostFunction) -> Self {
        Self {
            baseline_total: 0.0,
            current_total: 0.0,
            baseline_total_size: 0.0,
            current_total_size: 0.0,
            cost_set: Vec::new(),
            sorted_dimension_costs: Vec::new(),
            dimensions: None,
            hierarchical_rows: Vec::new(),
            hierarchical_nodes: Vec::new(),
            built: false,
            top_entries_to_log: 20,
            fetcher,
            cost_function,
            telemetry: &NOOP_TELEMETRY,
        }
    }

    pub fn with_telemetry(mut self, telemetry: &'a dyn CubeTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Number of top cost entries logged after the one-dimension pass.
    pub fn with_top_entries_to_log(mut self, count: usize) -> Self {
        self.top_entries_to_log = count;
        self
    }

    /// Orders `dimensions` by their cost, honoring `hierarchy`, and builds the
    /// cube for the top `depth` of them.
    ///
    /// Dimensions pinned to a single value by `data_filters` are not considered.
    pub fn build_with_auto_dimension_order(
        &mut self,
        dimensions: &Dimensions,
        data_filters: &[DimensionFilter],
        depth: usize,
        hierarchy: &[Vec<String>],
    ) -> Result<()> {
        self.instrumented(|cube| {
            if dimensions.is_empty() {
                return Err(CubeError::InvalidArgument(
                    "Dimensions cannot be empty.".to_string(),
                ));
            }

            cube.initialize_basic_info()?;
            let shrunk = shrink_dimensions_by_filters(dimensions, data_filters);
            cube.cost_set = cube.compute_one_dimension_cost(&shrunk)?;
            cube.sorted_dimension_costs = CostAggregator::sorted_dimension_costs(&cube.cost_set);
            let ordered = DimensionOrderer::sort_dimensions(&cube.sorted_dimension_costs, depth, hierarchy);

            info!("Auto-dimension order: {}", ordered);
            cube.dimensions = Some(ordered.clone());

            cube.build_sub_cube(&ordered)
        })
    }

    /// Builds the cube with the dimensions in the given order.
    pub fn build_with_manual_dimension_order(&mut self, dimensions: &Dimensions) -> Result<()> {
        self.instrumented(|cube| cube.build_sub_cube(dimensions))
    }

    fn instrumented<F>(&mut self, build: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let started = Instant::now();
        let result = match self.ensure_unbuilt() {
            Ok(()) => build(self),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.telemetry.record_exception();
        }
        self.telemetry.record_call();
        self.telemetry.record_duration(started.elapsed());
        result
    }

    fn ensure_unbuilt(&mut self) -> Result<()> {
        if self.built {
            return Err(CubeError::InvalidArgument(
                "Cube has already been built; create a new one per request.".to_string(),
            ));
        }
        self.built = true;
        Ok(())
    }

    fn build_sub_cube(&mut self, dimensions: &Dimensions) -> Result<()> {
        if dimensions.is_empty() {
            return Err(CubeError::InvalidArgument(
                "Dimensions cannot be empty.".to_string(),
            ));
        }
        if self.dimensions.is_none() {
            // manual order: compute the cost set for diagnostics only
            self.initialize_basic_info()?;
            self.dimensions = Some(dimensions.clone());
            self.cost_set = self.compute_one_dimension_cost(dimensions)?;
        }

        let expected = dimensions.len() + 1;
        let mut rows = self.fetcher.aggregated_values_of_levels(dimensions)?;
        if rows.len() < expected {
            return Err(CubeError::LevelCount {
                expected,
                actual: rows.len(),
            });
        }
        rows.truncate(expected);

        // Parent rows sort before their children, e.g. (), (IN), (IN, p1), (US), ...
        for level in rows.iter_mut() {
            level.sort_by(|a, b| a.dimension_values.cmp(&b.dimension_values));
        }
        let size: usize = rows.iter().map(Vec::len).sum();
        info!("Size of the cube for generating summary: {}", size);

        self.hierarchical_nodes = CubeTreeBuilder::build(&rows, dimensions);
        self.hierarchical_rows = rows;
        Ok(())
    }

    fn initialize_basic_info(&mut self) -> Result<()> {
        self.baseline_total = self.fetcher.baseline_total()?;
        self.current_total = self.fetcher.current_total()?;
        self.baseline_total_size = self.baseline_total;
        self.current_total_size = self.current_total;
        Ok(())
    }

    fn compute_one_dimension_cost(&self, dimensions: &Dimensions) -> Result<Vec<CostEntry>> {
        let rows = self.fetcher.aggregated_values_of_dimension(dimensions)?;
        CostAggregator::new(self.cost_function)
            .with_top_entries_to_log(self.top_entries_to_log)
            .compute_one_dimension_cost(&self.totals(), dimensions, &rows)
    }

    pub fn totals(&self) -> Totals {
        Totals {
            baseline_value: self.baseline_total,
            current_value: self.current_total,
            baseline_size: self.baseline_total_size,
            current_size: self.current_total_size,
        }
    }

    pub fn baseline_total(&self) -> f64 {
        self.baseline_total
    }

    pub fn current_total(&self) -> f64 {
        self.current_total
    }

    pub fn baseline_total_size(&self) -> f64 {
        self.baseline_total_size
    }

    pub fn current_total_size(&self) -> f64 {
        self.current_total_size
    }

    /// Resolved dimension order; `None` until a build has started.
    pub fn dimensions(&self) -> Option<&Dimensions> {
        self.dimensions.as_ref()
    }

    /// Cost of every dimension value, highest first.
    pub fn cost_set(&self) -> &[CostEntry] {
        &self.cost_set
    }

    /// Aggregated cost per dimension, highest first. Empty for manual builds.
    pub fn sorted_dimension_costs(&self) -> &[DimensionCost] {
        &self.sorted_dimension_costs
    }

    pub fn hierarchical_rows(&self) -> &[Vec<Row>] {
        &self.hierarchical_rows
    }

    pub fn hierarchical_nodes(&self) -> &[Vec<CubeNode>] {
        &self.hierarchical_nodes
    }

    /// The ungrouped level-0 node, if any data was fetched.
    pub fn root(&self) -> Option<&CubeNode> {
        self.node(NodeId::ROOT)
    }

    pub fn node(&self, id: NodeId) -> Option<&CubeNode> {
        self.hierarchical_nodes.get(id.level)?.get(id.index)
    }

    pub fn parent(&self, node: &CubeNode) -> Option<&CubeNode> {
        node.parent().and_then(|id| self.node(id))
    }

    /// Children of `node`, largest first.
    pub fn children<'c>(&'c self, node: &'c CubeNode) -> impl Iterator<Item = &'c CubeNode> + 'c {
        let levels: &'c [Vec<CubeNode>] = &self.hierarchical_nodes;
        node.children()
            .iter()
            .filter_map(move |id| levels.get(id.level)?.get(id.index))
    }
}

impl fmt::Display for Cube<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Baseline Value: {}", self.baseline_total)?;
        writeln!(f, "Current Value: {}", self.current_total)?;
        writeln!(f, "Change Ratio: {}", self.current_total / self.baseline_total)?;
        match &self.dimensions {
            Some(dimensions) => writeln!(f, "Dimensions: {}", dimensions)?,
            None => writeln!(f, "Dimensions: []")?,
        }
        write!(
            f,
            "#Detailed Rows: {}",
            self.hierarchical_rows.last().map_or(0, Vec::len)
        )
    }
}
