use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rca_cube::cube::{CostInput, Cube, Dimensions};
use rca_cube::fetcher::{InMemoryFetcher, Snapshot};
use rca_cube::observability::CubeMetrics;
use rca_cube::summary::Summary;
use rca_cube::CubeConfig;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs a root-cause cube over a JSON snapshot of records
#[derive(Parser)]
#[command(name = "cube")]
#[command(about = "Explain a metric change by its dimensions")]
struct Args {
    /// Snapshot file: {"records": [...], "filters": [...]}
    #[arg(short, long)]
    input: PathBuf,

    /// Cube config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Nodes picked by the summary (overrides config)
    #[arg(long)]
    answer_size: Option<usize>,

    /// Summary levels, 0 for all (overrides config)
    #[arg(long)]
    level_count: Option<usize>,

    /// Only pick nodes that moved with the overall change
    #[arg(long)]
    one_side_error: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rank the dimensions by cost and keep the top ones
    Auto {
        /// Candidate dimensions, comma separated
        #[arg(short, long, value_delimiter = ',', required = true)]
        dimensions: Vec<String>,

        /// Number of dimensions to keep (overrides config)
        #[arg(long)]
        depth: Option<usize>,

        /// Declared hierarchy, comma separated; repeatable
        #[arg(long = "hierarchy")]
        hierarchies: Vec<String>,
    },
    /// Use the dimensions in the given order
    Manual {
        #[arg(short, long, value_delimiter = ',', required = true)]
        dimensions: Vec<String>,
    },
}

/// Deviation of a value from the global trend, relative to the total size.
fn trend_deviation(input: &CostInput) -> f64 {
    let expected = input.baseline_size * input.top_ratio;
    let total_size = input.top_baseline_size + input.top_current_size;
    if total_size == 0.0 {
        return 0.0;
    }
    (input.current_size - expected).abs() / total_size
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => CubeConfig::load(path)?,
        None => CubeConfig::default(),
    }
    .apply_env_overrides()?;

    let snapshot = Snapshot::load(&args.input)
        .with_context(|| format!("loading snapshot {}", args.input.display()))?;
    info!("Loaded {} records", snapshot.records.len());
    let fetcher = InMemoryFetcher::from_snapshot(snapshot);
    let metrics = CubeMetrics::new();

    let mut cube = Cube::new(&fetcher, &trend_deviation)
        .with_telemetry(&metrics)
        .with_top_entries_to_log(config.top_cost_entries_to_log);

    match &args.command {
        Command::Auto {
            dimensions,
            depth,
            hierarchies,
        } => {
            let mut declared = config.hierarchies.clone();
            declared.extend(hierarchies.iter().map(|h| {
                h.split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect::<Vec<_>>()
            }));
            cube.build_with_auto_dimension_order(
                &Dimensions::new(dimensions.iter().map(String::as_str)),
                fetcher.filters(),
                depth.unwrap_or(config.depth),
                &declared,
            )?;
        }
        Command::Manual { dimensions } => {
            cube.build_with_manual_dimension_order(&Dimensions::new(dimensions.iter().map(String::as_str)))?;
        }
    }

    info!("{}", cube);
    let summary = Summary::new(&cube, &trend_deviation)
        .with_max_gainer_loser_count(config.max_gainer_loser_count)
        .compute_summary(
            args.answer_size.unwrap_or(config.answer_size),
            args.one_side_error || config.one_side_error,
            args.level_count.unwrap_or(config.summary_level_count),
        )?;

    let output = serde_json::to_string_pretty(&json!({
        "generatedAt": Utc::now().to_rfc3339(),
        "cube": cube,
        "summary": summary,
        "metrics": metrics.snapshot(),
    }))?;

    match args.output {
        Some(path) => {
            std::fs::write(&path, output)?;
            info!("Result saved to {}", path.display());
        }
        None => println!("{}", output),
    }

    Ok(())
}
