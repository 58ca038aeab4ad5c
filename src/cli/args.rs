//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::config::AnalysisConfig;
use crate::model::TreeSpec;
use crate::pipeline::Source;

pub const DEFAULT_PREDICTORS: &[&str] = &[
    "launch_speed",
    "launch_angle",
    "release_speed",
    "plate_x",
    "plate_z",
    "pitch_name",
    "stand",
    "p_throws",
];

/// Dinger - batted-ball exploration and home-run classification
#[derive(Parser, Debug)]
#[command(name = "dinger")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Batted-ball events source: HTTP(S) URL or local CSV/Parquet file
    #[arg(short, long)]
    pub events: Option<String>,

    /// Park dimensions source: HTTP(S) URL or local CSV/Parquet file
    #[arg(short, long)]
    pub parks: Option<String>,

    /// Column shared by both tables for the join
    #[arg(short = 'k', long, default_value = "park")]
    pub join_key: String,

    /// Outcome column (two classes)
    #[arg(short, long, default_value = "is_home_run")]
    pub target: String,

    /// Raw events column used to derive the outcome when it is missing
    #[arg(long, default_value = "events")]
    pub events_column: String,

    /// Predictor columns (comma-separated)
    #[arg(long, value_delimiter = ',', default_values_t = DEFAULT_PREDICTORS.iter().map(|s| s.to_string()).collect::<Vec<_>>())]
    pub predictors: Vec<String>,

    /// Fraction of rows used for training, strictly between 0 and 1
    #[arg(long, default_value = "0.85", value_parser = validate_fraction)]
    pub train_fraction: f64,

    /// Seed for the split and the cross-validation folds
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Number of cross-validation folds
    #[arg(long, default_value = "10", value_parser = validate_folds)]
    pub folds: usize,

    /// Tree depths to evaluate during tuning (comma-separated)
    #[arg(long, value_delimiter = ',', default_values_t = [1usize, 2, 3, 4, 5, 6, 7, 8], value_parser = validate_depth)]
    pub depths: Vec<usize>,

    /// Number of tuning candidates to show
    #[arg(long, default_value = "5")]
    pub top_n: usize,

    /// Depth of the first, untuned tree
    #[arg(long, default_value = "30", value_parser = validate_depth)]
    pub tree_depth: usize,

    /// Minimum rows in a node for it to be split
    #[arg(long, default_value = "2", value_parser = validate_min_n)]
    pub min_n: usize,

    /// Cost-complexity: minimum relative impurity decrease for a split
    #[arg(long, default_value = "0.01", value_parser = validate_cost_complexity)]
    pub cost_complexity: f64,

    /// Grouping column for the exploratory summary table
    #[arg(long, default_value = "pitch_name")]
    pub group_by: String,

    /// Numeric column summarised in the exploratory step
    #[arg(long, default_value = "launch_speed")]
    pub summary_column: String,

    /// Second numeric column for the scatter charts
    #[arg(long, default_value = "launch_angle")]
    pub scatter_column: String,

    /// Launch speed column used for the barrel-zone flag
    #[arg(long, default_value = "launch_speed")]
    pub speed_column: String,

    /// Launch angle column used for the barrel-zone flag
    #[arg(long, default_value = "launch_angle")]
    pub angle_column: String,

    /// Number of histogram bins
    #[arg(long, default_value = "30")]
    pub bins: usize,

    /// Directory for charts and the JSON report
    #[arg(short, long, default_value = "dinger_output")]
    pub output_dir: PathBuf,

    /// Skip SVG chart rendering
    #[arg(long, default_value = "false")]
    pub no_charts: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Show debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download or read one source and save it as CSV or Parquet
    Fetch {
        /// Source: HTTP(S) URL or local CSV/Parquet file
        source: String,

        /// Output file (.csv or .parquet). Defaults to <stem>.parquet in the current directory
        output: Option<PathBuf>,

        /// Number of rows to use for schema inference. Use 0 for full table scan.
        #[arg(long, default_value = "10000")]
        infer_schema_length: usize,
    },
}

impl Cli {
    /// Both sources, or an error naming the missing flag.
    pub fn sources(&self) -> anyhow::Result<(Source, Source)> {
        let events = self.events.as_deref().ok_or_else(|| {
            anyhow::anyhow!("Events source is required. Use -e/--events to specify a URL or file.")
        })?;
        let parks = self.parks.as_deref().ok_or_else(|| {
            anyhow::anyhow!("Parks source is required. Use -p/--parks to specify a URL or file.")
        })?;
        Ok((Source::parse(events), Source::parse(parks)))
    }

    /// Tree specification of the first fit.
    pub fn tree_spec(&self) -> TreeSpec {
        TreeSpec::default()
            .with_tree_depth(self.tree_depth)
            .with_min_n(self.min_n)
            .with_cost_complexity(self.cost_complexity)
    }

    /// Level for the diagnostic log filter.
    pub fn log_level(&self) -> &'static str {
        match (self.verbose, self.quiet) {
            (true, _) => "debug",
            (_, true) => "error",
            _ => "warn",
        }
    }

    pub fn analysis_config(&self) -> anyhow::Result<AnalysisConfig> {
        let (events, parks) = self.sources()?;
        Ok(AnalysisConfig {
            events: events.to_string(),
            parks: parks.to_string(),
            join_key: self.join_key.clone(),
            target: self.target.clone(),
            events_column: self.events_column.clone(),
            predictors: self.predictors.clone(),
            train_fraction: self.train_fraction,
            seed: self.seed,
            folds: self.folds,
            depths: self.depths.clone(),
            top_n: self.top_n,
            tree: self.tree_spec(),
            group_by: self.group_by.clone(),
            summary_column: self.summary_column.clone(),
            scatter_column: self.scatter_column.clone(),
            speed_column: self.speed_column.clone(),
            angle_column: self.angle_column.clone(),
            bins: self.bins,
            output_dir: self.output_dir.clone(),
            charts: !self.no_charts,
        })
    }
}

fn parse_number<T: std::str::FromStr>(s: &str) -> Result<T, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))
}

/// Validator for train_fraction
fn validate_fraction(s: &str) -> Result<f64, String> {
    let value: f64 = parse_number(s)?;
    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "train_fraction must be strictly between 0.0 and 1.0, got {}",
            value
        ))
    }
}

/// Validator for folds
fn validate_folds(s: &str) -> Result<usize, String> {
    let value: usize = parse_number(s)?;
    if value >= 2 {
        Ok(value)
    } else {
        Err(format!("folds must be at least 2, got {}", value))
    }
}

fn validate_depth(s: &str) -> Result<usize, String> {
    let value: usize = parse_number(s)?;
    if value >= 1 {
        Ok(value)
    } else {
        Err("tree depth must be at least 1".to_string())
    }
}

fn validate_min_n(s: &str) -> Result<usize, String> {
    let value: usize = parse_number(s)?;
    if value >= 2 {
        Ok(value)
    } else {
        Err(format!("min_n must be at least 2, got {}", value))
    }
}

fn validate_cost_complexity(s: &str) -> Result<f64, String> {
    let value: f64 = parse_number(s)?;
    if value >= 0.0 && value.is_finite() {
        Ok(value)
    } else {
        Err(format!("cost_complexity must be non-negative, got {}", value))
    }
}
