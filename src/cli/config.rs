//! Resolved analysis settings

use std::path::PathBuf;

use serde::Serialize;

use crate::model::TreeSpec;

/// Settings of one analysis run, as resolved from the command line.
/// Embedded verbatim in the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisConfig {
    pub events: String,
    pub parks: String,
    pub join_key: String,
    pub target: String,
    pub events_column: String,
    pub predictors: Vec<String>,
    pub train_fraction: f64,
    pub seed: u64,
    pub folds: usize,
    pub depths: Vec<usize>,
    pub top_n: usize,
    pub tree: TreeSpec,
    pub group_by: String,
    pub summary_column: String,
    pub scatter_column: String,
    pub speed_column: String,
    pub angle_column: String,
    pub bins: usize,
    pub output_dir: PathBuf,
    pub charts: bool,
}

impl AnalysisConfig {
    pub fn predictor_refs(&self) -> Vec<&str> {
        self.predictors.iter().map(|s| s.as_str()).collect()
    }
}
