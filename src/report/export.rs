//! JSON analysis report

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::cli::AnalysisConfig;
use crate::model::{CvResult, Evaluation, TreeSpec, TuneCandidate};
use crate::pipeline::{OutcomeSource, SplitSizes, TableProfile};

/// File name of the report inside the output directory.
pub const REPORT_FILE: &str = "analysis_report.json";

#[derive(Debug, Serialize)]
pub struct ReportMetadata {
    /// ISO 8601 timestamp of the run
    pub timestamp: String,
    pub dinger_version: String,
}

impl ReportMetadata {
    pub fn now() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            dinger_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Accuracy and confusion matrix of one fitted model on one table.
#[derive(Debug, Serialize)]
pub struct ModelReport {
    pub spec: TreeSpec,
    pub formula: String,
    pub n_nodes: usize,
    pub n_leaves: usize,
    pub depth: usize,
    pub train: Evaluation,
    pub test: Evaluation,
}

#[derive(Debug, Serialize)]
pub struct TuningReport {
    pub best: Option<TuneCandidate>,
    pub candidates: Vec<TuneCandidate>,
}

/// Everything the run produced, in pipeline order.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    pub config: AnalysisConfig,
    pub outcome: OutcomeSource,
    pub outcome_levels: Vec<String>,
    pub profile: TableProfile,
    pub split: SplitSizes,
    pub initial_fit: ModelReport,
    pub cross_validation: CvResult,
    pub tuning: TuningReport,
    pub final_fit: ModelReport,
    pub charts: Vec<PathBuf>,
}

/// Write `report` as pretty JSON into `dir`, returning the file path.
pub fn write_report(report: &AnalysisReport, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(REPORT_FILE);
    let file = File::create(&path)
        .with_context(|| format!("Failed to create report file: {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), report)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(path)
}
