//! Grid search over tree depth, finalisation and the last fit

use indicatif::ProgressBar;
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument};

use super::cv::{fit_resamples, Fold};
use super::error::ModelError;
use super::metrics::Evaluation;
use super::workflow::{FittedWorkflow, Workflow};

/// Cross-validated score of one grid point.
#[derive(Debug, Clone, Serialize)]
pub struct TuneCandidate {
    pub tree_depth: usize,
    pub mean_accuracy: f64,
    pub std_err: f64,
    pub n_folds: usize,
}

/// Grid results ranked by mean accuracy, best first.
#[derive(Debug, Clone, Serialize)]
pub struct TuneResult {
    candidates: Vec<TuneCandidate>,
}

impl TuneResult {
    /// Rank candidates: higher mean accuracy first, shallower trees win ties.
    pub fn new(mut candidates: Vec<TuneCandidate>) -> Self {
        candidates.sort_by(|a, b| {
            b.mean_accuracy
                .total_cmp(&a.mean_accuracy)
                .then(a.tree_depth.cmp(&b.tree_depth))
        });
        Self { candidates }
    }

    pub fn candidates(&self) -> &[TuneCandidate] {
        &self.candidates
    }

    /// Top `n` candidates.
    pub fn show_best(&self, n: usize) -> &[TuneCandidate] {
        &self.candidates[..n.min(self.candidates.len())]
    }

    pub fn select_best(&self) -> Option<&TuneCandidate> {
        self.candidates.first()
    }
}

/// Cross-validate `workflow` once per depth in `depths`, reusing the same folds.
#[instrument(skip_all, fields(n_candidates = depths.len(), n_folds = folds.len()))]
pub fn tune_grid(
    workflow: &Workflow,
    df: &DataFrame,
    folds: &[Fold],
    depths: &[usize],
    progress: Option<&ProgressBar>,
) -> Result<TuneResult, ModelError> {
    if depths.is_empty() {
        return Err(ModelError::EmptyGrid);
    }

    let candidates = depths
        .par_iter()
        .map(|&tree_depth| {
            let candidate = workflow.with_spec(workflow.spec().with_tree_depth(tree_depth));
            let cv = fit_resamples(&candidate, df, folds, progress)?;
            Ok(TuneCandidate {
                tree_depth,
                mean_accuracy: cv.mean_accuracy,
                std_err: cv.std_err,
                n_folds: cv.n_folds,
            })
        })
        .collect::<Result<Vec<_>, ModelError>>()?;

    let result = TuneResult::new(candidates);
    if let Some(best) = result.select_best() {
        info!(
            tree_depth = best.tree_depth,
            mean_accuracy = best.mean_accuracy,
            "tuning complete"
        );
    }
    Ok(result)
}

/// Workflow with the tuned depth plugged into its tree specification.
pub fn finalize_workflow(workflow: &Workflow, best: &TuneCandidate) -> Workflow {
    workflow.with_spec(workflow.spec().with_tree_depth(best.tree_depth))
}

/// Final model fitted on the training split and scored on both splits.
#[derive(Debug, Clone)]
pub struct LastFit {
    pub fitted: FittedWorkflow,
    pub train: Evaluation,
    pub test: Evaluation,
}

/// Fit on `train` once and evaluate on `train` and the held-out `test`.
pub fn last_fit(workflow: &Workflow, train: &DataFrame, test: &DataFrame) -> Result<LastFit, ModelError> {
    let fitted = workflow.fit(train)?;
    let train_eval = fitted.evaluate(train)?;
    let test_eval = fitted.evaluate(test)?;
    info!(
        train_accuracy = train_eval.accuracy,
        test_accuracy = test_eval.accuracy,
        "last fit complete"
    );
    Ok(LastFit {
        fitted,
        train: train_eval,
        test: test_eval,
    })
}
