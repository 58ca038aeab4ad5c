//! Stratified v-fold cross-validation

use indicatif::ProgressBar;
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::error::{missing_column, ModelError};
use super::workflow::Workflow;
use crate::pipeline::rows::{stratum_groups, take_rows};

/// One resample: fit on `analysis`, score on `assessment` (row indices).
#[derive(Debug, Clone, Serialize)]
pub struct Fold {
    pub id: usize,
    pub analysis: Vec<usize>,
    pub assessment: Vec<usize>,
}

/// Assign every row of `df` to exactly one of `v` assessment folds.
///
/// With a `strata` column, rows are grouped by its value, shuffled within
/// each group, and dealt round-robin across folds; the dealing position
/// carries over between groups so fold sizes differ by at most one row.
#[instrument(skip(df), fields(rows = df.height()))]
pub fn vfold_cv(
    df: &DataFrame,
    v: usize,
    strata: Option<&str>,
    seed: u64,
) -> Result<Vec<Fold>, ModelError> {
    if v < 2 {
        return Err(ModelError::InvalidParameter {
            name: "v",
            value: v.to_string(),
            reason: "at least 2 folds are required",
        });
    }
    let n = df.height();
    if n < v {
        return Err(ModelError::TooFewRows { rows: n, folds: v });
    }

    let groups = match strata {
        Some(column) => {
            if df.column(column).is_err() {
                return Err(missing_column(df, column));
            }
            stratum_groups(df, column)?
        }
        None => vec![(0..n).collect()],
    };

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut assignment = vec![0usize; n];
    let mut next_fold = 0;
    for mut group in groups {
        group.shuffle(&mut rng);
        for idx in group {
            assignment[idx] = next_fold;
            next_fold = (next_fold + 1) % v;
        }
    }

    let folds: Vec<Fold> = (0..v)
        .map(|id| {
            let (assessment, analysis): (Vec<usize>, Vec<usize>) =
                (0..n).partition(|&i| assignment[i] == id);
            Fold {
                id,
                analysis,
                assessment,
            }
        })
        .collect();

    debug!(v, stratified = strata.is_some(), "folds assigned");
    Ok(folds)
}

/// Per-fold accuracies and their summary.
#[derive(Debug, Clone, Serialize)]
pub struct CvResult {
    pub fold_accuracies: Vec<f64>,
    pub mean_accuracy: f64,
    /// Sample variance of fold accuracies
    pub variance: f64,
    pub std_err: f64,
    pub n_folds: usize,
}

impl CvResult {
    pub fn from_accuracies(fold_accuracies: Vec<f64>) -> Self {
        let k = fold_accuracies.len();
        let mean_accuracy = if k == 0 {
            0.0
        } else {
            fold_accuracies.iter().sum::<f64>() / k as f64
        };
        let variance = if k < 2 {
            0.0
        } else {
            fold_accuracies
                .iter()
                .map(|a| (a - mean_accuracy).powi(2))
                .sum::<f64>()
                / (k - 1) as f64
        };
        let std_err = if k == 0 { 0.0 } else { (variance / k as f64).sqrt() };
        Self {
            fold_accuracies,
            mean_accuracy,
            variance,
            std_err,
            n_folds: k,
        }
    }
}

/// Fit `workflow` on each fold's analysis rows and score the assessment rows.
///
/// Folds run in parallel; accuracies are reported in fold order.
#[instrument(skip_all, fields(n_folds = folds.len(), tree_depth = workflow.spec().tree_depth))]
pub fn fit_resamples(
    workflow: &Workflow,
    df: &DataFrame,
    folds: &[Fold],
    progress: Option<&ProgressBar>,
) -> Result<CvResult, ModelError> {
    let fold_accuracies = folds
        .par_iter()
        .map(|fold| -> Result<f64, ModelError> {
            let analysis = take_rows(df, &fold.analysis)?;
            let assessment = take_rows(df, &fold.assessment)?;
            let fitted = workflow.fit(&analysis)?;
            let eval = fitted.evaluate(&assessment)?;
            if let Some(pb) = progress {
                pb.inc(1);
            }
            debug!(fold = fold.id, accuracy = eval.accuracy, "fold scored");
            Ok(eval.accuracy)
        })
        .collect::<Result<Vec<f64>, ModelError>>()?;

    let result = CvResult::from_accuracies(fold_accuracies);
    info!(
        mean_accuracy = result.mean_accuracy,
        std_err = result.std_err,
        "cross-validation complete"
    );
    Ok(result)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::recipe::{Recipe, Selector};
    use crate::model::tree::TreeSpec;

    fn data(n: usize) -> DataFrame {
        let speed: Vec<f64> = (0..n).map(|i| 70.0 + (i % 40) as f64).collect();
        let hr: Vec<bool> = speed.iter().map(|&s| s > 100.0).collect();
        df! {
            "launch_speed" => speed,
            "is_home_run" => hr,
        }
        .unwrap()
    }

    #[test]
    fn test_every_row_held_out_exactly_once() {
        let df = data(53);
        let folds = vfold_cv(&df, 10, Some("is_home_run"), 7).unwrap();
        assert_eq!(folds.len(), 10);

        let mut seen = vec![0usize; df.height()];
        for fold in &folds {
            assert_eq!(fold.analysis.len() + fold.assessment.len(), df.height());
            for &i in &fold.assessment {
                seen[i] += 1;
            }
            assert!(fold.assessment.iter().all(|i| !fold.analysis.contains(i)));
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_unknown_strata_column() {
        let err = vfold_cv(&data(20), 5, Some("outcome"), 7).unwrap_err();
        assert!(matches!(err, ModelError::MissingColumn { ref column, .. } if column == "outcome"));
    }

    #[test]
    fn test_fold_sizes_are_balanced() {
        let folds = vfold_cv(&data(53), 10, Some("is_home_run"), 7).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.assessment.len()).collect();
        let min = *sizes.iter().min().unwrap();
        let max = *sizes.iter().max().unwrap();
        assert!(max - min <= 1, "fold sizes {:?}", sizes);
    }

    #[test]
    fn test_folds_are_reproducible() {
        let df = data(40);
        let a = vfold_cv(&df, 5, Some("is_home_run"), 11).unwrap();
        let b = vfold_cv(&df, 5, Some("is_home_run"), 11).unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.assessment, y.assessment);
        }
    }

    #[test]
    fn test_invalid_fold_counts() {
        assert!(vfold_cv(&data(10), 1, None, 0).is_err());
        let err = vfold_cv(&data(3), 5, None, 0).unwrap_err();
        assert!(matches!(err, ModelError::TooFewRows { rows: 3, folds: 5 }));
    }

    #[test]
    fn test_fit_resamples_accuracy_in_unit_interval() {
        let df = data(80);
        let folds = vfold_cv(&df, 10, Some("is_home_run"), 42).unwrap();
        let recipe = Recipe::new("is_home_run", ["launch_speed"])
            .step_impute_median(Selector::AllNumericPredictors);
        let workflow = Workflow::new(recipe, TreeSpec::default());

        let result = fit_resamples(&workflow, &df, &folds, None).unwrap();
        assert_eq!(result.fold_accuracies.len(), 10);
        assert!((0.0..=1.0).contains(&result.mean_accuracy));
        assert!(result.mean_accuracy > 0.9);
    }

    #[test]
    fn test_cv_summary_statistics() {
        let result = CvResult::from_accuracies(vec![0.5, 0.7, 0.9]);
        assert!((result.mean_accuracy - 0.7).abs() < 1e-12);
        assert!((result.variance - 0.04).abs() < 1e-12);
        assert!((result.std_err - (0.04f64 / 3.0).sqrt()).abs() < 1e-12);
    }
}
