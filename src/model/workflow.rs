//! Workflow: a recipe bundled with a tree specification
//!
//! `Workflow::fit` takes the unfit pair to a [`FittedWorkflow`], which can
//! predict and be evaluated on any table carrying the recipe's columns.

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument};

use super::error::{missing_column, ModelError};
use super::metrics::Evaluation;
use super::recipe::{outcome_values, PreparedRecipe, Recipe};
use super::tree::{DecisionTree, TreeSpec};

/// Name of the prediction column added by [`FittedWorkflow::augment`].
pub const PREDICTION_COLUMN: &str = ".pred_class";

#[derive(Debug, Clone, Serialize)]
pub struct Workflow {
    recipe: Recipe,
    spec: TreeSpec,
}

impl Workflow {
    pub fn new(recipe: Recipe, spec: TreeSpec) -> Self {
        Self { recipe, spec }
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    pub fn spec(&self) -> &TreeSpec {
        &self.spec
    }

    /// Same recipe with a different tree specification.
    #[must_use]
    pub fn with_spec(&self, spec: TreeSpec) -> Self {
        Self {
            recipe: self.recipe.clone(),
            spec,
        }
    }

    /// Prepare the recipe on `df` and grow the tree.
    ///
    /// Rows whose outcome is null are ignored.
    #[instrument(skip_all, fields(rows = df.height(), tree_depth = self.spec.tree_depth))]
    pub fn fit(&self, df: &DataFrame) -> Result<FittedWorkflow, ModelError> {
        self.spec.validate()?;

        let labelled = drop_null_outcome(df, self.recipe.outcome())?;
        if labelled.height() == 0 {
            return Err(ModelError::EmptyDataset);
        }

        let prepared = self.recipe.prep(&labelled)?;
        let matrix = prepared.bake(&labelled)?;
        let outcome: Vec<String> = prepared
            .outcome_values(&labelled)?
            .into_iter()
            .flatten()
            .collect();

        let mut classes = outcome.clone();
        classes.sort();
        classes.dedup();

        let labels: Vec<usize> = outcome
            .iter()
            .map(|v| classes.binary_search(v).unwrap_or_default())
            .collect();

        let tree = self.spec.fit(&matrix.rows, &labels, classes.len())?;
        debug!(n_classes = classes.len(), n_leaves = tree.n_leaves(), "workflow fitted");

        Ok(FittedWorkflow {
            prepared,
            tree,
            classes,
            spec: self.spec,
        })
    }
}

/// A workflow whose recipe and tree were learned from training data.
#[derive(Debug, Clone, Serialize)]
pub struct FittedWorkflow {
    prepared: PreparedRecipe,
    tree: DecisionTree,
    classes: Vec<String>,
    spec: TreeSpec,
}

impl FittedWorkflow {
    pub fn prepared(&self) -> &PreparedRecipe {
        &self.prepared
    }

    pub fn tree(&self) -> &DecisionTree {
        &self.tree
    }

    /// Outcome levels seen during fitting, sorted.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn spec(&self) -> &TreeSpec {
        &self.spec
    }

    /// Predicted class label for every row of `df`.
    pub fn predict(&self, df: &DataFrame) -> Result<Vec<String>, ModelError> {
        let matrix = self.prepared.bake(df)?;
        let predicted = self.tree.predict_batch(&matrix.rows)?;
        Ok(predicted
            .into_iter()
            .map(|idx| self.classes[idx].clone())
            .collect())
    }

    /// `df` with a [`PREDICTION_COLUMN`] appended.
    pub fn augment(&self, df: &DataFrame) -> Result<DataFrame, ModelError> {
        let predicted = self.predict(df)?;
        let column = Column::new(PREDICTION_COLUMN.into(), predicted);
        Ok(df.hstack(&[column])?)
    }

    /// Accuracy and confusion matrix over the rows of `df` with a known outcome.
    pub fn evaluate(&self, df: &DataFrame) -> Result<Evaluation, ModelError> {
        let labelled = drop_null_outcome(df, self.prepared.outcome())?;
        let predicted = self.predict(&labelled)?;
        let truth: Vec<String> = self
            .prepared
            .outcome_values(&labelled)?
            .into_iter()
            .flatten()
            .collect();
        Ok(Evaluation::from_labels(&truth, &predicted))
    }
}

fn drop_null_outcome(df: &DataFrame, outcome: &str) -> Result<DataFrame, ModelError> {
    let column = df.column(outcome).map_err(|_| missing_column(df, outcome))?;
    if column.null_count() == 0 {
        return Ok(df.clone());
    }
    Ok(df.filter(&column.is_not_null())?)
}

/// Distinct outcome levels of `df`, sorted, nulls excluded.
pub fn outcome_levels(df: &DataFrame, outcome: &str) -> Result<Vec<String>, ModelError> {
    let mut levels: Vec<String> = outcome_values(df, outcome)?.into_iter().flatten().collect();
    levels.sort();
    levels.dedup();
    Ok(levels)
}
