//! Error types for recipe preparation, tree fitting and resampling

use polars::prelude::PolarsError;

/// Errors from the modeling layer.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A column referenced by the recipe or outcome is absent from the table.
    #[error("column '{column}' not found. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// A selector named a column that is not one of the recipe predictors.
    #[error("column '{column}' is not a predictor of this recipe")]
    NotAPredictor { column: String },

    /// The table has no usable rows.
    #[error("dataset is empty")]
    EmptyDataset,

    /// A predictor has a dtype the recipe cannot treat as numeric or nominal.
    #[error("column '{column}' has unsupported dtype {dtype}")]
    UnsupportedType { column: String, dtype: String },

    /// A step was asked to operate on a column of the wrong kind.
    #[error("step '{step}' cannot be applied to {kind} column '{column}'")]
    WrongColumnKind {
        step: &'static str,
        kind: &'static str,
        column: String,
    },

    /// Imputation has nothing to learn from.
    #[error("column '{column}' has no non-missing values to impute from")]
    AllMissing { column: String },

    /// A nominal predictor reached the model without being dummy-encoded.
    #[error("nominal predictor '{column}' must be dummy-encoded before fitting")]
    NominalNotEncoded { column: String },

    /// A numeric predictor still contains nulls after all steps ran.
    #[error("predictor '{column}' contains missing values; add an imputation step")]
    MissingValues { column: String },

    /// A hyperparameter or resampling setting is out of range.
    #[error("invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Fewer rows than requested folds.
    #[error("cannot build {folds} folds from {rows} rows")]
    TooFewRows { rows: usize, folds: usize },

    /// Feature matrix width differs from what the tree was fitted on.
    #[error("expected {expected} features, got {got}")]
    FeatureCountMismatch { expected: usize, got: usize },

    /// Tuning was asked to search an empty grid.
    #[error("tuning grid is empty")]
    EmptyGrid,

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

/// Build a [`ModelError::MissingColumn`] listing the columns that do exist.
pub(crate) fn missing_column(df: &polars::prelude::DataFrame, column: &str) -> ModelError {
    ModelError::MissingColumn {
        column: column.to_string(),
        available: df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}
