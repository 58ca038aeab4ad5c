//! Preprocessing recipes: median/mode imputation and dummy encoding
//!
//! A [`Recipe`] names the outcome, the predictors and an ordered list of
//! steps. Preparing it on a training table learns the step parameters
//! (medians, modes, factor levels) once; the resulting [`PreparedRecipe`]
//! is then baked onto any table with the same schema, so train and test
//! rows go through identical transformations.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::error::{missing_column, ModelError};

/// Which predictors a step applies to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Selector {
    /// Every predictor that is numeric at the time the step runs
    AllNumericPredictors,
    /// Every predictor that is nominal (string, boolean, categorical) at the time the step runs
    AllNominalPredictors,
    /// An explicit list of predictor names
    Columns(Vec<String>),
}

/// An unprepared preprocessing step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Step {
    /// Replace missing numeric values with the training median
    ImputeMedian(Selector),
    /// Replace missing nominal values with the training mode
    ImputeMode(Selector),
    /// Expand each nominal column into one indicator per non-reference level
    Dummy(Selector),
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::ImputeMedian(_) => "impute_median",
            Step::ImputeMode(_) => "impute_mode",
            Step::Dummy(_) => "dummy",
        }
    }

    fn selector(&self) -> &Selector {
        match self {
            Step::ImputeMedian(s) | Step::ImputeMode(s) | Step::Dummy(s) => s,
        }
    }
}

/// Outcome, predictors and an ordered list of steps.
#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    outcome: String,
    predictors: Vec<String>,
    steps: Vec<Step>,
}

impl Recipe {
    pub fn new<S: Into<String>>(outcome: impl Into<String>, predictors: impl IntoIterator<Item = S>) -> Self {
        Self {
            outcome: outcome.into(),
            predictors: predictors.into_iter().map(Into::into).collect(),
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn step_impute_median(mut self, selector: Selector) -> Self {
        self.steps.push(Step::ImputeMedian(selector));
        self
    }

    #[must_use]
    pub fn step_impute_mode(mut self, selector: Selector) -> Self {
        self.steps.push(Step::ImputeMode(selector));
        self
    }

    #[must_use]
    pub fn step_dummy(mut self, selector: Selector) -> Self {
        self.steps.push(Step::Dummy(selector));
        self
    }

    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    pub fn predictors(&self) -> &[String] {
        &self.predictors
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Model formula in `outcome ~ a + b` form, for display.
    pub fn formula(&self) -> String {
        format!("{} ~ {}", self.outcome, self.predictors.join(" + "))
    }

    /// Learn every step's parameters from `df`.
    ///
    /// Steps run in order, each seeing the output of the previous one, so a
    /// mode imputation placed before a dummy step removes nulls before the
    /// levels are collected.
    pub fn prep(&self, df: &DataFrame) -> Result<PreparedRecipe, ModelError> {
        if df.height() == 0 {
            return Err(ModelError::EmptyDataset);
        }
        if self.predictors.is_empty() {
            return Err(ModelError::InvalidParameter {
                name: "predictors",
                value: "[]".to_string(),
                reason: "at least one predictor is required",
            });
        }
        if self.predictors.contains(&self.outcome) {
            return Err(ModelError::InvalidParameter {
                name: "predictors",
                value: self.outcome.clone(),
                reason: "the outcome cannot also be a predictor",
            });
        }
        if df.column(&self.outcome).is_err() {
            return Err(missing_column(df, &self.outcome));
        }

        let mut columns = extract_predictors(df, &self.predictors)?;
        let mut prepared = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let learned = learn_step(step, &columns)?;
            learned.apply(&mut columns)?;
            prepared.push(learned);
        }

        let feature_names = check_encoded(&columns)?;
        debug!(
            outcome = %self.outcome,
            n_steps = prepared.len(),
            n_features = feature_names.len(),
            "recipe prepared"
        );

        Ok(PreparedRecipe {
            outcome: self.outcome.clone(),
            predictors: self.predictors.clone(),
            steps: prepared,
            feature_names,
        })
    }
}

/// Parameters learned for one step.
#[derive(Debug, Clone, Serialize)]
pub enum PreparedStep {
    ImputeMedian(Vec<(String, f64)>),
    ImputeMode(Vec<(String, String)>),
    Dummy(Vec<DummyEncoding>),
}

/// Levels of one dummy-encoded column; `levels[0]` is the reference level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DummyEncoding {
    pub column: String,
    pub levels: Vec<String>,
}

impl DummyEncoding {
    /// Names of the indicator columns, one per non-reference level.
    pub fn indicator_names(&self) -> Vec<String> {
        self.levels
            .iter()
            .skip(1)
            .map(|level| format!("{}_{}", self.column, sanitize_level(level)))
            .collect()
    }
}

/// Row-major numeric feature matrix produced by baking a recipe.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

/// A recipe whose step parameters were learned from a training table.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedRecipe {
    outcome: String,
    predictors: Vec<String>,
    steps: Vec<PreparedStep>,
    feature_names: Vec<String>,
}

impl PreparedRecipe {
    pub fn outcome(&self) -> &str {
        &self.outcome
    }

    pub fn steps(&self) -> &[PreparedStep] {
        &self.steps
    }

    /// Names of the model-ready features, in matrix column order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Apply the learned steps to `df` and return the feature matrix.
    pub fn bake(&self, df: &DataFrame) -> Result<FeatureMatrix, ModelError> {
        let mut columns = extract_predictors(df, &self.predictors)?;
        for step in &self.steps {
            step.apply(&mut columns)?;
        }
        let names = check_encoded(&columns)?;

        let n_rows = df.height();
        let mut rows = vec![Vec::with_capacity(names.len()); n_rows];
        for column in &columns {
            if let Values::Numeric(values) = &column.values {
                for (row, value) in rows.iter_mut().zip(values) {
                    match value {
                        Some(v) => row.push(*v),
                        None => {
                            return Err(ModelError::MissingValues {
                                column: column.name.clone(),
                            })
                        }
                    }
                }
            }
        }

        Ok(FeatureMatrix { names, rows })
    }

    /// Outcome values rendered as strings; nulls stay `None`.
    pub fn outcome_values(&self, df: &DataFrame) -> Result<Vec<Option<String>>, ModelError> {
        outcome_values(df, &self.outcome)
    }
}

impl PreparedStep {
    /// Rewrite `columns` in place. A null reaching a dummy step is an error,
    /// since all-zero indicators already mean the reference level.
    fn apply(&self, columns: &mut Vec<FeatureColumn>) -> Result<(), ModelError> {
        match self {
            PreparedStep::ImputeMedian(fills) => {
                for (name, median) in fills {
                    if let Some(Values::Numeric(values)) =
                        columns.iter_mut().find(|c| &c.name == name).map(|c| &mut c.values)
                    {
                        for v in values.iter_mut().filter(|v| v.is_none()) {
                            *v = Some(*median);
                        }
                    }
                }
            }
            PreparedStep::ImputeMode(fills) => {
                for (name, mode) in fills {
                    if let Some(Values::Nominal(values)) =
                        columns.iter_mut().find(|c| &c.name == name).map(|c| &mut c.values)
                    {
                        for v in values.iter_mut().filter(|v| v.is_none()) {
                            *v = Some(mode.clone());
                        }
                    }
                }
            }
            PreparedStep::Dummy(encodings) => {
                for encoding in encodings {
                    let Some(pos) = columns.iter().position(|c| c.name == encoding.column) else {
                        continue;
                    };
                    if !matches!(columns[pos].values, Values::Nominal(_)) {
                        continue;
                    }
                    if let Values::Nominal(values) = &columns[pos].values {
                        if values.iter().any(Option::is_none) {
                            return Err(ModelError::MissingValues {
                                column: encoding.column.clone(),
                            });
                        }
                    }
                    let Values::Nominal(values) = columns.remove(pos).values else {
                        continue;
                    };

                    let unseen = values
                        .iter()
                        .flatten()
                        .filter(|v| !encoding.levels.contains(v))
                        .count();
                    if unseen > 0 {
                        debug!(column = %encoding.column, unseen, "levels not seen during training encode as all zeros");
                    }

                    let indicators = encoding
                        .levels
                        .iter()
                        .skip(1)
                        .zip(encoding.indicator_names())
                        .map(|(level, name)| FeatureColumn {
                            name,
                            values: Values::Numeric(
                                values
                                    .iter()
                                    .map(|v| Some(if v.as_deref() == Some(level.as_str()) { 1.0 } else { 0.0 }))
                                    .collect(),
                            ),
                        });
                    for (offset, indicator) in indicators.enumerate() {
                        columns.insert(pos + offset, indicator);
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Values {
    Numeric(Vec<Option<f64>>),
    Nominal(Vec<Option<String>>),
}

#[derive(Debug, Clone)]
struct FeatureColumn {
    name: String,
    values: Values,
}

impl FeatureColumn {
    fn kind(&self) -> &'static str {
        match self.values {
            Values::Numeric(_) => "numeric",
            Values::Nominal(_) => "nominal",
        }
    }
}

fn extract_predictors(df: &DataFrame, predictors: &[String]) -> Result<Vec<FeatureColumn>, ModelError> {
    predictors
        .iter()
        .map(|name| {
            let col = df.column(name).map_err(|_| missing_column(df, name))?;
            let dtype = col.dtype();
            let values = if dtype.is_primitive_numeric() {
                let cast = col.cast(&DataType::Float64)?;
                Values::Numeric(cast.f64()?.into_iter().collect())
            } else if matches!(
                dtype,
                DataType::String | DataType::Boolean | DataType::Categorical(..) | DataType::Enum(..)
            ) {
                let cast = col.cast(&DataType::String)?;
                Values::Nominal(
                    cast.str()?
                        .into_iter()
                        .map(|v| v.map(|s| s.to_string()))
                        .collect(),
                )
            } else {
                return Err(ModelError::UnsupportedType {
                    column: name.clone(),
                    dtype: dtype.to_string(),
                });
            };
            Ok(FeatureColumn {
                name: name.clone(),
                values,
            })
        })
        .collect()
}

pub(crate) fn outcome_values(df: &DataFrame, outcome: &str) -> Result<Vec<Option<String>>, ModelError> {
    let col = df.column(outcome).map_err(|_| missing_column(df, outcome))?;
    let cast = col.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

fn resolve(selector: &Selector, columns: &[FeatureColumn]) -> Result<Vec<usize>, ModelError> {
    match selector {
        Selector::AllNumericPredictors => Ok(columns
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c.values, Values::Numeric(_)))
            .map(|(i, _)| i)
            .collect()),
        Selector::AllNominalPredictors => Ok(columns
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c.values, Values::Nominal(_)))
            .map(|(i, _)| i)
            .collect()),
        Selector::Columns(names) => names
            .iter()
            .map(|name| {
                columns
                    .iter()
                    .position(|c| &c.name == name)
                    .ok_or_else(|| ModelError::NotAPredictor { column: name.clone() })
            })
            .collect(),
    }
}

fn learn_step(step: &Step, columns: &[FeatureColumn]) -> Result<PreparedStep, ModelError> {
    let selected = resolve(step.selector(), columns)?;

    match step {
        Step::ImputeMedian(_) => {
            let mut fills = Vec::with_capacity(selected.len());
            for idx in selected {
                let column = &columns[idx];
                let Values::Numeric(values) = &column.values else {
                    return Err(wrong_kind(step, column));
                };
                let median = median(values).ok_or_else(|| ModelError::AllMissing {
                    column: column.name.clone(),
                })?;
                fills.push((column.name.clone(), median));
            }
            Ok(PreparedStep::ImputeMedian(fills))
        }
        Step::ImputeMode(_) => {
            let mut fills = Vec::with_capacity(selected.len());
            for idx in selected {
                let column = &columns[idx];
                let Values::Nominal(values) = &column.values else {
                    return Err(wrong_kind(step, column));
                };
                let mode = mode(values).ok_or_else(|| ModelError::AllMissing {
                    column: column.name.clone(),
                })?;
                fills.push((column.name.clone(), mode));
            }
            Ok(PreparedStep::ImputeMode(fills))
        }
        Step::Dummy(_) => {
            let mut encodings = Vec::with_capacity(selected.len());
            for idx in selected {
                let column = &columns[idx];
                let Values::Nominal(values) = &column.values else {
                    return Err(wrong_kind(step, column));
                };
                let levels: BTreeSet<&String> = values.iter().flatten().collect();
                if levels.is_empty() {
                    return Err(ModelError::AllMissing {
                        column: column.name.clone(),
                    });
                }
                encodings.push(DummyEncoding {
                    column: column.name.clone(),
                    levels: levels.into_iter().cloned().collect(),
                });
            }
            Ok(PreparedStep::Dummy(encodings))
        }
    }
}

fn wrong_kind(step: &Step, column: &FeatureColumn) -> ModelError {
    ModelError::WrongColumnKind {
        step: step.name(),
        kind: column.kind(),
        column: column.name.clone(),
    }
}

/// Every remaining column must be numeric; returns their names in order.
fn check_encoded(columns: &[FeatureColumn]) -> Result<Vec<String>, ModelError> {
    columns
        .iter()
        .map(|c| match c.values {
            Values::Numeric(_) => Ok(c.name.clone()),
            Values::Nominal(_) => Err(ModelError::NominalNotEncoded {
                column: c.name.clone(),
            }),
        })
        .collect()
}

fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.total_cmp(b));
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// Most frequent value; ties go to the lexicographically smallest.
fn mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for v in values.iter().flatten() {
        *counts.entry(v.as_str()).or_insert(0) += 1;
    }
    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.to_string())
}

fn sanitize_level(level: &str) -> String {
    level
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df! {
            "hr" => ["no", "yes", "no", "no", "yes"],
            "speed" => [Some(90.0f64), None, Some(100.0), Some(80.0), Some(110.0)],
            "pitch" => [Some("Slider"), Some("4-Seam Fastball"), None, Some("Slider"), Some("Curveball")],
        }
        .unwrap()
    }

    fn full_recipe() -> Recipe {
        Recipe::new("hr", ["speed", "pitch"])
            .step_impute_median(Selector::AllNumericPredictors)
            .step_impute_mode(Selector::AllNominalPredictors)
            .step_dummy(Selector::AllNominalPredictors)
    }

    #[test]
    fn test_median_imputation_uses_training_median() {
        let prepared = full_recipe().prep(&sample()).unwrap();
        match &prepared.steps()[0] {
            PreparedStep::ImputeMedian(fills) => {
                assert_eq!(fills, &vec![("speed".to_string(), 95.0)]);
            }
            other => panic!("Expected median step, got {:?}", other),
        }

        let baked = prepared.bake(&sample()).unwrap();
        assert_eq!(baked.rows[1][0], 95.0);
    }

    #[test]
    fn test_mode_imputation_and_dummy_levels() {
        let prepared = full_recipe().prep(&sample()).unwrap();
        match &prepared.steps()[1] {
            PreparedStep::ImputeMode(fills) => {
                assert_eq!(fills, &vec![("pitch".to_string(), "Slider".to_string())]);
            }
            other => panic!("Expected mode step, got {:?}", other),
        }
        match &prepared.steps()[2] {
            PreparedStep::Dummy(encodings) => {
                assert_eq!(
                    encodings[0].levels,
                    vec!["4-Seam Fastball", "Curveball", "Slider"]
                );
            }
            other => panic!("Expected dummy step, got {:?}", other),
        }

        // Reference level "4-Seam Fastball" is dropped
        assert_eq!(
            prepared.feature_names(),
            &["speed", "pitch_Curveball", "pitch_Slider"]
        );
    }

    #[test]
    fn test_bake_encodes_indicators() {
        let prepared = full_recipe().prep(&sample()).unwrap();
        let baked = prepared.bake(&sample()).unwrap();

        assert_eq!(baked.rows.len(), 5);
        assert_eq!(baked.rows[0], vec![90.0, 0.0, 1.0]);
        assert_eq!(baked.rows[1], vec![95.0, 0.0, 0.0]);
        // Null pitch imputed to the mode "Slider"
        assert_eq!(baked.rows[2], vec![100.0, 0.0, 1.0]);
        assert_eq!(baked.rows[4], vec![110.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unseen_level_encodes_as_zeros() {
        let prepared = full_recipe().prep(&sample()).unwrap();
        let new_data = df! {
            "hr" => ["no"],
            "speed" => [85.0f64],
            "pitch" => ["Knuckleball"],
        }
        .unwrap();

        let baked = prepared.bake(&new_data).unwrap();
        assert_eq!(baked.rows[0], vec![85.0, 0.0, 0.0]);
    }

    #[test]
    fn test_null_level_at_dummy_step_is_rejected() {
        let training = df! {
            "hr" => ["no", "yes", "no"],
            "pitch" => ["Changeup", "Slider", "Slider"],
        }
        .unwrap();
        let prepared = Recipe::new("hr", ["pitch"])
            .step_dummy(Selector::AllNominalPredictors)
            .prep(&training)
            .unwrap();
        let new_data = df! {
            "hr" => ["no"],
            "pitch" => [None::<&str>],
        }
        .unwrap();

        let err = prepared.bake(&new_data).unwrap_err();
        assert!(matches!(err, ModelError::MissingValues { ref column } if column == "pitch"));
    }

    #[test]
    fn test_null_level_without_mode_step_fails_prep() {
        let err = Recipe::new("hr", ["speed", "pitch"])
            .step_impute_median(Selector::AllNumericPredictors)
            .step_dummy(Selector::AllNominalPredictors)
            .prep(&sample())
            .unwrap_err();
        assert!(matches!(err, ModelError::MissingValues { ref column } if column == "pitch"));
    }

    #[test]
    fn test_missing_predictor_is_fatal() {
        let prepared = full_recipe().prep(&sample()).unwrap();
        let no_pitch = sample().drop("pitch").unwrap();

        let err = prepared.bake(&no_pitch).unwrap_err();
        assert!(matches!(err, ModelError::MissingColumn { ref column, .. } if column == "pitch"));
    }

    #[test]
    fn test_unencoded_nominal_is_rejected() {
        let recipe = Recipe::new("hr", ["speed", "pitch"])
            .step_impute_median(Selector::AllNumericPredictors);
        let err = recipe.prep(&sample()).unwrap_err();
        assert!(matches!(err, ModelError::NominalNotEncoded { .. }));
    }

    #[test]
    fn test_remaining_nulls_are_rejected_at_bake() {
        let recipe = Recipe::new("hr", ["speed"]);
        let prepared = recipe.prep(&sample()).unwrap();
        let err = prepared.bake(&sample()).unwrap_err();
        assert!(matches!(err, ModelError::MissingValues { .. }));
    }

    #[test]
    fn test_median_step_on_nominal_column_fails() {
        let recipe = Recipe::new("hr", ["pitch"])
            .step_impute_median(Selector::Columns(vec!["pitch".to_string()]));
        let err = recipe.prep(&sample()).unwrap_err();
        assert!(matches!(err, ModelError::WrongColumnKind { step: "impute_median", .. }));
    }

    #[test]
    fn test_formula() {
        assert_eq!(full_recipe().formula(), "hr ~ speed + pitch");
    }

    #[test]
    fn test_mode_tie_breaks_lexicographically() {
        let values = vec![Some("b".to_string()), Some("a".to_string()), None];
        assert_eq!(mode(&values), Some("a".to_string()));
    }
}
