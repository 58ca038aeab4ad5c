//! Outcome column resolution and validation
//!
//! The classifier needs a two-level outcome. A table may carry it directly
//! (boolean, 0/1 or two labels), or only the raw Statcast `events` column,
//! in which case the label is derived.

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::Serialize;

use super::features::add_home_run_label;

/// How the outcome column came to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OutcomeSource {
    /// Present in the loaded data
    Present,
    /// Derived from a raw events column
    Derived { from: String },
}

/// Make sure `df` has a usable `target`, deriving it from `events_column`
/// when it is absent, and return the two outcome levels.
pub fn resolve_outcome(
    df: &DataFrame,
    target: &str,
    events_column: &str,
) -> Result<(DataFrame, OutcomeSource, Vec<String>)> {
    let has = |name: &str| df.get_column_names().iter().any(|c| c.as_str() == name);

    let (resolved, source) = if has(target) {
        (df.clone(), OutcomeSource::Present)
    } else if has(events_column) {
        let derived = add_home_run_label(df, events_column, target)
            .with_context(|| format!("Failed to derive '{}' from '{}'", target, events_column))?;
        (
            derived,
            OutcomeSource::Derived {
                from: events_column.to_string(),
            },
        )
    } else {
        anyhow::bail!(
            "Target column '{}' not found and no '{}' column to derive it from",
            target,
            events_column
        );
    };

    let levels = binary_levels(&resolved, target)?;
    Ok((resolved, source, levels))
}

/// The two distinct non-null values of `target`, sorted.
pub fn binary_levels(df: &DataFrame, target: &str) -> Result<Vec<String>> {
    let column = df
        .column(target)
        .with_context(|| format!("Target column '{}' not found", target))?;

    if column.len() == 0 {
        anyhow::bail!("Target column '{}' is empty", target);
    }
    if column.null_count() == column.len() {
        anyhow::bail!("Target column '{}' contains only null values", target);
    }

    let levels = unique_values_as_strings(column)?;
    match levels.len() {
        2 => Ok(levels),
        1 => anyhow::bail!(
            "Target column '{}' has a single level {:?}; a two-class outcome is required",
            target,
            levels
        ),
        n => anyhow::bail!(
            "Target column '{}' has {} levels; a two-class outcome is required. Levels: {:?}",
            target,
            n,
            preview(&levels)
        ),
    }
}

fn unique_values_as_strings(column: &Column) -> Result<Vec<String>> {
    let cast = column.drop_nulls().unique()?.cast(&DataType::String)?;
    let mut values: Vec<String> = cast
        .str()?
        .into_iter()
        .flatten()
        .map(|s| s.to_string())
        .collect();
    values.sort();
    Ok(values)
}

fn preview(levels: &[String]) -> Vec<&str> {
    levels.iter().take(10).map(|s| s.as_str()).collect()
}
