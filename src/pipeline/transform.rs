//! Row filters, projections and derived columns
//!
//! Every operation takes `&DataFrame` and returns a new table; the input is
//! never modified, so a derivation only "sticks" when the caller binds the
//! result.

use anyhow::{Context, Result};
use polars::prelude::*;

/// Fail with the list of available columns if any of `columns` is absent.
pub fn ensure_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    let available = column_names(df);
    for column in columns {
        if !available.iter().any(|c| c == column) {
            anyhow::bail!(
                "Column '{}' not found. Available columns: {:?}",
                column,
                available
            );
        }
    }
    Ok(())
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names().iter().map(|s| s.to_string()).collect()
}

/// Collect a lazy plan built on `df`, naming the available columns if the
/// plan references one that does not exist.
fn collect_on(df: &DataFrame, lf: LazyFrame, action: &str) -> Result<DataFrame> {
    lf.collect().with_context(|| {
        format!(
            "Failed to {} (available columns: {:?})",
            action,
            column_names(df)
        )
    })
}

/// Rows for which `predicate` is true; null predicate results drop the row.
pub fn filter(df: &DataFrame, predicate: Expr) -> Result<DataFrame> {
    collect_on(df, df.clone().lazy().filter(predicate), "filter rows")
}

/// Projection onto `columns`, in the given order.
pub fn select(df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    ensure_columns(df, columns)?;
    Ok(df.select(columns.iter().copied())?)
}

/// Add `name` computed by `expr`, or overwrite it if it already exists.
pub fn derive(df: &DataFrame, name: &str, expr: Expr) -> Result<DataFrame> {
    collect_on(
        df,
        df.clone().lazy().with_column(expr.alias(name)),
        &format!("derive column '{}'", name),
    )
}

pub fn drop_columns(df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    ensure_columns(df, columns)?;
    Ok(df.drop_many(columns.iter().copied()))
}
