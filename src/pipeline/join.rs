//! Left join of the events table onto park dimensions

use anyhow::{Context, Result};
use polars::prelude::*;
use tracing::{debug, instrument, warn};

use super::transform::ensure_columns;

const ROW_INDEX: &str = "__dinger_row";

/// Left join `right` onto `left` by `key`.
///
/// Every left row appears exactly once and in its original position;
/// unmatched rows carry nulls in the right-hand columns. Right keys must be
/// unique. Colliding non-key columns from `right` get a `_right` suffix.
#[instrument(skip_all, fields(key = %key, left_rows = left.height(), right_rows = right.height()))]
pub fn left_join(left: &DataFrame, right: &DataFrame, key: &str) -> Result<DataFrame> {
    ensure_columns(left, &[key]).context("Join key missing from left table")?;
    ensure_columns(right, &[key]).context("Join key missing from right table")?;

    let right_key = right.column(key)?;
    let non_null = right_key.len() - right_key.null_count();
    let distinct = right_key.drop_nulls().n_unique()?;
    if distinct != non_null {
        anyhow::bail!(
            "Join key '{}' is not unique in the right table ({} distinct values over {} rows)",
            key,
            distinct,
            non_null
        );
    }

    let mut left_lf = left.clone().lazy();
    let mut right_lf = right.clone().lazy();
    let left_dtype = left.column(key)?.dtype().clone();
    let right_dtype = right_key.dtype().clone();
    if left_dtype != right_dtype {
        let common = common_key_dtype(&left_dtype, &right_dtype);
        debug!(%left_dtype, %right_dtype, %common, "casting join keys");
        left_lf = left_lf.with_column(col(key).cast(common.clone()));
        right_lf = right_lf.with_column(col(key).cast(common));
    }

    let joined = left_lf
        .with_row_index(ROW_INDEX, None)
        .join(
            right_lf,
            [col(key)],
            [col(key)],
            JoinArgs::new(JoinType::Left),
        )
        .sort([ROW_INDEX], SortMultipleOptions::default())
        .collect()
        .with_context(|| format!("Failed to join on '{}'", key))?
        .drop(ROW_INDEX)?;

    let unmatched = unmatched_rows(left, right, key, &joined)?;
    if unmatched > 0 {
        warn!(unmatched, "rows without a matching key in the right table");
    }
    debug_assert_eq!(joined.height(), left.height());
    Ok(joined)
}

/// Key dtype both sides are cast to when they differ: Int64 for two integer
/// keys, Float64 for any other pair of numeric keys, String otherwise.
fn common_key_dtype(left: &DataType, right: &DataType) -> DataType {
    match (left.is_primitive_numeric(), right.is_primitive_numeric()) {
        (true, true) if left.is_integer() && right.is_integer() => DataType::Int64,
        (true, true) => DataType::Float64,
        _ => DataType::String,
    }
}

/// Count of left rows that found no partner, judged by the first
/// right-only column being null where the left key is non-null.
fn unmatched_rows(left: &DataFrame, right: &DataFrame, key: &str, joined: &DataFrame) -> Result<usize> {
    let left_names: Vec<&str> = left.get_column_names().iter().map(|s| s.as_str()).collect();
    let marker = right
        .get_column_names()
        .into_iter()
        .map(|s| s.as_str())
        .find(|name| *name != key && !left_names.contains(name));

    let Some(marker) = marker else {
        return Ok(0);
    };

    let right_marker = right.column(marker)?;
    if right_marker.null_count() > 0 {
        // nulls in the right table itself would be indistinguishable from misses
        return Ok(0);
    }

    let missing = joined.column(marker)?.is_null();
    let keyed = joined.column(key)?.is_not_null();
    Ok((&missing & &keyed).num_trues())
}
