//! Grouped and ungrouped summary statistics

use std::fmt;

use anyhow::{Context, Result};
use polars::prelude::*;
use serde::Serialize;

use super::transform::ensure_columns;

/// Output column for [`Stat::Count`].
pub const COUNT_COLUMN: &str = "n";
/// Output column for [`Stat::Share`].
pub const SHARE_COLUMN: &str = "prop";

/// One requested summary statistic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stat {
    /// Rows in the group
    Count,
    /// Group rows over all rows
    Share,
    /// Mean of a boolean or 0/1 column
    PropTrue(String),
    Min(String),
    Max(String),
    Mean(String),
    Median(String),
    /// Sample standard deviation (n - 1)
    Sd(String),
}

impl Stat {
    /// Column the statistic reads, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Stat::Count | Stat::Share => None,
            Stat::PropTrue(c)
            | Stat::Min(c)
            | Stat::Max(c)
            | Stat::Mean(c)
            | Stat::Median(c)
            | Stat::Sd(c) => Some(c),
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Stat::Count => COUNT_COLUMN,
            Stat::Share => SHARE_COLUMN,
            Stat::PropTrue(_) => "prop_true",
            Stat::Min(_) => "min",
            Stat::Max(_) => "max",
            Stat::Mean(_) => "mean",
            Stat::Median(_) => "median",
            Stat::Sd(_) => "sd",
        }
    }

    /// `n`, `prop`, or `<stat>_<column>`.
    pub fn output_name(&self) -> String {
        match self.column() {
            Some(column) => format!("{}_{}", self.prefix(), column),
            None => self.prefix().to_string(),
        }
    }

    /// The numeric statistics for `column` in the usual reporting order.
    pub fn numeric_summary(column: &str) -> Vec<Stat> {
        vec![
            Stat::Min(column.to_string()),
            Stat::Max(column.to_string()),
            Stat::Mean(column.to_string()),
            Stat::Median(column.to_string()),
            Stat::Sd(column.to_string()),
        ]
    }

    fn expr(&self, total_rows: usize, skip_nulls: bool) -> Expr {
        let name = self.output_name();
        let (column, reduced) = match self {
            Stat::Count => return len().alias(name),
            Stat::Share => {
                return (len().cast(DataType::Float64) / lit(total_rows as f64)).alias(name)
            }
            Stat::PropTrue(c) | Stat::Mean(c) => (c, numeric(c).mean()),
            Stat::Min(c) => (c, numeric(c).min()),
            Stat::Max(c) => (c, numeric(c).max()),
            Stat::Median(c) => (c, numeric(c).median()),
            Stat::Sd(c) => (c, numeric(c).std(1)),
        };

        if skip_nulls {
            reduced.alias(name)
        } else {
            when(col(column.as_str()).null_count().gt(lit(0)))
                .then(lit(NULL).cast(DataType::Float64))
                .otherwise(reduced)
                .alias(name)
        }
    }
}

fn numeric(column: &str) -> Expr {
    col(column).cast(DataType::Float64)
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.output_name())
    }
}

/// One row per distinct combination of `group_by` (one row overall when
/// empty) with a column per statistic, sorted by the group keys.
///
/// Without `skip_nulls`, a statistic over a column holding any null within
/// the group is null.
pub fn summarize(
    df: &DataFrame,
    group_by: &[&str],
    stats: &[Stat],
    skip_nulls: bool,
) -> Result<DataFrame> {
    if stats.is_empty() {
        anyhow::bail!("At least one statistic must be requested");
    }
    ensure_columns(df, group_by)?;
    let stat_columns: Vec<&str> = stats.iter().filter_map(Stat::column).collect();
    ensure_columns(df, &stat_columns)?;

    let total = df.height();
    let exprs: Vec<Expr> = stats.iter().map(|s| s.expr(total, skip_nulls)).collect();

    let lf = df.clone().lazy();
    let out = if group_by.is_empty() {
        lf.select(exprs)
    } else {
        let keys: Vec<Expr> = group_by.iter().map(|k| col(*k)).collect();
        lf.group_by(keys)
            .agg(exprs)
            .sort(group_by.to_vec(), SortMultipleOptions::default().with_nulls_last(true))
    };

    out.collect()
        .with_context(|| format!("Failed to summarize by {:?}", group_by))
}

/// Frequency table: rows per combination of `columns` with its share,
/// most frequent first.
pub fn count_by(df: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    if columns.is_empty() {
        anyhow::bail!("count_by needs at least one column");
    }
    let counts = summarize(df, columns, &[Stat::Count, Stat::Share], true)?;
    let sorted = counts
        .lazy()
        .sort(
            [COUNT_COLUMN],
            SortMultipleOptions::default()
                .with_order_descending(true)
                .with_maintain_order(true),
        )
        .collect()?;
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pitches() -> DataFrame {
        df! {
            "pitch_name" => ["Slider", "4-Seam Fastball", "Slider", "Changeup", "4-Seam Fastball", "Slider", "Changeup"],
            "launch_speed" => [Some(90.0f64), Some(100.0), None, Some(80.0), Some(104.0), Some(96.0), Some(84.0)],
            "is_home_run" => [false, true, false, false, true, false, false],
        }
        .unwrap()
    }

    fn f64s(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name).unwrap().f64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_grouped_summary_with_null_skipping() {
        let stats = Stat::numeric_summary("launch_speed");
        let out = summarize(&pitches(), &["pitch_name"], &stats, true).unwrap();
        assert_eq!(out.height(), 3);
        for stat in &stats {
            assert_eq!(out.column(&stat.output_name()).unwrap().null_count(), 0);
        }
        // sorted by key
        let keys: Vec<Option<&str>> = out.column("pitch_name").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(keys, vec![Some("4-Seam Fastball"), Some("Changeup"), Some("Slider")]);
        assert_eq!(f64s(&out, "mean_launch_speed")[2], Some(93.0));
    }

    #[test]
    fn test_nulls_poison_statistics_by_default() {
        let out = summarize(
            &pitches(),
            &["pitch_name"],
            &[Stat::Mean("launch_speed".into())],
            false,
        )
        .unwrap();
        assert_eq!(
            f64s(&out, "mean_launch_speed"),
            vec![Some(102.0), Some(82.0), None]
        );
    }

    #[test]
    fn test_single_row_group_has_null_sd() {
        let df = df! {
            "pitch_name" => ["Slider", "Slider", "Knuckleball"],
            "launch_speed" => [90.0f64, 96.0, 71.0],
        }
        .unwrap();
        let out = summarize(&df, &["pitch_name"], &Stat::numeric_summary("launch_speed"), true).unwrap();
        // Knuckleball sorts first; one row has no sample deviation
        assert_eq!(f64s(&out, "sd_launch_speed")[0], None);
        assert_eq!(f64s(&out, "mean_launch_speed")[0], Some(71.0));
        assert!(f64s(&out, "sd_launch_speed")[1].unwrap() > 0.0);
    }

    #[test]
    fn test_ungrouped_summary() {
        let out = summarize(
            &pitches(),
            &[],
            &[Stat::Count, Stat::PropTrue("is_home_run".into()), Stat::Sd("launch_speed".into())],
            true,
        )
        .unwrap();
        assert_eq!(out.height(), 1);
        let prop = f64s(&out, "prop_true_is_home_run")[0].unwrap();
        assert!((prop - 2.0 / 7.0).abs() < 1e-12);
        assert!(f64s(&out, "sd_launch_speed")[0].unwrap() > 0.0);
    }

    #[test]
    fn test_count_by_sorted_descending() {
        let out = count_by(&pitches(), &["pitch_name"]).unwrap();
        let keys: Vec<Option<&str>> = out.column("pitch_name").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(keys, vec![Some("Slider"), Some("4-Seam Fastball"), Some("Changeup")]);

        let share = f64s(&out, SHARE_COLUMN);
        let total: f64 = share.iter().flatten().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_column_rejected() {
        let err = summarize(&pitches(), &["park"], &[Stat::Count], true).unwrap_err();
        assert!(err.to_string().contains("park"));
    }

    #[test]
    fn test_output_names() {
        assert_eq!(Stat::Count.output_name(), "n");
        assert_eq!(Stat::Share.output_name(), "prop");
        assert_eq!(Stat::Sd("launch_angle".into()).output_name(), "sd_launch_angle");
    }
}
