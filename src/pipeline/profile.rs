//! Head, glimpse and per-column profile of a table

use anyhow::Result;
use polars::prelude::*;
use serde::Serialize;

/// Values shown per column by [`glimpse`].
pub const GLIMPSE_VALUES: usize = 5;

/// First `n` rows.
pub fn head(df: &DataFrame, n: usize) -> DataFrame {
    df.head(Some(n))
}

/// One line of a glimpse: a column's name, type and leading values.
#[derive(Debug, Clone, Serialize)]
pub struct GlimpseRow {
    pub name: String,
    pub dtype: String,
    pub values: Vec<String>,
}

pub fn glimpse(df: &DataFrame) -> Result<Vec<GlimpseRow>> {
    let shown = df.height().min(GLIMPSE_VALUES);
    df.get_columns()
        .iter()
        .map(|column| {
            let values = (0..shown)
                .map(|i| column.get(i).map(|v| render_value(&v)))
                .collect::<PolarsResult<Vec<String>>>()?;
            Ok(GlimpseRow {
                name: column.name().to_string(),
                dtype: column.dtype().to_string(),
                values,
            })
        })
        .collect()
}

/// Plain rendering of a cell: strings unquoted, nulls as `NA`.
pub fn render_value(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => "NA".to_string(),
        AnyValue::Float64(v) => format_float(*v),
        AnyValue::Float32(v) => format_float(*v as f64),
        other => match other.get_str() {
            Some(s) => s.to_string(),
            None => other.to_string(),
        },
    }
}

fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{:.4}", v)
            .trim_end_matches('0')
            .to_string()
    }
}

/// Summary statistics of a numeric column over its non-null values.
#[derive(Debug, Clone, Serialize)]
pub struct NumericSummary {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub sd: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
    pub null_ratio: f64,
    /// Distinct non-null values
    pub n_unique: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableProfile {
    pub rows: usize,
    pub cols: usize,
    pub columns: Vec<ColumnProfile>,
}

pub fn profile(df: &DataFrame) -> Result<TableProfile> {
    let rows = df.height();
    let columns = df
        .get_columns()
        .iter()
        .map(|column| profile_column(column, rows))
        .collect::<Result<Vec<_>>>()?;

    Ok(TableProfile {
        rows,
        cols: df.width(),
        columns,
    })
}

fn profile_column(column: &Column, rows: usize) -> Result<ColumnProfile> {
    let null_count = column.null_count();
    let n_unique = column.drop_nulls().n_unique()?;

    let numeric = if column.dtype().is_primitive_numeric() {
        let cast = column.cast(&DataType::Float64)?;
        let ca = cast.f64()?;
        Some(NumericSummary {
            min: ca.min(),
            max: ca.max(),
            mean: ca.mean(),
            median: ca.median(),
            sd: ca.std(1),
        })
    } else {
        None
    };

    Ok(ColumnProfile {
        name: column.name().to_string(),
        dtype: column.dtype().to_string(),
        null_count,
        null_ratio: if rows == 0 {
            0.0
        } else {
            null_count as f64 / rows as f64
        },
        n_unique,
        numeric,
    })
}
