//! Row-index helpers shared by the split and resampling code

use std::collections::BTreeMap;

use polars::prelude::*;

/// Row indices grouped by the value of `column`, groups ordered by value
/// with the null stratum last.
pub fn stratum_groups(df: &DataFrame, column: &str) -> PolarsResult<Vec<Vec<usize>>> {
    let cast = df.column(column)?.cast(&DataType::String)?;

    let mut groups: BTreeMap<Option<String>, Vec<usize>> = BTreeMap::new();
    for (i, value) in cast.str()?.into_iter().enumerate() {
        groups.entry(value.map(|s| s.to_string())).or_default().push(i);
    }

    // BTreeMap puts None first
    let nulls = groups.remove(&None);
    let mut ordered: Vec<Vec<usize>> = groups.into_values().collect();
    ordered.extend(nulls);
    Ok(ordered)
}

/// The rows of `df` at `rows`, in that order.
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> PolarsResult<DataFrame> {
    let idx: Vec<IdxSize> = rows.iter().map(|&i| i as IdxSize).collect();
    df.take(&IdxCa::from_vec("idx".into(), idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_sorted_with_nulls_last() {
        let df = df! {
            "pitch" => [Some("Slider"), None, Some("Changeup"), Some("Slider"), None],
        }
        .unwrap();
        let groups = stratum_groups(&df, "pitch").unwrap();
        assert_eq!(groups, vec![vec![2], vec![0, 3], vec![1, 4]]);
    }

    #[test]
    fn test_numeric_strata_grouped_by_value() {
        let df = df! { "hr" => [1i32, 0, 1, 0, 0] }.unwrap();
        let groups = stratum_groups(&df, "hr").unwrap();
        assert_eq!(groups, vec![vec![1, 3, 4], vec![0, 2]]);
    }

    #[test]
    fn test_unknown_column_errors() {
        let df = df! { "hr" => [true, false] }.unwrap();
        assert!(stratum_groups(&df, "is_home_run").is_err());
    }

    #[test]
    fn test_take_rows_follows_index_order() {
        let df = df! { "id" => [10i64, 20, 30, 40] }.unwrap();
        let taken = take_rows(&df, &[3, 0]).unwrap();
        let ids: Vec<Option<i64>> = taken.column("id").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some(40), Some(10)]);
    }
}
