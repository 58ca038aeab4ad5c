//! Integration tests for join, outcome, split and aggregation on batted-ball data

use dinger::pipeline::{
    add_barrel_zone, count_by, left_join, profile, resolve_outcome, stratified_split, summarize,
    OutcomeSource, Stat, COUNT_COLUMN,
};
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

fn joined_with_outcome(rows: usize) -> DataFrame {
    let events = common::create_events_dataframe(rows, 11);
    let parks = common::create_parks_dataframe();
    let joined = left_join(&events, &parks, "park").unwrap();
    let (df, _, _) = resolve_outcome(&joined, "is_home_run", "events").unwrap();
    df
}

fn sum_counts(df: &DataFrame) -> i64 {
    df.column(COUNT_COLUMN)
        .unwrap()
        .cast(&DataType::Int64)
        .unwrap()
        .i64()
        .unwrap()
        .sum()
        .unwrap()
}

#[test]
fn test_join_keeps_every_event_row() {
    let events = common::create_events_dataframe(200, 3);
    let parks = common::create_parks_dataframe();

    let joined = left_join(&events, &parks, "park").unwrap();

    assert_eq!(joined.height(), events.height());
    assert_eq!(joined.width(), events.width() + parks.width() - 1);
    assert_eq!(joined.column("cf_dist").unwrap().null_count(), 0);
    assert!(joined
        .column("events")
        .unwrap()
        .equals(events.column("events").unwrap()));
}

#[test]
fn test_join_unknown_park_gives_null_dimensions() {
    let events = df! {
        "park" => ["Fenway", "Dome of Nowhere"],
        "launch_speed" => [101.0f64, 95.0],
    }
    .unwrap();
    let parks = common::create_parks_dataframe();

    let joined = left_join(&events, &parks, "park").unwrap();

    assert_eq!(joined.height(), 2);
    let lf = joined.column("lf_dist").unwrap().i64().unwrap();
    assert_eq!(lf.get(0), Some(310));
    assert_eq!(lf.get(1), None);
}

#[test]
fn test_outcome_derived_from_events() {
    let events = common::create_events_dataframe(300, 5);
    let (df, source, levels) = resolve_outcome(&events, "is_home_run", "events").unwrap();

    assert_eq!(
        source,
        OutcomeSource::Derived {
            from: "events".to_string()
        }
    );
    assert_eq!(levels, vec!["false".to_string(), "true".to_string()]);

    let homers = events
        .column("events")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .filter(|e| *e == Some("home_run"))
        .count();
    assert_eq!(common::count_true(&df, "is_home_run"), homers);
}

#[test]
fn test_outcome_with_three_levels_is_rejected() {
    let df = df! { "result" => ["hr", "out", "single", "hr"] }.unwrap();
    let err = resolve_outcome(&df, "result", "events").unwrap_err();
    assert!(err.to_string().contains("3 levels"));
}

#[test]
fn test_stratified_split_preserves_class_balance() {
    let df = joined_with_outcome(400);
    let total_hr = common::count_true(&df, "is_home_run");

    let split = stratified_split(&df, 0.85, "is_home_run", 42).unwrap();
    let train_hr = common::count_true(&split.train, "is_home_run");

    assert_eq!(split.train.height() + split.test.height(), 400);
    assert_eq!(split.train.height(), 340);
    let expected = total_hr as f64 * 0.85;
    assert!((train_hr as f64 - expected).abs() <= 1.0);
}

#[test]
fn test_stratified_split_is_reproducible() {
    let df = joined_with_outcome(150);
    let a = stratified_split(&df, 0.7, "is_home_run", 9).unwrap();
    let b = stratified_split(&df, 0.7, "is_home_run", 9).unwrap();
    let c = stratified_split(&df, 0.7, "is_home_run", 10).unwrap();

    assert_eq!(a.train_rows, b.train_rows);
    assert_ne!(a.train_rows, c.train_rows);
}

#[test]
fn test_grouped_summary_by_pitch() {
    let df = joined_with_outcome(400);
    let mut stats = vec![
        Stat::Count,
        Stat::Share,
        Stat::PropTrue("is_home_run".to_string()),
    ];
    stats.extend(Stat::numeric_summary("launch_speed"));

    let summary = summarize(&df, &["pitch_name"], &stats, true).unwrap();

    assert_eq!(summary.height(), common::PITCHES.len());
    assert_eq!(sum_counts(&summary), 400);
    for name in [
        "pitch_name",
        "n",
        "prop",
        "prop_true_is_home_run",
        "min_launch_speed",
        "max_launch_speed",
        "mean_launch_speed",
        "median_launch_speed",
        "sd_launch_speed",
    ] {
        assert!(summary.column(name).is_ok(), "missing column {}", name);
    }
    let share: f64 = summary.column("prop").unwrap().f64().unwrap().sum().unwrap();
    assert!((share - 1.0).abs() < 1e-9);
}

#[test]
fn test_barrel_zone_counts() {
    let df = joined_with_outcome(400);
    let with_barrels = add_barrel_zone(&df, "launch_speed", "launch_angle").unwrap();

    let counts = count_by(&with_barrels, &["barrel_zone", "is_home_run"]).unwrap();

    assert_eq!(sum_counts(&counts), 400);
    let first = counts.column(COUNT_COLUMN).unwrap().cast(&DataType::Int64).unwrap();
    let first = first.i64().unwrap();
    assert!(first.get(0) >= first.get(counts.height() - 1));
}

#[test]
fn test_profile_reports_launch_speed_nulls() {
    let df = joined_with_outcome(400);
    let table = profile(&df).unwrap();

    assert_eq!(table.rows, 400);
    assert_eq!(table.cols, df.width());
    let speed = table
        .columns
        .iter()
        .find(|c| c.name == "launch_speed")
        .unwrap();
    assert_eq!(speed.null_count, df.column("launch_speed").unwrap().null_count());
    assert!(speed.numeric.is_some());
}
