//! Shared test utilities and batted-ball fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const PARKS: &[&str] = &["Fenway", "Wrigley", "Coors", "Oracle"];
pub const PITCHES: &[&str] = &["4-Seam Fastball", "Slider", "Changeup", "Curveball"];

/// Synthetic batted-ball events.
///
/// A ball is a home run when it is hit at least 100 mph with a launch angle
/// between 22 and 36 degrees, so a shallow tree on speed and angle separates
/// the classes almost perfectly. About one non-homer launch speed in twenty
/// is null.
pub fn create_events_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut events = Vec::with_capacity(rows);
    let mut park = Vec::with_capacity(rows);
    let mut launch_speed: Vec<Option<f64>> = Vec::with_capacity(rows);
    let mut launch_angle = Vec::with_capacity(rows);
    let mut release_speed = Vec::with_capacity(rows);
    let mut plate_x = Vec::with_capacity(rows);
    let mut plate_z = Vec::with_capacity(rows);
    let mut pitch_name = Vec::with_capacity(rows);
    let mut stand = Vec::with_capacity(rows);
    let mut p_throws = Vec::with_capacity(rows);

    for _ in 0..rows {
        let speed: f64 = rng.gen_range(60.0..115.0);
        let angle: f64 = rng.gen_range(-30.0..60.0);
        let homer = speed >= 100.0 && (22.0..=36.0).contains(&angle);
        let outcome = if homer {
            "home_run"
        } else if angle < 10.0 {
            "field_out"
        } else if rng.gen_bool(0.3) {
            "single"
        } else {
            "fly_out"
        };

        events.push(outcome.to_string());
        park.push(PARKS[rng.gen_range(0..PARKS.len())].to_string());
        launch_speed.push(if !homer && rng.gen_bool(0.05) {
            None
        } else {
            Some(speed)
        });
        launch_angle.push(angle);
        release_speed.push(rng.gen_range(78.0..100.0));
        plate_x.push(rng.gen_range(-1.5..1.5));
        plate_z.push(rng.gen_range(1.0..4.0));
        pitch_name.push(PITCHES[rng.gen_range(0..PITCHES.len())].to_string());
        stand.push(if rng.gen_bool(0.6) { "R" } else { "L" }.to_string());
        p_throws.push(if rng.gen_bool(0.7) { "R" } else { "L" }.to_string());
    }

    df! {
        "events" => events,
        "park" => park,
        "launch_speed" => launch_speed,
        "launch_angle" => launch_angle,
        "release_speed" => release_speed,
        "plate_x" => plate_x,
        "plate_z" => plate_z,
        "pitch_name" => pitch_name,
        "stand" => stand,
        "p_throws" => p_throws,
    }
    .unwrap()
}

/// Park dimensions keyed by `park`.
pub fn create_parks_dataframe() -> DataFrame {
    df! {
        "park" => PARKS,
        "lf_dist" => [310i64, 355, 347, 339],
        "cf_dist" => [390i64, 400, 415, 399],
        "rf_dist" => [302i64, 353, 350, 309],
        "altitude_ft" => [20i64, 595, 5200, 0],
    }
    .unwrap()
}

/// Write `df` as CSV into `dir` under `name`.
pub fn write_csv(dir: &Path, name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
    path
}

/// Write `df` as Parquet into `dir` under `name`.
pub fn write_parquet(dir: &Path, name: &str, df: &mut DataFrame) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();
    path
}

/// Temporary directory holding `events.csv` and `parks.csv`.
pub fn create_fixture_files(rows: usize) -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let events = write_csv(
        temp_dir.path(),
        "events.csv",
        &mut create_events_dataframe(rows, 7),
    );
    let parks = write_csv(temp_dir.path(), "parks.csv", &mut create_parks_dataframe());
    (temp_dir, events, parks)
}

/// Number of `true` values in a boolean column.
pub fn count_true(df: &DataFrame, column: &str) -> usize {
    df.column(column).unwrap().bool().unwrap().num_trues()
}
