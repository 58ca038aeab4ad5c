//! Batted-ball feature derivations
//!
//! The expression builders compose with [`super::transform::derive`]; the
//! `add_*` helpers check their inputs and bind the column in one step.

use std::f64::consts::PI;

use anyhow::{Context, Result};
use polars::prelude::*;

use super::transform::{derive, ensure_columns};

/// Home plate position in Statcast hit-coordinate space.
const HOME_X: f64 = 125.42;
const HOME_Y: f64 = 198.27;

/// Barrel window at the 98 mph threshold and its limits.
const BARREL_MIN_SPEED: f64 = 98.0;
const BARREL_LOW: f64 = 26.0;
const BARREL_HIGH: f64 = 30.0;
const BARREL_LOW_LIMIT: f64 = 8.0;
const BARREL_HIGH_LIMIT: f64 = 50.0;

/// `events == "home_run"`; null events stay null.
pub fn home_run_label(events: &str) -> Expr {
    col(events).cast(DataType::String).eq(lit("home_run"))
}

/// Horizontal spray angle in degrees; negative is toward the left-field line.
pub fn spray_angle(hc_x: &str, hc_y: &str) -> Expr {
    let ratio = (col(hc_x).cast(DataType::Float64) - lit(HOME_X))
        / (lit(HOME_Y) - col(hc_y).cast(DataType::Float64));
    ratio.arctan() * lit(180.0 / PI)
}

/// Whether a ball was struck in the barrel zone: at least 98 mph with a
/// launch angle inside a window that opens one degree downward per mph and
/// 20/18 degrees upward per mph, capped at 8 and 50 degrees.
pub fn barrel_zone(launch_speed: &str, launch_angle: &str) -> Expr {
    let speed = col(launch_speed).cast(DataType::Float64);
    let angle = col(launch_angle).cast(DataType::Float64);
    let excess = speed.clone() - lit(BARREL_MIN_SPEED);

    let low = lit(BARREL_LOW) - excess.clone();
    let low = when(low.clone().lt(lit(BARREL_LOW_LIMIT)))
        .then(lit(BARREL_LOW_LIMIT))
        .otherwise(low);
    let high = lit(BARREL_HIGH) + excess * lit(20.0 / 18.0);
    let high = when(high.clone().gt(lit(BARREL_HIGH_LIMIT)))
        .then(lit(BARREL_HIGH_LIMIT))
        .otherwise(high);

    let inside = speed
        .clone()
        .gt_eq(lit(BARREL_MIN_SPEED))
        .and(angle.clone().gt_eq(low))
        .and(angle.clone().lt_eq(high));

    when(speed.is_null().or(angle.is_null()))
        .then(lit(NULL).cast(DataType::Boolean))
        .otherwise(inside)
}

pub fn add_home_run_label(df: &DataFrame, events: &str, target: &str) -> Result<DataFrame> {
    ensure_columns(df, &[events])?;
    derive(df, target, home_run_label(events))
}

pub fn add_spray_angle(df: &DataFrame, hc_x: &str, hc_y: &str) -> Result<DataFrame> {
    ensure_columns(df, &[hc_x, hc_y])?;
    derive(df, "spray_angle", spray_angle(hc_x, hc_y))
}

pub fn add_barrel_zone(df: &DataFrame, launch_speed: &str, launch_angle: &str) -> Result<DataFrame> {
    ensure_columns(df, &[launch_speed, launch_angle])?;
    derive(df, "barrel_zone", barrel_zone(launch_speed, launch_angle))
}

/// Rename every column to lower snake case (`LaunchSpeed` -> `launch_speed`).
pub fn lower_case_names(df: &DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| snake_case(name))
        .collect();

    let mut renamed = df.clone();
    renamed
        .set_column_names(names.iter().map(|s| s.as_str()))
        .context("Renaming produced duplicate column names")?;
    Ok(renamed)
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() {
                if matches!(prev, Some(p) if p.is_lowercase() || p.is_ascii_digit()) {
                    out.push('_');
                }
                out.extend(ch.to_lowercase());
            } else {
                out.push(ch);
            }
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
        prev = Some(ch);
    }
    out.trim_end_matches('_').to_string()
}
