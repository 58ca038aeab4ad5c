//! Seeded stratified train/test split

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, instrument};

use super::rows::{stratum_groups, take_rows};

/// Slack for products like `0.29 * 100` landing just under an integer.
const FLOOR_EPS: f64 = 1e-9;

/// Disjoint train/test partition of a table.
#[derive(Debug, Clone)]
pub struct Split {
    pub train: DataFrame,
    pub test: DataFrame,
    /// Input row indices of the training rows, ascending
    pub train_rows: Vec<usize>,
    /// Input row indices of the test rows, ascending
    pub test_rows: Vec<usize>,
}

/// Row counts of a split, for reports.
#[derive(Debug, Clone, Serialize)]
pub struct SplitSizes {
    pub train: usize,
    pub test: usize,
    pub prop: f64,
}

impl Split {
    pub fn sizes(&self, prop: f64) -> SplitSizes {
        SplitSizes {
            train: self.train.height(),
            test: self.test.height(),
            prop,
        }
    }
}

/// Split `df` so that `floor(n * prop)` rows go to training, allocated
/// across the values of `strata` by largest remainder.
///
/// Rows are drawn at random within each stratum with a generator seeded by
/// `seed`; both sides keep the input's row order.
#[instrument(skip(df), fields(rows = df.height()))]
pub fn stratified_split(df: &DataFrame, prop: f64, strata: &str, seed: u64) -> Result<Split> {
    if !(prop > 0.0 && prop < 1.0) {
        anyhow::bail!("Split fraction must be strictly between 0 and 1, got {}", prop);
    }
    let n = df.height();
    if n == 0 {
        anyhow::bail!("Cannot split an empty table");
    }

    let groups = stratum_groups(df, strata)
        .with_context(|| format!("Failed to stratify on '{}'", strata))?;
    let sizes: Vec<usize> = groups.iter().map(Vec::len).collect();
    let quotas = allocate_quotas(&sizes, prop, n);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_rows = Vec::with_capacity(quotas.iter().sum());
    let mut test_rows = Vec::with_capacity(n);
    for (mut group, quota) in groups.into_iter().zip(&quotas) {
        group.shuffle(&mut rng);
        train_rows.extend_from_slice(&group[..*quota]);
        test_rows.extend_from_slice(&group[*quota..]);
    }
    train_rows.sort_unstable();
    test_rows.sort_unstable();

    debug!(train = train_rows.len(), test = test_rows.len(), strata_count = sizes.len(), "split drawn");

    Ok(Split {
        train: take_rows(df, &train_rows)?,
        test: take_rows(df, &test_rows)?,
        train_rows,
        test_rows,
    })
}

/// Per-stratum training quotas summing to `floor(n * prop)`.
///
/// Each stratum first gets the floor of its exact share; the leftover rows
/// go to the strata with the largest fractional parts, earlier strata first
/// on ties.
fn allocate_quotas(sizes: &[usize], prop: f64, n: usize) -> Vec<usize> {
    let target = ((n as f64) * prop + FLOOR_EPS).floor() as usize;

    let exact: Vec<f64> = sizes.iter().map(|&s| s as f64 * prop).collect();
    let mut quotas: Vec<usize> = exact
        .iter()
        .zip(sizes)
        .map(|(&e, &s)| ((e + FLOOR_EPS).floor() as usize).min(s))
        .collect();

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = exact[a] - quotas[a] as f64;
        let rb = exact[b] - quotas[b] as f64;
        rb.total_cmp(&ra).then(a.cmp(&b))
    });

    let mut remaining = target.saturating_sub(quotas.iter().sum());
    for &i in order.iter().cycle().take(order.len() * 2) {
        if remaining == 0 {
            break;
        }
        if quotas[i] < sizes[i] {
            quotas[i] += 1;
            remaining -= 1;
        }
    }
    quotas
}
