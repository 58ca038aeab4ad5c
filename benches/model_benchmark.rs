//! Benchmarks for tree fitting, cross-validation and the stratified split
//!
//! Run with: cargo bench --bench model_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;

use dinger::model::{fit_resamples, vfold_cv, Recipe, Selector, TreeSpec, Workflow};
use dinger::pipeline::stratified_split;

/// Batted balls where hard-hit balls in a narrow angle window leave the park
fn generate_batted_balls(n_rows: usize, seed: u64) -> DataFrame {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let pitches = ["4-Seam Fastball", "Slider", "Changeup", "Curveball", "Sinker"];

    let speed: Vec<f64> = (0..n_rows).map(|_| rng.gen_range(60.0..115.0)).collect();
    let angle: Vec<f64> = (0..n_rows).map(|_| rng.gen_range(-30.0..60.0)).collect();
    let release: Vec<f64> = (0..n_rows).map(|_| rng.gen_range(78.0..100.0)).collect();
    let pitch: Vec<&str> = (0..n_rows)
        .map(|_| pitches[rng.gen_range(0..pitches.len())])
        .collect();
    let homer: Vec<bool> = speed
        .iter()
        .zip(&angle)
        .map(|(&s, &a)| s >= 100.0 && (22.0..=36.0).contains(&a))
        .collect();

    df! {
        "launch_speed" => speed,
        "launch_angle" => angle,
        "release_speed" => release,
        "pitch_name" => pitch,
        "is_home_run" => homer,
    }
    .expect("Failed to create DataFrame")
}

fn workflow(depth: usize) -> Workflow {
    let recipe = Recipe::new(
        "is_home_run",
        ["launch_speed", "launch_angle", "release_speed", "pitch_name"],
    )
    .step_impute_median(Selector::AllNumericPredictors)
    .step_impute_mode(Selector::AllNominalPredictors)
    .step_dummy(Selector::AllNominalPredictors);
    Workflow::new(recipe, TreeSpec::default().with_tree_depth(depth))
}

/// Single fit at increasing table sizes and depths
fn benchmark_tree_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_fit");

    for n_rows in [1_000, 10_000, 50_000] {
        let df = generate_batted_balls(n_rows, 42);
        group.throughput(Throughput::Elements(n_rows as u64));

        for depth in [3, 8, 30] {
            let wf = workflow(depth);
            group.bench_with_input(
                BenchmarkId::new(format!("depth_{}", depth), n_rows),
                &df,
                |b, df| {
                    b.iter(|| {
                        let _ = wf.fit(black_box(df));
                    });
                },
            );
        }
    }

    group.finish();
}

fn benchmark_cross_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("cross_validation");
    group.sample_size(10);

    for n_rows in [5_000, 20_000] {
        let df = generate_batted_balls(n_rows, 7);
        let folds = vfold_cv(&df, 10, Some("is_home_run"), 42).expect("Failed to build folds");
        let wf = workflow(6);

        group.bench_with_input(BenchmarkId::new("10_fold", n_rows), &df, |b, df| {
            b.iter(|| {
                let _ = fit_resamples(black_box(&wf), black_box(df), black_box(&folds), None);
            });
        });
    }

    group.finish();
}

fn benchmark_stratified_split(c: &mut Criterion) {
    let mut group = c.benchmark_group("stratified_split");

    for n_rows in [10_000, 100_000] {
        let df = generate_batted_balls(n_rows, 3);
        group.throughput(Throughput::Elements(n_rows as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n_rows), &df, |b, df| {
            b.iter(|| {
                let _ = stratified_split(black_box(df), 0.85, "is_home_run", 42);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_tree_fit,
    benchmark_cross_validation,
    benchmark_stratified_split
);
criterion_main!(benches);
