//! Dinger: batted-ball EDA and home-run classification CLI

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use polars::prelude::{DataFrame, DataType};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use dinger::cli::{self, AnalysisConfig, Cli, Commands};
use dinger::model::{
    finalize_workflow, fit_resamples, last_fit, tune_grid, vfold_cv, LastFit, Recipe, Selector,
    Workflow,
};
use dinger::pipeline::{
    add_barrel_zone, count_by, glimpse, left_join, load_dataset_with_progress, profile,
    resolve_outcome, stratified_split, summarize, OutcomeSource, Stat, TableProfile,
};
use dinger::report::{
    charts, confusion_table, cv_table, dataframe_table, glimpse_table, print_indented,
    profile_table, tune_table, write_report, AnalysisReport, AnalysisSummary, ModelReport,
    ReportMetadata, TuningReport,
};
use dinger::utils::{
    create_progress_bar, create_spinner, finish_with_success, finish_with_warning, print_banner,
    print_completion, print_config, print_info, print_metric, print_step_header, print_step_time,
    print_success, print_warning,
};

/// Rows shown in grouped summary tables.
const TABLE_ROWS: usize = 20;

fn init_tracing(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::Fetch {
                source,
                output,
                infer_schema_length,
            } => cli::fetch::run_fetch(source, output.as_deref(), *infer_schema_length),
        };
    }

    let config = cli.analysis_config()?;
    let (events_source, parks_source) = cli.sources()?;

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&config);

    if !cli.no_confirm && !cli::confirm_output_dir(&config.output_dir)? {
        println!("Cancelled by user.");
        return Ok(());
    }
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;

    // Step 1: Load both sources
    print_step_header(1, "Load");
    let step_start = Instant::now();
    let (events, events_rows, events_cols, events_mb) =
        load_dataset_with_progress(&events_source, cli.infer_schema_length)?;
    let (parks, parks_rows, parks_cols, _) =
        load_dataset_with_progress(&parks_source, cli.infer_schema_length)?;
    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    print_metric("Events", format!("{} rows × {} cols", events_rows, events_cols));
    print_metric("Parks", format!("{} rows × {} cols", parks_rows, parks_cols));
    print_metric("Events memory", format!("{:.2} MB", events_mb));
    let mut summary = AnalysisSummary::new(events_rows, parks_rows);
    finish_step(&mut summary, "Load", step_start);

    // Step 2: Join and resolve the outcome
    print_step_header(2, "Join");
    let step_start = Instant::now();
    let joined = left_join(&events, &parks, &config.join_key)?;
    print_success(&format!(
        "Joined on '{}': {} rows × {} cols",
        config.join_key,
        joined.height(),
        joined.width()
    ));
    let (data, outcome_source, levels) =
        resolve_outcome(&joined, &config.target, &config.events_column)?;
    if let OutcomeSource::Derived { from } = &outcome_source {
        print_info(&format!("Derived '{}' from '{}'", config.target, from));
    }
    print_metric("Outcome levels", levels.join(" / "));
    summary.joined_cols = data.width();
    finish_step(&mut summary, "Join", step_start);

    // Step 3: Profile
    print_step_header(3, "Profile");
    let step_start = Instant::now();
    let table_profile = profile(&data)?;
    print_indented(&glimpse_table(&glimpse(&data)?));
    let mut focus = config.predictor_refs();
    focus.push(config.target.as_str());
    let focus_profile = TableProfile {
        rows: table_profile.rows,
        cols: table_profile.cols,
        columns: table_profile
            .columns
            .iter()
            .filter(|c| focus.contains(&c.name.as_str()))
            .cloned()
            .collect(),
    };
    println!();
    print_indented(&profile_table(&focus_profile));
    finish_step(&mut summary, "Profile", step_start);

    // Step 4: Stratified split
    print_step_header(4, "Split");
    let step_start = Instant::now();
    let split = stratified_split(&data, config.train_fraction, &config.target, config.seed)?;
    summary.train_rows = split.train.height();
    summary.test_rows = split.test.height();
    print_metric("Train rows", split.train.height());
    print_metric("Test rows", split.test.height());
    print_indented(&dataframe_table(&count_by(&split.train, &[config.target.as_str()])?, 10));
    finish_step(&mut summary, "Split", step_start);

    // Step 5: Explore the training split
    print_step_header(5, "Explore");
    let step_start = Instant::now();
    let explore = explore_training(&split.train, &config)?;
    let chart_paths = if config.charts {
        render_charts(&explore, &config)
    } else {
        print_info("Chart rendering skipped (--no-charts)");
        Vec::new()
    };
    summary.charts_written = chart_paths.len();
    finish_step(&mut summary, "Explore", step_start);

    // Step 6: Fit and evaluate the first model
    print_step_header(6, "Model");
    let step_start = Instant::now();
    let recipe = Recipe::new(config.target.clone(), config.predictors.iter().cloned())
        .step_impute_median(Selector::AllNumericPredictors)
        .step_impute_mode(Selector::AllNominalPredictors)
        .step_dummy(Selector::AllNominalPredictors);
    let workflow = Workflow::new(recipe, config.tree);
    print_info(&format!("Formula: {}", workflow.recipe().formula()));

    let spinner = create_spinner("Fitting decision tree...");
    let initial = last_fit(&workflow, &split.train, &split.test).context("Initial fit failed")?;
    finish_with_success(&spinner, "Decision tree fitted");
    print_metric("Train accuracy", format!("{:.4}", initial.train.accuracy));
    print_metric("Test accuracy", format!("{:.4}", initial.test.accuracy));
    print_indented(&confusion_table(&initial.test.confusion));
    finish_step(&mut summary, "Model", step_start);

    // Step 7: Cross-validation on the training split
    print_step_header(7, "Cross-validate");
    let step_start = Instant::now();
    let folds = vfold_cv(&split.train, config.folds, Some(config.target.as_str()), config.seed)?;
    let pb = create_progress_bar(folds.len() as u64, "Folds");
    let cv = fit_resamples(&workflow, &split.train, &folds, Some(&pb))?;
    finish_with_success(&pb, &format!("{}-fold cross-validation complete", folds.len()));
    print_indented(&cv_table(&cv));
    summary.cv_mean_accuracy = Some(cv.mean_accuracy);
    finish_step(&mut summary, "Cross-validate", step_start);

    // Step 8: Tune tree depth
    print_step_header(8, "Tune");
    let step_start = Instant::now();
    let pb = create_progress_bar((folds.len() * config.depths.len()) as u64, "Fits");
    let tuned = tune_grid(&workflow, &split.train, &folds, &config.depths, Some(&pb))?;
    finish_with_success(&pb, &format!("{} depths evaluated", config.depths.len()));
    print_indented(&tune_table(tuned.show_best(config.top_n)));
    let best = tuned
        .select_best()
        .cloned()
        .context("Tuning produced no candidates")?;
    summary.best_depth = Some(best.tree_depth);
    finish_step(&mut summary, "Tune", step_start);

    // Step 9: Final fit with the best depth
    print_step_header(9, "Final fit");
    let step_start = Instant::now();
    let final_workflow = finalize_workflow(&workflow, &best);
    let spinner = create_spinner("Fitting final model...");
    let final_fit =
        last_fit(&final_workflow, &split.train, &split.test).context("Final fit failed")?;
    finish_with_success(&spinner, &format!("Final tree (depth {}) fitted", best.tree_depth));
    print_metric("Train accuracy", format!("{:.4}", final_fit.train.accuracy));
    print_metric("Test accuracy", format!("{:.4}", final_fit.test.accuracy));
    print_indented(&confusion_table(&final_fit.test.confusion));
    summary.train_accuracy = Some(final_fit.train.accuracy);
    summary.test_accuracy = Some(final_fit.test.accuracy);
    finish_step(&mut summary, "Final fit", step_start);

    let report = AnalysisReport {
        metadata: ReportMetadata::now(),
        config: config.clone(),
        outcome: outcome_source,
        outcome_levels: levels,
        profile: table_profile,
        split: split.sizes(config.train_fraction),
        initial_fit: model_report(&workflow, &initial),
        cross_validation: cv,
        tuning: TuningReport {
            best: Some(best),
            candidates: tuned.candidates().to_vec(),
        },
        final_fit: model_report(&final_workflow, &final_fit),
        charts: chart_paths,
    };
    let report_path = write_report(&report, &config.output_dir)?;

    summary.display();
    println!();
    print_success(&format!("Report written to {}", report_path.display()));
    print_completion();

    Ok(())
}

fn finish_step(summary: &mut AnalysisSummary, name: &str, start: Instant) {
    let elapsed = start.elapsed();
    summary.record_step(name, elapsed);
    print_step_time(elapsed);
}

/// Grouped summary and frequency tables of the training split; returns the
/// table charts are drawn from, with the barrel flag bound when possible.
fn explore_training(train: &DataFrame, config: &AnalysisConfig) -> Result<DataFrame> {
    let has = |name: &str| train.get_column_names().iter().any(|c| c.as_str() == name);

    let explore = if has(config.speed_column.as_str()) && has(config.angle_column.as_str()) {
        add_barrel_zone(train, &config.speed_column, &config.angle_column)?
    } else {
        train.clone()
    };

    if !has(config.group_by.as_str()) || !has(config.summary_column.as_str()) {
        print_warning(&format!(
            "Skipping grouped summary: '{}' or '{}' not in data",
            config.group_by, config.summary_column
        ));
        return Ok(explore);
    }

    let target_dtype = explore.column(&config.target)?.dtype().clone();
    let mut stats = vec![Stat::Count, Stat::Share];
    if target_dtype == DataType::Boolean || target_dtype.is_primitive_numeric() {
        stats.push(Stat::PropTrue(config.target.clone()));
    }
    stats.extend(Stat::numeric_summary(&config.summary_column));

    let grouped = summarize(&explore, &[config.group_by.as_str()], &stats, true)?;
    println!(
        "\n    {} {} by {}:",
        style("✧").cyan(),
        config.summary_column,
        config.group_by
    );
    print_indented(&dataframe_table(&grouped, TABLE_ROWS));

    if explore.column("barrel_zone").is_ok() {
        let barrels = count_by(&explore, &["barrel_zone", config.target.as_str()])?;
        println!("\n    {} Barrel zone vs outcome:", style("✧").cyan());
        print_indented(&dataframe_table(&barrels, TABLE_ROWS));
    }
    Ok(explore)
}

/// Draw every chart; a chart that cannot be drawn is reported and skipped.
fn render_charts(df: &DataFrame, config: &AnalysisConfig) -> Vec<PathBuf> {
    let dir = &config.output_dir;
    let x = config.summary_column.as_str();
    let y = config.scatter_column.as_str();
    let target = config.target.as_str();

    let spinner = create_spinner("Rendering charts...");
    let mut written = Vec::new();
    let mut keep = |path: PathBuf, result: Result<()>| match result {
        Ok(()) => written.push(path),
        Err(e) => {
            warn!(chart = %path.display(), error = %e, "chart skipped");
            spinner.println(format!(
                "    {} {}: {:#}",
                style("!").yellow(),
                path.display(),
                e
            ));
        }
    };

    let path = dir.join(format!("histogram_{}.svg", x));
    let result = charts::histogram(df, x, config.bins, &path);
    keep(path, result);

    let path = dir.join(format!("density_{}_by_{}.svg", x, target));
    let result = charts::density_by_group(df, x, target, &path);
    keep(path, result);

    let path = dir.join(format!("scatter_{}_{}.svg", x, y));
    let result = charts::scatter(df, x, y, target, &path);
    keep(path, result);

    let path = dir.join(format!("facet_{}_{}_by_{}.svg", x, y, config.group_by));
    let result = charts::facet_scatter(df, x, y, target, &config.group_by, &path).map(|_| ());
    keep(path, result);

    if written.is_empty() {
        finish_with_warning(&spinner, "No charts written");
    } else {
        finish_with_success(
            &spinner,
            &format!("{} chart(s) written to {}", written.len(), dir.display()),
        );
    }
    written
}

fn model_report(workflow: &Workflow, fit: &LastFit) -> ModelReport {
    let tree = fit.fitted.tree();
    ModelReport {
        spec: *fit.fitted.spec(),
        formula: workflow.recipe().formula(),
        n_nodes: tree.n_nodes(),
        n_leaves: tree.n_leaves(),
        depth: tree.depth(),
        train: fit.train.clone(),
        test: fit.test.clone(),
    }
}
