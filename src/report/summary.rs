//! End-of-run summary table

use std::time::Duration;

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, Color, Table};
use console::style;

/// Headline numbers of an analysis run.
#[derive(Debug, Default)]
pub struct AnalysisSummary {
    pub events_rows: usize,
    pub parks_rows: usize,
    pub joined_cols: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_accuracy: Option<f64>,
    pub test_accuracy: Option<f64>,
    pub cv_mean_accuracy: Option<f64>,
    pub best_depth: Option<usize>,
    pub charts_written: usize,
    step_times: Vec<(String, Duration)>,
}

impl AnalysisSummary {
    pub fn new(events_rows: usize, parks_rows: usize) -> Self {
        Self {
            events_rows,
            parks_rows,
            ..Default::default()
        }
    }

    pub fn record_step(&mut self, step: &str, elapsed: Duration) {
        self.step_times.push((step.to_string(), elapsed));
    }

    pub fn step_times(&self) -> &[(String, Duration)] {
        &self.step_times
    }

    pub fn total_time(&self) -> Duration {
        self.step_times.iter().map(|(_, d)| *d).sum()
    }

    fn accuracy_cell(value: Option<f64>) -> Cell {
        match value {
            Some(acc) => {
                let color = if acc >= 0.9 {
                    Color::Green
                } else if acc >= 0.7 {
                    Color::Yellow
                } else {
                    Color::Red
                };
                Cell::new(format!("{:.3}", acc))
                    .fg(color)
                    .add_attribute(Attribute::Bold)
            }
            None => Cell::new("-").fg(Color::DarkGrey),
        }
    }

    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL_CONDENSED);
        table.set_header(vec![
            Cell::new("Metric").add_attribute(Attribute::Bold),
            Cell::new("Value").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![Cell::new("📁 Events rows"), Cell::new(self.events_rows)]);
        table.add_row(vec![Cell::new("🏟️  Park rows"), Cell::new(self.parks_rows)]);
        table.add_row(vec![Cell::new("🔗 Joined columns"), Cell::new(self.joined_cols)]);
        table.add_row(vec![
            Cell::new("✂️  Train / test"),
            Cell::new(format!("{} / {}", self.train_rows, self.test_rows)),
        ]);
        table.add_row(vec![
            Cell::new("🎯 Train accuracy"),
            Self::accuracy_cell(self.train_accuracy),
        ]);
        table.add_row(vec![
            Cell::new("🔁 CV accuracy (mean)"),
            Self::accuracy_cell(self.cv_mean_accuracy),
        ]);
        table.add_row(vec![
            Cell::new("🌳 Best tree depth"),
            match self.best_depth {
                Some(d) => Cell::new(d).fg(Color::Cyan),
                None => Cell::new("-").fg(Color::DarkGrey),
            },
        ]);
        table.add_row(vec![
            Cell::new("✅ Test accuracy"),
            Self::accuracy_cell(self.test_accuracy),
        ]);
        table.add_row(vec![Cell::new("📈 Charts"), Cell::new(self.charts_written)]);
        table.add_row(vec![
            Cell::new("⏱️  Total time"),
            Cell::new(format!("{:.2}s", self.total_time().as_secs_f64())),
        ]);
        table
    }

    pub fn display(&self) {
        println!();
        println!(
            "    {} {}",
            style("📋").cyan(),
            style("ANALYSIS SUMMARY").white().bold()
        );
        println!("    {}", style("─".repeat(50)).dim());
        println!();

        for line in self.to_table().to_string().lines() {
            println!("    {}", line);
        }

        if !self.step_times.is_empty() {
            println!();
            println!(
                "    {} {}",
                style("⏱").cyan(),
                style("STEP TIMINGS").white().bold()
            );
            println!("    {}", style("─".repeat(50)).dim());
            for (step, elapsed) in &self.step_times {
                println!(
                    "      {} {:<22} {}",
                    style("•").dim(),
                    step,
                    style(format!("{:.2}s", elapsed.as_secs_f64())).dim()
                );
            }
        }
    }
}
