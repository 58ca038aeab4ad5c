//! Terminal tables for profiles, summaries and model results

use comfy_table::{presets::UTF8_FULL_CONDENSED, Attribute, Cell, CellAlignment, Color, Table};
use polars::prelude::DataFrame;

use crate::model::{ConfusionMatrix, CvResult, TuneCandidate};
use crate::pipeline::{render_value, GlimpseRow, TableProfile};

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn number(value: Option<f64>) -> Cell {
    match value {
        Some(v) => Cell::new(format!("{:.3}", v)).set_alignment(CellAlignment::Right),
        None => Cell::new("NA").fg(Color::DarkGrey),
    }
}

/// Print a table indented to line up with step output.
pub fn print_indented(table: &Table) {
    for line in table.to_string().lines() {
        println!("    {}", line);
    }
}

/// Any data frame, cells rendered as plain strings; at most `max_rows` rows.
pub fn dataframe_table(df: &DataFrame, max_rows: usize) -> Table {
    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let headers: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
    let mut table = new_table(&headers);

    for i in 0..df.height().min(max_rows) {
        let row: Vec<Cell> = df
            .get_columns()
            .iter()
            .map(|column| match column.get(i) {
                Ok(value) => Cell::new(render_value(&value)),
                Err(_) => Cell::new("?"),
            })
            .collect();
        table.add_row(row);
    }
    table
}

pub fn glimpse_table(rows: &[GlimpseRow]) -> Table {
    let mut table = new_table(&["Column", "Type", "Values"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.name).fg(Color::Cyan),
            Cell::new(&row.dtype).fg(Color::DarkGrey),
            Cell::new(row.values.join(", ")),
        ]);
    }
    table
}

pub fn profile_table(profile: &TableProfile) -> Table {
    let mut table = new_table(&[
        "Column", "Type", "Missing", "Distinct", "Min", "Max", "Mean", "Median", "SD",
    ]);
    for column in &profile.columns {
        let missing = Cell::new(format!("{:.1}%", column.null_ratio * 100.0)).fg(
            if column.null_count > 0 {
                Color::Yellow
            } else {
                Color::White
            },
        );
        let mut row = vec![
            Cell::new(&column.name).fg(Color::Cyan),
            Cell::new(&column.dtype).fg(Color::DarkGrey),
            missing,
            Cell::new(column.n_unique).set_alignment(CellAlignment::Right),
        ];
        match &column.numeric {
            Some(n) => row.extend([
                number(n.min),
                number(n.max),
                number(n.mean),
                number(n.median),
                number(n.sd),
            ]),
            None => row.extend((0..5).map(|_| Cell::new(""))),
        }
        table.add_row(row);
    }
    table
}

pub fn cv_table(result: &CvResult) -> Table {
    let mut table = new_table(&["Fold", "Accuracy"]);
    for (i, acc) in result.fold_accuracies.iter().enumerate() {
        table.add_row(vec![
            Cell::new(format!("Fold{:02}", i + 1)),
            number(Some(*acc)),
        ]);
    }
    table.add_row(vec![
        Cell::new("mean").add_attribute(Attribute::Bold),
        number(Some(result.mean_accuracy))
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    ]);
    table.add_row(vec![Cell::new("std err"), number(Some(result.std_err))]);
    table
}

/// Top tuning candidates; the first row is highlighted as the best.
pub fn tune_table(candidates: &[TuneCandidate]) -> Table {
    let mut table = new_table(&["Rank", "Tree depth", "Mean accuracy", "Std err", "Folds"]);
    for (rank, c) in candidates.iter().enumerate() {
        let accuracy = number(Some(c.mean_accuracy));
        let accuracy = if rank == 0 {
            accuracy.fg(Color::Green).add_attribute(Attribute::Bold)
        } else {
            accuracy
        };
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(c.tree_depth).set_alignment(CellAlignment::Right),
            accuracy,
            number(Some(c.std_err)),
            Cell::new(c.n_folds).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

/// Confusion matrix with truth down the side and predictions across.
pub fn confusion_table(matrix: &ConfusionMatrix) -> Table {
    let mut headers = vec!["truth \\ predicted"];
    headers.extend(matrix.labels.iter().map(|s| s.as_str()));
    let mut table = new_table(&headers);
    for (i, label) in matrix.labels.iter().enumerate() {
        let mut row = vec![Cell::new(label).add_attribute(Attribute::Bold)];
        row.extend(matrix.counts[i].iter().enumerate().map(|(j, &count)| {
            let cell = Cell::new(count).set_alignment(CellAlignment::Right);
            if i == j {
                cell.fg(Color::Green)
            } else {
                cell
            }
        }));
        table.add_row(row);
    }
    table
}
