//! `fetch` subcommand: save a remote or local source as CSV or Parquet

use std::path::{Path, PathBuf};

use anyhow::Result;
use console::style;

use crate::pipeline::{load_dataset_with_progress, save_dataset, Source};
use crate::utils::create_spinner;

/// Output path when none is given: `<stem>.parquet` in the working directory.
pub fn default_output(source: &Source) -> PathBuf {
    PathBuf::from(format!("{}.parquet", source.stem()))
}

pub fn run_fetch(source: &str, output: Option<&Path>, infer_schema_length: usize) -> Result<()> {
    let source = Source::parse(source);
    let output_path = match output {
        Some(p) => p.to_path_buf(),
        None => default_output(&source),
    };

    println!("\n {} Fetching dataset", style("◆").cyan().bold());
    println!("   Source: {}", style(&source).dim());
    println!("   Output: {}", style(output_path.display()).dim());
    println!();

    let (mut df, rows, cols, _) = load_dataset_with_progress(&source, infer_schema_length)?;

    let spinner = create_spinner("Writing output file...");
    save_dataset(&mut df, &output_path)?;
    spinner.finish_with_message(format!("{} Written", style("✓").green()));

    let size_mb = std::fs::metadata(&output_path)
        .map(|m| m.len())
        .unwrap_or(0) as f64
        / (1024.0 * 1024.0);

    println!();
    println!(
        "   {} rows × {} columns",
        style(rows).yellow(),
        style(cols).yellow()
    );
    println!("   {} File size: {:.2} MB", style("✧").cyan(), size_mb);
    println!();
    println!(" {} Fetch complete!", style("✓").green().bold());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_uses_source_stem() {
        let source = Source::parse("https://example.com/data/statcast_2023.csv");
        assert_eq!(default_output(&source), PathBuf::from("statcast_2023.parquet"));
    }
}
