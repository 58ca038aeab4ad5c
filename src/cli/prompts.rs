//! Interactive prompts using dialoguer

use std::path::Path;

use anyhow::Result;
use dialoguer::Confirm;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// Whether `dir` exists and already holds files.
pub fn dir_has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Ask before writing into a non-empty output directory.
pub fn confirm_output_dir(dir: &Path) -> Result<bool> {
    if !dir_has_entries(dir) {
        return Ok(true);
    }
    confirm_step(&format!(
        "Output directory {} is not empty. Overwrite existing charts and report?",
        dir.display()
    ))
}
