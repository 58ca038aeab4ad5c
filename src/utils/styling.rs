//! Terminal styling for the step-by-step report

use std::time::Duration;

use console::{style, Emoji};

use crate::cli::AnalysisConfig;

// Emoji icons with fallbacks for terminals that don't support them
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[*] ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", ">> ");
pub static BALL: Emoji<'_, '_> = Emoji("⚾ ", "");
pub static STADIUM: Emoji<'_, '_> = Emoji("🏟️  ", "");
pub static TARGET: Emoji<'_, '_> = Emoji("🎯 ", "");
pub static SAVE: Emoji<'_, '_> = Emoji("💾 ", "");
pub static TREE: Emoji<'_, '_> = Emoji("🌳 ", "");
pub static FOLDS: Emoji<'_, '_> = Emoji("🔁 ", "");

/// Print the application banner
pub fn print_banner(version: &str) {
    let banner = r#"
    ██████╗ ██╗███╗   ██╗ ██████╗ ███████╗██████╗
    ██╔══██╗██║████╗  ██║██╔════╝ ██╔════╝██╔══██╗
    ██║  ██║██║██╔██╗ ██║██║  ███╗█████╗  ██████╔╝
    ██║  ██║██║██║╚██╗██║██║   ██║██╔══╝  ██╔══██╗
    ██████╔╝██║██║ ╚████║╚██████╔╝███████╗██║  ██║
    ╚═════╝ ╚═╝╚═╝  ╚═══╝ ╚═════╝ ╚══════╝╚═╝  ╚═╝
    "#;

    println!();
    println!("{}", style(banner).cyan().bold());
    println!(
        "    {}{}",
        BALL,
        style("Batted balls in, home runs out").dim()
    );
    println!("    {}", style(format!("v{}", version)).dim());
    println!("    {}", style("━".repeat(50)).dim());
    println!();
}

/// Print configuration card
pub fn print_config(config: &AnalysisConfig) {
    let box_width = 60;
    let line = "─".repeat(box_width - 2);

    println!("    ┌{}┐", line);
    println!(
        "    │ {}{}│",
        style("⚙️  Configuration").cyan().bold(),
        " ".repeat(box_width - 20)
    );
    println!("    ├{}┤", line);
    println!("    │  {}Events: {:<46}│", BALL, truncate_string(&config.events, 45));
    println!("    │  {}Parks:  {:<46}│", STADIUM, truncate_string(&config.parks, 45));
    println!("    │  {}Target: {:<46}│", TARGET, truncate_string(&config.target, 45));
    println!(
        "    │  {}Output: {:<46}│",
        SAVE,
        truncate_string(&config.output_dir.display().to_string(), 45)
    );
    println!("    ├{}┤", line);
    println!(
        "    │  {}Train fraction / seed: {:<31}│",
        FOLDS,
        style(format!("{:.2} / {}", config.train_fraction, config.seed)).yellow()
    );
    println!(
        "    │  {}Folds / depth grid:    {:<31}│",
        TREE,
        style(format!("{} / {:?}", config.folds, config.depths)).yellow()
    );
    println!("    └{}┘", line);
    println!();
}

/// Print a step header with styling
pub fn print_step_header(step_num: u8, title: &str) {
    println!();
    println!(
        "    {} {} {}",
        style(format!("STEP {}", step_num)).cyan().bold(),
        style("│").dim(),
        style(title).white().bold()
    );
    println!("    {}", style("─".repeat(50)).dim());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("    {} {}", style("✓").green().bold(), style(message).green());
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("    {} {}", INFO, message);
}

/// Print a warning that does not stop the run
pub fn print_warning(message: &str) {
    println!("    {} {}", style("!").yellow().bold(), style(message).yellow());
}

/// Print a key/value line under a step
pub fn print_metric(label: &str, value: impl std::fmt::Display) {
    println!("      {:<24} {}", label, style(value).yellow().bold());
}

/// Print the time a step took
pub fn print_step_time(elapsed: Duration) {
    println!(
        "    {}",
        style(format!("⏱  {:.2}s", elapsed.as_secs_f64())).dim()
    );
}

/// Print the final completion message
pub fn print_completion() {
    println!();
    println!(
        "    {} {}",
        ROCKET,
        style("Dinger analysis complete!").green().bold()
    );
    println!();
}

fn truncate_string(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_len {
        s.to_string()
    } else {
        let tail: String = chars[chars.len() - (max_len - 3)..].iter().collect();
        format!("...{}", tail)
    }
}
