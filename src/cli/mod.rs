//! CLI module - argument parsing, run configuration and prompts

mod args;
mod config;
pub mod fetch;
mod prompts;

pub use args::{Cli, Commands, DEFAULT_PREDICTORS};
pub use config::AnalysisConfig;
pub use prompts::*;
