//! Dinger: batted-ball exploration and home-run classification
//!
//! Loads Statcast-style batted-ball events and park dimensions, joins and
//! profiles them, draws a stratified train/test split, and fits a CART
//! decision tree with cross-validation and depth tuning.

pub mod cli;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod utils;
