//! Report module - charts, terminal tables and the JSON report

pub mod charts;
pub mod export;
pub mod summary;
pub mod tables;

pub use export::*;
pub use summary::*;
pub use tables::*;
