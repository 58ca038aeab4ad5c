//! Pipeline module - load, join, profile, split, transform and aggregate

pub mod aggregate;
pub mod features;
pub mod join;
pub mod loader;
pub mod outcome;
pub mod profile;
pub mod rows;
pub mod split;
pub mod transform;

pub use aggregate::*;
pub use features::*;
pub use join::*;
pub use loader::*;
pub use outcome::*;
pub use profile::*;
pub use rows::*;
pub use split::*;
pub use transform::*;
