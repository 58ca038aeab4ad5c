//! Classification modelling: preprocessing recipes, CART trees,
//! cross-validation and depth tuning

pub mod cv;
pub mod error;
pub mod metrics;
pub mod recipe;
pub mod tree;
pub mod tune;
pub mod workflow;

pub use cv::{fit_resamples, vfold_cv, CvResult, Fold};
pub use error::ModelError;
pub use metrics::{accuracy, ConfusionMatrix, Evaluation};
pub use recipe::{FeatureMatrix, PreparedRecipe, Recipe, Selector, Step};
pub use tree::{DecisionTree, Node, TreeSpec};
pub use tune::{finalize_workflow, last_fit, tune_grid, LastFit, TuneCandidate, TuneResult};
pub use workflow::{outcome_levels, FittedWorkflow, Workflow, PREDICTION_COLUMN};
