//! Data preparation module
//!
//! Turns a raw table into a model-ready dataset:
//! - Column typing (numeric, categorical, identifier)
//! - Missing value imputation from the training partition
//! - One-hot categorical encoding with an unknown bucket
//! - Deterministic, stratified train/holdout splitting
//! - A frozen [`FeatureSchema`] reused for every prediction input

mod config;
mod preparer;
mod scaler;
pub mod schema;
pub mod split;
pub mod table;

pub use config::PreparationConfig;
pub use preparer::{DataPreparer, PreparedDataset};
pub use scaler::Standardizer;
pub use schema::{FeatureColumn, FeatureEncoding, FeatureSchema, TargetSchema, UNKNOWN_CATEGORY};
pub use split::Partition;
pub use table::{ColumnKind, ColumnValues};
