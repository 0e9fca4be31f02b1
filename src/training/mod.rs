//! Model training module
//!
//! Provides the algorithm variants behind one [`Estimator`] contract:
//! - K-Nearest Neighbors
//! - Logistic regression (linear least squares for regression targets)
//! - Random forests of CART trees
//!
//! plus holdout metrics and the [`SupervisedTrainer`] that fits them against
//! one prepared dataset and selects the best.

mod config;
mod models;
mod trainer;
pub mod decision_tree;
pub mod knn;
pub mod linear_models;
pub mod permutation;
pub mod random_forest;

pub use config::{
    Algorithm, ForestConfig, KnnConfig, LogisticConfig, ModelType, ScoringMetric, TrainerConfig,
    TrainingRequest,
};
pub use decision_tree::{DecisionTree, TreeNode, TreeParams};
pub use knn::KnnModel;
pub use linear_models::{LinearRegression, LogisticRegression};
pub use models::{Estimator, FittedState, ModelMetrics};
pub use random_forest::{MaxFeatures, RandomForest};
pub use trainer::{AdapterFailure, EnsembleOutcome, SupervisedTrainer};
