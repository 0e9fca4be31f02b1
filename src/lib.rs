//! caretrain - Supervised training harness for tabular clinical data
//!
//! This crate provides the training, explanation and evaluation pipeline:
//! - Data preparation: column typing, imputation, encoding, stratified split
//! - Model training with k-nearest-neighbors, logistic/linear regression and
//!   random forests behind one contract, plus best-of ensemble selection
//! - Per-row explanations ranking the top contributing features
//! - ROC aggregation across models
//! - Versioned model persistence
//!
//! # Modules
//!
//! - [`preprocessing`] - Table validation, imputation, encoding, splitting
//! - [`training`] - Algorithms, metrics and the [`training::SupervisedTrainer`]
//! - [`model`] - The [`model::TrainedModel`] artifact and its output frames
//! - [`explainability`] - Top-k factor ranking
//! - [`evaluation`] - ROC curves, AUC and model comparison
//! - [`export`] - Binary envelope for saved models
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod training;
pub mod model;

// Analysis
pub mod explainability;
pub mod evaluation;

// Persistence
pub mod export;

// Services
pub mod cli;

pub use error::{Result, TrainerError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, TrainerError};

    // Preprocessing
    pub use crate::preprocessing::{DataPreparer, FeatureSchema, PreparationConfig, PreparedDataset};

    // Training
    pub use crate::training::{
        Algorithm, EnsembleOutcome, Estimator, ModelMetrics, ModelType, ScoringMetric,
        SupervisedTrainer, TrainerConfig, TrainingRequest,
    };

    // Trained model
    pub use crate::model::TrainedModel;

    // Explainability
    pub use crate::explainability::{explain, explain_rows, Factor, FactorRanking};

    // Evaluation
    pub use crate::evaluation::{compare, RocPoint, RocSeries};
}
