//! Training configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use super::random_forest::MaxFeatures;
use crate::error::{Result, TrainerError};
use crate::preprocessing::PreparationConfig;

/// Type of supervised learning task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    Classification,
    Regression,
}

impl ModelType {
    pub fn is_classification(&self) -> bool {
        matches!(self, ModelType::Classification)
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelType::Classification => write!(f, "classification"),
            ModelType::Regression => write!(f, "regression"),
        }
    }
}

impl FromStr for ModelType {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "classification" | "classify" => Ok(ModelType::Classification),
            "regression" | "regress" => Ok(ModelType::Regression),
            other => Err(TrainerError::invalid_argument(
                "model_type",
                other,
                "expected classification or regression",
            )),
        }
    }
}

/// Supported learning algorithms
///
/// The ensemble is not a variant: it fits every variant and keeps the best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    KNearestNeighbors,
    /// Logistic regression for classification, linear least squares for regression
    LogisticRegression,
    RandomForest,
}

impl Algorithm {
    /// Preference order applied to exact metric ties, simplest first
    pub const PREFERENCE_ORDER: [Algorithm; 3] = [
        Algorithm::LogisticRegression,
        Algorithm::KNearestNeighbors,
        Algorithm::RandomForest,
    ];

    /// Position in [`Algorithm::PREFERENCE_ORDER`]
    pub fn preference_rank(&self) -> usize {
        match self {
            Algorithm::LogisticRegression => 0,
            Algorithm::KNearestNeighbors => 1,
            Algorithm::RandomForest => 2,
        }
    }

    /// Display name for the algorithm fitted on this task
    pub fn name(&self, model_type: ModelType) -> &'static str {
        match (self, model_type) {
            (Algorithm::KNearestNeighbors, _) => "k_nearest_neighbors",
            (Algorithm::LogisticRegression, ModelType::Classification) => "logistic_regression",
            (Algorithm::LogisticRegression, ModelType::Regression) => "linear_regression",
            (Algorithm::RandomForest, _) => "random_forest",
        }
    }
}

impl FromStr for Algorithm {
    type Err = TrainerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "knn" | "k_nearest_neighbors" => Ok(Algorithm::KNearestNeighbors),
            "logistic" | "logistic_regression" | "linear" | "linear_regression" => {
                Ok(Algorithm::LogisticRegression)
            }
            "rf" | "random_forest" => Ok(Algorithm::RandomForest),
            other => Err(TrainerError::invalid_argument(
                "algorithm",
                other,
                "expected knn, logistic, linear or random_forest",
            )),
        }
    }
}

/// What to train: target, grain and missing-value policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub predicted_column: String,
    pub grain_column: Option<String>,
    pub model_type: ModelType,
    /// Fill missing feature values instead of dropping the row
    pub impute: bool,
}

impl TrainingRequest {
    pub fn new(predicted_column: impl Into<String>, model_type: ModelType) -> Self {
        Self {
            predicted_column: predicted_column.into(),
            grain_column: None,
            model_type,
            impute: true,
        }
    }

    pub fn with_grain(mut self, grain_column: impl Into<String>) -> Self {
        self.grain_column = Some(grain_column.into());
        self
    }

    pub fn with_impute(mut self, impute: bool) -> Self {
        self.impute = impute;
        self
    }
}

/// k-nearest-neighbors parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnConfig {
    pub n_neighbors: usize,
    /// Training rows scored when measuring permutation importance
    pub permutation_sample: usize,
    /// Shuffles per feature when measuring permutation importance
    pub permutation_repeats: usize,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            permutation_sample: 200,
            permutation_repeats: 3,
        }
    }
}

/// Logistic (and linear) regression parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticConfig {
    pub learning_rate: f64,
    pub max_iter: usize,
    /// L2 penalty strength
    pub alpha: f64,
    pub tol: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_iter: 1000,
            alpha: 0.01,
            tol: 1e-6,
        }
    }
}

/// Random forest parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
        }
    }
}

/// Holdout metric used to rank ensemble candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoringMetric {
    RocAuc,
    PrAuc,
    Accuracy,
    Rmse,
    Mae,
    R2,
}

impl ScoringMetric {
    pub fn default_for(model_type: ModelType) -> Self {
        match model_type {
            ModelType::Classification => ScoringMetric::RocAuc,
            ModelType::Regression => ScoringMetric::Rmse,
        }
    }

    pub fn higher_is_better(&self) -> bool {
        !matches!(self, ScoringMetric::Rmse | ScoringMetric::Mae)
    }

    pub fn applies_to(&self, model_type: ModelType) -> bool {
        match self {
            ScoringMetric::RocAuc | ScoringMetric::PrAuc | ScoringMetric::Accuracy => {
                model_type.is_classification()
            }
            ScoringMetric::Rmse | ScoringMetric::Mae | ScoringMetric::R2 => {
                !model_type.is_classification()
            }
        }
    }
}

/// Full trainer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub preparation: PreparationConfig,
    pub knn: KnnConfig,
    pub logistic: LogisticConfig,
    pub forest: ForestConfig,
    /// Ensemble ranking metric; `None` picks the task default
    pub scoring: Option<ScoringMetric>,
    /// Fit ensemble candidates concurrently
    pub parallel_ensemble: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            preparation: PreparationConfig::default(),
            knn: KnnConfig::default(),
            logistic: LogisticConfig::default(),
            forest: ForestConfig::default(),
            scoring: None,
            parallel_ensemble: true,
        }
    }
}

impl TrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; absent fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn seed(&self) -> u64 {
        self.preparation.random_seed
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.preparation.random_seed = seed;
        self
    }

    pub fn with_holdout_ratio(mut self, ratio: f64) -> Self {
        self.preparation.holdout_ratio = ratio;
        self
    }

    pub fn with_preparation(mut self, preparation: PreparationConfig) -> Self {
        self.preparation = preparation;
        self
    }

    pub fn with_n_neighbors(mut self, k: usize) -> Self {
        self.knn.n_neighbors = k;
        self
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.forest.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.forest.max_depth = Some(depth);
        self
    }

    pub fn with_scoring(mut self, metric: ScoringMetric) -> Self {
        self.scoring = Some(metric);
        self
    }

    pub fn with_parallel_ensemble(mut self, parallel: bool) -> Self {
        self.parallel_ensemble = parallel;
        self
    }

    /// Scoring metric for a task, defaulting when none was configured
    pub fn scoring_for(&self, model_type: ModelType) -> ScoringMetric {
        self.scoring
            .unwrap_or_else(|| ScoringMetric::default_for(model_type))
    }

    pub fn validate(&self) -> Result<()> {
        self.preparation.validate()?;
        if self.knn.n_neighbors == 0 {
            return Err(TrainerError::invalid_argument(
                "knn.n_neighbors",
                0,
                "must be at least 1",
            ));
        }
        if self.knn.permutation_repeats == 0 {
            return Err(TrainerError::invalid_argument(
                "knn.permutation_repeats",
                0,
                "must be at least 1",
            ));
        }
        if self.logistic.max_iter == 0 {
            return Err(TrainerError::invalid_argument(
                "logistic.max_iter",
                0,
                "must be at least 1",
            ));
        }
        if !(self.logistic.learning_rate > 0.0) {
            return Err(TrainerError::invalid_argument(
                "logistic.learning_rate",
                self.logistic.learning_rate,
                "must be positive",
            ));
        }
        if self.forest.n_estimators == 0 {
            return Err(TrainerError::invalid_argument(
                "forest.n_estimators",
                0,
                "must be at least 1",
            ));
        }
        if self.forest.min_samples_leaf == 0 {
            return Err(TrainerError::invalid_argument(
                "forest.min_samples_leaf",
                0,
                "must be at least 1",
            ));
        }
        Ok(())
    }
}
