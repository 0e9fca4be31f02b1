//! Shared estimator contract, fitted-state variants and holdout metrics

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::config::{Algorithm, ModelType, ScoringMetric, TrainerConfig};
use super::knn::KnnModel;
use super::linear_models::{LinearRegression, LogisticRegression};
use super::random_forest::RandomForest;
use crate::error::{Result, TrainerError};
use crate::evaluation::roc::{average_precision, roc_auc};

/// Capability every fitted algorithm exposes
pub trait Estimator: Send + Sync {
    /// Class index (classification) or continuous value (regression) per row
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Probability per class, rows by classes. Classification only.
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>>;

    /// Non-negative weight per encoded column, summing to one
    fn feature_importances(&self) -> Array1<f64>;
}

/// Fitted state of one algorithm variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedState {
    KNearestNeighbors(KnnModel),
    LogisticRegression(LogisticRegression),
    LinearRegression(LinearRegression),
    RandomForest(RandomForest),
}

impl FittedState {
    /// Fit `algorithm` on encoded features.
    ///
    /// `n_classes` is `Some` for classification targets holding class indices.
    pub fn fit(
        algorithm: Algorithm,
        x: &Array2<f64>,
        y: &Array1<f64>,
        n_classes: Option<usize>,
        config: &TrainerConfig,
    ) -> Result<Self> {
        let seed = config.seed();
        match (algorithm, n_classes) {
            (Algorithm::KNearestNeighbors, _) => {
                KnnModel::fit(x, y, n_classes, &config.knn, seed).map(FittedState::KNearestNeighbors)
            }
            (Algorithm::LogisticRegression, Some(k)) => {
                LogisticRegression::fit(x, y, k, &config.logistic).map(FittedState::LogisticRegression)
            }
            (Algorithm::LogisticRegression, None) => {
                LinearRegression::fit(x, y, config.logistic.alpha).map(FittedState::LinearRegression)
            }
            (Algorithm::RandomForest, _) => {
                RandomForest::fit(x, y, n_classes, &config.forest, seed).map(FittedState::RandomForest)
            }
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            FittedState::KNearestNeighbors(_) => Algorithm::KNearestNeighbors,
            FittedState::LogisticRegression(_) | FittedState::LinearRegression(_) => {
                Algorithm::LogisticRegression
            }
            FittedState::RandomForest(_) => Algorithm::RandomForest,
        }
    }

    fn estimator(&self) -> &dyn Estimator {
        match self {
            FittedState::KNearestNeighbors(m) => m,
            FittedState::LogisticRegression(m) => m,
            FittedState::LinearRegression(m) => m,
            FittedState::RandomForest(m) => m,
        }
    }
}

impl Estimator for FittedState {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.estimator().predict(x)
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.estimator().predict_proba(x)
    }

    fn feature_importances(&self) -> Array1<f64> {
        self.estimator().feature_importances()
    }
}

/// Metrics computed on the holdout partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy (classification)
    pub accuracy: Option<f64>,
    /// Precision for the positive class (classification)
    pub precision: Option<f64>,
    /// Recall for the positive class (classification)
    pub recall: Option<f64>,
    /// F1 score for the positive class (classification)
    pub f1_score: Option<f64>,
    /// AUC-ROC of the positive-class score (classification)
    pub roc_auc: Option<f64>,
    /// Average precision of the positive-class score (classification)
    pub pr_auc: Option<f64>,
    /// Mean Squared Error (regression)
    pub mse: Option<f64>,
    /// Root Mean Squared Error (regression)
    pub rmse: Option<f64>,
    /// Mean Absolute Error (regression)
    pub mae: Option<f64>,
    /// R-squared (regression)
    pub r2: Option<f64>,
    /// Number of encoded features
    pub n_features: usize,
    /// Number of training rows
    pub n_train: usize,
    /// Number of holdout rows
    pub n_holdout: usize,
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelMetrics {
    pub fn new() -> Self {
        Self {
            accuracy: None,
            precision: None,
            recall: None,
            f1_score: None,
            roc_auc: None,
            pr_auc: None,
            mse: None,
            rmse: None,
            mae: None,
            r2: None,
            n_features: 0,
            n_train: 0,
            n_holdout: 0,
        }
    }

    /// Classification metrics from class-index predictions and the positive-class
    /// score. `positive` is the class treated as positive for the binary metrics.
    pub fn compute_classification(
        y_true: &Array1<f64>,
        y_pred: &Array1<f64>,
        positive_scores: &Array1<f64>,
        positive: usize,
    ) -> Self {
        let mut metrics = Self::new();
        metrics.n_holdout = y_true.len();
        let n = y_true.len().max(1) as f64;

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (*t - *p).abs() < 0.5)
            .count();
        metrics.accuracy = Some(correct as f64 / n);

        let is_positive = |v: f64| v as usize == positive;
        let (mut tp, mut fp, mut fn_) = (0usize, 0usize, 0usize);
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (is_positive(t), is_positive(p)) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (true, false) => fn_ += 1,
                (false, false) => {}
            }
        }
        let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
        let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
        metrics.precision = Some(precision);
        metrics.recall = Some(recall);
        metrics.f1_score = Some(if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        });

        let labels: Vec<f64> = y_true
            .iter()
            .map(|&t| if is_positive(t) { 1.0 } else { 0.0 })
            .collect();
        let scores = positive_scores.to_vec();
        metrics.roc_auc = Some(roc_auc(&labels, &scores));
        metrics.pr_auc = Some(average_precision(&labels, &scores));

        metrics
    }

    pub fn compute_regression(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut metrics = Self::new();
        metrics.n_holdout = y_true.len();

        let n = y_true.len().max(1) as f64;
        let errors: Vec<f64> = y_true.iter().zip(y_pred.iter()).map(|(t, p)| t - p).collect();

        let mse = errors.iter().map(|e| e * e).sum::<f64>() / n;
        metrics.mse = Some(mse);
        metrics.rmse = Some(mse.sqrt());
        metrics.mae = Some(errors.iter().map(|e| e.abs()).sum::<f64>() / n);

        let y_mean = y_true.iter().sum::<f64>() / n;
        let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
        let ss_res: f64 = errors.iter().map(|e| e.powi(2)).sum();
        metrics.r2 = Some(if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 });

        metrics
    }

    /// Value of one scoring metric, if it was computed
    pub fn score(&self, metric: ScoringMetric) -> Option<f64> {
        let value = match metric {
            ScoringMetric::RocAuc => self.roc_auc,
            ScoringMetric::PrAuc => self.pr_auc,
            ScoringMetric::Accuracy => self.accuracy,
            ScoringMetric::Rmse => self.rmse,
            ScoringMetric::Mae => self.mae,
            ScoringMetric::R2 => self.r2,
        };
        value.filter(|v| v.is_finite())
    }

    /// Headline metric for a task: AUC for classification, RMSE for regression
    pub fn headline(&self, model_type: ModelType) -> Result<(ScoringMetric, f64)> {
        let metric = ScoringMetric::default_for(model_type);
        self.score(metric)
            .map(|v| (metric, v))
            .ok_or_else(|| TrainerError::NotApplicableError(format!("{:?} was not computed", metric)))
    }
}
