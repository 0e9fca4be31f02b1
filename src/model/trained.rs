//! The trained model artifact

use chrono::{DateTime, Utc};
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use super::baseline::FeatureBaseline;
use crate::error::{Result, TrainerError};
use crate::evaluation::roc::{roc_auc, roc_curve};
use crate::evaluation::{rank_importances, RocSeries};
use crate::explainability::{explain_rows, FactorRanking};
use crate::export;
use crate::preprocessing::{DataPreparer, FeatureSchema, PreparedDataset};
use crate::training::{Algorithm, Estimator, FittedState, ModelMetrics, ModelType, TrainerConfig};

/// Identity and provenance of a trained model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub algorithm: Algorithm,
    pub model_type: ModelType,
    /// Configuration the model was trained with
    pub config: TrainerConfig,
    pub created_at: DateTime<Utc>,
    /// Wall-clock fit time
    pub training_time_secs: f64,
    pub crate_version: String,
}

/// Holdout targets and scores kept for ROC aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutScores {
    pub targets: Array1<f64>,
    pub predictions: Array1<f64>,
    /// Positive-class probability (classification only)
    pub scores: Option<Array1<f64>>,
    /// Class treated as positive for the binary metrics
    pub positive_class: Option<usize>,
}

/// A fitted algorithm together with everything needed to apply and explain it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    metadata: ModelMetadata,
    schema: FeatureSchema,
    state: FittedState,
    metrics: ModelMetrics,
    baseline: FeatureBaseline,
    holdout: HoldoutScores,
}

/// Binary targets use class 1, multiclass the last class
pub(crate) fn positive_class(n_classes: usize) -> usize {
    n_classes.saturating_sub(1)
}

impl TrainedModel {
    /// Score a freshly fitted state on the holdout partition and freeze it
    pub(crate) fn from_fit(
        state: FittedState,
        prepared: &PreparedDataset,
        config: &TrainerConfig,
        elapsed: Duration,
    ) -> Result<Self> {
        let schema = prepared.schema.clone();
        let x_train = prepared.train_features()?;
        let y_train = prepared.train_targets()?;
        let x_holdout = prepared.holdout_features()?;
        let y_holdout = prepared.holdout_targets()?;

        let predictions = state.predict(&x_holdout)?;
        let (mut metrics, scores, positive) = match schema.n_classes() {
            Some(n_classes) => {
                let positive = positive_class(n_classes);
                let proba = state.predict_proba(&x_holdout)?;
                let scores = proba.column(positive).to_owned();
                let metrics = ModelMetrics::compute_classification(&y_holdout, &predictions, &scores, positive);
                (metrics, Some(scores), Some(positive))
            }
            None => (ModelMetrics::compute_regression(&y_holdout, &predictions), None, None),
        };
        metrics.n_features = x_train.ncols();
        metrics.n_train = x_train.nrows();

        let baseline = FeatureBaseline::fit(&x_train, &y_train, schema.n_classes());
        let metadata = ModelMetadata {
            model_id: uuid::Uuid::new_v4().to_string(),
            algorithm: state.algorithm(),
            model_type: schema.model_type,
            config: config.clone(),
            created_at: Utc::now(),
            training_time_secs: elapsed.as_secs_f64(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        };

        Ok(Self {
            metadata,
            schema,
            state,
            metrics,
            baseline,
            holdout: HoldoutScores {
                targets: y_holdout,
                predictions,
                scores,
                positive_class: positive,
            },
        })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn model_id(&self) -> &str {
        &self.metadata.model_id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.metadata.algorithm
    }

    /// Name of the fitted algorithm, e.g. `linear_regression`
    pub fn algorithm_name(&self) -> &'static str {
        self.metadata.algorithm.name(self.metadata.model_type)
    }

    pub fn model_type(&self) -> ModelType {
        self.metadata.model_type
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn state(&self) -> &FittedState {
        &self.state
    }

    pub fn metrics(&self) -> &ModelMetrics {
        &self.metrics
    }

    pub fn baseline(&self) -> &FeatureBaseline {
        &self.baseline
    }

    pub fn holdout(&self) -> &HoldoutScores {
        &self.holdout
    }

    /// Encode `table` through the frozen schema
    pub fn prepare_input(&self, table: &DataFrame) -> Result<PreparedDataset> {
        DataPreparer::apply(&self.schema, table)
    }

    /// One prediction per table row: class index or continuous value
    pub fn make_predictions(&self, table: &DataFrame) -> Result<Array1<f64>> {
        let input = self.prepare_input(table)?;
        self.state.predict(&input.features)
    }

    /// Class probabilities per table row, columns in class-label order
    pub fn make_probabilities(&self, table: &DataFrame) -> Result<Array2<f64>> {
        if !self.model_type().is_classification() {
            return Err(TrainerError::NotApplicableError(
                "probabilities are only defined for classification models".to_string(),
            ));
        }
        let input = self.prepare_input(table)?;
        self.state.predict_proba(&input.features)
    }

    /// Top `k` contributing features per table row
    pub fn make_factors(&self, table: &DataFrame, k: usize) -> Result<Vec<FactorRanking>> {
        let input = self.prepare_input(table)?;
        explain_rows(self, &input, k)
    }

    /// Encoded-column importances
    pub fn feature_importances(&self) -> Array1<f64> {
        self.state.feature_importances()
    }

    /// Source-feature importances, descending; ties keep schema order
    pub fn ranked_feature_importances(&self) -> Vec<(String, f64)> {
        let encoded = self.state.feature_importances();
        let per_feature: Vec<f64> = self
            .schema
            .feature_spans()
            .into_iter()
            .map(|span| span.map(|c| encoded[c]).sum())
            .collect();
        rank_importances(&self.schema.feature_names(), &per_feature)
    }

    /// ROC curve of the holdout positive-class scores
    pub fn roc_curve_series(&self) -> Result<RocSeries> {
        let (scores, positive) = match (&self.holdout.scores, self.holdout.positive_class) {
            (Some(scores), Some(positive)) => (scores, positive),
            _ => {
                return Err(TrainerError::NotApplicableError(format!(
                    "ROC curves are not defined for {} models",
                    self.model_type()
                )))
            }
        };
        let labels: Vec<f64> = self
            .holdout
            .targets
            .iter()
            .map(|&t| if t as usize == positive { 1.0 } else { 0.0 })
            .collect();
        let scores = scores.to_vec();

        Ok(RocSeries {
            model_id: self.metadata.model_id.clone(),
            algorithm: self.algorithm_name().to_string(),
            points: roc_curve(&labels, &scores),
            auc: roc_auc(&labels, &scores),
        })
    }

    /// Serialize into the versioned, checksummed envelope
    pub fn save(&self) -> Result<Vec<u8>> {
        export::encode(self)
    }

    pub fn load(bytes: &[u8]) -> Result<Self> {
        export::decode(bytes)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.save()?;
        std::fs::write(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), "model saved");
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let model = Self::load(&bytes)?;
        info!(path = %path.display(), algorithm = model.algorithm_name(), "model loaded");
        Ok(model)
    }
}
