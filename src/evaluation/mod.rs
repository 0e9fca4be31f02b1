//! Model evaluation and comparison
//!
//! Aggregates holdout predictions from several trained models into ROC
//! series for side-by-side comparison. Rendering is left to the caller.

pub mod roc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TrainerError};
use crate::model::TrainedModel;

pub use roc::{average_precision, roc_auc, roc_curve, trapezoid_area, RocPoint};

/// ROC curve of one model's holdout scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocSeries {
    pub model_id: String,
    pub algorithm: String,
    /// Ordered from (0, 0) to (1, 1)
    pub points: Vec<RocPoint>,
    pub auc: f64,
}

impl RocSeries {
    pub fn fpr(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.fpr).collect()
    }

    pub fn tpr(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.tpr).collect()
    }
}

/// ROC series for each model, in input order.
///
/// Every model must be a classifier trained on the same target with the
/// same class labels and holdout targets.
pub fn compare(models: &[&TrainedModel]) -> Result<Vec<RocSeries>> {
    let first = models.first().ok_or_else(|| {
        TrainerError::IncomparableModelsError("no models to compare".to_string())
    })?;

    for model in models {
        if !model.model_type().is_classification() {
            return Err(TrainerError::IncomparableModelsError(format!(
                "model {} ({}) is a {} model",
                model.model_id(),
                model.algorithm_name(),
                model.model_type()
            )));
        }
    }

    for model in &models[1..] {
        let reason = if model.schema().predicted_column != first.schema().predicted_column {
            Some("different predicted columns")
        } else if model.schema().classes() != first.schema().classes() {
            Some("different class labels")
        } else if model.holdout().targets != first.holdout().targets {
            Some("different holdout targets")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(TrainerError::IncomparableModelsError(format!(
                "{} vs {}: {}",
                first.model_id(),
                model.model_id(),
                reason
            )));
        }
    }

    let series = models
        .iter()
        .map(|m| m.roc_curve_series())
        .collect::<Result<Vec<_>>>()?;
    debug!(models = series.len(), "compared models");
    Ok(series)
}

/// Pair names with weights, descending by weight; ties keep input order
pub fn rank_importances(names: &[&str], weights: &[f64]) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = names
        .iter()
        .zip(weights.iter())
        .map(|(n, &w)| (n.to_string(), w))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}
