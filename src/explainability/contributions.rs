//! Per-row feature contributions and top-k factor ranking

use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainerError};
use crate::model::{FeatureBaseline, TrainedModel};
use crate::preprocessing::{FeatureSchema, PreparedDataset};
use crate::training::Estimator;

/// One source feature's contribution to a prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Factor {
    pub feature: String,
    /// Signed contribution; positive pushes toward the predicted outcome
    pub contribution: f64,
    /// 1-based position in the ranking
    pub rank: usize,
}

/// Top contributing features for one prediction, most influential first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRanking {
    pub prediction: f64,
    pub factors: Vec<Factor>,
}

impl FactorRanking {
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.factors.iter().map(|f| f.feature.as_str()).collect()
    }

    pub fn positive_factors(&self) -> Vec<&Factor> {
        self.factors.iter().filter(|f| f.contribution > 0.0).collect()
    }

    pub fn negative_factors(&self) -> Vec<&Factor> {
        self.factors.iter().filter(|f| f.contribution < 0.0).collect()
    }
}

/// Validate `k` and clamp it to the number of source features
pub(crate) fn effective_k(k: usize, n_features: usize) -> Result<usize> {
    if k == 0 {
        return Err(TrainerError::invalid_argument(
            "k",
            k,
            "at least one factor must be requested",
        ));
    }
    Ok(k.min(n_features))
}

/// Contribution of every source feature, in schema order.
///
/// Sums `importance * z-score * direction * outcome sign` over the feature's
/// encoded columns.
pub fn feature_contributions(
    schema: &FeatureSchema,
    baseline: &FeatureBaseline,
    importances: &Array1<f64>,
    row: ArrayView1<f64>,
    prediction: f64,
) -> Vec<f64> {
    let z = baseline.z_scores(row);
    let (directions, sign) = baseline.oriented_directions(prediction);
    schema
        .feature_spans()
        .into_iter()
        .map(|span| {
            span.map(|c| importances[c] * z[c] * directions[c] * sign)
                .sum::<f64>()
        })
        .collect()
}

/// Order contributions by magnitude, keeping schema order among ties
pub fn rank_factors(schema: &FeatureSchema, contributions: &[f64], prediction: f64, k: usize) -> FactorRanking {
    let mut order: Vec<usize> = (0..contributions.len()).collect();
    order.sort_by(|&a, &b| contributions[b].abs().total_cmp(&contributions[a].abs()));

    let factors = order
        .into_iter()
        .take(k)
        .enumerate()
        .map(|(pos, j)| Factor {
            feature: schema.features[j].name.clone(),
            contribution: contributions[j],
            rank: pos + 1,
        })
        .collect();

    FactorRanking { prediction, factors }
}

/// Rank the top `k` factors for one encoded row
pub fn explain(model: &TrainedModel, row: ArrayView1<f64>, k: usize) -> Result<FactorRanking> {
    let schema = model.schema();
    if row.len() != schema.n_encoded() {
        return Err(TrainerError::ShapeError {
            expected: format!("{} encoded columns", schema.n_encoded()),
            actual: format!("{} columns", row.len()),
        });
    }
    let x = row.to_owned().insert_axis(ndarray::Axis(0));
    let predictions = model.state().predict(&x)?;
    let mut rankings = explain_predicted(model, &x, &predictions, k)?;
    rankings
        .pop()
        .ok_or_else(|| TrainerError::TrainingError("no prediction produced".to_string()))
}

/// Rank the top `k` factors for every row of a prepared dataset
pub fn explain_rows(model: &TrainedModel, dataset: &PreparedDataset, k: usize) -> Result<Vec<FactorRanking>> {
    let predictions = model.state().predict(&dataset.features)?;
    explain_predicted(model, &dataset.features, &predictions, k)
}

/// Rankings for rows whose predictions are already known
pub(crate) fn explain_predicted(
    model: &TrainedModel,
    features: &Array2<f64>,
    predictions: &Array1<f64>,
    k: usize,
) -> Result<Vec<FactorRanking>> {
    let schema = model.schema();
    let k = effective_k(k, schema.n_features())?;
    let importances = model.state().feature_importances();
    let baseline = model.baseline();

    Ok((0..features.nrows())
        .into_par_iter()
        .map(|r| {
            let contributions =
                feature_contributions(schema, baseline, &importances, features.row(r), predictions[r]);
            rank_factors(schema, &contributions, predictions[r], k)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{FeatureColumn, FeatureEncoding, TargetSchema};
    use crate::training::ModelType;
    use ndarray::array;

    fn schema() -> FeatureSchema {
        FeatureSchema {
            predicted_column: "LOS".to_string(),
            grain_column: None,
            model_type: ModelType::Regression,
            target: TargetSchema::Continuous,
            features: vec![
                FeatureColumn {
                    name: "Age".to_string(),
                    encoding: FeatureEncoding::Numeric { fill: 0.0 },
                },
                FeatureColumn {
                    name: "Unit".to_string(),
                    encoding: FeatureEncoding::Categorical {
                        categories: vec!["icu".to_string()],
                        fill: Some("icu".to_string()),
                    },
                },
                FeatureColumn {
                    name: "Weight".to_string(),
                    encoding: FeatureEncoding::Numeric { fill: 0.0 },
                },
            ],
            excluded_columns: Vec::new(),
            missing_markers: Vec::new(),
        }
    }

    #[test]
    fn test_rank_orders_by_magnitude_with_schema_ties() {
        let ranking = rank_factors(&schema(), &[0.5, -2.0, 0.5], 1.0, 3);
        assert_eq!(ranking.feature_names(), vec!["Unit", "Age", "Weight"]);
        assert_eq!(ranking.factors[0].rank, 1);
        assert_eq!(ranking.negative_factors().len(), 1);
    }

    #[test]
    fn test_rank_truncates_to_k() {
        let ranking = rank_factors(&schema(), &[0.1, 0.2, 0.3], 0.0, 2);
        assert_eq!(ranking.feature_names(), vec!["Weight", "Unit"]);
    }

    #[test]
    fn test_effective_k() {
        assert_eq!(effective_k(5, 3).unwrap(), 3);
        assert_eq!(effective_k(2, 3).unwrap(), 2);
        assert!(matches!(
            effective_k(0, 3),
            Err(TrainerError::InvalidArgumentError { .. })
        ));
    }

    #[test]
    fn test_contributions_sum_encoded_columns() {
        // Age, Unit=icu, Unit=<unknown>, Weight
        let x = array![
            [20.0, 1.0, 0.0, 60.0],
            [40.0, 0.0, 1.0, 60.0],
            [60.0, 1.0, 0.0, 60.0],
            [80.0, 0.0, 1.0, 60.0]
        ];
        let y = array![1.0, 2.0, 3.0, 4.0];
        let baseline = FeatureBaseline::fit(&x, &y, None);
        let importances = array![0.5, 0.25, 0.25, 0.0];

        let row = array![80.0, 0.0, 1.0, 60.0];
        let contributions = feature_contributions(&schema(), &baseline, &importances, row.view(), 4.0);
        assert_eq!(contributions.len(), 3);
        assert!(contributions[0] > 0.0);
        assert_eq!(contributions[2], 0.0);
    }
}
