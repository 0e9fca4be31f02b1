//! Supervised trainer: one prepared dataset, many algorithms

use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::config::{Algorithm, ModelType, ScoringMetric, TrainerConfig, TrainingRequest};
use super::models::FittedState;
use crate::error::{Result, TrainerError};
use crate::model::TrainedModel;
use crate::preprocessing::{DataPreparer, PreparedDataset};

/// An algorithm whose fit failed during ensemble selection
#[derive(Debug)]
pub struct AdapterFailure {
    pub algorithm: Algorithm,
    pub error: TrainerError,
}

/// Result of [`SupervisedTrainer::ensemble`]
#[derive(Debug)]
pub struct EnsembleOutcome {
    /// Successfully fitted candidates in preference order
    pub models: Vec<TrainedModel>,
    /// Index of the selected model in `models`
    pub best: usize,
    /// Metric the candidates were ranked by
    pub metric: ScoringMetric,
    pub failures: Vec<AdapterFailure>,
}

impl EnsembleOutcome {
    pub fn best_model(&self) -> &TrainedModel {
        &self.models[self.best]
    }

    pub fn into_best(mut self) -> TrainedModel {
        self.models.swap_remove(self.best)
    }
}

/// Fits algorithms against a single, once-prepared dataset
#[derive(Debug, Clone)]
pub struct SupervisedTrainer {
    request: TrainingRequest,
    config: TrainerConfig,
    prepared: PreparedDataset,
}

impl SupervisedTrainer {
    /// Validate the configuration and prepare `table` for `request`
    pub fn new(table: &DataFrame, request: TrainingRequest, config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        let preparer = DataPreparer::new(config.preparation.clone());
        let prepared = preparer.prepare(table, &request)?;
        Ok(Self {
            request,
            config,
            prepared,
        })
    }

    pub fn prepared(&self) -> &PreparedDataset {
        &self.prepared
    }

    pub fn request(&self) -> &TrainingRequest {
        &self.request
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    pub fn model_type(&self) -> ModelType {
        self.request.model_type
    }

    pub fn knn(&self) -> Result<TrainedModel> {
        self.train(Algorithm::KNearestNeighbors)
    }

    /// Logistic regression. Classification only.
    pub fn logistic_regression(&self) -> Result<TrainedModel> {
        if !self.model_type().is_classification() {
            return Err(TrainerError::NotApplicableError(
                "logistic regression needs a classification target; use linear_regression".to_string(),
            ));
        }
        self.train(Algorithm::LogisticRegression)
    }

    /// Linear least squares. Regression only.
    pub fn linear_regression(&self) -> Result<TrainedModel> {
        if self.model_type().is_classification() {
            return Err(TrainerError::NotApplicableError(
                "linear regression needs a continuous target; use logistic_regression".to_string(),
            ));
        }
        self.train(Algorithm::LogisticRegression)
    }

    pub fn random_forest(&self) -> Result<TrainedModel> {
        self.train(Algorithm::RandomForest)
    }

    /// Fit one algorithm on the training partition and score it on the holdout
    pub fn train(&self, algorithm: Algorithm) -> Result<TrainedModel> {
        let name = algorithm.name(self.model_type());
        let start = Instant::now();

        let x = self.prepared.train_features()?;
        let y = self.prepared.train_targets()?;
        debug!(algorithm = name, rows = x.nrows(), columns = x.ncols(), "fitting");

        let state = FittedState::fit(algorithm, &x, &y, self.prepared.schema.n_classes(), &self.config)?;
        let model = TrainedModel::from_fit(state, &self.prepared, &self.config, start.elapsed())?;

        info!(
            algorithm = name,
            secs = model.metadata().training_time_secs,
            "model trained"
        );
        Ok(model)
    }

    /// Fit every algorithm on the same partition and select the best by the
    /// configured scoring metric. Exact ties keep the earlier algorithm in
    /// [`Algorithm::PREFERENCE_ORDER`].
    pub fn ensemble(&self) -> Result<EnsembleOutcome> {
        let metric = self.config.scoring_for(self.model_type());
        if !metric.applies_to(self.model_type()) {
            return Err(TrainerError::invalid_argument(
                "scoring",
                format!("{:?}", metric),
                format!("not defined for {}", self.model_type()),
            ));
        }

        let candidates = Algorithm::PREFERENCE_ORDER;
        let results: Vec<(Algorithm, Result<TrainedModel>)> = if self.config.parallel_ensemble {
            candidates
                .par_iter()
                .map(|&algorithm| (algorithm, self.train(algorithm)))
                .collect()
        } else {
            candidates
                .iter()
                .map(|&algorithm| (algorithm, self.train(algorithm)))
                .collect()
        };

        let mut models = Vec::new();
        let mut failures = Vec::new();
        for (algorithm, result) in results {
            match result {
                Ok(model) => models.push(model),
                Err(error) => {
                    warn!(
                        algorithm = algorithm.name(self.model_type()),
                        error = %error,
                        "ensemble candidate failed"
                    );
                    failures.push(AdapterFailure { algorithm, error });
                }
            }
        }

        if models.is_empty() {
            return match failures.pop() {
                Some(last) => Err(last.error),
                None => Err(TrainerError::TrainingError("no ensemble candidates".to_string())),
            };
        }

        let mut best = 0;
        for i in 1..models.len() {
            let candidate = models[i].metrics().score(metric);
            let incumbent = models[best].metrics().score(metric);
            if is_better(candidate, incumbent, metric) {
                best = i;
            }
        }

        info!(
            selected = models[best].algorithm_name(),
            metric = ?metric,
            score = models[best].metrics().score(metric),
            failures = failures.len(),
            "ensemble selection complete"
        );

        Ok(EnsembleOutcome {
            models,
            best,
            metric,
            failures,
        })
    }
}

/// Strictly better; an uncomputed score always loses
fn is_better(candidate: Option<f64>, incumbent: Option<f64>, metric: ScoringMetric) -> bool {
    match (candidate, incumbent) {
        (Some(c), Some(i)) => {
            let ord = c.total_cmp(&i);
            if metric.higher_is_better() {
                ord == Ordering::Greater
            } else {
                ord == Ordering::Less
            }
        }
        (Some(_), None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn classification_table() -> DataFrame {
        let n = 40;
        let age: Vec<f64> = (0..n).map(|i| 20.0 + i as f64).collect();
        let visits: Vec<f64> = (0..n).map(|i| (i % 7) as f64).collect();
        let label: Vec<i64> = (0..n).map(|i| if i >= 20 { 1 } else { 0 }).collect();
        let id: Vec<String> = (0..n).map(|i| format!("p{}", i)).collect();
        df!(
            "PatientID" => id,
            "Age" => age,
            "Visits" => visits,
            "Readmitted" => label
        )
        .unwrap()
    }

    fn small_config() -> TrainerConfig {
        TrainerConfig::default().with_n_estimators(10)
    }

    #[test]
    fn test_is_better_tie_keeps_incumbent() {
        assert!(!is_better(Some(0.8), Some(0.8), ScoringMetric::RocAuc));
        assert!(is_better(Some(0.9), Some(0.8), ScoringMetric::RocAuc));
        assert!(is_better(Some(1.0), Some(2.0), ScoringMetric::Rmse));
        assert!(!is_better(None, Some(0.1), ScoringMetric::RocAuc));
        assert!(is_better(Some(0.1), None, ScoringMetric::RocAuc));
    }

    #[test]
    fn test_linear_family_task_guards() {
        let request = TrainingRequest::new("Readmitted", ModelType::Classification).with_grain("PatientID");
        let trainer = SupervisedTrainer::new(&classification_table(), request, small_config()).unwrap();
        assert!(matches!(
            trainer.linear_regression(),
            Err(TrainerError::NotApplicableError(_))
        ));
        assert!(trainer.logistic_regression().is_ok());
    }

    #[test]
    fn test_ensemble_selects_a_candidate() {
        let request = TrainingRequest::new("Readmitted", ModelType::Classification).with_grain("PatientID");
        let trainer = SupervisedTrainer::new(&classification_table(), request, small_config()).unwrap();
        let outcome = trainer.ensemble().unwrap();

        assert_eq!(outcome.models.len(), 3);
        assert!(outcome.failures.is_empty());
        assert_eq!(outcome.metric, ScoringMetric::RocAuc);

        let best_score = outcome.best_model().metrics().score(outcome.metric).unwrap();
        for (i, model) in outcome.models.iter().enumerate() {
            let score = model.metrics().score(outcome.metric).unwrap();
            assert!(score <= best_score);
            if i < outcome.best {
                assert!(score < best_score);
            }
        }
    }

    #[test]
    fn test_ensemble_rejects_metric_for_other_task() {
        let request = TrainingRequest::new("Readmitted", ModelType::Classification).with_grain("PatientID");
        let config = small_config().with_scoring(ScoringMetric::Rmse);
        let trainer = SupervisedTrainer::new(&classification_table(), request, config).unwrap();
        assert!(matches!(
            trainer.ensemble(),
            Err(TrainerError::InvalidArgumentError { .. })
        ));
    }
}
