//! Integration tests for training: adapters, determinism and ensemble selection

mod common;

use approx::assert_abs_diff_eq;
use caretrain::training::{
    Algorithm, Estimator, ModelType, ScoringMetric, SupervisedTrainer, TrainerConfig, TrainingRequest,
};
use caretrain::TrainerError;
use common::{length_of_stay_table, readmission_table, separable_table};
use polars::prelude::*;

fn fast_config() -> TrainerConfig {
    TrainerConfig::default().with_n_estimators(20)
}

fn readmission_trainer(config: TrainerConfig) -> SupervisedTrainer {
    let request = TrainingRequest::new("Readmitted", ModelType::Classification).with_grain("EncounterID");
    SupervisedTrainer::new(&readmission_table(120, 11), request, config).unwrap()
}

// ============================================================================
// Classification
// ============================================================================

#[test]
fn test_imbalanced_logistic_predicts_every_row() {
    let labels: Vec<i64> = (0..100).map(|i| if i % 10 == 0 { 1 } else { 0 }).collect();
    let severity: Vec<f64> = (0..100)
        .map(|i| if i % 10 == 0 { 8.0 + (i % 3) as f64 } else { (i % 6) as f64 })
        .collect();
    let age: Vec<f64> = (0..100).map(|i| 30.0 + (i % 40) as f64).collect();
    let table = df!("Severity" => severity, "Age" => age, "Sepsis" => labels).unwrap();

    let request = TrainingRequest::new("Sepsis", ModelType::Classification);
    let trainer = SupervisedTrainer::new(&table, request, fast_config()).unwrap();
    let holdout = trainer.prepared().holdout_targets().unwrap();
    assert!(holdout.iter().any(|&y| y == 0.0));
    assert!(holdout.iter().any(|&y| y == 1.0));

    let model = trainer.logistic_regression().unwrap();
    let predictions = model.make_predictions(&table).unwrap();
    assert_eq!(predictions.len(), 100);
    assert!(predictions.iter().all(|&p| p == 0.0 || p == 1.0));
    assert!(model.metrics().roc_auc.unwrap() > 0.9);
}

#[test]
fn test_every_adapter_trains() {
    let trainer = readmission_trainer(fast_config());
    for algorithm in Algorithm::PREFERENCE_ORDER {
        let model = trainer.train(algorithm).unwrap();
        let metrics = model.metrics();
        assert_eq!(model.algorithm(), algorithm);
        assert!(metrics.accuracy.unwrap() > 0.55, "{} accuracy", model.algorithm_name());
        assert_eq!(metrics.n_train + metrics.n_holdout, 120);
        assert_abs_diff_eq!(model.feature_importances().sum(), 1.0, epsilon = 1e-9);
        assert!(model.feature_importances().iter().all(|&w| w >= 0.0));
    }
}

#[test]
fn test_probabilities_are_distributions() {
    let trainer = readmission_trainer(fast_config());
    let table = readmission_table(30, 99);
    for algorithm in Algorithm::PREFERENCE_ORDER {
        let proba = trainer.train(algorithm).unwrap().make_probabilities(&table).unwrap();
        assert_eq!(proba.dim(), (30, 2));
        for row in proba.rows() {
            assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_multiclass_target() {
    let n = 90;
    let x: Vec<f64> = (0..n).map(|i| (i % 3) as f64 * 10.0 + (i % 5) as f64 * 0.1).collect();
    let noise: Vec<f64> = (0..n).map(|i| ((i * 13) % 7) as f64).collect();
    let acuity: Vec<&str> = (0..n)
        .map(|i| match i % 3 {
            0 => "low",
            1 => "medium",
            _ => "high",
        })
        .collect();
    let table = df!("Score" => x, "Noise" => noise, "Acuity" => acuity).unwrap();

    let request = TrainingRequest::new("Acuity", ModelType::Classification);
    let trainer = SupervisedTrainer::new(&table, request, fast_config()).unwrap();
    assert_eq!(trainer.prepared().schema.n_classes(), Some(3));

    let model = trainer.logistic_regression().unwrap();
    let proba = model.make_probabilities(&table).unwrap();
    assert_eq!(proba.ncols(), 3);
    assert_eq!(model.holdout().positive_class, Some(2));
    assert!(model.metrics().accuracy.unwrap() > 0.6);
}

// ============================================================================
// Regression
// ============================================================================

#[test]
fn test_regression_adapters() {
    let table = length_of_stay_table(150, 5);
    let request = TrainingRequest::new("LOS", ModelType::Regression).with_grain("PatientID");
    let trainer = SupervisedTrainer::new(&table, request, fast_config()).unwrap();

    let linear = trainer.linear_regression().unwrap();
    assert_eq!(linear.algorithm_name(), "linear_regression");
    assert!(linear.metrics().r2.unwrap() > 0.95);
    assert!(matches!(
        trainer.logistic_regression(),
        Err(TrainerError::NotApplicableError(_))
    ));

    let forest = trainer.random_forest().unwrap();
    assert!(forest.metrics().rmse.unwrap() > 0.0);
    assert!(forest.metrics().roc_auc.is_none());
}

#[test]
fn test_regression_ensemble_minimizes_rmse() {
    let table = length_of_stay_table(150, 5);
    let request = TrainingRequest::new("LOS", ModelType::Regression);
    let trainer = SupervisedTrainer::new(&table, request, fast_config()).unwrap();

    let outcome = trainer.ensemble().unwrap();
    assert_eq!(outcome.metric, ScoringMetric::Rmse);
    let best = outcome.best_model().metrics().rmse.unwrap();
    for model in &outcome.models {
        assert!(model.metrics().rmse.unwrap() >= best);
    }
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_fits_are_deterministic() {
    let table = readmission_table(30, 4);
    for algorithm in Algorithm::PREFERENCE_ORDER {
        let a = readmission_trainer(fast_config()).train(algorithm).unwrap();
        let b = readmission_trainer(fast_config()).train(algorithm).unwrap();

        assert_eq!(a.make_probabilities(&table).unwrap(), b.make_probabilities(&table).unwrap());
        assert_eq!(a.feature_importances(), b.feature_importances());
        assert_eq!(a.metrics(), b.metrics());
        assert_eq!(a.holdout(), b.holdout());
    }
}

#[test]
fn test_parallel_and_sequential_ensembles_agree() {
    let parallel = readmission_trainer(fast_config()).ensemble().unwrap();
    let sequential = readmission_trainer(fast_config().with_parallel_ensemble(false))
        .ensemble()
        .unwrap();

    assert_eq!(parallel.best, sequential.best);
    let scores = |o: &caretrain::training::EnsembleOutcome| -> Vec<Option<f64>> {
        o.models.iter().map(|m| m.metrics().roc_auc).collect()
    };
    assert_eq!(scores(&parallel), scores(&sequential));
}

// ============================================================================
// Ensemble selection
// ============================================================================

#[test]
fn test_ensemble_tie_prefers_logistic_regression() {
    let table = separable_table(60);
    let request = TrainingRequest::new("Label", ModelType::Classification);
    let trainer = SupervisedTrainer::new(&table, request, fast_config()).unwrap();

    let outcome = trainer.ensemble().unwrap();
    assert_eq!(outcome.models.len(), 3);
    assert_eq!(outcome.best_model().metrics().roc_auc, Some(1.0));
    assert_eq!(outcome.best, 0);
    assert_eq!(outcome.best_model().algorithm(), Algorithm::LogisticRegression);
}

#[test]
fn test_ensemble_isolates_failed_adapter() {
    let mut config = fast_config();
    config.logistic.learning_rate = 1e308;
    let trainer = readmission_trainer(config);

    assert!(matches!(
        trainer.logistic_regression(),
        Err(TrainerError::TrainingError(_))
    ));

    let outcome = trainer.ensemble().unwrap();
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].algorithm, Algorithm::LogisticRegression);
    assert_eq!(outcome.models.len(), 2);
    assert_ne!(outcome.best_model().algorithm(), Algorithm::LogisticRegression);
}

#[test]
fn test_fitted_state_used_directly() {
    let trainer = readmission_trainer(fast_config());
    let model = trainer.knn().unwrap();
    let holdout = trainer.prepared().holdout_features().unwrap();
    let predictions = model.state().predict(&holdout).unwrap();
    assert_eq!(predictions, model.holdout().predictions);
}
