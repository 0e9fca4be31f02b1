//! Integration tests for per-row factor rankings and output frames

mod common;

use caretrain::explainability::{explain, explain_rows};
use caretrain::model::{factor_column_name, TrainedModel};
use caretrain::training::{Algorithm, ModelType, SupervisedTrainer, TrainerConfig, TrainingRequest};
use caretrain::TrainerError;
use common::{length_of_stay_table, readmission_table};
use polars::prelude::*;

fn trained(algorithm: Algorithm) -> TrainedModel {
    let request = TrainingRequest::new("Readmitted", ModelType::Classification).with_grain("EncounterID");
    let config = TrainerConfig::default().with_n_estimators(20);
    SupervisedTrainer::new(&readmission_table(120, 21), request, config)
        .unwrap()
        .train(algorithm)
        .unwrap()
}

#[test]
fn test_single_row_ranking_has_k_factors() {
    let model = trained(Algorithm::LogisticRegression);
    let row = readmission_table(1, 5);

    let rankings = model.make_factors(&row, 3).unwrap();
    assert_eq!(rankings.len(), 1);
    assert_eq!(rankings[0].len(), 3);
    let ranks: Vec<usize> = rankings[0].factors.iter().map(|f| f.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
}

#[test]
fn test_rankings_sorted_and_clamped() {
    for algorithm in Algorithm::PREFERENCE_ORDER {
        let model = trained(algorithm);
        let rankings = model.make_factors(&readmission_table(25, 8), 10).unwrap();

        assert_eq!(rankings.len(), 25);
        for ranking in &rankings {
            assert_eq!(ranking.len(), 3);
            let magnitudes: Vec<f64> = ranking.factors.iter().map(|f| f.contribution.abs()).collect();
            assert!(magnitudes.windows(2).all(|w| w[0] >= w[1]));

            let mut names = ranking.feature_names();
            names.sort();
            assert_eq!(names, vec!["Age", "Glucose", "Unit"]);
        }
    }
}

#[test]
fn test_zero_k_is_invalid() {
    let model = trained(Algorithm::KNearestNeighbors);
    assert!(matches!(
        model.make_factors(&readmission_table(3, 1), 0),
        Err(TrainerError::InvalidArgumentError { .. })
    ));
    assert!(matches!(
        model.make_predictions_with_k_factors(&readmission_table(3, 1), 0),
        Err(TrainerError::InvalidArgumentError { .. })
    ));
}

#[test]
fn test_explain_matches_batch_explanations() {
    let model = trained(Algorithm::RandomForest);
    let table = readmission_table(10, 3);
    let input = model.prepare_input(&table).unwrap();

    let batch = explain_rows(&model, &input, 2).unwrap();
    for (r, expected) in batch.iter().enumerate() {
        let single = explain(&model, input.features.row(r), 2).unwrap();
        assert_eq!(&single, expected);
    }
}

#[test]
fn test_explain_rejects_wrong_width() {
    let model = trained(Algorithm::LogisticRegression);
    let row = ndarray::array![1.0, 2.0];
    assert!(matches!(
        explain(&model, row.view(), 2),
        Err(TrainerError::ShapeError { .. })
    ));
}

#[test]
fn test_older_patient_pushes_toward_readmission() {
    let model = trained(Algorithm::LogisticRegression);
    let patient = df!(
        "Age" => &[89.0],
        "Glucose" => &[135.0],
        "Unit" => &["medicine"]
    )
    .unwrap();

    let predictions = model.make_predictions(&patient).unwrap();
    assert_eq!(predictions[0], 1.0);

    let ranking = &model.make_factors(&patient, 1).unwrap()[0];
    assert_eq!(ranking.factors[0].feature, "Age");
    assert!(ranking.factors[0].contribution > 0.0);
}

#[test]
fn test_regression_factors() {
    let table = length_of_stay_table(120, 2);
    let request = TrainingRequest::new("LOS", ModelType::Regression).with_grain("PatientID");
    let model = SupervisedTrainer::new(&table, request, TrainerConfig::default())
        .unwrap()
        .linear_regression()
        .unwrap();

    let long_stay = df!(
        "Age" => &[55.0],
        "Comorbidities" => &[4.0],
        "AdmitType" => &["emergency"]
    )
    .unwrap();
    assert!(model.make_predictions(&long_stay).unwrap()[0] > model.baseline().target_mean());

    let ranking = &model.make_factors(&long_stay, 3).unwrap()[0];
    let pushing_up: Vec<&str> = ranking.positive_factors().iter().map(|f| f.feature.as_str()).collect();
    assert!(pushing_up.contains(&"Comorbidities"));
    assert!(pushing_up.contains(&"AdmitType"));
}

#[test]
fn test_prediction_frame_factor_columns() {
    let model = trained(Algorithm::KNearestNeighbors);
    let table = readmission_table(12, 6);
    let frame = model.make_predictions_with_k_factors(&table, 2).unwrap();

    assert_eq!(frame.height(), 12);
    let rankings = model.make_factors(&table, 2).unwrap();
    let first = frame.column(&factor_column_name(1)).unwrap().str().unwrap();
    for (value, ranking) in first.into_iter().zip(rankings.iter()) {
        assert_eq!(value, Some(ranking.factors[0].feature.as_str()));
    }
}

#[test]
fn test_schema_mismatch_leaves_model_usable() {
    let model = trained(Algorithm::LogisticRegression);
    let broken = readmission_table(5, 1).drop("Age").unwrap();
    assert!(matches!(
        model.make_factors(&broken, 2),
        Err(TrainerError::SchemaMismatchError(_))
    ));
    assert_eq!(model.make_factors(&readmission_table(5, 1), 2).unwrap().len(), 5);
}
