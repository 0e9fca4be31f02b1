//! Integration tests for saving and loading trained models

mod common;

use caretrain::export::FORMAT_VERSION;
use caretrain::model::TrainedModel;
use caretrain::training::{Algorithm, ModelType, SupervisedTrainer, TrainerConfig, TrainingRequest};
use caretrain::TrainerError;
use common::{length_of_stay_table, readmission_table};

fn readmission_trainer() -> SupervisedTrainer {
    let request = TrainingRequest::new("Readmitted", ModelType::Classification).with_grain("EncounterID");
    let config = TrainerConfig::default().with_n_estimators(15);
    SupervisedTrainer::new(&readmission_table(100, 31), request, config).unwrap()
}

#[test]
fn test_round_trip_preserves_outputs() {
    let trainer = readmission_trainer();
    let table = readmission_table(20, 2);

    for algorithm in Algorithm::PREFERENCE_ORDER {
        let model = trainer.train(algorithm).unwrap();
        let restored = TrainedModel::load(&model.save().unwrap()).unwrap();

        assert_eq!(restored.model_id(), model.model_id());
        assert_eq!(restored.metadata(), model.metadata());
        assert_eq!(restored.metrics(), model.metrics());
        assert_eq!(
            restored.make_predictions(&table).unwrap(),
            model.make_predictions(&table).unwrap()
        );
        assert_eq!(
            restored.make_probabilities(&table).unwrap(),
            model.make_probabilities(&table).unwrap()
        );
        assert_eq!(
            restored.make_factors(&table, 2).unwrap(),
            model.make_factors(&table, 2).unwrap()
        );
    }
}

#[test]
fn test_regression_round_trip() {
    let request = TrainingRequest::new("LOS", ModelType::Regression).with_grain("PatientID");
    let table = length_of_stay_table(80, 4);
    let model = SupervisedTrainer::new(&table, request, TrainerConfig::default())
        .unwrap()
        .linear_regression()
        .unwrap();

    let restored = TrainedModel::load(&model.save().unwrap()).unwrap();
    assert_eq!(restored.model_type(), ModelType::Regression);
    assert_eq!(
        restored.make_predictions(&table).unwrap(),
        model.make_predictions(&table).unwrap()
    );
}

#[test]
fn test_file_round_trip() {
    let model = readmission_trainer().knn().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("readmission.ctm");

    model.save_to_file(&path).unwrap();
    let restored = TrainedModel::load_from_file(&path).unwrap();
    assert_eq!(restored.model_id(), model.model_id());
    assert_eq!(restored.schema(), model.schema());
}

#[test]
fn test_newer_format_version_rejected() {
    let model = readmission_trainer().logistic_regression().unwrap();
    let mut bytes = model.save().unwrap();
    bytes[4] = 9;

    match TrainedModel::load(&bytes) {
        Err(TrainerError::IncompatibleVersionError { found, expected }) => {
            assert_eq!(found, 9);
            assert_eq!(expected, FORMAT_VERSION);
        }
        other => panic!("expected a version error, got {:?}", other.map(|m| m.model_id().to_string())),
    }
}

#[test]
fn test_damaged_bytes_rejected() {
    let model = readmission_trainer().logistic_regression().unwrap();
    let bytes = model.save().unwrap();

    let mut bad_magic = bytes.clone();
    bad_magic[0] = b'X';
    assert!(matches!(
        TrainedModel::load(&bad_magic),
        Err(TrainerError::SerializationError(_))
    ));

    let truncated = &bytes[..bytes.len() / 2];
    assert!(matches!(
        TrainedModel::load(truncated),
        Err(TrainerError::SerializationError(_))
    ));

    let mut flipped = bytes.clone();
    let last = flipped.len() - 1;
    flipped[last] ^= 0xff;
    assert!(matches!(
        TrainedModel::load(&flipped),
        Err(TrainerError::SerializationError(_))
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        TrainedModel::load_from_file(dir.path().join("absent.ctm")),
        Err(TrainerError::IoError(_))
    ));
}
