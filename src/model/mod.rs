//! Trained model artifact
//!
//! A [`TrainedModel`] bundles the fitted algorithm with its frozen feature
//! schema, holdout metrics and training baseline. It scores new tables,
//! explains each prediction, builds output frames and round-trips through
//! the persistence envelope.

mod baseline;
mod frames;
mod trained;

pub use baseline::FeatureBaseline;
pub use frames::{
    factor_column_name, BINDING_ID_COLUMN, BINDING_NAME, BINDING_NAME_COLUMN, LAST_LOAD_COLUMN,
    PREDICTION_COLUMN, PROBABILITY_COLUMN,
};
pub use trained::{HoldoutScores, ModelMetadata, TrainedModel};
