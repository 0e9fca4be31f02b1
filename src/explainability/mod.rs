//! Model explainability module
//!
//! Model-agnostic local explanations: each prediction is attributed to the
//! source features whose deviation from the training baseline, weighted by
//! the model's importances, pushes hardest toward the predicted outcome.

mod contributions;

pub use contributions::{explain, explain_rows, feature_contributions, rank_factors, Factor, FactorRanking};

pub(crate) use contributions::{effective_k, explain_predicted};
