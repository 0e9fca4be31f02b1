//! Tabular outputs joining predictions and factors back to the input rows

use chrono::Utc;
use polars::prelude::*;

use super::trained::TrainedModel;
use crate::preprocessing::table::has_column;
use crate::error::{Result, TrainerError};
use crate::explainability::{effective_k, explain_predicted};
use crate::training::Estimator;

pub const PREDICTION_COLUMN: &str = "Prediction";
pub const PROBABILITY_COLUMN: &str = "Probability";
pub const BINDING_ID_COLUMN: &str = "BindingID";
pub const BINDING_NAME_COLUMN: &str = "BindingNM";
pub const LAST_LOAD_COLUMN: &str = "LastLoadDTS";
pub const BINDING_NAME: &str = "caretrain";

/// `Factor{i}TXT`, 1-based
pub fn factor_column_name(i: usize) -> String {
    format!("Factor{}TXT", i)
}

impl TrainedModel {
    /// Prediction, optional probability and factor columns for `table`
    fn scored_columns(&self, table: &DataFrame, k: usize) -> Result<Vec<Column>> {
        let k = effective_k(k, self.schema().n_features())?;
        let input = self.prepare_input(table)?;
        let predictions = self.state().predict(&input.features)?;
        let rankings = explain_predicted(self, &input.features, &predictions, k)?;

        let mut columns = Vec::with_capacity(k + 2);
        match self.schema().classes() {
            Some(_) => {
                let labels: Vec<String> = predictions
                    .iter()
                    .map(|&p| self.schema().describe_prediction(p))
                    .collect();
                columns.push(Column::new(PREDICTION_COLUMN.into(), labels));

                let positive = self.holdout().positive_class.unwrap_or(1);
                let proba = self.state().predict_proba(&input.features)?;
                let scores: Vec<f64> = proba.column(positive).to_vec();
                columns.push(Column::new(PROBABILITY_COLUMN.into(), scores));
            }
            None => {
                columns.push(Column::new(PREDICTION_COLUMN.into(), predictions.to_vec()));
            }
        }

        for i in 0..k {
            let names: Vec<String> = rankings
                .iter()
                .map(|r| r.factors.get(i).map(|f| f.feature.clone()).unwrap_or_default())
                .collect();
            columns.push(Column::new(factor_column_name(i + 1).into(), names));
        }
        Ok(columns)
    }

    fn grain_of(&self, table: &DataFrame) -> Option<Column> {
        self.schema()
            .grain_column
            .as_deref()
            .and_then(|grain| table.column(grain).ok())
            .cloned()
    }

    /// Grain (when present), predictions and `Factor{i}TXT` columns
    pub fn make_predictions_with_k_factors(&self, table: &DataFrame, k: usize) -> Result<DataFrame> {
        let mut columns = Vec::new();
        columns.extend(self.grain_of(table));
        columns.extend(self.scored_columns(table, k)?);
        Ok(DataFrame::new(columns)?)
    }

    /// Every original column in order, followed by predictions and factors.
    ///
    /// Fails when `table` already holds a column named like one of the outputs.
    pub fn make_original_with_predictions_and_features(&self, table: &DataFrame, k: usize) -> Result<DataFrame> {
        let scored = self.scored_columns(table, k)?;
        if let Some(taken) = scored.iter().find(|c| has_column(table, c.name())) {
            return Err(TrainerError::invalid_argument(
                "table",
                taken.name(),
                "column already exists and would be overwritten by the scored output",
            ));
        }

        let mut out = table.clone();
        for column in scored {
            out.with_column(column)?;
        }
        Ok(out)
    }

    /// Predictions in the warehouse layout: binding metadata, grain,
    /// predictions and factors
    pub fn create_catalyst_frame(&self, table: &DataFrame, k: usize) -> Result<DataFrame> {
        let scored = self.scored_columns(table, k)?;
        let n = table.height();
        let loaded_at = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let mut columns = vec![
            Column::new(BINDING_ID_COLUMN.into(), vec![0i32; n]),
            Column::new(BINDING_NAME_COLUMN.into(), vec![BINDING_NAME.to_string(); n]),
            Column::new(LAST_LOAD_COLUMN.into(), vec![loaded_at; n]),
        ];
        columns.extend(self.grain_of(table));
        columns.extend(scored);
        Ok(DataFrame::new(columns)?)
    }
}
