//! Table validation, imputation, encoding and splitting

use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

use super::schema::{FeatureColumn, FeatureEncoding, FeatureSchema, TargetSchema};
use super::split::{random_split, stratified_split, Partition};
use super::table::{format_number, has_column, infer_column, read_strings, ColumnValues};
use super::PreparationConfig;
use crate::error::{Result, TrainerError};
use crate::training::{ModelType, TrainingRequest};

/// Model-ready view of a table
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    /// Frozen schema the features were encoded with
    pub schema: FeatureSchema,
    /// Encoded features, one row per kept table row
    pub features: Array2<f64>,
    /// Target per kept row: class index or continuous value.
    /// `None` on the prediction path.
    pub targets: Option<Array1<f64>>,
    /// Grain identifiers per kept row when a grain column is present
    pub grain: Option<Vec<String>>,
    /// Table row index of each kept row
    pub row_ids: Vec<usize>,
    /// Train/holdout assignment over kept rows. `None` on the prediction path.
    pub partition: Option<Partition>,
}

impl PreparedDataset {
    pub fn n_rows(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn partition(&self) -> Result<&Partition> {
        self.partition.as_ref().ok_or_else(|| {
            TrainerError::NotApplicableError("dataset was prepared for prediction only".to_string())
        })
    }

    fn targets(&self) -> Result<&Array1<f64>> {
        self.targets.as_ref().ok_or_else(|| {
            TrainerError::NotApplicableError("dataset has no target values".to_string())
        })
    }

    pub fn train_features(&self) -> Result<Array2<f64>> {
        Ok(self.features.select(Axis(0), &self.partition()?.train))
    }

    pub fn train_targets(&self) -> Result<Array1<f64>> {
        Ok(self.targets()?.select(Axis(0), &self.partition()?.train))
    }

    pub fn holdout_features(&self) -> Result<Array2<f64>> {
        Ok(self.features.select(Axis(0), &self.partition()?.holdout))
    }

    pub fn holdout_targets(&self) -> Result<Array1<f64>> {
        Ok(self.targets()?.select(Axis(0), &self.partition()?.holdout))
    }
}

/// Turns raw tables into [`PreparedDataset`]s
#[derive(Debug, Clone, Default)]
pub struct DataPreparer {
    config: PreparationConfig,
}

impl DataPreparer {
    pub fn new(config: PreparationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreparationConfig {
        &self.config
    }

    /// Validate the table, fit fill values and encodings on the training
    /// partition, and encode every kept row.
    pub fn prepare(&self, table: &DataFrame, request: &TrainingRequest) -> Result<PreparedDataset> {
        self.config.validate()?;
        let predicted = request.predicted_column.as_str();

        if let Some(grain) = &request.grain_column {
            if !has_column(table, grain) {
                return Err(TrainerError::SchemaError(format!(
                    "grain column '{}' not found",
                    grain
                )));
            }
            if grain == predicted {
                return Err(TrainerError::SchemaError(format!(
                    "'{}' cannot be both the predicted and the grain column",
                    grain
                )));
            }
        }
        if !has_column(table, predicted) {
            return Err(TrainerError::SchemaError(format!(
                "predicted column '{}' not found",
                predicted
            )));
        }

        let (target, raw_targets) = self.read_target(table, predicted, request.model_type)?;

        let feature_names: Vec<String> = table
            .get_column_names()
            .into_iter()
            .map(|c| c.to_string())
            .filter(|c| {
                c != predicted
                    && request.grain_column.as_deref() != Some(c.as_str())
                    && !self.config.excluded_columns.contains(c)
            })
            .collect();
        if feature_names.is_empty() {
            return Err(TrainerError::SchemaError(
                "table has no feature columns besides the predicted and grain columns".to_string(),
            ));
        }

        let columns = feature_names
            .iter()
            .map(|name| {
                let values = infer_column(table, name, &self.config)?;
                debug!(column = %name, kind = ?values.kind(), missing = values.missing_count(), "Detected feature column");
                Ok(values)
            })
            .collect::<Result<Vec<_>>>()?;

        let kept: Vec<usize> = (0..table.height())
            .filter(|&r| raw_targets[r].is_some())
            .filter(|&r| request.impute || columns.iter().all(|c| !c.is_missing(r)))
            .collect();
        let dropped = table.height() - kept.len();

        if kept.is_empty() {
            return Err(TrainerError::InsufficientDataError(format!(
                "no rows left after dropping {} rows with missing values",
                dropped
            )));
        }
        if kept.len() < 2 {
            return Err(TrainerError::InsufficientDataError(format!(
                "need at least 2 usable rows, found {}",
                kept.len()
            )));
        }

        let kept_targets: Vec<f64> = kept.iter().filter_map(|&r| raw_targets[r]).collect();
        if let TargetSchema::Classes(classes) = &target {
            let mut present = vec![false; classes.len()];
            for &t in &kept_targets {
                present[t as usize] = true;
            }
            let surviving = present.iter().filter(|&&p| p).count();
            if surviving < 2 {
                let lost: Vec<&str> = classes
                    .iter()
                    .zip(&present)
                    .filter(|(_, &p)| !p)
                    .map(|(c, _)| c.as_str())
                    .collect();
                return Err(TrainerError::SchemaError(format!(
                    "classification target '{}' has {} class left after dropping incomplete rows (lost: {})",
                    predicted,
                    surviving,
                    lost.join(", ")
                )));
            }
        }
        let partition = match &target {
            TargetSchema::Classes(classes) => {
                let class_idx: Vec<usize> = kept_targets.iter().map(|&t| t as usize).collect();
                stratified_split(
                    &class_idx,
                    classes.len(),
                    self.config.holdout_ratio,
                    self.config.random_seed,
                )
            }
            TargetSchema::Continuous => random_split(
                kept.len(),
                self.config.holdout_ratio,
                self.config.random_seed,
            ),
        };
        if partition.holdout.is_empty() || partition.train.is_empty() {
            return Err(TrainerError::InsufficientDataError(format!(
                "cannot form both a train and a holdout partition from {} rows",
                kept.len()
            )));
        }

        let train_rows: Vec<usize> = partition.train.iter().map(|&p| kept[p]).collect();
        let features: Vec<FeatureColumn> = feature_names
            .iter()
            .zip(&columns)
            .map(|(name, values)| FeatureColumn {
                name: name.clone(),
                encoding: fit_encoding(values, &train_rows),
            })
            .collect();

        let schema = FeatureSchema {
            predicted_column: predicted.to_string(),
            grain_column: request.grain_column.clone(),
            model_type: request.model_type,
            target,
            features,
            excluded_columns: self
                .config
                .excluded_columns
                .iter()
                .filter(|c| has_column(table, c))
                .cloned()
                .collect(),
            missing_markers: self.config.missing_markers.clone(),
        };

        let matrix = encode_rows(&schema, &columns, &kept)?;
        let grain = self.read_grain(table, &schema, &kept)?;

        info!(
            rows = table.height(),
            kept = kept.len(),
            dropped,
            train = partition.train.len(),
            holdout = partition.holdout.len(),
            features = schema.n_features(),
            encoded = schema.n_encoded(),
            "Prepared dataset"
        );

        Ok(PreparedDataset {
            schema,
            features: matrix,
            targets: Some(Array1::from_vec(kept_targets)),
            grain,
            row_ids: kept,
            partition: Some(partition),
        })
    }

    /// Re-apply a frozen schema to new rows.
    ///
    /// Nothing is refitted and no row is dropped: missing values take the frozen
    /// fill values and unseen categories land in the unknown bucket.
    pub fn apply(schema: &FeatureSchema, table: &DataFrame) -> Result<PreparedDataset> {
        let config = PreparationConfig::default().with_missing_markers(schema.missing_markers.clone());

        let columns = schema
            .features
            .iter()
            .map(|feature| {
                if !has_column(table, &feature.name) {
                    return Err(TrainerError::SchemaMismatchError(format!(
                        "required feature column '{}' is missing",
                        feature.name
                    )));
                }
                match &feature.encoding {
                    FeatureEncoding::Numeric { .. } => match infer_column(table, &feature.name, &config)? {
                        numeric @ ColumnValues::Numeric(_) => Ok(numeric),
                        ColumnValues::Categorical(_) => Err(TrainerError::SchemaMismatchError(format!(
                            "feature column '{}' was numeric in training but holds non-numeric values",
                            feature.name
                        ))),
                    },
                    FeatureEncoding::Categorical { .. } => {
                        read_strings(table, &feature.name, &config).map(ColumnValues::Categorical)
                    }
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let rows: Vec<usize> = (0..table.height()).collect();
        let features = encode_rows(schema, &columns, &rows)?;
        let grain = match &schema.grain_column {
            Some(grain) if has_column(table, grain) => Some(
                read_strings(table, grain, &config)?
                    .into_iter()
                    .map(|v| v.unwrap_or_default())
                    .collect(),
            ),
            _ => None,
        };

        debug!(rows = rows.len(), encoded = features.ncols(), "Applied frozen schema");

        Ok(PreparedDataset {
            schema: schema.clone(),
            features,
            targets: None,
            grain,
            row_ids: rows,
            partition: None,
        })
    }

    fn read_target(
        &self,
        table: &DataFrame,
        predicted: &str,
        model_type: ModelType,
    ) -> Result<(TargetSchema, Vec<Option<f64>>)> {
        let values = infer_column(table, predicted, &self.config)?;

        match (model_type, values) {
            (ModelType::Regression, ColumnValues::Numeric(values)) => {
                Ok((TargetSchema::Continuous, values))
            }
            (ModelType::Regression, ColumnValues::Categorical(_)) => Err(TrainerError::SchemaError(format!(
                "regression target '{}' must be numeric",
                predicted
            ))),
            (ModelType::Classification, ColumnValues::Numeric(values)) => {
                let mut distinct: Vec<f64> = values.iter().flatten().copied().collect();
                distinct.sort_by(|a, b| a.total_cmp(b));
                distinct.dedup();
                self.check_class_count(predicted, distinct.len())?;

                let indexed = values
                    .iter()
                    .map(|v| v.and_then(|x| distinct.iter().position(|&d| d == x)).map(|i| i as f64))
                    .collect();
                let labels = distinct.iter().map(|&d| format_number(d)).collect();
                Ok((TargetSchema::Classes(labels), indexed))
            }
            (ModelType::Classification, ColumnValues::Categorical(values)) => {
                let mut distinct: Vec<String> = values.iter().flatten().cloned().collect();
                distinct.sort();
                distinct.dedup();
                self.check_class_count(predicted, distinct.len())?;

                let lookup: HashMap<&str, usize> = distinct
                    .iter()
                    .enumerate()
                    .map(|(i, label)| (label.as_str(), i))
                    .collect();
                let indexed = values
                    .iter()
                    .map(|v| v.as_deref().and_then(|s| lookup.get(s)).map(|&i| i as f64))
                    .collect();
                Ok((TargetSchema::Classes(distinct), indexed))
            }
        }
    }

    fn check_class_count(&self, predicted: &str, n_classes: usize) -> Result<()> {
        if n_classes < 2 {
            return Err(TrainerError::SchemaError(format!(
                "classification target '{}' needs at least 2 distinct values, found {}",
                predicted, n_classes
            )));
        }
        if n_classes > self.config.max_classes {
            return Err(TrainerError::SchemaError(format!(
                "classification target '{}' has {} distinct values, at most {} are supported",
                predicted, n_classes, self.config.max_classes
            )));
        }
        Ok(())
    }

    fn read_grain(&self, table: &DataFrame, schema: &FeatureSchema, rows: &[usize]) -> Result<Option<Vec<String>>> {
        match &schema.grain_column {
            Some(grain) => {
                let values = read_strings(table, grain, &self.config)?;
                Ok(Some(
                    rows.iter()
                        .map(|&r| values[r].clone().unwrap_or_default())
                        .collect(),
                ))
            }
            None => Ok(None),
        }
    }
}

/// Fill values and category lists from the training rows only
fn fit_encoding(values: &ColumnValues, train_rows: &[usize]) -> FeatureEncoding {
    match values {
        ColumnValues::Numeric(v) => {
            let present: Vec<f64> = train_rows.iter().filter_map(|&r| v[r]).collect();
            let fill = if present.is_empty() {
                0.0
            } else {
                present.iter().sum::<f64>() / present.len() as f64
            };
            FeatureEncoding::Numeric { fill }
        }
        ColumnValues::Categorical(v) => {
            let mut categories: Vec<String> = Vec::new();
            let mut counts: Vec<usize> = Vec::new();
            for value in train_rows.iter().filter_map(|&r| v[r].as_ref()) {
                match categories.iter().position(|c| c == value) {
                    Some(i) => counts[i] += 1,
                    None => {
                        categories.push(value.clone());
                        counts.push(1);
                    }
                }
            }
            // first-appearance order breaks mode ties
            let mut mode: Option<usize> = None;
            for (i, &count) in counts.iter().enumerate() {
                if mode.map_or(true, |m| count > counts[m]) {
                    mode = Some(i);
                }
            }
            let fill = mode.map(|i| categories[i].clone());
            FeatureEncoding::Categorical { categories, fill }
        }
    }
}

/// Encode the given table rows through the schema.
///
/// Each column must have been read with the kind its encoding was fitted on.
fn encode_rows(schema: &FeatureSchema, columns: &[ColumnValues], rows: &[usize]) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((rows.len(), schema.n_encoded()));
    let spans = schema.feature_spans();

    for ((feature, values), span) in schema.features.iter().zip(columns).zip(spans) {
        match (&feature.encoding, values) {
            (FeatureEncoding::Numeric { fill }, ColumnValues::Numeric(v)) => {
                for (out_row, &r) in rows.iter().enumerate() {
                    matrix[[out_row, span.start]] = v[r].unwrap_or(*fill);
                }
            }
            (FeatureEncoding::Categorical { categories, fill }, ColumnValues::Categorical(v)) => {
                let lookup: HashMap<&str, usize> = categories
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (c.as_str(), i))
                    .collect();
                let unknown = categories.len();
                for (out_row, &r) in rows.iter().enumerate() {
                    let value = v[r].as_deref().or(fill.as_deref());
                    let slot = value.and_then(|s| lookup.get(s).copied()).unwrap_or(unknown);
                    matrix[[out_row, span.start + slot]] = 1.0;
                }
            }
            (_, values) => {
                return Err(TrainerError::SchemaMismatchError(format!(
                    "feature column '{}' was read as {:?} but is encoded as {:?}",
                    feature.name,
                    values.kind(),
                    feature.kind()
                )));
            }
        }
    }

    Ok(matrix)
}
