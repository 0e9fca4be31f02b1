//! Preparation configuration

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainerError};

/// Configuration for turning a raw table into a model-ready dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreparationConfig {
    /// Fraction of rows withheld for holdout metrics
    pub holdout_ratio: f64,

    /// Seed for the train/holdout assignment and every seeded algorithm
    pub random_seed: u64,

    /// Upper bound on distinct values a classification target may have
    pub max_classes: usize,

    /// String values read as missing in addition to nulls and NaN
    pub missing_markers: Vec<String>,

    /// Columns never used as features (besides the target and grain)
    pub excluded_columns: Vec<String>,
}

impl Default for PreparationConfig {
    fn default() -> Self {
        Self {
            holdout_ratio: 0.2,
            random_seed: 42,
            max_classes: 10,
            missing_markers: ["", "None", "NA", "NaN", "NULL", "null"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_columns: Vec::new(),
        }
    }
}

impl PreparationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the holdout ratio
    pub fn with_holdout_ratio(mut self, ratio: f64) -> Self {
        self.holdout_ratio = ratio;
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Builder method to set the class limit
    pub fn with_max_classes(mut self, max_classes: usize) -> Self {
        self.max_classes = max_classes;
        self
    }

    /// Builder method to replace the missing-value markers
    pub fn with_missing_markers(mut self, markers: Vec<String>) -> Self {
        self.missing_markers = markers;
        self
    }

    /// Builder method to exclude a column from the features
    pub fn exclude_column(mut self, column: impl Into<String>) -> Self {
        self.excluded_columns.push(column.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.holdout_ratio > 0.0 && self.holdout_ratio < 1.0) {
            return Err(TrainerError::invalid_argument(
                "holdout_ratio",
                self.holdout_ratio,
                "must lie strictly between 0 and 1",
            ));
        }
        if self.max_classes < 2 {
            return Err(TrainerError::invalid_argument(
                "max_classes",
                self.max_classes,
                "classification needs at least 2 classes",
            ));
        }
        Ok(())
    }

    /// Whether a raw string value counts as missing
    pub fn is_missing_marker(&self, value: &str) -> bool {
        let trimmed = value.trim();
        self.missing_markers.iter().any(|m| m == trimmed)
    }
}
