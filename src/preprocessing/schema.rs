//! Frozen feature schema
//!
//! Captures how raw table columns map to model input columns: column order,
//! fill values and categorical encodings. A schema is computed once during
//! preparation and reused verbatim for every later prediction input.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use super::table::{format_number, ColumnKind};
use crate::training::ModelType;

/// Suffix of the one-hot column that receives unseen categories
pub const UNKNOWN_CATEGORY: &str = "<unknown>";

/// Encoding parameters of one source feature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FeatureEncoding {
    /// Single column; missing values take `fill` (training mean)
    Numeric { fill: f64 },
    /// One column per category plus a trailing unknown bucket.
    /// Missing values take `fill` (training mode) when one exists.
    Categorical {
        categories: Vec<String>,
        fill: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub encoding: FeatureEncoding,
}

impl FeatureColumn {
    pub fn kind(&self) -> ColumnKind {
        match self.encoding {
            FeatureEncoding::Numeric { .. } => ColumnKind::Numeric,
            FeatureEncoding::Categorical { .. } => ColumnKind::Categorical,
        }
    }

    /// Number of encoded columns produced by this feature
    pub fn width(&self) -> usize {
        match &self.encoding {
            FeatureEncoding::Numeric { .. } => 1,
            FeatureEncoding::Categorical { categories, .. } => categories.len() + 1,
        }
    }

    pub fn encoded_names(&self) -> Vec<String> {
        match &self.encoding {
            FeatureEncoding::Numeric { .. } => vec![self.name.clone()],
            FeatureEncoding::Categorical { categories, .. } => categories
                .iter()
                .map(|c| format!("{}={}", self.name, c))
                .chain(std::iter::once(format!("{}={}", self.name, UNKNOWN_CATEGORY)))
                .collect(),
        }
    }
}

/// Semantics of the predicted column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetSchema {
    /// Ordered class labels; a prediction is an index into this list
    Classes(Vec<String>),
    Continuous,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub predicted_column: String,
    pub grain_column: Option<String>,
    pub model_type: ModelType,
    pub target: TargetSchema,
    pub features: Vec<FeatureColumn>,
    /// Columns explicitly kept out of the features
    #[serde(default)]
    pub excluded_columns: Vec<String>,
    pub missing_markers: Vec<String>,
}

impl FeatureSchema {
    /// Source feature names in schema order
    pub fn feature_names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn n_features(&self) -> usize {
        self.features.len()
    }

    /// Total width of the encoded matrix
    pub fn n_encoded(&self) -> usize {
        self.features.iter().map(|f| f.width()).sum()
    }

    pub fn encoded_names(&self) -> Vec<String> {
        self.features.iter().flat_map(|f| f.encoded_names()).collect()
    }

    /// Encoded column range of each source feature
    pub fn feature_spans(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        self.features
            .iter()
            .map(|f| {
                let span = start..start + f.width();
                start = span.end;
                span
            })
            .collect()
    }

    /// How a table column is treated. The grain and excluded columns are
    /// identifiers; the predicted column and unknown columns yield `None`.
    pub fn column_kind(&self, name: &str) -> Option<ColumnKind> {
        if self.grain_column.as_deref() == Some(name) || self.excluded_columns.iter().any(|c| c == name) {
            return Some(ColumnKind::Identifier);
        }
        self.features.iter().find(|f| f.name == name).map(|f| f.kind())
    }

    pub fn classes(&self) -> Option<&[String]> {
        match &self.target {
            TargetSchema::Classes(classes) => Some(classes),
            TargetSchema::Continuous => None,
        }
    }

    pub fn n_classes(&self) -> Option<usize> {
        self.classes().map(|c| c.len())
    }

    /// Human-readable form of a prediction value
    pub fn describe_prediction(&self, value: f64) -> String {
        match &self.target {
            TargetSchema::Classes(classes) => classes
                .get(value as usize)
                .cloned()
                .unwrap_or_else(|| format_number(value)),
            TargetSchema::Continuous => format!("{:.4}", value),
        }
    }
}
