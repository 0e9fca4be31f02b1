//! Typed column access over polars tables

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::PreparationConfig;
use crate::error::Result;

/// Declared kind of a table column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Numeric,
    Categorical,
    /// Row identity only, never a learning input
    Identifier,
}

/// Column values with missing entries normalized to `None`
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            ColumnValues::Numeric(_) => ColumnKind::Numeric,
            ColumnValues::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnValues::Numeric(v) => v[row].is_none(),
            ColumnValues::Categorical(v) => v[row].is_none(),
        }
    }

    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&r| self.is_missing(r)).count()
    }
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Boolean
    )
}

/// Whether the table has a column with this name
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Read a column and infer its kind.
///
/// Numeric and boolean dtypes are numeric. String columns are numeric when
/// every non-missing value parses as a finite number, categorical otherwise.
/// A column with no present values at all reads as numeric.
pub fn infer_column(df: &DataFrame, name: &str, config: &PreparationConfig) -> Result<ColumnValues> {
    let column = df.column(name)?;
    let series = column.as_materialized_series();

    if is_numeric_dtype(series.dtype()) {
        return read_float_series(series).map(ColumnValues::Numeric);
    }

    let strings = read_strings(df, name, config)?;
    if strings.iter().all(|v| v.is_none()) {
        return Ok(ColumnValues::Numeric(vec![None; strings.len()]));
    }

    let parsed: Option<Vec<Option<f64>>> = strings
        .iter()
        .map(|value| match value {
            None => Some(None),
            Some(s) => s.parse::<f64>().ok().filter(|v| v.is_finite()).map(Some),
        })
        .collect();

    Ok(match parsed {
        Some(values) => ColumnValues::Numeric(values),
        None => ColumnValues::Categorical(strings),
    })
}

/// Read any column as trimmed strings, mapping missing markers to `None`
pub fn read_strings(df: &DataFrame, name: &str, config: &PreparationConfig) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?;
    let series = column.as_materialized_series();
    let casted = series.cast(&DataType::String)?;
    let values = casted
        .str()?
        .into_iter()
        .map(|v| {
            v.filter(|s| !config.is_missing_marker(s))
                .map(|s| s.trim().to_string())
        })
        .collect();
    Ok(values)
}

fn read_float_series(series: &Series) -> Result<Vec<Option<f64>>> {
    let casted = series.cast(&DataType::Float64)?;
    let values = casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| x.is_finite()))
        .collect();
    Ok(values)
}

/// Render a numeric label without a trailing `.0` for whole numbers
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
