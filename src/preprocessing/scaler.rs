//! Z-score scaling over encoded feature matrices

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainerError};

/// Per-column centering and scaling: (x - mean) / std
///
/// Columns with zero spread keep a scale of 1 so they pass through centered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    means: Array1<f64>,
    scales: Array1<f64>,
}

impl Standardizer {
    /// Fit population mean and standard deviation of each column
    pub fn fit(x: &Array2<f64>) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(TrainerError::InsufficientDataError(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }
        let means = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let scales = x.std_axis(Axis(0), 0.0).mapv(|s| if s > 1e-12 { s } else { 1.0 });
        Ok(Self { means, scales })
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn scales(&self) -> &Array1<f64> {
        &self.scales
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if x.ncols() != self.n_features() {
            return Err(TrainerError::ShapeError {
                expected: format!("{} columns", self.n_features()),
                actual: format!("{} columns", x.ncols()),
            });
        }
        Ok((x - &self.means) / &self.scales)
    }
}
