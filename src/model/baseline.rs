//! Training-partition statistics used to explain individual predictions

use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// Per encoded column: mean, spread and direction of association with the outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureBaseline {
    means: Array1<f64>,
    stds: Array1<f64>,
    /// Outcomes by encoded columns. One row per class for classification
    /// (association with `y == class`), a single row for regression.
    directions: Array2<f64>,
    target_mean: f64,
    classification: bool,
}

impl FeatureBaseline {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, n_classes: Option<usize>) -> Self {
        let n_cols = x.ncols();
        let means = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_cols));
        let stds = x.std_axis(Axis(0), 0.0);
        let target_mean = y.mean().unwrap_or(0.0);

        let outcomes: Vec<Array1<f64>> = match n_classes {
            Some(k) => (0..k)
                .map(|class| y.mapv(|v| if v as usize == class { 1.0 } else { 0.0 }))
                .collect(),
            None => vec![y.clone()],
        };

        let mut directions = Array2::<f64>::zeros((outcomes.len(), n_cols));
        for (o, outcome) in outcomes.iter().enumerate() {
            for c in 0..n_cols {
                directions[[o, c]] = covariance_sign(x.column(c), outcome.view(), means[c]);
            }
        }

        Self {
            means,
            stds,
            directions,
            target_mean,
            classification: n_classes.is_some(),
        }
    }

    pub fn n_columns(&self) -> usize {
        self.means.len()
    }

    pub fn means(&self) -> &Array1<f64> {
        &self.means
    }

    pub fn stds(&self) -> &Array1<f64> {
        &self.stds
    }

    pub fn target_mean(&self) -> f64 {
        self.target_mean
    }

    /// Deviation of a row from the training mean in standard deviations; a
    /// constant column uses unit spread.
    pub fn z_scores(&self, row: ArrayView1<f64>) -> Array1<f64> {
        row.iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(&x, (&mean, &std))| {
                let scale = if std > 0.0 { std } else { 1.0 };
                (x - mean) / scale
            })
            .collect()
    }

    /// Direction row and outcome sign oriented toward `prediction`
    pub fn oriented_directions(&self, prediction: f64) -> (ArrayView1<'_, f64>, f64) {
        if self.classification {
            let last = self.directions.nrows().saturating_sub(1);
            let class = (prediction.max(0.0) as usize).min(last);
            (self.directions.row(class), 1.0)
        } else {
            let sign = if prediction >= self.target_mean { 1.0 } else { -1.0 };
            (self.directions.row(0), sign)
        }
    }
}

/// Sign of the covariance between a column and the outcome, 0 when undefined
fn covariance_sign(column: ArrayView1<f64>, outcome: ArrayView1<f64>, column_mean: f64) -> f64 {
    let n = column.len();
    if n == 0 {
        return 0.0;
    }
    let outcome_mean = outcome.sum() / n as f64;
    let cov: f64 = column
        .iter()
        .zip(outcome.iter())
        .map(|(&x, &y)| (x - column_mean) * (y - outcome_mean))
        .sum::<f64>()
        / n as f64;
    if cov > 1e-12 {
        1.0
    } else if cov < -1e-12 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_regression_directions() {
        let x = array![[1.0, 4.0, 2.0], [2.0, 3.0, 2.0], [3.0, 2.0, 2.0], [4.0, 1.0, 2.0]];
        let y = array![10.0, 20.0, 30.0, 40.0];
        let baseline = FeatureBaseline::fit(&x, &y, None);

        let (dirs, sign) = baseline.oriented_directions(35.0);
        assert_eq!(dirs.to_vec(), vec![1.0, -1.0, 0.0]);
        assert_eq!(sign, 1.0);
        assert_eq!(baseline.oriented_directions(5.0).1, -1.0);
        assert_abs_diff_eq!(baseline.target_mean(), 25.0, epsilon = 1e-12);
    }

    #[test]
    fn test_class_directions_follow_prediction() {
        let x = array![[0.0], [0.0], [1.0], [1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let baseline = FeatureBaseline::fit(&x, &y, Some(2));

        let (dirs, sign) = baseline.oriented_directions(0.0);
        assert_eq!((dirs[0], sign), (-1.0, 1.0));
        let (dirs, sign) = baseline.oriented_directions(1.0);
        assert_eq!((dirs[0], sign), (1.0, 1.0));
    }

    #[test]
    fn test_constant_column_has_unit_spread() {
        let x = array![[5.0], [5.0]];
        let y = array![1.0, 2.0];
        let baseline = FeatureBaseline::fit(&x, &y, None);
        assert_eq!(baseline.z_scores(array![7.0].view()), array![2.0]);
    }
}
