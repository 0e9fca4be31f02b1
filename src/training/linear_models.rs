//! Linear model implementations
//!
//! Both models standardize their inputs internally and keep the scaling in
//! the fitted state, so coefficient magnitudes are comparable across features.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::config::LogisticConfig;
use super::knn::argmax;
use super::models::Estimator;
use super::permutation::normalize_importances;
use crate::error::{Result, TrainerError};
use crate::preprocessing::Standardizer;

/// Solve the symmetric positive-definite system Ax = b by Cholesky decomposition.
/// Returns `None` when A is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[[i, k]] * l[[j, k]]).sum();
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let sum: f64 = (0..i).map(|j| l[[i, j]] * y[j]).sum();
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let sum: f64 = ((i + 1)..n).map(|j| l[[j, i]] * x[j]).sum();
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Gauss-Jordan solve with partial pivoting, used when Cholesky fails
fn gauss_jordan_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut aug = Array2::<f64>::zeros((n, n + 1));
    for i in 0..n {
        for j in 0..n {
            aug[[i, j]] = a[[i, j]];
        }
        aug[[i, n]] = b[i];
    }

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&r1, &r2| aug[[r1, col]].abs().total_cmp(&aug[[r2, col]].abs()))?;
        if aug[[pivot_row, col]].abs() < 1e-10 {
            return None;
        }
        if pivot_row != col {
            for j in 0..=n {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        for j in 0..=n {
            aug[[col, j]] /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[[row, col]];
                for j in 0..=n {
                    aug[[row, j]] -= factor * aug[[col, j]];
                }
            }
        }
    }

    Some(aug.column(n).to_owned())
}

/// Ridge-regularized least squares: the linear member of the family used
/// for regression targets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    scaler: Standardizer,
    /// Coefficients over standardized features
    coefficients: Array1<f64>,
    intercept: f64,
    alpha: f64,
}

impl LinearRegression {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, alpha: f64) -> Result<Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(TrainerError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        let scaler = Standardizer::fit(x)?;
        let z = scaler.transform(x)?;
        let y_mean = y.mean().unwrap_or(0.0);
        let y_centered = y - y_mean;

        // (Z^T Z + alpha I) w = Z^T y
        let mut ztz = z.t().dot(&z);
        for i in 0..n_features {
            ztz[[i, i]] += alpha.max(1e-8);
        }
        let zty = z.t().dot(&y_centered);

        let coefficients = cholesky_solve(&ztz, &zty)
            .or_else(|| gauss_jordan_solve(&ztz, &zty))
            .ok_or_else(|| {
                TrainerError::TrainingError("normal equations are singular".to_string())
            })?;

        Ok(Self {
            scaler,
            coefficients,
            // standardized features are centered, so the intercept is the target mean
            intercept: y_mean,
            alpha,
        })
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Estimator for LinearRegression {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let z = self.scaler.transform(x)?;
        Ok(z.dot(&self.coefficients) + self.intercept)
    }

    fn predict_proba(&self, _x: &Array2<f64>) -> Result<Array2<f64>> {
        Err(TrainerError::NotApplicableError(
            "linear regression does not produce class probabilities".to_string(),
        ))
    }

    fn feature_importances(&self) -> Array1<f64> {
        normalize_importances(self.coefficients.mapv(f64::abs))
    }
}

/// Logistic regression fitted by batch gradient descent with an L2 penalty.
///
/// Two classes fit a single model on class 1. More classes fit one model per
/// class (one-vs-rest) and normalize the per-class scores into probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    scaler: Standardizer,
    /// One row of standardized-feature coefficients per fitted model
    coefficients: Array2<f64>,
    intercepts: Array1<f64>,
    n_classes: usize,
    /// Iterations used by each fitted model
    n_iter: Vec<usize>,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Gradient descent on one binary problem; returns (weights, bias, iterations)
fn fit_binary(z: &Array2<f64>, y: &Array1<f64>, config: &LogisticConfig) -> (Array1<f64>, f64, usize) {
    let n_samples = z.nrows() as f64;
    let mut weights = Array1::<f64>::zeros(z.ncols());
    let mut bias = 0.0;
    let mut iterations = config.max_iter;

    for iter in 0..config.max_iter {
        let predictions = (z.dot(&weights) + bias).mapv(sigmoid);
        let errors = &predictions - y;
        let dw = z.t().dot(&errors) / n_samples + config.alpha * &weights;
        let db = errors.mean().unwrap_or(0.0);

        let grad_norm = (dw.mapv(|v| v * v).sum() + db * db).sqrt();
        if grad_norm < config.tol {
            iterations = iter;
            break;
        }

        weights = weights - config.learning_rate * dw;
        bias -= config.learning_rate * db;
    }

    (weights, bias, iterations)
}

impl LogisticRegression {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, n_classes: usize, config: &LogisticConfig) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(TrainerError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_classes < 2 {
            return Err(TrainerError::TrainingError(format!(
                "logistic regression needs at least 2 classes, got {}",
                n_classes
            )));
        }

        let scaler = Standardizer::fit(x)?;
        let z = scaler.transform(x)?;

        let targets: Vec<usize> = if n_classes == 2 { vec![1] } else { (0..n_classes).collect() };
        let mut coefficients = Array2::<f64>::zeros((targets.len(), x.ncols()));
        let mut intercepts = Array1::<f64>::zeros(targets.len());
        let mut n_iter = Vec::with_capacity(targets.len());

        for (m, &class) in targets.iter().enumerate() {
            let indicator = y.mapv(|v| if v as usize == class { 1.0 } else { 0.0 });
            let (weights, bias, iterations) = fit_binary(&z, &indicator, config);
            coefficients.row_mut(m).assign(&weights);
            intercepts[m] = bias;
            n_iter.push(iterations);
        }

        if coefficients.iter().any(|v| !v.is_finite()) {
            return Err(TrainerError::TrainingError(
                "logistic regression diverged; lower the learning rate".to_string(),
            ));
        }

        Ok(Self {
            scaler,
            coefficients,
            intercepts,
            n_classes,
            n_iter,
        })
    }

    pub fn coefficients(&self) -> &Array2<f64> {
        &self.coefficients
    }

    pub fn n_iter(&self) -> &[usize] {
        &self.n_iter
    }
}

impl Estimator for LogisticRegression {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        Ok(proba
            .rows()
            .into_iter()
            .map(|row| argmax(&row.to_vec()) as f64)
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let z = self.scaler.transform(x)?;
        let scores = (z.dot(&self.coefficients.t()) + &self.intercepts).mapv(sigmoid);

        if self.n_classes == 2 {
            let mut proba = Array2::<f64>::zeros((x.nrows(), 2));
            for (r, &p) in scores.column(0).iter().enumerate() {
                proba[[r, 0]] = 1.0 - p;
                proba[[r, 1]] = p;
            }
            return Ok(proba);
        }

        let mut proba = scores;
        for mut row in proba.axis_iter_mut(Axis(0)) {
            let total = row.sum();
            if total > 0.0 {
                row /= total;
            } else {
                row.fill(1.0 / self.n_classes as f64);
            }
        }
        Ok(proba)
    }

    /// Mean absolute coefficient across fitted models, normalized
    fn feature_importances(&self) -> Array1<f64> {
        let magnitudes = self
            .coefficients
            .mapv(f64::abs)
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(self.coefficients.ncols()));
        normalize_importances(magnitudes)
    }
}
