//! Permutation importance for models without native weights

use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Score where higher is better: accuracy for classes, negated MSE otherwise
fn score(y_true: &Array1<f64>, y_pred: &Array1<f64>, classification: bool) -> f64 {
    let n = y_true.len().max(1) as f64;
    if classification {
        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (*t - *p).abs() < 0.5)
            .count();
        correct as f64 / n
    } else {
        -y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| (t - p).powi(2))
            .sum::<f64>()
            / n
    }
}

/// Mean score drop when each column is shuffled, clamped at zero and
/// normalized to sum to one. Uniform when no column moves the score.
///
/// Column `j` is shuffled with an RNG seeded from `seed + j`, so results do
/// not depend on how rayon schedules the columns.
pub fn permutation_importance<F>(
    predict: F,
    x: &Array2<f64>,
    y: &Array1<f64>,
    classification: bool,
    n_repeats: usize,
    seed: u64,
) -> Array1<f64>
where
    F: Fn(&Array2<f64>) -> Array1<f64> + Sync,
{
    let n_features = x.ncols();
    if n_features == 0 {
        return Array1::zeros(0);
    }

    let baseline = score(y, &predict(x), classification);
    let n_repeats = n_repeats.max(1);

    let drops: Vec<f64> = (0..n_features)
        .into_par_iter()
        .map(|feature_idx| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(feature_idx as u64));
            let mut total = 0.0;
            for _ in 0..n_repeats {
                let mut col: Vec<f64> = x.column(feature_idx).to_vec();
                col.shuffle(&mut rng);

                let mut x_permuted = x.clone();
                for (i, val) in col.into_iter().enumerate() {
                    x_permuted[[i, feature_idx]] = val;
                }
                total += baseline - score(y, &predict(&x_permuted), classification);
            }
            (total / n_repeats as f64).max(0.0)
        })
        .collect();

    normalize_importances(Array1::from_vec(drops))
}

/// Scale non-negative weights to sum to one; all-zero weights become uniform
pub fn normalize_importances(weights: Array1<f64>) -> Array1<f64> {
    let n = weights.len();
    let weights = weights.mapv(|w| if w.is_finite() { w.abs() } else { 0.0 });
    let total = weights.sum();
    if total > 0.0 {
        weights / total
    } else if n > 0 {
        Array1::from_elem(n, 1.0 / n as f64)
    } else {
        weights
    }
}
