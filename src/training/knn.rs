//! K-Nearest Neighbors implementation
//!
//! Euclidean neighbors over internally standardized features. Importances
//! come from permutation sensitivity measured once at fit time.

use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::config::KnnConfig;
use super::models::Estimator;
use super::permutation::permutation_importance;
use crate::error::{Result, TrainerError};
use crate::preprocessing::Standardizer;

/// Fitted k-nearest-neighbors model for classification or regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnModel {
    n_neighbors: usize,
    scaler: Standardizer,
    /// Standardized training features
    x_train: Array2<f64>,
    y_train: Array1<f64>,
    /// `Some(k)` for classification over class indices `0..k`
    n_classes: Option<usize>,
    importances: Array1<f64>,
}

/// Max-heap entry keeping the k smallest (distance, training index) pairs
#[derive(PartialEq)]
struct Neighbor(f64, usize);

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

impl KnnModel {
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<f64>,
        n_classes: Option<usize>,
        config: &KnnConfig,
        seed: u64,
    ) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(TrainerError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(TrainerError::InsufficientDataError(
                "k-nearest-neighbors needs at least one training row".to_string(),
            ));
        }

        let scaler = Standardizer::fit(x)?;
        let x_train = scaler.transform(x)?;
        let mut model = Self {
            n_neighbors: config.n_neighbors.clamp(1, x.nrows()),
            scaler,
            x_train,
            y_train: y.clone(),
            n_classes,
            importances: Array1::zeros(x.ncols()),
        };

        let n_sample = config.permutation_sample.clamp(1, x.nrows());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut rows = sample(&mut rng, x.nrows(), n_sample).into_vec();
        rows.sort_unstable();
        let x_sample = model.x_train.select(ndarray::Axis(0), &rows);
        let y_sample = model.y_train.select(ndarray::Axis(0), &rows);

        model.importances = permutation_importance(
            |xs| model.predict_standardized(xs),
            &x_sample,
            &y_sample,
            n_classes.is_some(),
            config.permutation_repeats,
            seed,
        );

        Ok(model)
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Nearest training rows by distance, ties broken by training index
    fn neighbors(&self, point: ArrayView1<f64>) -> Vec<usize> {
        let k = self.n_neighbors;
        let mut heap = BinaryHeap::with_capacity(k + 1);

        for (i, row) in self.x_train.rows().into_iter().enumerate() {
            let dist: f64 = point
                .iter()
                .zip(row.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum();
            let candidate = Neighbor(dist, i);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(top) = heap.peek() {
                if candidate < *top {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        heap.into_sorted_vec().into_iter().map(|n| n.1).collect()
    }

    fn class_votes(&self, neighbors: &[usize], n_classes: usize) -> Vec<f64> {
        let mut votes = vec![0.0; n_classes];
        for &i in neighbors {
            let class = self.y_train[i] as usize;
            if class < n_classes {
                votes[class] += 1.0;
            }
        }
        votes
    }

    fn predict_standardized(&self, xs: &Array2<f64>) -> Array1<f64> {
        let predictions: Vec<f64> = (0..xs.nrows())
            .into_par_iter()
            .map(|r| {
                let neighbors = self.neighbors(xs.row(r));
                match self.n_classes {
                    Some(n_classes) => argmax(&self.class_votes(&neighbors, n_classes)) as f64,
                    None => {
                        neighbors.iter().map(|&i| self.y_train[i]).sum::<f64>()
                            / neighbors.len() as f64
                    }
                }
            })
            .collect();
        Array1::from_vec(predictions)
    }
}

/// Index of the largest value; the lowest index wins ties
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v > values[best] {
            best = i;
        }
    }
    best
}

impl Estimator for KnnModel {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let xs = self.scaler.transform(x)?;
        Ok(self.predict_standardized(&xs))
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let n_classes = self.n_classes.ok_or_else(|| {
            TrainerError::NotApplicableError(
                "class probabilities are only defined for classification".to_string(),
            )
        })?;
        let xs = self.scaler.transform(x)?;
        let k = self.n_neighbors as f64;

        let rows: Vec<Vec<f64>> = (0..xs.nrows())
            .into_par_iter()
            .map(|r| {
                let neighbors = self.neighbors(xs.row(r));
                self.class_votes(&neighbors, n_classes)
                    .into_iter()
                    .map(|v| v / k)
                    .collect()
            })
            .collect();

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((xs.nrows(), n_classes), flat)?)
    }

    fn feature_importances(&self) -> Array1<f64> {
        self.importances.clone()
    }
}
