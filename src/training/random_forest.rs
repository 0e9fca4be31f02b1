//! Random Forest implementation

use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::ForestConfig;
use super::decision_tree::{DecisionTree, TreeParams};
use super::knn::argmax;
use super::models::Estimator;
use super::permutation::normalize_importances;
use crate::error::{Result, TrainerError};

/// Strategy for max features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// Fraction of n_features
    Fraction(f64),
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

impl MaxFeatures {
    pub fn resolve(&self, n_features: usize) -> usize {
        match *self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().ceil() as usize,
            MaxFeatures::Fraction(f) => (n_features as f64 * f).ceil() as usize,
            MaxFeatures::Fixed(n) => n,
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features.max(1))
    }
}

/// Random Forest model
///
/// Tree `i` is grown from its own RNG seeded with `seed + i`, so the forest is
/// identical however rayon schedules the trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
    n_classes: Option<usize>,
    importances: Array1<f64>,
}

impl RandomForest {
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<f64>,
        n_classes: Option<usize>,
        config: &ForestConfig,
        seed: u64,
    ) -> Result<Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(TrainerError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(TrainerError::InsufficientDataError(
                "random forest needs at least one training row".to_string(),
            ));
        }

        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split.max(2),
            min_samples_leaf: config.min_samples_leaf.max(1),
            max_features: config.max_features.resolve(n_features),
        };

        let trees: Vec<DecisionTree> = (0..config.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(tree_idx as u64));
                let sample_indices: Vec<usize> = if config.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };
                DecisionTree::fit(x, y, &sample_indices, n_classes, params, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut total = Array1::<f64>::zeros(n_features);
        for tree in &trees {
            total += tree.importances();
        }
        let importances = normalize_importances(total / trees.len().max(1) as f64);

        Ok(Self {
            trees,
            n_features,
            n_classes,
            importances,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Mean leaf class distribution over all trees
    fn class_distribution(&self, x: &Array2<f64>, n_classes: usize) -> Array2<f64> {
        let n_trees = self.trees.len().max(1) as f64;
        let rows: Vec<Vec<f64>> = (0..x.nrows())
            .into_par_iter()
            .map(|r| {
                let row = x.row(r);
                let mut acc = vec![0.0; n_classes];
                for tree in &self.trees {
                    for (a, p) in acc.iter_mut().zip(tree.leaf_distribution(row)) {
                        *a += p;
                    }
                }
                acc.into_iter().map(|a| a / n_trees).collect()
            })
            .collect();

        let mut proba = Array2::<f64>::zeros((x.nrows(), n_classes));
        for (r, row) in rows.into_iter().enumerate() {
            for (c, p) in row.into_iter().enumerate() {
                proba[[r, c]] = p;
            }
        }
        proba
    }
}

impl Estimator for RandomForest {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self.n_classes {
            Some(n_classes) => {
                let proba = self.class_distribution(x, n_classes);
                Ok(proba
                    .rows()
                    .into_iter()
                    .map(|row| argmax(&row.to_vec()) as f64)
                    .collect())
            }
            None => {
                let n_trees = self.trees.len().max(1) as f64;
                let predictions: Vec<f64> = (0..x.nrows())
                    .into_par_iter()
                    .map(|r| {
                        let row = x.row(r);
                        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees
                    })
                    .collect();
                Ok(Array1::from_vec(predictions))
            }
        }
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let n_classes = self.n_classes.ok_or_else(|| {
            TrainerError::NotApplicableError(
                "class probabilities are only defined for classification".to_string(),
            )
        })?;
        Ok(self.class_distribution(x, n_classes))
    }

    fn feature_importances(&self) -> Array1<f64> {
        self.importances.clone()
    }
}
