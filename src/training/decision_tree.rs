//! CART decision tree used as the random forest base learner

use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::knn::argmax;
use crate::error::{Result, TrainerError};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        /// Majority class index or mean target
        value: f64,
        /// Class frequencies at the leaf (classification only)
        distribution: Vec<f64>,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Growth limits for one tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn at each node
    pub max_features: usize,
}

/// Gini impurity for classes, variance for regression
#[derive(Debug, Clone)]
enum NodeStats {
    Classes(Vec<f64>),
    Moments { sum: f64, sq_sum: f64 },
}

impl NodeStats {
    fn empty(n_classes: Option<usize>) -> Self {
        match n_classes {
            Some(k) => NodeStats::Classes(vec![0.0; k]),
            None => NodeStats::Moments { sum: 0.0, sq_sum: 0.0 },
        }
    }

    fn add(&mut self, y: f64) {
        match self {
            NodeStats::Classes(counts) => {
                let class = y as usize;
                if class < counts.len() {
                    counts[class] += 1.0;
                }
            }
            NodeStats::Moments { sum, sq_sum } => {
                *sum += y;
                *sq_sum += y * y;
            }
        }
    }

    fn remove(&mut self, y: f64) {
        match self {
            NodeStats::Classes(counts) => {
                let class = y as usize;
                if class < counts.len() {
                    counts[class] -= 1.0;
                }
            }
            NodeStats::Moments { sum, sq_sum } => {
                *sum -= y;
                *sq_sum -= y * y;
            }
        }
    }

    fn impurity(&self, n: usize) -> f64 {
        if n == 0 {
            return 0.0;
        }
        let n = n as f64;
        match self {
            NodeStats::Classes(counts) => 1.0 - counts.iter().map(|c| (c / n).powi(2)).sum::<f64>(),
            NodeStats::Moments { sum, sq_sum } => (sq_sum / n - (sum / n).powi(2)).max(0.0),
        }
    }
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: TreeNode,
    n_features: usize,
    n_classes: Option<usize>,
    /// Impurity decrease per feature, normalized to sum to one (zeros for a stump)
    importances: Array1<f64>,
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    n_classes: Option<usize>,
    params: TreeParams,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on the given (possibly repeated) row indices.
    ///
    /// `rng` draws the candidate features at every node.
    pub fn fit(
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        n_classes: Option<usize>,
        params: TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(TrainerError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if indices.is_empty() {
            return Err(TrainerError::InsufficientDataError(
                "cannot grow a tree on zero rows".to_string(),
            ));
        }

        let mut builder = Builder {
            x,
            y,
            n_classes,
            params,
            importances: vec![0.0; x.ncols()],
        };
        let root = builder.build(indices.to_vec(), 0, rng);

        let total: f64 = builder.importances.iter().sum();
        let importances = if total > 0.0 {
            Array1::from_vec(builder.importances) / total
        } else {
            Array1::zeros(x.ncols())
        };

        Ok(Self {
            root,
            n_features: x.ncols(),
            n_classes,
            importances,
        })
    }

    fn leaf(&self, row: ArrayView1<f64>) -> &TreeNode {
        let mut node = &self.root;
        while let TreeNode::Split { feature_idx, threshold, left, right, .. } = node {
            node = if row[*feature_idx] <= *threshold { &**left } else { &**right };
        }
        node
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        match self.leaf(row) {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split { .. } => 0.0,
        }
    }

    /// Class frequencies of the leaf reached by `row`
    pub fn leaf_distribution(&self, row: ArrayView1<f64>) -> &[f64] {
        match self.leaf(row) {
            TreeNode::Leaf { distribution, .. } => distribution,
            TreeNode::Split { .. } => &[],
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        x.rows().into_iter().map(|row| self.predict_row(row)).collect()
    }

    pub fn importances(&self) -> &Array1<f64> {
        &self.importances
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_classifier(&self) -> bool {
        self.n_classes.is_some()
    }

    pub fn depth(&self) -> usize {
        fn depth_of(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }
}

impl<'a> Builder<'a> {
    fn stats(&self, indices: &[usize]) -> NodeStats {
        let mut stats = NodeStats::empty(self.n_classes);
        for &i in indices {
            stats.add(self.y[i]);
        }
        stats
    }

    fn make_leaf(&self, indices: &[usize], stats: &NodeStats) -> TreeNode {
        let n = indices.len();
        match stats {
            NodeStats::Classes(counts) => TreeNode::Leaf {
                value: argmax(counts) as f64,
                distribution: counts.iter().map(|c| c / n as f64).collect(),
                n_samples: n,
            },
            NodeStats::Moments { sum, .. } => TreeNode::Leaf {
                value: sum / n as f64,
                distribution: Vec::new(),
                n_samples: n,
            },
        }
    }

    fn build(&mut self, indices: Vec<usize>, depth: usize, rng: &mut ChaCha8Rng) -> TreeNode {
        let n_samples = indices.len();
        let stats = self.stats(&indices);
        let parent_impurity = stats.impurity(n_samples);

        let should_stop = n_samples < self.params.min_samples_split
            || n_samples < 2 * self.params.min_samples_leaf
            || self.params.max_depth.map_or(false, |d| depth >= d)
            || parent_impurity <= 1e-12;
        if should_stop {
            return self.make_leaf(&indices, &stats);
        }

        let n_features = self.x.ncols();
        let candidates: Vec<usize> = if self.params.max_features >= n_features {
            (0..n_features).collect()
        } else {
            let mut drawn = sample(rng, n_features, self.params.max_features.max(1)).into_vec();
            drawn.sort_unstable();
            drawn
        };

        // first candidate wins exact gain ties
        let mut best: Option<(usize, f64, f64)> = None;
        for feature_idx in candidates {
            if let Some((gain, threshold)) = self.best_threshold(&indices, feature_idx, &stats, parent_impurity) {
                if best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature_idx, threshold, gain));
                }
            }
        }

        let Some((feature_idx, threshold, gain)) = best else {
            return self.make_leaf(&indices, &stats);
        };

        self.importances[feature_idx] += n_samples as f64 * gain;
        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[[i, feature_idx]] <= threshold);

        let left = Box::new(self.build(left_idx, depth + 1, rng));
        let right = Box::new(self.build(right_idx, depth + 1, rng));
        TreeNode::Split {
            feature_idx,
            threshold,
            left,
            right,
            n_samples,
        }
    }

    /// Best (gain, threshold) for one feature by sweeping sorted values
    fn best_threshold(
        &self,
        indices: &[usize],
        feature_idx: usize,
        total: &NodeStats,
        parent_impurity: f64,
    ) -> Option<(f64, f64)> {
        let n = indices.len();
        let mut order = indices.to_vec();
        order.sort_by(|&a, &b| {
            self.x[[a, feature_idx]]
                .total_cmp(&self.x[[b, feature_idx]])
                .then(a.cmp(&b))
        });

        let mut left = NodeStats::empty(self.n_classes);
        let mut right = total.clone();
        let mut best: Option<(f64, f64)> = None;

        for pos in 0..n - 1 {
            let yi = self.y[order[pos]];
            left.add(yi);
            right.remove(yi);

            let value = self.x[[order[pos], feature_idx]];
            let next = self.x[[order[pos + 1], feature_idx]];
            if value == next {
                continue;
            }
            let n_left = pos + 1;
            let n_right = n - n_left;
            if n_left < self.params.min_samples_leaf || n_right < self.params.min_samples_leaf {
                continue;
            }

            let weighted = (n_left as f64 * left.impurity(n_left)
                + n_right as f64 * right.impurity(n_right))
                / n as f64;
            let gain = parent_impurity - weighted;
            if gain > 1e-12 && best.map_or(true, |(g, _)| gain > g) {
                best = Some((gain, (value + next) / 2.0));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn params(n_features: usize) -> TreeParams {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: n_features,
        }
    }

    #[test]
    fn test_classifier_separates_classes() {
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [7.0, 1.0], [8.0, 0.0], [9.0, 1.0]];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let tree = DecisionTree::fit(&x, &y, &indices, Some(2), params(2), &mut rng).unwrap();

        assert_eq!(tree.predict(&x), y);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.importances()[0], 1.0);
        assert_eq!(tree.leaf_distribution(x.row(0)), &[1.0, 0.0]);
    }

    #[test]
    fn test_regressor_fits_steps() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![10.0, 10.0, 20.0, 20.0];
        let indices: Vec<usize> = (0..4).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = DecisionTree::fit(&x, &y, &indices, None, params(1), &mut rng).unwrap();
        assert_eq!(tree.predict(&array![[1.5], [3.5]]), array![10.0, 20.0]);
    }

    #[test]
    fn test_max_depth_limits_growth() {
        let x = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let y = array![0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let indices: Vec<usize> = (0..6).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut limited = params(1);
        limited.max_depth = Some(1);
        let tree = DecisionTree::fit(&x, &y, &indices, Some(2), limited, &mut rng).unwrap();
        assert!(tree.depth() <= 1);
    }
}
