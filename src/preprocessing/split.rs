//! Deterministic train/holdout partitioning

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Row positions of the train and holdout partitions, each sorted ascending
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.train.len() + self.holdout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holdout size for a group of `n` rows: at least one row on each side
/// whenever the group has two or more rows.
fn holdout_count(n: usize, ratio: f64) -> usize {
    if n < 2 {
        return 0;
    }
    ((n as f64 * ratio).round() as usize).clamp(1, n - 1)
}

/// Shuffle all rows and hold out `ratio` of them
pub fn random_split(n_rows: usize, ratio: f64, seed: u64) -> Partition {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n_rows).collect();
    indices.shuffle(&mut rng);

    let n_holdout = holdout_count(n_rows, ratio);
    let mut holdout = indices[..n_holdout].to_vec();
    let mut train = indices[n_holdout..].to_vec();
    holdout.sort_unstable();
    train.sort_unstable();
    Partition { train, holdout }
}

/// Split each class separately so the holdout keeps the class balance.
///
/// `classes[i]` is the class index of row `i`. Classes are visited in index
/// order with one shared RNG, so the result depends only on the input and seed.
/// A class with a single row stays entirely in train.
pub fn stratified_split(classes: &[usize], n_classes: usize, ratio: f64, seed: u64) -> Partition {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &class) in classes.iter().enumerate() {
        if class < n_classes {
            groups[class].push(row);
        }
    }

    let mut train = Vec::with_capacity(classes.len());
    let mut holdout = Vec::new();
    for mut group in groups {
        group.shuffle(&mut rng);
        let n_holdout = holdout_count(group.len(), ratio);
        holdout.extend_from_slice(&group[..n_holdout]);
        train.extend_from_slice(&group[n_holdout..]);
    }

    train.sort_unstable();
    holdout.sort_unstable();
    Partition { train, holdout }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_split_sizes() {
        let partition = random_split(100, 0.2, 42);
        assert_eq!(partition.holdout.len(), 20);
        assert_eq!(partition.train.len(), 80);
        assert!(partition.holdout.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_split_is_deterministic() {
        assert_eq!(random_split(50, 0.3, 7), random_split(50, 0.3, 7));
        assert_ne!(random_split(50, 0.3, 7), random_split(50, 0.3, 8));
    }

    #[test]
    fn test_stratified_keeps_minority_in_holdout() {
        let mut classes = vec![0usize; 90];
        classes.extend(vec![1usize; 10]);
        let partition = stratified_split(&classes, 2, 0.2, 42);

        let holdout_positives = partition.holdout.iter().filter(|&&r| classes[r] == 1).count();
        let holdout_negatives = partition.holdout.len() - holdout_positives;
        assert_eq!(holdout_positives, 2);
        assert_eq!(holdout_negatives, 18);
        assert_eq!(partition.len(), 100);
    }

    #[test]
    fn test_tiny_class_still_appears_in_holdout() {
        let classes = vec![0, 0, 0, 0, 0, 0, 0, 0, 1, 1];
        let partition = stratified_split(&classes, 2, 0.1, 1);
        assert!(partition.holdout.iter().any(|&r| classes[r] == 1));
        assert!(partition.train.iter().any(|&r| classes[r] == 1));
    }

    #[test]
    fn test_singleton_class_stays_in_train() {
        let classes = vec![0, 0, 0, 1];
        let partition = stratified_split(&classes, 2, 0.5, 3);
        assert!(partition.train.contains(&3));
    }
}
