//! ROC and precision-recall computations over binary labels and scores

use serde::{Deserialize, Serialize};

/// One operating point of a ROC curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub fpr: f64,
    pub tpr: f64,
    /// Scores at or above this threshold are called positive
    pub threshold: f64,
}

/// Threshold sweep from the highest score down.
///
/// Starts at (0, 0) and ends at (1, 1); tied scores form a single point.
/// Labels above 0.5 are positive. A label set with only one class yields
/// the diagonal.
pub fn roc_curve(labels: &[f64], scores: &[f64]) -> Vec<RocPoint> {
    let n = labels.len().min(scores.len());
    let n_pos = labels[..n].iter().filter(|&&l| l > 0.5).count();
    let n_neg = n - n_pos;

    let mut points = vec![RocPoint {
        fpr: 0.0,
        tpr: 0.0,
        threshold: f64::INFINITY,
    }];
    if n_pos == 0 || n_neg == 0 {
        points.push(RocPoint {
            fpr: 1.0,
            tpr: 1.0,
            threshold: f64::NEG_INFINITY,
        });
        return points;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

    let (mut tp, mut fp) = (0usize, 0usize);
    let mut i = 0;
    while i < n {
        let threshold = scores[order[i]];
        while i < n && scores[order[i]] == threshold {
            if labels[order[i]] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        points.push(RocPoint {
            fpr: fp as f64 / n_neg as f64,
            tpr: tp as f64 / n_pos as f64,
            threshold,
        });
    }
    points
}

/// Area under the ROC curve via the rank statistic, with average ranks for ties.
///
/// Returns 0.5 when either class is absent.
pub fn roc_auc(labels: &[f64], scores: &[f64]) -> f64 {
    let n = labels.len().min(scores.len());
    let n_pos = labels[..n].iter().filter(|&&l| l > 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0f64;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = (i + 1 + j) as f64 / 2.0;
        rank_sum_pos += order[i..j]
            .iter()
            .filter(|&&idx| labels[idx] > 0.5)
            .count() as f64
            * avg_rank;
        i = j;
    }

    let n_pos_f = n_pos as f64;
    (rank_sum_pos - n_pos_f * (n_pos_f + 1.0) / 2.0) / (n_pos_f * n_neg as f64)
}

/// Average precision: precision summed over recall steps.
///
/// Returns 0.0 when there are no positives.
pub fn average_precision(labels: &[f64], scores: &[f64]) -> f64 {
    let n = labels.len().min(scores.len());
    let n_pos = labels[..n].iter().filter(|&&l| l > 0.5).count();
    if n_pos == 0 {
        return 0.0;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

    let (mut tp, mut seen) = (0usize, 0usize);
    let mut prev_recall = 0.0;
    let mut ap = 0.0;
    let mut i = 0;
    while i < n {
        let threshold = scores[order[i]];
        while i < n && scores[order[i]] == threshold {
            if labels[order[i]] > 0.5 {
                tp += 1;
            }
            seen += 1;
            i += 1;
        }
        let recall = tp as f64 / n_pos as f64;
        let precision = tp as f64 / seen as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;
    }
    ap
}

/// Trapezoidal area under an ordered curve
pub fn trapezoid_area(points: &[RocPoint]) -> f64 {
    points
        .windows(2)
        .map(|w| (w[1].fpr - w[0].fpr) * (w[1].tpr + w[0].tpr) / 2.0)
        .sum()
}
