//! Binary classification metrics over label slices (0 = real, 1 = fake).
//! Division-by-zero cases evaluate to 0.0, never an error.

use std::cmp::Ordering;

/// 2x2 matrix, rows = actual class, columns = predicted class.
pub fn confusion_matrix(actual: &[i64], predicted: &[i64]) -> [[i64; 2]; 2] {
    let mut cm = [[0_i64; 2]; 2];
    for (&a, &p) in actual.iter().zip(predicted) {
        cm[a as usize][p as usize] += 1;
    }
    cm
}

pub fn accuracy(actual: &[i64], predicted: &[i64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let hits = actual
        .iter()
        .zip(predicted)
        .filter(|(a, p)| a == p)
        .count();
    hits as f64 / actual.len() as f64
}

pub fn precision(actual: &[i64], predicted: &[i64]) -> f64 {
    let tp = count(actual, predicted, 1, 1);
    let fp = count(actual, predicted, 0, 1);
    ratio(tp, tp + fp)
}

pub fn recall(actual: &[i64], predicted: &[i64]) -> f64 {
    let tp = count(actual, predicted, 1, 1);
    let missed = count(actual, predicted, 1, 0);
    ratio(tp, tp + missed)
}

pub fn f1_score(actual: &[i64], predicted: &[i64]) -> f64 {
    let p = precision(actual, predicted);
    let r = recall(actual, predicted);
    if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
}

/// Area under the ROC curve by trapezoidal sweep over score thresholds.
/// Degenerate label sets (a single class present) score 0.0.
pub fn roc_auc(actual: &[i64], scores: &[f64]) -> f64 {
    let positives = actual.iter().filter(|&&a| a == 1).count() as f64;
    let negatives = actual.len() as f64 - positives;
    if positives == 0.0 || negatives == 0.0 {
        return 0.0;
    }

    let mut ranked: Vec<(f64, i64)> = scores.iter().copied().zip(actual.iter().copied()).collect();
    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    let mut auc = 0.0;
    let (mut tp, mut fp) = (0.0, 0.0);
    let (mut prev_tpr, mut prev_fpr) = (0.0, 0.0);
    let mut i = 0;
    while i < ranked.len() {
        // Ties move as one threshold step.
        let score = ranked[i].0;
        while i < ranked.len() && ranked[i].0 == score {
            if ranked[i].1 == 1 {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
        }
        let tpr = tp / positives;
        let fpr = fp / negatives;
        auc += (fpr - prev_fpr) * (tpr + prev_tpr) / 2.0;
        prev_tpr = tpr;
        prev_fpr = fpr;
    }
    auc
}

fn count(actual: &[i64], predicted: &[i64], a: i64, p: i64) -> usize {
    actual
        .iter()
        .zip(predicted)
        .filter(|&(&x, &y)| x == a && y == p)
        .count()
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTUAL: &[i64] = &[0, 0, 1, 1, 1];
    const PREDICTED: &[i64] = &[0, 1, 1, 1, 0];

    #[test]
    fn confusion_matrix_marginals_match_class_counts() {
        let cm = confusion_matrix(ACTUAL, PREDICTED);
        assert_eq!(cm, [[1, 1], [1, 2]]);
        // Row sums equal actual class counts.
        assert_eq!(cm[0][0] + cm[0][1], 2);
        assert_eq!(cm[1][0] + cm[1][1], 3);
        // Column sums equal predicted class counts.
        assert_eq!(cm[0][0] + cm[1][0], 2);
        assert_eq!(cm[0][1] + cm[1][1], 3);
    }

    #[test]
    fn metrics_on_mixed_predictions() {
        assert!((accuracy(ACTUAL, PREDICTED) - 0.6).abs() < 1e-12);
        assert!((precision(ACTUAL, PREDICTED) - 2.0 / 3.0).abs() < 1e-12);
        assert!((recall(ACTUAL, PREDICTED) - 2.0 / 3.0).abs() < 1e-12);
        assert!((f1_score(ACTUAL, PREDICTED) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn absent_positive_class_scores_zero_not_error() {
        let actual = &[1, 1, 0];
        let predicted = &[0, 0, 0];
        assert_eq!(precision(actual, predicted), 0.0);
        assert_eq!(recall(actual, predicted), 0.0);
        assert_eq!(f1_score(actual, predicted), 0.0);

        let no_positives_at_all = &[0, 0, 0];
        assert_eq!(precision(no_positives_at_all, predicted), 0.0);
        assert_eq!(recall(no_positives_at_all, predicted), 0.0);
    }

    #[test]
    fn empty_inputs_score_zero() {
        assert_eq!(accuracy(&[], &[]), 0.0);
        assert_eq!(f1_score(&[], &[]), 0.0);
        assert_eq!(roc_auc(&[], &[]), 0.0);
    }

    #[test]
    fn auc_is_one_for_perfect_separation() {
        let actual = &[0, 0, 1, 1];
        let scores = &[0.1, 0.2, 0.8, 0.9];
        assert!((roc_auc(actual, scores) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn auc_is_half_for_uninformative_scores() {
        let actual = &[0, 1, 0, 1];
        let scores = &[0.5, 0.5, 0.5, 0.5];
        assert!((roc_auc(actual, scores) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn auc_single_class_is_zero() {
        assert_eq!(roc_auc(&[1, 1], &[0.4, 0.6]), 0.0);
        assert_eq!(roc_auc(&[0, 0], &[0.4, 0.6]), 0.0);
    }
}
