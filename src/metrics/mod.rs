//! Evaluation metrics for click prediction.
//!
//! Provides ROC AUC (the fine-tuning checkpoint criterion) and binary
//! accuracy for held-out evaluation.

/// Area under the ROC curve via the rank-sum (Mann-Whitney) statistic.
///
/// Tied scores receive averaged ranks. A degenerate input with a single
/// class scores 0.5, so short validation folds on skewed data still
/// produce a usable checkpoint criterion.
///
/// # Arguments
///
/// * `y_true` - Binary labels (values > 0.5 count as positive)
/// * `y_score` - Predicted scores, higher = more likely positive
///
/// # Panics
///
/// Panics if the slices differ in length or are empty.
///
/// # Examples
///
/// ```
/// use sugerir::metrics::roc_auc_score;
///
/// let y_true = [0.0, 0.0, 1.0, 1.0];
/// let y_score = [0.1, 0.4, 0.35, 0.8];
/// let auc = roc_auc_score(&y_true, &y_score);
/// assert!((auc - 0.75).abs() < 1e-6);
/// ```
#[must_use]
pub fn roc_auc_score(y_true: &[f32], y_score: &[f32]) -> f32 {
    assert_eq!(y_true.len(), y_score.len(), "Inputs must have same length");
    assert!(!y_true.is_empty(), "Inputs cannot be empty");

    let n_pos = y_true.iter().filter(|&&y| y > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| {
        y_score[a]
            .partial_cmp(&y_score[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Assign ranks (1-based), averaging over ties.
    let mut ranks = vec![0.0_f32; y_score.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j + 2) as f32 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let rank_sum_pos: f32 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&y, _)| y > 0.5)
        .map(|(_, &r)| r)
        .sum();

    let n_pos_f = n_pos as f32;
    let n_neg_f = n_neg as f32;
    (rank_sum_pos - n_pos_f * (n_pos_f + 1.0) / 2.0) / (n_pos_f * n_neg_f)
}

/// Binary accuracy at a 0.5 decision threshold.
///
/// # Panics
///
/// Panics if the slices differ in length or are empty.
///
/// # Examples
///
/// ```
/// use sugerir::metrics::accuracy;
///
/// let y_true = [1.0, 0.0, 1.0, 0.0];
/// let y_score = [0.9, 0.2, 0.4, 0.1];
/// assert!((accuracy(&y_true, &y_score) - 0.75).abs() < 1e-6);
/// ```
#[must_use]
pub fn accuracy(y_true: &[f32], y_score: &[f32]) -> f32 {
    assert_eq!(y_true.len(), y_score.len(), "Inputs must have same length");
    assert!(!y_true.is_empty(), "Inputs cannot be empty");

    let correct = y_true
        .iter()
        .zip(y_score)
        .filter(|(&y, &p)| (p > 0.5) == (y > 0.5))
        .count();
    correct as f32 / y_true.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auc_perfect_separation() {
        let auc = roc_auc_score(&[0.0, 0.0, 1.0, 1.0], &[0.1, 0.2, 0.8, 0.9]);
        assert!((auc - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_auc_inverted_scores() {
        let auc = roc_auc_score(&[0.0, 0.0, 1.0, 1.0], &[0.9, 0.8, 0.2, 0.1]);
        assert!(auc.abs() < 1e-6);
    }

    #[test]
    fn test_auc_all_ties_is_half() {
        let auc = roc_auc_score(&[0.0, 1.0, 0.0, 1.0], &[0.5, 0.5, 0.5, 0.5]);
        assert!((auc - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_auc_single_class_is_half() {
        let auc = roc_auc_score(&[1.0, 1.0], &[0.3, 0.7]);
        assert!((auc - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_auc_hand_computed() {
        // Positives ranked 2nd and 4th of 4: ranks 2 + 4 = 6.
        // AUC = (6 - 2*3/2) / (2*2) = 0.75
        let auc = roc_auc_score(&[0.0, 1.0, 0.0, 1.0], &[0.1, 0.3, 0.2, 0.9]);
        assert!((auc - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_accuracy_all_correct() {
        let acc = accuracy(&[1.0, 0.0], &[0.9, 0.1]);
        assert!((acc - 1.0).abs() < 1e-6);
    }
}
