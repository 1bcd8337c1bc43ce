//! Holdout evaluation of a fitted classifier

use serde::{Deserialize, Serialize};

/// Binary confusion matrix at a fixed threshold
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    pub fn compute(y_true: &[f64], y_prob: &[f64], threshold: f64) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_prob) {
            match (t > 0.5, p >= threshold) {
                (true, true) => cm.true_positives += 1,
                (false, true) => cm.false_positives += 1,
                (false, false) => cm.true_negatives += 1,
                (true, false) => cm.false_negatives += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }
}

/// Metrics for one labelled split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub n_samples: usize,
    pub positive_rate: f64,
    pub threshold: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// `None` when the split holds a single class
    pub roc_auc: Option<f64>,
    pub log_loss: f64,
    pub confusion: ConfusionMatrix,
}

impl ModelMetrics {
    /// Compute classification metrics from labels in `{0, 1}` and
    /// positive-class probabilities.
    pub fn compute(y_true: &[f64], y_prob: &[f64], threshold: f64) -> Self {
        let n = y_true.len().min(y_prob.len());
        let (y_true, y_prob) = (&y_true[..n], &y_prob[..n]);
        let confusion = ConfusionMatrix::compute(y_true, y_prob, threshold);

        let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };
        let precision = ratio(confusion.true_positives, confusion.true_positives + confusion.false_positives);
        let recall = ratio(confusion.true_positives, confusion.true_positives + confusion.false_negatives);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            n_samples: n,
            positive_rate: ratio(y_true.iter().filter(|&&t| t > 0.5).count(), n),
            threshold,
            accuracy: ratio(confusion.true_positives + confusion.true_negatives, n),
            precision,
            recall,
            f1_score,
            roc_auc: roc_auc(y_true, y_prob),
            log_loss: log_loss(y_true, y_prob),
            confusion,
        }
    }
}

/// Area under the ROC curve via the rank statistic; tied scores count half.
/// Returns `None` unless both classes are present.
pub fn roc_auc(y_true: &[f64], y_score: &[f64]) -> Option<f64> {
    let mut pairs: Vec<(f64, bool)> = y_score
        .iter()
        .zip(y_true)
        .map(|(&s, &t)| (s, t > 0.5))
        .collect();
    let n_pos = pairs.iter().filter(|(_, p)| *p).count();
    let n_neg = pairs.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Sum of (average) ranks of the positives
    let mut rank_sum = 0.0;
    let mut i = 0;
    while i < pairs.len() {
        let mut j = i;
        while j + 1 < pairs.len() && pairs[j + 1].0 == pairs[i].0 {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        rank_sum += avg_rank * pairs[i..=j].iter().filter(|(_, p)| *p).count() as f64;
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    Some((rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg as f64))
}

/// Mean binary cross-entropy, probabilities clipped away from 0 and 1
pub fn log_loss(y_true: &[f64], y_prob: &[f64]) -> f64 {
    const EPS: f64 = 1e-15;
    let n = y_true.len().min(y_prob.len());
    if n == 0 {
        return 0.0;
    }
    let total: f64 = y_true
        .iter()
        .zip(y_prob)
        .map(|(&t, &p)| {
            let p = p.clamp(EPS, 1.0 - EPS);
            if t > 0.5 { -p.ln() } else { -(1.0 - p).ln() }
        })
        .sum();
    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auc_perfect_and_reversed() {
        let y = [0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(&y, &[0.1, 0.2, 0.8, 0.9]), Some(1.0));
        assert_eq!(roc_auc(&y, &[0.9, 0.8, 0.2, 0.1]), Some(0.0));
    }

    #[test]
    fn test_auc_ties_and_single_class() {
        let y = [0.0, 1.0];
        assert_eq!(roc_auc(&y, &[0.5, 0.5]), Some(0.5));
        assert_eq!(roc_auc(&[1.0, 1.0], &[0.3, 0.7]), None);
    }

    #[test]
    fn test_classification_metrics() {
        let y_true = [1.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0];
        let y_prob = [0.9, 0.1, 0.8, 0.3, 0.2, 0.7, 0.6, 0.4];

        let metrics = ModelMetrics::compute(&y_true, &y_prob, 0.5);
        assert_eq!(metrics.n_samples, 8);
        assert_eq!(metrics.confusion.true_positives, 3);
        assert_eq!(metrics.confusion.false_positives, 1);
        assert_eq!(metrics.confusion.false_negatives, 1);
        assert_eq!(metrics.confusion.total(), 8);
        assert!((metrics.accuracy - 0.75).abs() < 1e-12);
        assert!((metrics.precision - 0.75).abs() < 1e-12);
        assert!((metrics.recall - 0.75).abs() < 1e-12);
        assert!(metrics.roc_auc.unwrap() > 0.8);
        assert!(metrics.log_loss > 0.0);
    }
}
