//! Confusion counters and the quality metrics derived from them.
//!
//! Every rate returns 0.0 when its denominator is zero, so an empty or
//! one-sided evaluation never yields NaN.

use std::fmt;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use super::LabeledPair;
use crate::algorithms::numeric::{count_ratio, ratio};

/// Highest false-positive rate an acceptable matcher may have (exclusive).
pub const MAX_FALSE_POSITIVE_RATE: f64 = 0.10;
/// Highest false-negative rate an acceptable matcher may have (exclusive).
pub const MAX_FALSE_NEGATIVE_RATE: f64 = 0.05;
/// Precision below this triggers a recommendation.
pub const MIN_PRECISION: f64 = 0.85;
/// Recall below this triggers a recommendation.
pub const MIN_RECALL: f64 = 0.90;

/// TP/FP/FN/TN counts for binary duplicate classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionCounters {
    /// Predicted duplicate, labeled duplicate
    pub true_positives: usize,
    /// Predicted duplicate, labeled distinct
    pub false_positives: usize,
    /// Predicted distinct, labeled duplicate
    pub false_negatives: usize,
    /// Predicted distinct, labeled distinct
    pub true_negatives: usize,
}

impl ConfusionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counts(tp: usize, fp: usize, fn_: usize, tn: usize) -> Self {
        Self {
            true_positives: tp,
            false_positives: fp,
            false_negatives: fn_,
            true_negatives: tn,
        }
    }

    /// Counters from predicted and true match sets of record-index pairs.
    ///
    /// Pairs are compared unordered. `total_pairs` is the number of candidate
    /// pairs considered; whatever is neither predicted nor true counts as TN.
    pub fn from_match_sets(
        true_matches: &AHashSet<(usize, usize)>,
        predicted_matches: &AHashSet<(usize, usize)>,
        total_pairs: usize,
    ) -> Self {
        let truth: AHashSet<(usize, usize)> = true_matches.iter().map(|&(a, b)| normalize_pair(a, b)).collect();
        let predicted: AHashSet<(usize, usize)> =
            predicted_matches.iter().map(|&(a, b)| normalize_pair(a, b)).collect();

        let tp = predicted.intersection(&truth).count();
        let fp = predicted.len() - tp;
        let fn_ = truth.len() - tp;
        let tn = total_pairs.saturating_sub(tp + fp + fn_);
        Self::from_counts(tp, fp, fn_, tn)
    }

    /// Record one prediction.
    pub fn add(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, true) => self.false_negatives += 1,
            (false, false) => self.true_negatives += 1,
        }
    }

    /// TP / (TP + FP)
    #[must_use]
    pub fn precision(&self) -> f64 {
        count_ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// TP / (TP + FN)
    #[must_use]
    pub fn recall(&self) -> f64 {
        count_ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    #[must_use]
    pub fn f1(&self) -> f64 {
        self.f_score(1.0)
    }

    /// Weighted harmonic mean of precision and recall. `beta > 1` favours recall.
    #[must_use]
    pub fn f_score(&self, beta: f64) -> f64 {
        let p = self.precision();
        let r = self.recall();
        let beta_sq = beta * beta;
        ratio((1.0 + beta_sq) * p * r, beta_sq * p + r)
    }

    /// (TP + TN) / total
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        count_ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// TN / (TN + FP)
    #[must_use]
    pub fn specificity(&self) -> f64 {
        count_ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }

    /// FP / (FP + TN)
    #[must_use]
    pub fn false_positive_rate(&self) -> f64 {
        count_ratio(self.false_positives, self.false_positives + self.true_negatives)
    }

    /// FN / (FN + TP)
    #[must_use]
    pub fn false_negative_rate(&self) -> f64 {
        count_ratio(self.false_negatives, self.false_negatives + self.true_positives)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.false_negatives + self.true_negatives
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Add another set of counts into this one.
    pub fn merge(&mut self, other: &ConfusionCounters) {
        self.true_positives += other.true_positives;
        self.false_positives += other.false_positives;
        self.false_negatives += other.false_negatives;
        self.true_negatives += other.true_negatives;
    }

    /// FPR < 0.10 and FNR < 0.05.
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        self.false_positive_rate() < MAX_FALSE_POSITIVE_RATE && self.false_negative_rate() < MAX_FALSE_NEGATIVE_RATE
    }

    /// Multi-line human-readable summary.
    #[must_use]
    pub fn detailed_report(&self) -> String {
        let total = self.total();
        if total == 0 {
            return "No data collected".to_string();
        }
        let pct = |n: usize| count_ratio(n, total) * 100.0;
        format!(
            "Evaluation Metrics Report:\n\
             Total samples: {total}\n\
             True Positives (TP): {} ({:.2}%)\n\
             False Positives (FP): {} ({:.2}%)\n\
             False Negatives (FN): {} ({:.2}%)\n\
             True Negatives (TN): {} ({:.2}%)\n\
             \n\
             Precision: {:.4}\n\
             Recall: {:.4}\n\
             F1-Score: {:.4}\n\
             Accuracy: {:.4}\n\
             \n\
             False Positive Rate: {:.4} (must be < {MAX_FALSE_POSITIVE_RATE:.2})\n\
             False Negative Rate: {:.4} (must be < {MAX_FALSE_NEGATIVE_RATE:.2})",
            self.true_positives,
            pct(self.true_positives),
            self.false_positives,
            pct(self.false_positives),
            self.false_negatives,
            pct(self.false_negatives),
            self.true_negatives,
            pct(self.true_negatives),
            self.precision(),
            self.recall(),
            self.f1(),
            self.accuracy(),
            self.false_positive_rate(),
            self.false_negative_rate(),
        )
    }

    /// One message per failing quality gate, or a single all-clear message.
    #[must_use]
    pub fn recommendations(&self) -> Vec<String> {
        let mut out = Vec::new();
        let fpr = self.false_positive_rate();
        let fnr = self.false_negative_rate();
        let precision = self.precision();
        let recall = self.recall();

        if fpr >= MAX_FALSE_POSITIVE_RATE {
            out.push(format!(
                "High false positive rate ({:.2}%). Raise the similarity threshold.",
                fpr * 100.0
            ));
        }
        if fnr >= MAX_FALSE_NEGATIVE_RATE {
            out.push(format!(
                "High false negative rate ({:.2}%). Lower the threshold or add more algorithms.",
                fnr * 100.0
            ));
        }
        if precision < MIN_PRECISION {
            out.push(format!(
                "Low precision ({:.2}%). Too many false matches, tighten filtering.",
                precision * 100.0
            ));
        }
        if recall < MIN_RECALL {
            out.push(format!(
                "Low recall ({:.2}%). Too many missed duplicates, use more sensitive algorithms.",
                recall * 100.0
            ));
        }
        if out.is_empty() {
            out.push("Metrics meet the requirements.".to_string());
        }
        out
    }

    /// Side-by-side comparison with another evaluation, `self` first.
    #[must_use]
    pub fn compare(&self, other: &ConfusionCounters) -> String {
        let row = |name: &str, a: f64, b: f64| format!("{name}: {a:.4} vs {b:.4} (diff: {:.4})", a - b);
        [
            "Comparison:".to_string(),
            row("Precision", self.precision(), other.precision()),
            row("Recall", self.recall(), other.recall()),
            row("F1-Score", self.f1(), other.f1()),
            row("FPR", self.false_positive_rate(), other.false_positive_rate()),
            row("FNR", self.false_negative_rate(), other.false_negative_rate()),
        ]
        .join("\n")
    }

    /// Integer mean of each count across runs. Empty input gives zero counts.
    #[must_use]
    pub fn average(runs: &[ConfusionCounters]) -> ConfusionCounters {
        if runs.is_empty() {
            return ConfusionCounters::default();
        }
        let mut sum = ConfusionCounters::default();
        for run in runs {
            sum.merge(run);
        }
        let n = runs.len();
        ConfusionCounters::from_counts(
            sum.true_positives / n,
            sum.false_positives / n,
            sum.false_negatives / n,
            sum.true_negatives / n,
        )
    }
}

impl fmt::Display for ConfusionCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Precision: {:.4}, Recall: {:.4}, F1: {:.4}, Accuracy: {:.4}, FPR: {:.4}, FNR: {:.4}",
            self.precision(),
            self.recall(),
            self.f1(),
            self.accuracy(),
            self.false_positive_rate(),
            self.false_negative_rate()
        )
    }
}

/// Score every labeled pair with `similarity` and count predictions at `threshold`.
pub fn evaluate_algorithm<F>(pairs: &[LabeledPair], threshold: f64, similarity: F) -> ConfusionCounters
where
    F: Fn(&str, &str) -> f64,
{
    let mut counters = ConfusionCounters::new();
    for pair in pairs {
        counters.add(similarity(&pair.s1, &pair.s2) >= threshold, pair.is_duplicate);
    }
    counters
}

/// Order a pair so the smaller index comes first.
#[inline]
pub fn normalize_pair(a: usize, b: usize) -> (usize, usize) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_reference_counts() {
        let c = ConfusionCounters::from_counts(90, 5, 3, 100);
        assert!(approx_eq(c.precision(), 0.9474, 1e-4));
        assert!(approx_eq(c.recall(), 0.9677, 1e-4));
        assert!(approx_eq(c.f1(), 0.9574, 1e-4));
        assert!(approx_eq(c.false_positive_rate(), 5.0 / 105.0, 1e-12));
        assert!(approx_eq(c.false_negative_rate(), 3.0 / 93.0, 1e-12));
        assert!(c.is_acceptable());
        assert_eq!(c.total(), 198);
        assert!(approx_eq(c.accuracy(), 190.0 / 198.0, 1e-12));
    }

    #[test]
    fn test_zero_denominators() {
        let c = ConfusionCounters::new();
        assert_eq!(c.precision(), 0.0);
        assert_eq!(c.recall(), 0.0);
        assert_eq!(c.f1(), 0.0);
        assert_eq!(c.accuracy(), 0.0);
        assert_eq!(c.false_positive_rate(), 0.0);
        assert_eq!(c.false_negative_rate(), 0.0);
        assert!(c.is_acceptable());
        assert_eq!(c.detailed_report(), "No data collected");
    }

    #[test]
    fn test_acceptance_gates() {
        // FPR exactly 0.10 fails
        assert!(!ConfusionCounters::from_counts(10, 1, 0, 9).is_acceptable());
        // FNR exactly 0.05 fails
        assert!(!ConfusionCounters::from_counts(19, 0, 1, 10).is_acceptable());
        assert!(ConfusionCounters::from_counts(20, 0, 0, 10).is_acceptable());
    }

    #[test]
    fn test_add_and_merge() {
        let mut c = ConfusionCounters::new();
        c.add(true, true);
        c.add(true, false);
        c.add(false, true);
        c.add(false, false);
        c.add(false, false);
        assert_eq!(c, ConfusionCounters::from_counts(1, 1, 1, 2));

        let mut d = ConfusionCounters::from_counts(1, 0, 0, 0);
        d.merge(&c);
        assert_eq!(d.true_positives, 2);
        assert_eq!(d.total(), 6);

        d.reset();
        assert_eq!(d.total(), 0);
    }

    #[test]
    fn test_f_score_beta() {
        let c = ConfusionCounters::from_counts(1, 1, 0, 0);
        // P = 0.5, R = 1.0
        assert!(approx_eq(c.f_score(1.0), 2.0 / 3.0, 1e-12));
        assert!(approx_eq(c.f_score(2.0), 5.0 * 0.5 / (4.0 * 0.5 + 1.0), 1e-12));
    }

    #[test]
    fn test_recommendations() {
        let good = ConfusionCounters::from_counts(95, 0, 0, 100);
        assert_eq!(good.recommendations(), vec!["Metrics meet the requirements.".to_string()]);

        let bad = ConfusionCounters::from_counts(10, 10, 10, 10);
        let recs = bad.recommendations();
        assert_eq!(recs.len(), 4);
        assert!(recs[0].contains("50.00%"));
    }

    #[test]
    fn test_compare_and_report() {
        let a = ConfusionCounters::from_counts(90, 5, 3, 100);
        let b = ConfusionCounters::from_counts(80, 10, 13, 95);
        let text = a.compare(&b);
        assert!(text.starts_with("Comparison:"));
        assert_eq!(text.lines().count(), 6);
        assert!(a.detailed_report().contains("Total samples: 198"));
        assert!(a.to_string().starts_with("Precision: 0.9474"));
    }

    #[test]
    fn test_average_is_integer_mean() {
        let runs = [
            ConfusionCounters::from_counts(3, 1, 0, 4),
            ConfusionCounters::from_counts(4, 2, 1, 4),
        ];
        assert_eq!(ConfusionCounters::average(&runs), ConfusionCounters::from_counts(3, 1, 0, 4));
        assert_eq!(ConfusionCounters::average(&[]), ConfusionCounters::default());
    }

    #[test]
    fn test_evaluate_algorithm() {
        let pairs = vec![
            LabeledPair::duplicate("a", "a"),
            LabeledPair::duplicate("a", "b"),
            LabeledPair::distinct("c", "c"),
            LabeledPair::distinct("c", "d"),
        ];
        let exact = |x: &str, y: &str| if x == y { 1.0 } else { 0.0 };
        let c = evaluate_algorithm(&pairs, 0.5, exact);
        assert_eq!(c, ConfusionCounters::from_counts(1, 1, 1, 1));
    }

    #[test]
    fn test_from_match_sets() {
        let truth: AHashSet<_> = [(0, 1), (1, 2)].into_iter().collect();
        let predicted: AHashSet<_> = [(1, 0), (2, 3)].into_iter().collect();
        let c = ConfusionCounters::from_match_sets(&truth, &predicted, 10);
        assert_eq!(c, ConfusionCounters::from_counts(1, 1, 1, 7));
    }

    #[test]
    fn test_normalize_pair() {
        assert_eq!(normalize_pair(1, 2), (1, 2));
        assert_eq!(normalize_pair(2, 1), (1, 2));
        assert_eq!(normalize_pair(5, 5), (5, 5));
    }
}
