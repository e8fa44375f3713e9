//! Supervised tuning of [`SimilarityWeights`] against labeled pairs.
//!
//! # Algorithm
//!
//! Batch gradient descent at a fixed decision threshold of 0.75. A pair only
//! contributes when it is misclassified:
//!
//! - missed duplicate: loss `1 - score`, pushes each weight up by its metric's score
//! - false positive: loss `score`, pushes each weight down by its metric's score
//!
//! After each step the weights are clamped to [0, 1] and renormalized. The
//! five component scores of every pair are computed once per run, in parallel.

use parking_lot::RwLock;
use rayon::prelude::*;

use super::metrics::{evaluate_algorithm, ConfusionCounters};
use super::{check_threshold, validate_labeled_pairs, LabeledPair};
use crate::error::{Result, SimilarityError};
use crate::hybrid::{breakdown, combine, AlgorithmBreakdown, SimilarityWeights, WeightSlot};
use crate::logging::Logger;

/// Decision threshold used while learning and when scoring folds.
pub const TRAINING_THRESHOLD: f64 = 0.75;
/// Iterations per fold in [`SimilarityLearner::cross_validate`].
pub const FOLD_ITERATIONS: usize = 50;
/// Learning rate per fold in [`SimilarityLearner::cross_validate`].
pub const FOLD_LEARNING_RATE: f64 = 0.01;

/// Candidate thresholds 0.50, 0.55, ..., 0.95.
fn threshold_sweep() -> impl Iterator<Item = f64> {
    (10..=19).map(|step| f64::from(step) * 0.05)
}

#[derive(Debug, Default)]
struct LearnerState {
    pairs: Vec<LabeledPair>,
    weights: SimilarityWeights,
}

/// Accumulates labeled pairs and learns hybrid weights from them.
///
/// All methods take `&self`; the training set and the learned weights sit
/// behind one lock.
#[derive(Debug, Default)]
pub struct SimilarityLearner {
    state: RwLock<LearnerState>,
    logger: Logger,
}

impl SimilarityLearner {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger.component("learner");
        self
    }

    pub fn add_training_pair(&self, pair: LabeledPair) {
        self.state.write().pairs.push(pair);
    }

    pub fn add_training_pairs<I>(&self, pairs: I)
    where
        I: IntoIterator<Item = LabeledPair>,
    {
        self.state.write().pairs.extend(pairs);
    }

    pub fn training_pairs_len(&self) -> usize {
        self.state.read().pairs.len()
    }

    /// Drop all training pairs and restore the default weights.
    pub fn reset(&self) {
        *self.state.write() = LearnerState::default();
    }

    /// Weights from the last successful run, or the defaults.
    pub fn weights(&self) -> SimilarityWeights {
        self.state.read().weights
    }

    /// Learn weights from the training pairs and store them.
    pub fn optimize_weights(&self, iterations: usize, learning_rate: f64) -> Result<SimilarityWeights> {
        let pairs = self.state.read().pairs.clone();
        validate_labeled_pairs(&pairs)?;
        if iterations == 0 {
            return Err(SimilarityError::invalid_input(None, "iterations", "must be positive"));
        }
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(SimilarityError::invalid_input(
                None,
                "learning_rate",
                format!("must be positive, got {learning_rate}"),
            ));
        }

        let breakdowns: Vec<AlgorithmBreakdown> = pairs.par_iter().map(|p| breakdown(&p.s1, &p.s2)).collect();

        let mut weights = SimilarityWeights::default();
        for _ in 0..iterations {
            let gradient = gradient(&pairs, &breakdowns, &weights);
            let mut next = weights;
            for slot in WeightSlot::ALL {
                next.set(slot, (weights.get(slot) - learning_rate * gradient.get(slot)).clamp(0.0, 1.0));
            }
            next.normalize();
            // a step that zeroes every weight would leave nothing to combine
            if next.total() <= 0.0 {
                break;
            }
            weights = next;
        }

        self.state.write().weights = weights;
        let pair_count = pairs.len();
        self.logger.emit(|| {
            tracing::info!(pairs = pair_count, iterations, learning_rate, ?weights, "weights learned");
        });
        Ok(weights)
    }

    /// Evaluate the stored weights on `pairs` at `threshold`.
    pub fn evaluate_current_weights(&self, pairs: &[LabeledPair], threshold: f64) -> Result<ConfusionCounters> {
        validate_labeled_pairs(pairs)?;
        check_threshold("threshold", threshold)?;
        let weights = self.weights();
        Ok(evaluate_algorithm(pairs, threshold, |a, b| combine(a, b, &weights)))
    }

    /// Threshold in 0.50..=0.95 (step 0.05) with the strictly best F1.
    ///
    /// Falls back to 0.5 and its counters when no threshold reaches F1 > 0.
    pub fn optimal_threshold(
        &self,
        pairs: &[LabeledPair],
        weights: &SimilarityWeights,
    ) -> Result<(f64, ConfusionCounters)> {
        validate_labeled_pairs(pairs)?;
        weights.validate()?;
        let scores: Vec<f64> = pairs.par_iter().map(|p| combine(&p.s1, &p.s2, weights)).collect();
        let counters_at = |threshold: f64| {
            let mut c = ConfusionCounters::new();
            for (pair, &score) in pairs.iter().zip(&scores) {
                c.add(score >= threshold, pair.is_duplicate);
            }
            c
        };

        let mut best: Option<(f64, ConfusionCounters)> = None;
        let mut best_f1 = 0.0;
        for threshold in threshold_sweep() {
            let counters = counters_at(threshold);
            let f1 = counters.f1();
            if f1 > best_f1 {
                best_f1 = f1;
                best = Some((threshold, counters));
            }
        }
        Ok(best.unwrap_or_else(|| (0.5, counters_at(0.5))))
    }

    /// K-fold validation over the training pairs, in insertion order.
    ///
    /// Folds are contiguous slices of `n / k` pairs; the last one takes the
    /// remainder. Each fold trains a fresh learner on the other folds.
    pub fn cross_validate(&self, folds: usize) -> Result<Vec<ConfusionCounters>> {
        let pairs = self.state.read().pairs.clone();
        if folds == 0 || pairs.len() < folds {
            return Err(SimilarityError::TrainingFailed {
                expected: folds,
                actual: pairs.len(),
                folds,
            });
        }
        validate_labeled_pairs(&pairs)?;

        let fold_size = pairs.len() / folds;
        let mut results = Vec::with_capacity(folds);
        for fold in 0..folds {
            let start = fold * fold_size;
            let end = if fold == folds - 1 { pairs.len() } else { start + fold_size };

            let fold_learner = SimilarityLearner::new();
            fold_learner.add_training_pairs(pairs[..start].iter().chain(&pairs[end..]).cloned());
            let weights = fold_learner.optimize_weights(FOLD_ITERATIONS, FOLD_LEARNING_RATE)?;

            let counters = evaluate_algorithm(&pairs[start..end], TRAINING_THRESHOLD, |a, b| combine(a, b, &weights));
            let f1 = counters.f1();
            self.logger.emit(|| {
                tracing::debug!(fold, test_pairs = end - start, f1, "fold evaluated");
            });
            results.push(counters);
        }
        Ok(results)
    }
}

/// Mean signed loss gradient per weight slot.
fn gradient(pairs: &[LabeledPair], breakdowns: &[AlgorithmBreakdown], weights: &SimilarityWeights) -> SimilarityWeights {
    let mut grad = SimilarityWeights::zero();
    for (pair, parts) in pairs.iter().zip(breakdowns) {
        let score = parts.weighted(weights);
        let predicted = score >= TRAINING_THRESHOLD;
        let signed_loss = match (predicted, pair.is_duplicate) {
            (false, true) => -(1.0 - score),
            (true, false) => score,
            _ => continue,
        };
        for slot in WeightSlot::ALL {
            grad.set(slot, grad.get(slot) + signed_loss * parts.get(slot));
        }
    }
    let n = pairs.len() as f64;
    for slot in WeightSlot::ALL {
        grad.set(slot, grad.get(slot) / n);
    }
    grad
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn training_set() -> Vec<LabeledPair> {
        vec![
            LabeledPair::duplicate("ООО Рога и Копыта", "Рога и Копыта ООО"),
            LabeledPair::duplicate("Кабель ВВГнг 3x2.5", "кабель ввгнг 3х2.5"),
            LabeledPair::duplicate("Масло сливочное 82%", "масло сливочное 82 %"),
            LabeledPair::duplicate("Иванов Иван", "Иваноф Иван"),
            LabeledPair::distinct("Кабель ВВГнг 3x2.5", "Провод ПВС 3x2.5"),
            LabeledPair::distinct("Масло сливочное", "Масло подсолнечное"),
            LabeledPair::distinct("Гвозди строительные", "Шурупы по дереву"),
            LabeledPair::distinct("Молоко 3.2%", "Кефир 1%"),
        ]
    }

    #[test]
    fn test_threshold_sweep() {
        let sweep: Vec<f64> = threshold_sweep().collect();
        assert_eq!(sweep.len(), 10);
        assert!(approx_eq(sweep[0], 0.5, 1e-12));
        assert!(approx_eq(sweep[9], 0.95, 1e-12));
    }

    #[test]
    fn test_optimize_rejects_bad_input() {
        let learner = SimilarityLearner::new();
        let err = learner.optimize_weights(10, 0.01).unwrap_err();
        assert!(matches!(err, SimilarityError::EmptyDataset { .. }));

        learner.add_training_pair(LabeledPair::duplicate("a", "a"));
        assert!(learner.optimize_weights(0, 0.01).is_err());
        assert!(learner.optimize_weights(10, 0.0).is_err());
        assert!(learner.optimize_weights(10, -1.0).is_err());

        learner.add_training_pair(LabeledPair::distinct("b", " "));
        let err = learner.optimize_weights(10, 0.01).unwrap_err();
        assert!(matches!(err, SimilarityError::InvalidInput { index: Some(1), .. }));
        // failed runs leave the defaults in place
        assert_eq!(learner.weights(), SimilarityWeights::default());
    }

    #[test]
    fn test_optimize_produces_normalized_weights() {
        let learner = SimilarityLearner::new();
        learner.add_training_pairs(training_set());
        assert_eq!(learner.training_pairs_len(), 8);

        let weights = learner.optimize_weights(20, 0.05).unwrap();
        assert!(weights.validate().is_ok());
        assert!(approx_eq(weights.total(), 1.0, 1e-9));
        assert_eq!(learner.weights(), weights);

        // deterministic
        let again = SimilarityLearner::new();
        again.add_training_pairs(training_set());
        assert_eq!(again.optimize_weights(20, 0.05).unwrap(), weights);
    }

    #[test]
    fn test_missed_duplicates_raise_their_metrics() {
        let pairs = vec![LabeledPair::duplicate("abc", "abd")];
        let parts = vec![AlgorithmBreakdown {
            jaro_winkler: 0.9,
            lcs: 0.1,
            phonetic: 0.0,
            ngram: 0.0,
            jaccard: 0.0,
        }];
        let g = gradient(&pairs, &parts, &SimilarityWeights::default());
        // descent subtracts the gradient, so a negative slot grows
        assert!(g.jaro_winkler < g.lcs);
        assert!(g.jaro_winkler < 0.0);
        assert_eq!(g.phonetic, 0.0);
    }

    #[test]
    fn test_correct_pairs_have_no_gradient() {
        let pairs = vec![LabeledPair::distinct("a", "b")];
        let parts = vec![AlgorithmBreakdown::default()];
        let g = gradient(&pairs, &parts, &SimilarityWeights::default());
        assert_eq!(g.total(), 0.0);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let learner = SimilarityLearner::new();
        learner.add_training_pairs(training_set());
        learner.optimize_weights(5, 0.1).unwrap();
        learner.reset();
        assert_eq!(learner.training_pairs_len(), 0);
        assert_eq!(learner.weights(), SimilarityWeights::default());
    }

    #[test]
    fn test_optimal_threshold_in_sweep() {
        let learner = SimilarityLearner::new();
        let (threshold, counters) = learner
            .optimal_threshold(&training_set(), &SimilarityWeights::default())
            .unwrap();
        assert!((0.5..=0.95 + 1e-9).contains(&threshold));
        assert_eq!(counters.total(), 8);
        assert!(counters.f1() > 0.0);
    }

    #[test]
    fn test_optimal_threshold_falls_back() {
        let learner = SimilarityLearner::new();
        let pairs = vec![LabeledPair::distinct("кабель", "кабель")];
        let (threshold, counters) = learner.optimal_threshold(&pairs, &SimilarityWeights::default()).unwrap();
        assert!(approx_eq(threshold, 0.5, 1e-12));
        assert_eq!(counters.false_positives, 1);
    }

    #[test]
    fn test_evaluate_current_weights() {
        let learner = SimilarityLearner::new();
        let counters = learner.evaluate_current_weights(&training_set(), 0.75).unwrap();
        assert_eq!(counters.total(), 8);
        assert!(learner.evaluate_current_weights(&training_set(), 2.0).is_err());
    }

    #[test]
    fn test_empty_evaluation_rejected() {
        let learner = SimilarityLearner::new();
        let err = learner.evaluate_current_weights(&[], 0.75).unwrap_err();
        assert!(matches!(err, SimilarityError::EmptyDataset { .. }));
        let err = learner.optimal_threshold(&[], &SimilarityWeights::default()).unwrap_err();
        assert!(matches!(err, SimilarityError::EmptyDataset { .. }));
    }

    #[test]
    fn test_missed_duplicate_raises_agreeing_metrics() {
        // every word is spelled differently but sounds the same
        let pair = LabeledPair::duplicate("Иванов Петров Сидоров", "Иваноф Петроф Сидороф");
        let parts = breakdown(&pair.s1, &pair.s2);
        let weights = SimilarityWeights::zero().with(WeightSlot::Jaccard, 1.0);
        assert!(parts.weighted(&weights) < TRAINING_THRESHOLD);

        let grad = gradient(std::slice::from_ref(&pair), &[parts], &weights);
        for slot in WeightSlot::ALL {
            assert!(grad.get(slot) <= 0.0, "{}", slot.name());
        }
        assert!(grad.get(WeightSlot::Phonetic) < grad.get(WeightSlot::Jaccard));
    }

    #[test]
    fn test_false_positive_lowers_weights() {
        let pair = LabeledPair::distinct("Кабель ВВГнг 3x2.5", "кабель ввгнг 3x2.5");
        let parts = breakdown(&pair.s1, &pair.s2);
        let weights = SimilarityWeights::default();
        assert!(parts.weighted(&weights) >= TRAINING_THRESHOLD);

        let grad = gradient(std::slice::from_ref(&pair), &[parts], &weights);
        for slot in WeightSlot::ALL {
            assert!(grad.get(slot) > 0.0, "{}", slot.name());
        }
    }

    #[test]
    fn test_correct_predictions_leave_gradient_zero() {
        let pairs = vec![
            LabeledPair::duplicate("кабель медный", "кабель медный"),
            LabeledPair::distinct("Гвозди строительные", "Молоко 3.2%"),
        ];
        let parts: Vec<AlgorithmBreakdown> = pairs.iter().map(|p| breakdown(&p.s1, &p.s2)).collect();
        let grad = gradient(&pairs, &parts, &SimilarityWeights::default());
        assert_eq!(grad, SimilarityWeights::zero());
    }

    #[test]
    fn test_cross_validate() {
        let learner = SimilarityLearner::new();
        learner.add_training_pairs(training_set());

        let folds = learner.cross_validate(3).unwrap();
        assert_eq!(folds.len(), 3);
        // 8 / 3 = 2, last fold takes 4
        assert_eq!(folds[0].total(), 2);
        assert_eq!(folds[1].total(), 2);
        assert_eq!(folds[2].total(), 4);
    }

    #[test]
    fn test_cross_validate_needs_enough_pairs() {
        let learner = SimilarityLearner::new();
        learner.add_training_pairs(training_set());
        let err = learner.cross_validate(9).unwrap_err();
        match err {
            SimilarityError::TrainingFailed { expected, actual, folds } => {
                assert_eq!((expected, actual, folds), (9, 8, 9));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(learner.cross_validate(0).is_err());
    }
}
