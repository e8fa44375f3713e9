//! Hybrid similarity: a weighted blend of five metrics.
//!
//! [`combine`] scores a pair as `Σ weight · metric` over Jaro-Winkler, LCS,
//! phonetic, bigram set and Jaccard-index similarity, skipping metrics whose
//! weight is zero and capping the result at 1.0.
//!
//! The configurable matchers at the bottom of the module work over any
//! [`Metric`]: a normalized weighted sum ([`HybridMatcher`]), voting over
//! several metrics ([`EnsembleMatcher`]) and length-dependent thresholds
//! ([`AdaptiveThresholdMatcher`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::algorithms::normalize::prepare;
use crate::algorithms::numeric::{clamp_unit, round_to};
use crate::algorithms::{
    jaccard_index, jaro_winkler_similarity, lcs_similarity, ngram_set_similarity, Metric, NgramSize,
    PhoneticMatcher,
};
use crate::error::{Result, SimilarityError};
use crate::evaluation::check_threshold;

/// Default decision threshold for "is duplicate".
pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.75;

/// One of the five weighted components of the hybrid score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightSlot {
    JaroWinkler,
    Lcs,
    Phonetic,
    Ngram,
    Jaccard,
}

impl WeightSlot {
    pub const ALL: [WeightSlot; 5] = [
        WeightSlot::JaroWinkler,
        WeightSlot::Lcs,
        WeightSlot::Phonetic,
        WeightSlot::Ngram,
        WeightSlot::Jaccard,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            WeightSlot::JaroWinkler => "jaro_winkler",
            WeightSlot::Lcs => "lcs",
            WeightSlot::Phonetic => "phonetic",
            WeightSlot::Ngram => "ngram",
            WeightSlot::Jaccard => "jaccard",
        }
    }

    /// Score a pair with this component's metric.
    #[must_use]
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            WeightSlot::JaroWinkler => jaro_winkler_similarity(a, b),
            WeightSlot::Lcs => lcs_similarity(a, b),
            WeightSlot::Phonetic => PhoneticMatcher::new().similarity(a, b),
            WeightSlot::Ngram => ngram_set_similarity(a, b, NgramSize::Bigram),
            WeightSlot::Jaccard => jaccard_index(a, b),
        }
    }
}

// ============================================================================
// Weights
// ============================================================================

/// Weights of the hybrid score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub jaro_winkler: f64,
    pub lcs: f64,
    pub phonetic: f64,
    pub ngram: f64,
    pub jaccard: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            jaro_winkler: 0.3,
            lcs: 0.2,
            phonetic: 0.2,
            ngram: 0.2,
            jaccard: 0.1,
        }
    }
}

impl SimilarityWeights {
    /// Validated weights in slot order.
    pub fn new(jaro_winkler: f64, lcs: f64, phonetic: f64, ngram: f64, jaccard: f64) -> Result<Self> {
        let weights = Self {
            jaro_winkler,
            lcs,
            phonetic,
            ngram,
            jaccard,
        };
        weights.validate()?;
        Ok(weights)
    }

    /// All weights zero; a starting point for [`set`](Self::set).
    #[must_use]
    pub fn zero() -> Self {
        Self {
            jaro_winkler: 0.0,
            lcs: 0.0,
            phonetic: 0.0,
            ngram: 0.0,
            jaccard: 0.0,
        }
    }

    #[must_use]
    pub fn get(&self, slot: WeightSlot) -> f64 {
        match slot {
            WeightSlot::JaroWinkler => self.jaro_winkler,
            WeightSlot::Lcs => self.lcs,
            WeightSlot::Phonetic => self.phonetic,
            WeightSlot::Ngram => self.ngram,
            WeightSlot::Jaccard => self.jaccard,
        }
    }

    pub fn set(&mut self, slot: WeightSlot, value: f64) {
        let field = match slot {
            WeightSlot::JaroWinkler => &mut self.jaro_winkler,
            WeightSlot::Lcs => &mut self.lcs,
            WeightSlot::Phonetic => &mut self.phonetic,
            WeightSlot::Ngram => &mut self.ngram,
            WeightSlot::Jaccard => &mut self.jaccard,
        };
        *field = value;
    }

    #[must_use]
    pub fn with(mut self, slot: WeightSlot, value: f64) -> Self {
        self.set(slot, value);
        self
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        WeightSlot::ALL.iter().map(|&s| self.get(s)).sum()
    }

    /// Rescale so the weights sum to 1. No-op when the total is zero.
    pub fn normalize(&mut self) {
        let total = self.total();
        if total == 0.0 {
            return;
        }
        for slot in WeightSlot::ALL {
            self.set(slot, self.get(slot) / total);
        }
    }

    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Every weight finite and non-negative, total positive.
    pub fn validate(&self) -> Result<()> {
        for slot in WeightSlot::ALL {
            let w = self.get(slot);
            if !w.is_finite() {
                return Err(SimilarityError::InvalidWeights {
                    slot: Some(slot),
                    actual: w,
                    reason: "must be finite",
                });
            }
            if w < 0.0 {
                return Err(SimilarityError::InvalidWeights {
                    slot: Some(slot),
                    actual: w,
                    reason: "must be non-negative",
                });
            }
        }
        let total = self.total();
        if total <= 0.0 {
            return Err(SimilarityError::InvalidWeights {
                slot: None,
                actual: total,
                reason: "total must be positive",
            });
        }
        Ok(())
    }
}

// ============================================================================
// Combiner
// ============================================================================

/// Individual component scores of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AlgorithmBreakdown {
    pub jaro_winkler: f64,
    pub lcs: f64,
    pub phonetic: f64,
    pub ngram: f64,
    pub jaccard: f64,
}

impl AlgorithmBreakdown {
    #[must_use]
    pub fn get(&self, slot: WeightSlot) -> f64 {
        match slot {
            WeightSlot::JaroWinkler => self.jaro_winkler,
            WeightSlot::Lcs => self.lcs,
            WeightSlot::Phonetic => self.phonetic,
            WeightSlot::Ngram => self.ngram,
            WeightSlot::Jaccard => self.jaccard,
        }
    }

    /// `Σ weight · score`, capped at 1.0.
    #[must_use]
    pub fn weighted(&self, weights: &SimilarityWeights) -> f64 {
        let sum: f64 = WeightSlot::ALL.iter().map(|&s| weights.get(s) * self.get(s)).sum();
        settle(sum)
    }

    fn identical() -> Self {
        Self {
            jaro_winkler: 1.0,
            lcs: 1.0,
            phonetic: 1.0,
            ngram: 1.0,
            jaccard: 1.0,
        }
    }
}

/// Snap float noise from the weighted sum (0.3 + 0.2 + 0.2 + 0.2 + 0.1 is
/// 0.9999999999999999) and cap at 1.0.
fn settle(sum: f64) -> f64 {
    round_to(sum, SCORE_DIGITS).min(1.0)
}

/// Decimal places kept by the combined score.
const SCORE_DIGITS: i32 = 12;

/// All five component scores of a pair.
///
/// Pairs equal after preparation score 1.0 on every component, including
/// phonetic for texts without letters.
#[must_use]
pub fn breakdown(a: &str, b: &str) -> AlgorithmBreakdown {
    if prepare(a) == prepare(b) {
        return AlgorithmBreakdown::identical();
    }
    AlgorithmBreakdown {
        jaro_winkler: WeightSlot::JaroWinkler.score(a, b),
        lcs: WeightSlot::Lcs.score(a, b),
        phonetic: WeightSlot::Phonetic.score(a, b),
        ngram: WeightSlot::Ngram.score(a, b),
        jaccard: WeightSlot::Jaccard.score(a, b),
    }
}

/// Hybrid score of a pair. Components with zero weight are not computed.
///
/// ```
/// use fuzzydedup::hybrid::{combine, SimilarityWeights};
///
/// let w = SimilarityWeights::default();
/// assert_eq!(combine("Кабель ВВГнг 3x2.5", "кабель ввгнг 3x2.5", &w), 1.0);
/// ```
#[must_use]
pub fn combine(a: &str, b: &str, weights: &SimilarityWeights) -> f64 {
    if prepare(a) == prepare(b) {
        return settle(weights.total());
    }
    let sum: f64 = WeightSlot::ALL
        .iter()
        .filter(|&&slot| weights.get(slot) > 0.0)
        .map(|&slot| weights.get(slot) * slot.score(a, b))
        .sum();
    settle(sum)
}

// ============================================================================
// Configurable matchers
// ============================================================================

/// A metric with its weight in a [`HybridMatcher`] and its own match threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMethod {
    pub metric: Metric,
    pub weight: f64,
    pub threshold: f64,
}

impl SimilarityMethod {
    #[must_use]
    pub fn new(metric: Metric, weight: f64, threshold: f64) -> Self {
        Self {
            metric,
            weight,
            threshold,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.metric.name()
    }

    /// Default method set: edit distances first, then token, n-gram and
    /// phonetic metrics.
    #[must_use]
    pub fn defaults() -> Vec<SimilarityMethod> {
        vec![
            SimilarityMethod::new(Metric::Levenshtein, 0.25, 0.85),
            SimilarityMethod::new(Metric::DamerauLevenshtein, 0.25, 0.85),
            SimilarityMethod::new(Metric::JaroWinkler, 0.15, 0.80),
            SimilarityMethod::new(Metric::JaccardIndex, 0.15, 0.75),
            SimilarityMethod::new(Metric::Ngram, 0.10, 0.70),
            SimilarityMethod::new(Metric::Phonetic, 0.10, 0.75),
        ]
    }
}

/// Weighted sum over arbitrary metrics, weights normalized at construction.
#[derive(Debug, Clone)]
pub struct HybridMatcher {
    methods: Vec<SimilarityMethod>,
    threshold: f64,
}

impl HybridMatcher {
    pub fn new(mut methods: Vec<SimilarityMethod>, threshold: f64) -> Result<Self> {
        check_threshold("threshold", threshold)?;
        for (i, m) in methods.iter().enumerate() {
            if !m.weight.is_finite() || m.weight < 0.0 {
                return Err(SimilarityError::invalid_input(
                    Some(i),
                    "weight",
                    format!("method weight must be finite and non-negative, got {}", m.weight),
                ));
            }
        }
        let total: f64 = methods.iter().map(|m| m.weight).sum();
        for m in &mut methods {
            m.weight = if total > 0.0 { m.weight / total } else { 0.0 };
        }
        Ok(Self { methods, threshold })
    }

    #[must_use]
    pub fn methods(&self) -> &[SimilarityMethod] {
        &self.methods
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let sum: f64 = self
            .methods
            .iter()
            .filter(|m| m.weight > 0.0)
            .map(|m| m.weight * m.metric.score(a, b))
            .sum();
        clamp_unit(sum)
    }

    #[must_use]
    pub fn is_match(&self, a: &str, b: &str) -> bool {
        self.similarity(a, b) >= self.threshold
    }
}

/// How an [`EnsembleMatcher`] reduces per-metric scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VotingStrategy {
    /// Mean of the passing scores when more than half pass, else 0
    Majority,
    #[default]
    Average,
    Max,
    Min,
}

/// Unweighted vote over several metrics.
#[derive(Debug, Clone)]
pub struct EnsembleMatcher {
    metrics: Vec<Metric>,
    threshold: f64,
    voting: VotingStrategy,
}

impl EnsembleMatcher {
    pub fn new(metrics: Vec<Metric>, threshold: f64, voting: VotingStrategy) -> Result<Self> {
        check_threshold("threshold", threshold)?;
        Ok(Self {
            metrics,
            threshold,
            voting,
        })
    }

    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        if self.metrics.is_empty() {
            return 0.0;
        }
        let scores: Vec<f64> = self.metrics.iter().map(|m| m.score(a, b)).collect();
        let n = scores.len() as f64;

        match self.voting {
            VotingStrategy::Average => scores.iter().sum::<f64>() / n,
            VotingStrategy::Max => scores.iter().copied().fold(0.0, f64::max),
            VotingStrategy::Min => scores.iter().copied().fold(1.0, f64::min),
            VotingStrategy::Majority => {
                let passing: Vec<f64> = scores.iter().copied().filter(|&s| s >= self.threshold).collect();
                if passing.len() > scores.len() / 2 {
                    passing.iter().sum::<f64>() / passing.len() as f64
                } else {
                    0.0
                }
            }
        }
    }

    #[must_use]
    pub fn is_match(&self, a: &str, b: &str) -> bool {
        self.similarity(a, b) >= self.threshold
    }
}

/// Threshold tier for a string length: short strings need a higher score.
#[must_use]
pub fn tiered_threshold(length: usize) -> f64 {
    match length {
        0..=5 => 0.95,
        6..=10 => 0.90,
        11..=20 => 0.85,
        _ => 0.80,
    }
}

/// Single-metric matcher whose threshold depends on the mean string length.
#[derive(Debug, Clone)]
pub struct AdaptiveThresholdMatcher {
    metric: Metric,
    min_length: usize,
    max_length: usize,
    thresholds: BTreeMap<usize, f64>,
}

impl AdaptiveThresholdMatcher {
    /// Seeds a threshold per length in `min_length..=max_length` from
    /// [`tiered_threshold`].
    #[must_use]
    pub fn new(metric: Metric, min_length: usize, max_length: usize) -> Self {
        let max_length = max_length.max(min_length);
        let thresholds = (min_length..=max_length).map(|len| (len, tiered_threshold(len))).collect();
        Self {
            metric,
            min_length,
            max_length,
            thresholds,
        }
    }

    /// Override the threshold for one length.
    pub fn set_threshold(&mut self, length: usize, threshold: f64) -> Result<()> {
        check_threshold("threshold", threshold)?;
        self.thresholds.insert(length, threshold);
        Ok(())
    }

    /// Threshold for `length`: exact entry, the edge entry outside the
    /// configured range, or linear interpolation between neighbours.
    #[must_use]
    pub fn threshold(&self, length: usize) -> f64 {
        if let Some(&t) = self.thresholds.get(&length) {
            return t;
        }
        let edge = |len: usize| self.thresholds.get(&len).copied().unwrap_or_else(|| tiered_threshold(len));
        if length <= self.min_length {
            return edge(self.min_length);
        }
        if length >= self.max_length {
            return edge(self.max_length);
        }

        let below = self.thresholds.range(..length).next_back();
        let above = self.thresholds.range(length + 1..).next();
        match (below, above) {
            (Some((&lo, &t_lo)), Some((&hi, &t_hi))) => {
                let frac = (length - lo) as f64 / (hi - lo) as f64;
                t_lo + (t_hi - t_lo) * frac
            }
            (Some((_, &t)), None) | (None, Some((_, &t))) => t,
            (None, None) => tiered_threshold(length),
        }
    }

    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        self.metric.score(a, b)
    }

    #[must_use]
    pub fn is_match(&self, a: &str, b: &str) -> bool {
        let mean_length = (a.chars().count() + b.chars().count()) / 2;
        self.similarity(a, b) >= self.threshold(mean_length)
    }
}

/// Reliability class used by [`compute_confidence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceMethod {
    Exact,
    Jaccard,
    Levenshtein,
    DamerauLevenshtein,
    Phonetic,
    Other,
}

impl ConfidenceMethod {
    fn factor(self) -> f64 {
        match self {
            ConfidenceMethod::Exact | ConfidenceMethod::Jaccard => 1.0,
            ConfidenceMethod::Levenshtein | ConfidenceMethod::DamerauLevenshtein => 0.95,
            ConfidenceMethod::Phonetic => 0.90,
            ConfidenceMethod::Other => 0.95,
        }
    }
}

impl From<Metric> for ConfidenceMethod {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Jaccard | Metric::JaccardIndex => ConfidenceMethod::Jaccard,
            Metric::Levenshtein => ConfidenceMethod::Levenshtein,
            Metric::DamerauLevenshtein => ConfidenceMethod::DamerauLevenshtein,
            Metric::Soundex | Metric::Metaphone | Metric::Phonetic => ConfidenceMethod::Phonetic,
            _ => ConfidenceMethod::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfidenceScore {
    pub similarity: f64,
    pub confidence: f64,
    pub method: ConfidenceMethod,
    pub reason: &'static str,
}

/// Adjust a similarity by string length and by how reliable `method` is.
///
/// `lengths` are the char lengths of the two strings, when known.
#[must_use]
pub fn compute_confidence(
    similarity: f64,
    method: ConfidenceMethod,
    lengths: Option<(usize, usize)>,
) -> ConfidenceScore {
    let mut confidence = similarity;
    if let Some((len_a, len_b)) = lengths {
        let mean_length = (len_a + len_b) / 2;
        if mean_length < 5 {
            confidence *= 0.9;
        } else if mean_length > 50 {
            confidence = (confidence * 1.05).min(1.0);
        }
    }
    confidence = clamp_unit(confidence * method.factor());

    let reason = if confidence < similarity {
        "adjusted down based on context"
    } else if confidence > similarity {
        "adjusted up based on context"
    } else {
        "base similarity"
    };

    ConfidenceScore {
        similarity,
        confidence,
        method,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.001
    }

    #[test]
    fn test_identical_pair_scores_one() {
        let w = SimilarityWeights::default();
        assert_eq!(combine("кабель ВВГнг 3x2.5", "кабель ВВГнг 3x2.5", &w), 1.0);
        assert_eq!(combine("Кабель ВВГнг 3x2.5 ", "кабель ввгнг 3x2.5", &w), 1.0);
        assert_eq!(breakdown("кабель медный", "кабель медный").weighted(&w), 1.0);
    }

    #[test]
    fn test_identical_digits_score_one() {
        // phonetic alone gives nothing for texts without letters
        let w = SimilarityWeights::default();
        assert_eq!(combine("2.5", "2.5", &w), 1.0);
        assert!(approx_eq(breakdown("2.5", "2.5").phonetic, 1.0));
        assert_eq!(combine("2.5", "2.5", &SimilarityWeights::zero()), 0.0);
    }

    #[test]
    fn test_reordered_company_name() {
        let w = SimilarityWeights::default();
        let s = combine("ООО Рога и Копыта", "Рога и Копыта ООО", &w);
        assert!((0.75..=0.95).contains(&s), "got {s}");
        assert!(approx_eq(breakdown("ООО Рога и Копыта", "Рога и Копыта ООО").phonetic, 1.0));
    }

    #[test]
    fn test_different_products_share_dimensions() {
        let w = SimilarityWeights::default();
        let s = combine("Кабель ВВГнг 3x2.5", "Провод ПВС 3x2.5", &w);
        assert!((0.40..=0.60).contains(&s), "got {s}");
    }

    #[test]
    fn test_breakdown_matches_combine() {
        let w = SimilarityWeights::default();
        let (a, b) = ("Кабель ВВГнг 3x2.5", "Кабель ВВГ 3x2.5");
        let bd = breakdown(a, b);
        assert!(approx_eq(bd.weighted(&w), combine(a, b, &w)));
        assert!(approx_eq(combine(a, b, &w), 0.904));
    }

    #[test]
    fn test_zero_weight_components_ignored() {
        let only_lcs = SimilarityWeights::zero().with(WeightSlot::Lcs, 1.0);
        assert!(approx_eq(combine("ВВГнг", "ввг", &only_lcs), 0.6));
        assert_eq!(combine("ВВГнг", "ввг", &SimilarityWeights::zero()), 0.0);
    }

    #[test]
    fn test_monotone_in_each_weight() {
        let (a, b) = ("масло сливочное", "масло подсолнечное");
        let base = SimilarityWeights::default();
        let before = combine(a, b, &base);
        for slot in WeightSlot::ALL {
            let bumped = base.with(slot, base.get(slot) + 0.1);
            assert!(combine(a, b, &bumped) >= before, "{}", slot.name());
        }
    }

    #[test]
    fn test_normalize() {
        let mut w = SimilarityWeights::new(2.0, 1.0, 1.0, 0.5, 0.5).unwrap();
        w.normalize();
        assert!((w.total() - 1.0).abs() < 1e-3);
        assert!(approx_eq(w.jaro_winkler, 0.4));

        let mut zero = SimilarityWeights::zero();
        zero.normalize();
        assert_eq!(zero, SimilarityWeights::zero());

        let once = SimilarityWeights::default().normalized();
        let twice = once.normalized();
        for slot in WeightSlot::ALL {
            assert!((once.get(slot) - twice.get(slot)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_validate_reports_slot() {
        let err = SimilarityWeights::default().with(WeightSlot::Ngram, -0.2).validate().unwrap_err();
        assert!(matches!(
            err,
            SimilarityError::InvalidWeights {
                slot: Some(WeightSlot::Ngram),
                ..
            }
        ));
        let err = SimilarityWeights::zero().validate().unwrap_err();
        assert!(matches!(err, SimilarityError::InvalidWeights { slot: None, .. }));
        assert!(SimilarityWeights::default().with(WeightSlot::Lcs, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_weights_json_field_names() {
        let json = serde_json::to_value(SimilarityWeights::default()).unwrap();
        assert!(approx_eq(json["jaro_winkler"].as_f64().unwrap(), 0.3));
        let bd: AlgorithmBreakdown =
            serde_json::from_str(r#"{"jaro_winkler":1,"lcs":0.5,"phonetic":0,"ngram":0.2,"jaccard":0.1}"#).unwrap();
        assert!(approx_eq(bd.get(WeightSlot::Lcs), 0.5));
    }

    #[test]
    fn test_hybrid_matcher_normalizes() {
        let m = HybridMatcher::new(
            vec![
                SimilarityMethod::new(Metric::Levenshtein, 2.0, 0.8),
                SimilarityMethod::new(Metric::Jaro, 2.0, 0.8),
            ],
            0.8,
        )
        .unwrap();
        assert!(approx_eq(m.methods()[0].weight, 0.5));
        assert!(approx_eq(m.similarity("кабель", "кабель"), 1.0));
        assert!(m.is_match("Иванов", "иванов"));
        assert!(HybridMatcher::new(SimilarityMethod::defaults(), 1.5).is_err());
        let defaults = HybridMatcher::new(SimilarityMethod::defaults(), 0.8).unwrap();
        let total: f64 = defaults.methods().iter().map(|m| m.weight).sum();
        assert!(approx_eq(total, 1.0));
    }

    #[test]
    fn test_ensemble_voting() {
        let metrics = vec![Metric::Levenshtein, Metric::Jaro, Metric::Jaccard];
        let (a, b) = ("кабель медный", "кабель медны");
        let avg = EnsembleMatcher::new(metrics.clone(), 0.8, VotingStrategy::Average).unwrap();
        let max = EnsembleMatcher::new(metrics.clone(), 0.8, VotingStrategy::Max).unwrap();
        let min = EnsembleMatcher::new(metrics.clone(), 0.8, VotingStrategy::Min).unwrap();
        assert!(min.similarity(a, b) <= avg.similarity(a, b));
        assert!(avg.similarity(a, b) <= max.similarity(a, b));

        // levenshtein and jaro pass, word jaccard (1/3) does not
        let majority = EnsembleMatcher::new(metrics, 0.8, VotingStrategy::Majority).unwrap();
        let expected = (Metric::Levenshtein.score(a, b) + Metric::Jaro.score(a, b)) / 2.0;
        assert!(approx_eq(majority.similarity(a, b), expected));
        assert_eq!(majority.similarity("кабель", "провод"), 0.0);
    }

    #[test]
    fn test_adaptive_thresholds() {
        let mut m = AdaptiveThresholdMatcher::new(Metric::Levenshtein, 1, 30);
        assert!(approx_eq(m.threshold(4), 0.95));
        assert!(approx_eq(m.threshold(8), 0.90));
        assert!(approx_eq(m.threshold(15), 0.85));
        assert!(approx_eq(m.threshold(25), 0.80));
        assert!(approx_eq(m.threshold(100), 0.80));

        // interpolation across a gap left by a sparse matcher
        let mut sparse = AdaptiveThresholdMatcher::new(Metric::Levenshtein, 10, 10);
        sparse.set_threshold(20, 0.70).unwrap();
        sparse.max_length = 20;
        assert!(approx_eq(sparse.threshold(15), 0.80));

        m.set_threshold(6, 0.5).unwrap();
        assert!(m.is_match("кабель", "кабели"));
        assert!(m.set_threshold(6, 2.0).is_err());
    }

    #[test]
    fn test_confidence_adjustments() {
        let c = compute_confidence(0.9, ConfidenceMethod::Exact, None);
        assert!(approx_eq(c.confidence, 0.9));
        assert_eq!(c.reason, "base similarity");

        let short = compute_confidence(0.9, ConfidenceMethod::Phonetic, Some((3, 4)));
        assert!(approx_eq(short.confidence, 0.9 * 0.9 * 0.9));
        assert_eq!(short.reason, "adjusted down based on context");

        let long = compute_confidence(0.99, ConfidenceMethod::Jaccard, Some((60, 70)));
        assert!(approx_eq(long.confidence, 1.0));
        assert_eq!(long.reason, "adjusted up based on context");

        assert_eq!(ConfidenceMethod::from(Metric::Metaphone), ConfidenceMethod::Phonetic);
    }
}
