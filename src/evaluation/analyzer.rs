//! Batch analysis of scored pairs.
//!
//! [`SimilarityAnalyzer::analyze_pairs`] never fails: invalid input produces an
//! empty [`AnalysisResult`] whose only recommendation describes the error, so
//! the result can always be exported.

use serde::{Deserialize, Serialize};

use rayon::prelude::*;

use super::metrics::{evaluate_algorithm, ConfusionCounters};
use super::{validate_labeled_pairs, validate_pairs, validate_threshold, LabeledPair, SimilarityPair};
use crate::algorithms::numeric::clamp_unit;
use crate::error::Result;
use crate::hybrid::{breakdown, combine, AlgorithmBreakdown, SimilarityWeights};

/// Distance from the threshold at which confidence reaches 1.
const CONFIDENCE_SPAN: f64 = 0.5;

/// One scored pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairResult {
    pub s1: String,
    pub s2: String,
    pub similarity: f64,
    pub is_duplicate: bool,
    pub breakdown: AlgorithmBreakdown,
    /// How far the score sits from the threshold, scaled to [0, 1]
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisStatistics {
    pub total_pairs: usize,
    pub duplicate_pairs: usize,
    pub non_duplicate_pairs: usize,
    pub average_similarity: f64,
    pub min_similarity: f64,
    pub max_similarity: f64,
    pub median_similarity: f64,
}

impl AnalysisStatistics {
    fn from_results(results: &[PairResult]) -> Self {
        if results.is_empty() {
            return Self::default();
        }
        let mut scores: Vec<f64> = results.iter().map(|r| r.similarity).collect();
        scores.sort_by(f64::total_cmp);

        let n = scores.len();
        let duplicate_pairs = results.iter().filter(|r| r.is_duplicate).count();
        let median = if n % 2 == 0 {
            (scores[n / 2 - 1] + scores[n / 2]) / 2.0
        } else {
            scores[n / 2]
        };

        Self {
            total_pairs: n,
            duplicate_pairs,
            non_duplicate_pairs: n - duplicate_pairs,
            average_similarity: scores.iter().sum::<f64>() / n as f64,
            min_similarity: scores[0],
            max_similarity: scores[n - 1],
            median_similarity: median,
        }
    }

    /// Share of pairs classified as duplicates.
    #[must_use]
    pub fn duplicate_rate(&self) -> f64 {
        crate::algorithms::numeric::count_ratio(self.duplicate_pairs, self.total_pairs)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub pairs: Vec<PairResult>,
    pub statistics: AnalysisStatistics,
    pub recommendations: Vec<String>,
}

impl AnalysisResult {
    fn failed(error: &crate::error::SimilarityError) -> Self {
        Self {
            pairs: Vec::new(),
            statistics: AnalysisStatistics::default(),
            recommendations: vec![format!("Error: {error}")],
        }
    }
}

/// Quality of one weight set on a labeled dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightComparison {
    pub weights: SimilarityWeights,
    pub counters: ConfusionCounters,
    pub f1_score: f64,
    pub precision: f64,
    pub recall: f64,
}

/// Scores batches of pairs with a fixed weight set.
#[derive(Debug, Clone, Default)]
pub struct SimilarityAnalyzer {
    weights: SimilarityWeights,
}

impl SimilarityAnalyzer {
    pub fn new(weights: SimilarityWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> SimilarityWeights {
        self.weights
    }

    /// Score, classify and summarize every pair.
    pub fn analyze_pairs(&self, pairs: &[SimilarityPair], threshold: f64) -> AnalysisResult {
        if let Err(err) = self.validate(pairs, threshold) {
            return AnalysisResult::failed(&err);
        }

        let weights = self.weights;
        let results: Vec<PairResult> = pairs
            .par_iter()
            .map(|pair| {
                let parts = breakdown(&pair.s1, &pair.s2);
                let similarity = parts.weighted(&weights);
                PairResult {
                    s1: pair.s1.clone(),
                    s2: pair.s2.clone(),
                    similarity,
                    is_duplicate: similarity >= threshold,
                    breakdown: parts,
                    confidence: confidence(similarity, threshold),
                }
            })
            .collect();

        let statistics = AnalysisStatistics::from_results(&results);
        let recommendations = recommendations(&statistics, threshold);
        AnalysisResult {
            pairs: results,
            statistics,
            recommendations,
        }
    }

    /// Pairs at or above `threshold`, best first.
    pub fn find_similar_pairs(&self, pairs: &[SimilarityPair], threshold: f64) -> Vec<PairResult> {
        let mut similar: Vec<PairResult> = self
            .analyze_pairs(pairs, threshold)
            .pairs
            .into_iter()
            .filter(|r| r.is_duplicate)
            .collect();
        similar.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        similar
    }

    /// Evaluate each weight set on `labeled`, best F1 first.
    pub fn compare_weights(
        &self,
        labeled: &[LabeledPair],
        weights_list: &[SimilarityWeights],
        threshold: f64,
    ) -> Result<Vec<WeightComparison>> {
        validate_labeled_pairs(labeled)?;
        validate_threshold(threshold)?;
        for weights in weights_list {
            weights.validate()?;
        }
        let mut out: Vec<WeightComparison> = weights_list
            .iter()
            .map(|weights| {
                let counters = evaluate_algorithm(labeled, threshold, |a, b| combine(a, b, weights));
                WeightComparison {
                    weights: *weights,
                    counters,
                    f1_score: counters.f1(),
                    precision: counters.precision(),
                    recall: counters.recall(),
                }
            })
            .collect();
        out.sort_by(|a, b| b.f1_score.total_cmp(&a.f1_score));
        Ok(out)
    }

    fn validate(&self, pairs: &[SimilarityPair], threshold: f64) -> Result<()> {
        validate_pairs(pairs)?;
        validate_threshold(threshold)?;
        self.weights.validate()
    }
}

/// `1 - |similarity - threshold| / 0.5`, clamped to [0, 1].
#[must_use]
pub fn confidence(similarity: f64, threshold: f64) -> f64 {
    clamp_unit(1.0 - (similarity - threshold).abs() / CONFIDENCE_SPAN)
}

fn recommendations(stats: &AnalysisStatistics, threshold: f64) -> Vec<String> {
    let mut out = Vec::new();

    let rate = stats.duplicate_rate();
    if rate > 0.5 {
        out.push(format!(
            "High duplicate rate ({:.1}%). Check the quality of the source data.",
            rate * 100.0
        ));
    } else if rate < 0.1 {
        out.push(format!(
            "Low duplicate rate ({:.1}%). The similarity threshold may be too high.",
            rate * 100.0
        ));
    }

    let avg = stats.average_similarity;
    if avg < threshold - 0.1 {
        out.push(format!(
            "Average similarity ({avg:.2}) is well below the threshold ({threshold:.2}). Consider lowering the threshold."
        ));
    } else if avg > threshold + 0.1 {
        out.push(format!(
            "Average similarity ({avg:.2}) is well above the threshold ({threshold:.2}). Consider raising it to cut false positives."
        ));
    }

    let spread = stats.max_similarity - stats.min_similarity;
    if spread < 0.3 {
        out.push("Narrow similarity spread. The data may be too homogeneous.".to_string());
    } else if spread > 0.8 {
        out.push("Wide similarity spread. Heterogeneous data makes duplicates harder to detect.".to_string());
    }

    if stats.median_similarity < threshold {
        out.push("Median similarity is below the threshold. Most pairs are not duplicates.".to_string());
    }

    if out.is_empty() {
        out.push("Statistics look normal.".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimilarityError;
    use crate::hybrid::WeightSlot;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn sample_pairs() -> Vec<SimilarityPair> {
        vec![
            SimilarityPair::new("кабель ВВГнг 3x2.5", "кабель ВВГнг 3x2.5"),
            SimilarityPair::new("ООО Рога и Копыта", "Рога и Копыта ООО"),
            SimilarityPair::new("Кабель ВВГнг 3x2.5", "Провод ПВС 3x2.5"),
        ]
    }

    #[test]
    fn test_confidence() {
        assert!(approx_eq(confidence(0.75, 0.75), 1.0, 1e-12));
        assert!(approx_eq(confidence(1.0, 0.75), 0.5, 1e-12));
        assert_eq!(confidence(0.0, 0.75), 0.0);
    }

    #[test]
    fn test_analyze_pairs() {
        let analyzer = SimilarityAnalyzer::default();
        let result = analyzer.analyze_pairs(&sample_pairs(), 0.75);
        assert_eq!(result.pairs.len(), 3);

        let w = SimilarityWeights::default();
        for r in &result.pairs {
            assert_eq!(r.similarity.to_bits(), combine(&r.s1, &r.s2, &w).to_bits());
            assert_eq!(r.is_duplicate, r.similarity >= 0.75);
        }
        // order preserved
        assert_eq!(result.pairs[2].s2, "Провод ПВС 3x2.5");

        let stats = result.statistics;
        assert_eq!(stats.total_pairs, 3);
        assert_eq!(stats.duplicate_pairs, 2);
        assert_eq!(stats.non_duplicate_pairs, 1);
        assert!(stats.min_similarity <= stats.median_similarity);
        assert!(stats.median_similarity <= stats.max_similarity);
        assert!(approx_eq(stats.median_similarity, result.pairs[1].similarity, 1e-12));
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn test_even_median() {
        let results: Vec<PairResult> = [0.2, 0.8, 0.4, 0.6]
            .iter()
            .map(|&s| PairResult {
                s1: String::new(),
                s2: String::new(),
                similarity: s,
                is_duplicate: false,
                breakdown: AlgorithmBreakdown::default(),
                confidence: 0.0,
            })
            .collect();
        let stats = AnalysisStatistics::from_results(&results);
        assert!(approx_eq(stats.median_similarity, 0.5, 1e-12));
        assert!(approx_eq(stats.average_similarity, 0.5, 1e-12));
    }

    #[test]
    fn test_invalid_input_degrades() {
        let analyzer = SimilarityAnalyzer::default();
        let result = analyzer.analyze_pairs(&[], 0.75);
        assert!(result.pairs.is_empty());
        assert_eq!(result.recommendations.len(), 1);
        assert!(result.recommendations[0].starts_with("Error: "));

        let result = analyzer.analyze_pairs(&sample_pairs(), 1.5);
        assert!(result.recommendations[0].contains("threshold"));

        let zero = SimilarityAnalyzer::new(SimilarityWeights::zero());
        let result = zero.analyze_pairs(&sample_pairs(), 0.75);
        assert!(result.recommendations[0].starts_with("Error: invalid weights"));
    }

    #[test]
    fn test_recommendations_rules() {
        let stats = AnalysisStatistics {
            total_pairs: 10,
            duplicate_pairs: 3,
            non_duplicate_pairs: 7,
            average_similarity: 0.75,
            min_similarity: 0.4,
            max_similarity: 0.95,
            median_similarity: 0.8,
        };
        assert_eq!(recommendations(&stats, 0.75), vec!["Statistics look normal.".to_string()]);

        let skewed = AnalysisStatistics {
            duplicate_pairs: 0,
            non_duplicate_pairs: 10,
            average_similarity: 0.2,
            min_similarity: 0.1,
            max_similarity: 0.3,
            median_similarity: 0.2,
            ..stats
        };
        let recs = recommendations(&skewed, 0.75);
        assert_eq!(recs.len(), 4);
        assert!(recs[0].contains("0.0%"));
    }

    #[test]
    fn test_find_similar_pairs_sorted() {
        let analyzer = SimilarityAnalyzer::default();
        let similar = analyzer.find_similar_pairs(&sample_pairs(), 0.75);
        assert_eq!(similar.len(), 2);
        assert!(similar[0].similarity >= similar[1].similarity);
        assert!(similar.iter().all(|r| r.is_duplicate));
    }

    #[test]
    fn test_compare_weights_sorted_by_f1() {
        let labeled = vec![
            LabeledPair::duplicate("ООО Рога и Копыта", "Рога и Копыта ООО"),
            LabeledPair::distinct("Кабель ВВГнг 3x2.5", "Провод ПВС 3x2.5"),
        ];
        let candidates = vec![
            SimilarityWeights::zero().with(WeightSlot::Phonetic, 1.0),
            SimilarityWeights::default(),
        ];
        let ranked = SimilarityAnalyzer::default().compare_weights(&labeled, &candidates, 0.75).unwrap();
        assert_eq!(ranked.len(), 2);
        assert!(ranked[0].f1_score >= ranked[1].f1_score);
        assert_eq!(ranked[0].counters.total(), 2);
    }

    #[test]
    fn test_compare_weights_rejects_bad_input() {
        let analyzer = SimilarityAnalyzer::default();
        let candidates = vec![SimilarityWeights::default()];
        let err = analyzer.compare_weights(&[], &candidates, 0.75).unwrap_err();
        assert!(matches!(err, SimilarityError::EmptyDataset { .. }));

        let labeled = vec![LabeledPair::duplicate("кабель", "кабель")];
        assert!(analyzer.compare_weights(&labeled, &candidates, 1.5).is_err());
        assert!(analyzer.compare_weights(&labeled, &[SimilarityWeights::zero()], 0.75).is_err());
    }
}
