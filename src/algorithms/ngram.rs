//! N-gram similarity implementation
//!
//! Character n-grams compare strings by shared n-character windows and are
//! tolerant of local edits; word n-grams compare token sequences.
//!
//! Three flavours are provided:
//! - [`ngram_similarity`]: padded grams, frequency weighted (`Σmin / Σmax`)
//! - [`ngram_set_similarity`]: unpadded gram sets, the variant fed into the
//!   hybrid score
//! - [`word_ngram_similarity`]: word sequences with stop words removed
//!
//! # Complexity
//! - Time: O(m+n) for extraction and comparison
//! - Space: O(m+n) for the gram maps

use super::normalize::{prepare, prepare_pair, words};
use super::numeric::{count_ratio, ratio};
use super::Similarity;
use crate::error::{Result, SimilarityError};
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Padding character placed around a string before extracting padded grams.
pub const PAD_CHAR: char = '_';

/// Words dropped before building word n-grams.
pub const WORD_NGRAM_STOP_WORDS: &[&str] = &[
    "и", "в", "на", "с", "по", "для", "от", "до", "из", "к", "the", "a", "an", "and", "or", "of", "to", "in", "on",
    "at",
];

/// Supported gram lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NgramSize {
    Unigram,
    #[default]
    Bigram,
    Trigram,
    Quadgram,
}

impl NgramSize {
    #[must_use]
    pub fn len(self) -> usize {
        match self {
            NgramSize::Unigram => 1,
            NgramSize::Bigram => 2,
            NgramSize::Trigram => 3,
            NgramSize::Quadgram => 4,
        }
    }

    /// Size for an integer length, if supported.
    #[must_use]
    pub fn from_len(n: usize) -> Option<Self> {
        match n {
            1 => Some(NgramSize::Unigram),
            2 => Some(NgramSize::Bigram),
            3 => Some(NgramSize::Trigram),
            4 => Some(NgramSize::Quadgram),
            _ => None,
        }
    }
}

// ============================================================================
// Extraction
// ============================================================================

/// Character n-grams of an already prepared string.
///
/// With `padded`, `n-1` [`PAD_CHAR`]s are added on each side and grams made only
/// of padding are skipped. Without padding, a string shorter than `n` yields a
/// single gram holding the whole string.
#[must_use]
pub fn char_ngrams(prepared: &str, size: NgramSize, padded: bool) -> Vec<String> {
    if prepared.is_empty() {
        return Vec::new();
    }
    let n = size.len();
    let mut chars: SmallVec<[char; 64]> = SmallVec::new();
    if padded {
        chars.extend(std::iter::repeat(PAD_CHAR).take(n - 1));
        chars.extend(prepared.chars());
        chars.extend(std::iter::repeat(PAD_CHAR).take(n - 1));
    } else {
        chars.extend(prepared.chars());
        if chars.len() < n {
            return vec![prepared.to_string()];
        }
    }

    chars
        .windows(n)
        .filter(|w| !(padded && w.iter().all(|&c| c == PAD_CHAR)))
        .map(|w| w.iter().collect())
        .collect()
}

/// Word n-grams of an already prepared string, stop words removed.
///
/// Fewer remaining words than `n` yields one gram of all remaining words.
#[must_use]
pub fn word_ngrams(prepared: &str, size: NgramSize) -> Vec<String> {
    let tokens: Vec<&str> = words(prepared)
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty() && !WORD_NGRAM_STOP_WORDS.contains(w))
        .collect();
    if tokens.is_empty() {
        return Vec::new();
    }
    let n = size.len();
    if tokens.len() < n {
        return vec![tokens.join(" ")];
    }
    tokens.windows(n).map(|w| w.join(" ")).collect()
}

// ============================================================================
// Similarities
// ============================================================================

/// Padded, frequency-weighted n-gram similarity: `Σ min(count) / Σ max(count)`.
#[must_use]
pub fn ngram_similarity(a: &str, b: &str, size: NgramSize) -> f64 {
    let (a, b) = prepare_pair(a, b);
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    weighted_overlap(&counts(char_ngrams(&a, size, true)), &counts(char_ngrams(&b, size, true)))
}

/// Unpadded n-gram set Jaccard: `|A ∩ B| / |A ∪ B|`.
#[must_use]
pub fn ngram_set_similarity(a: &str, b: &str, size: NgramSize) -> f64 {
    let (a, b) = prepare_pair(a, b);
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let set_a: AHashSet<String> = char_ngrams(&a, size, false).into_iter().collect();
    let set_b: AHashSet<String> = char_ngrams(&b, size, false).into_iter().collect();
    set_jaccard(&set_a, &set_b)
}

/// Padded bigram set Jaccard, used for short-string Jaccard.
#[must_use]
pub fn bigram_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = prepare_pair(a, b);
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let set_a: AHashSet<String> = char_ngrams(&a, NgramSize::Bigram, true).into_iter().collect();
    let set_b: AHashSet<String> = char_ngrams(&b, NgramSize::Bigram, true).into_iter().collect();
    set_jaccard(&set_a, &set_b)
}

/// Word n-gram set Jaccard.
#[must_use]
pub fn word_ngram_similarity(a: &str, b: &str, size: NgramSize) -> f64 {
    let (a, b) = prepare_pair(a, b);
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let set_a: AHashSet<String> = word_ngrams(&a, size).into_iter().collect();
    let set_b: AHashSet<String> = word_ngrams(&b, size).into_iter().collect();
    set_jaccard(&set_a, &set_b)
}

/// Indices of `candidates` whose padded n-gram similarity to `target` is at
/// least `threshold`.
#[must_use]
pub fn find_similar(target: &str, candidates: &[&str], size: NgramSize, threshold: f64) -> Vec<usize> {
    let target = prepare(target);
    if target.is_empty() {
        return Vec::new();
    }
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| ngram_similarity(&target, c, size) >= threshold)
        .map(|(i, _)| i)
        .collect()
}

pub(crate) fn set_jaccard<T: Eq + std::hash::Hash>(a: &AHashSet<T>, b: &AHashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    count_ratio(intersection, a.len() + b.len() - intersection)
}

pub(crate) fn counts<I, T>(items: I) -> AHashMap<T, usize>
where
    I: IntoIterator<Item = T>,
    T: Eq + std::hash::Hash,
{
    let mut map = AHashMap::new();
    for item in items {
        *map.entry(item).or_insert(0) += 1;
    }
    map
}

/// `Σ min / Σ max` over two count maps.
pub(crate) fn weighted_overlap<T: Eq + std::hash::Hash>(a: &AHashMap<T, usize>, b: &AHashMap<T, usize>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut min_sum = 0usize;
    let mut max_sum = 0usize;
    for (gram, &ca) in a {
        let cb = b.get(gram).copied().unwrap_or(0);
        min_sum += ca.min(cb);
        max_sum += ca.max(cb);
    }
    max_sum += b.iter().filter(|(g, _)| !a.contains_key(*g)).map(|(_, &c)| c).sum::<usize>();
    count_ratio(min_sum, max_sum)
}

// ============================================================================
// Calculators
// ============================================================================

/// N-gram similarity calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ngram {
    pub size: NgramSize,
    /// Padded + frequency weighted when true, unpadded set Jaccard otherwise
    pub padded: bool,
}

impl Default for Ngram {
    fn default() -> Self {
        Self {
            size: NgramSize::Bigram,
            padded: true,
        }
    }
}

impl Ngram {
    #[must_use]
    pub fn new(size: NgramSize) -> Self {
        Self { size, ..Self::default() }
    }

    #[must_use]
    pub fn with_padding(mut self, padded: bool) -> Self {
        self.padded = padded;
        self
    }
}

impl Similarity for Ngram {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        if self.padded {
            ngram_similarity(a, b, self.size)
        } else {
            ngram_set_similarity(a, b, self.size)
        }
    }

    fn name(&self) -> &'static str {
        "ngram"
    }
}

/// Named weight slots of a blended bigram/trigram score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NgramSlot {
    Bigram,
    Trigram,
}

impl NgramSlot {
    #[must_use]
    pub fn size(self) -> NgramSize {
        match self {
            NgramSlot::Bigram => NgramSize::Bigram,
            NgramSlot::Trigram => NgramSize::Trigram,
        }
    }
}

/// Weights for [`multi_ngram_similarity`]. Construct through [`NgramWeights::new`]
/// so both weights are finite, non-negative and not both zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NgramWeights {
    bigram: f64,
    trigram: f64,
}

impl Default for NgramWeights {
    fn default() -> Self {
        Self {
            bigram: 0.6,
            trigram: 0.4,
        }
    }
}

impl NgramWeights {
    pub fn new(bigram: f64, trigram: f64) -> Result<Self> {
        let weights = Self { bigram, trigram };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<()> {
        for (slot, w) in [(NgramSlot::Bigram, self.bigram), (NgramSlot::Trigram, self.trigram)] {
            if !w.is_finite() || w < 0.0 {
                let field = match slot {
                    NgramSlot::Bigram => "bigram",
                    NgramSlot::Trigram => "trigram",
                };
                return Err(SimilarityError::invalid_input(
                    None,
                    field,
                    format!("n-gram weight must be finite and non-negative, got {w}"),
                ));
            }
        }
        if self.bigram + self.trigram == 0.0 {
            return Err(SimilarityError::invalid_input(None, "ngram_weights", "weights sum to zero"));
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, slot: NgramSlot) -> f64 {
        match slot {
            NgramSlot::Bigram => self.bigram,
            NgramSlot::Trigram => self.trigram,
        }
    }
}

/// Weighted blend of padded bigram and trigram similarity, normalized by the
/// total weight.
#[must_use]
pub fn multi_ngram_similarity(a: &str, b: &str, weights: &NgramWeights) -> f64 {
    let total = weights.bigram + weights.trigram;
    let score: f64 = [NgramSlot::Bigram, NgramSlot::Trigram]
        .into_iter()
        .filter(|slot| weights.get(*slot) > 0.0)
        .map(|slot| weights.get(slot) * ngram_similarity(a, b, slot.size()))
        .sum();
    ratio(score, total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.001
    }

    #[test]
    fn test_padded_extraction() {
        assert_eq!(char_ngrams("ab", NgramSize::Bigram, true), vec!["_a", "ab", "b_"]);
        assert_eq!(char_ngrams("a", NgramSize::Trigram, true), vec!["__a", "_a_", "a__"]);
        assert!(char_ngrams("", NgramSize::Bigram, true).is_empty());
    }

    #[test]
    fn test_unpadded_extraction() {
        assert_eq!(char_ngrams("кабель", NgramSize::Bigram, false).len(), 5);
        assert_eq!(char_ngrams("к", NgramSize::Bigram, false), vec!["к"]);
    }

    #[test]
    fn test_set_similarity_examples() {
        assert!(approx_eq(ngram_set_similarity("кабель", "кабел", NgramSize::Bigram), 0.8));
        assert!(ngram_set_similarity("кабель", "провод", NgramSize::Bigram) < 0.4);
        assert!(approx_eq(ngram_set_similarity("", "", NgramSize::Bigram), 1.0));
        assert!(approx_eq(ngram_set_similarity("a", "", NgramSize::Bigram), 0.0));
    }

    #[test]
    fn test_weighted_similarity_stays_in_range() {
        // repeated grams must not push the score above 1
        let s = ngram_similarity("аааа", "аа", NgramSize::Bigram);
        assert!(s > 0.0 && s < 1.0);
        assert!(approx_eq(ngram_similarity("night", "nacht", NgramSize::Bigram), 3.0 / 9.0));
    }

    #[test]
    fn test_word_ngrams_drop_stop_words() {
        let grams = word_ngrams("масло для жарки и выпечки", NgramSize::Bigram);
        assert_eq!(grams, vec!["масло жарки", "жарки выпечки"]);
        assert_eq!(word_ngrams("кабель", NgramSize::Bigram), vec!["кабель"]);
        assert!(word_ngrams("и в на", NgramSize::Bigram).is_empty());
    }

    #[test]
    fn test_word_similarity() {
        assert!(approx_eq(word_ngram_similarity("масло сливочное", "Масло  сливочное", NgramSize::Bigram), 1.0));
        assert!(approx_eq(word_ngram_similarity("кабель", "провод", NgramSize::Bigram), 0.0));
    }

    #[test]
    fn test_find_similar() {
        let found = find_similar("кабель", &["кабели", "провод", "КАБЕЛЬ"], NgramSize::Bigram, 0.5);
        assert_eq!(found, vec![0, 2]);
    }

    #[test]
    fn test_multi_ngram_weights() {
        assert!(NgramWeights::new(-1.0, 0.5).is_err());
        assert!(NgramWeights::new(0.0, 0.0).is_err());
        let only_bigram = NgramWeights::new(1.0, 0.0).unwrap();
        assert!(approx_eq(
            multi_ngram_similarity("кабель", "кабел", &only_bigram),
            ngram_similarity("кабель", "кабел", NgramSize::Bigram)
        ));
        let blended = multi_ngram_similarity("кабель", "кабел", &NgramWeights::default());
        assert!(blended > 0.0 && blended < 1.0);
    }
}
