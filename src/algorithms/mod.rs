//! Core string similarity algorithms
//!
//! Each algorithm is implemented as a standalone function for composability,
//! plus a trait-based interface for extensibility. Every similarity function
//! prepares its inputs first (trim, lowercase, NFC) and compares Unicode code
//! points, returning a score in `[0, 1]` where both-empty is `1.0` and
//! one-empty is `0.0`.

pub mod cosine;
pub mod damerau;
pub mod jaro;
pub mod lcs;
pub mod levenshtein;
pub mod ngram;
pub mod normalize;
pub mod numeric;
pub mod phonetic;
pub mod token;

pub use cosine::*;
pub use damerau::*;
pub use jaro::*;
pub use lcs::*;
pub use levenshtein::*;
pub use ngram::*;
pub use phonetic::*;
pub use token::*;

use serde::{Deserialize, Serialize};

/// Trait for all similarity metrics.
/// Returns a value between 0.0 (completely different) and 1.0 (identical).
pub trait Similarity: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;

    /// Convenience method for distance (1.0 - similarity)
    fn distance(&self, a: &str, b: &str) -> f64 {
        1.0 - self.similarity(a, b)
    }

    /// Name of the algorithm for debugging/logging
    fn name(&self) -> &'static str;
}

/// Trait for edit distance algorithms that return integer distances.
///
/// `distance` works on the raw strings; `similarity` prepares both sides first.
pub trait EditDistance: Send + Sync {
    fn distance(&self, a: &str, b: &str) -> usize;

    /// Convert to normalized similarity score (0.0 to 1.0)
    fn similarity(&self, a: &str, b: &str) -> f64 {
        let (a, b) = normalize::prepare_pair(a, b);
        if a == b {
            return 1.0;
        }
        let dist = self.distance(&a, &b);
        let max_len = a.chars().count().max(b.chars().count());
        numeric::distance_to_similarity(dist, max_len)
    }

    fn name(&self) -> &'static str;
}

/// Blanket implementation: any EditDistance is also a Similarity
impl<T: EditDistance> Similarity for T {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        EditDistance::similarity(self, a, b)
    }

    fn name(&self) -> &'static str {
        EditDistance::name(self)
    }
}

/// Closed selector over the metrics library, usable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Levenshtein,
    DamerauLevenshtein,
    Jaro,
    JaroWinkler,
    Lcs,
    Jaccard,
    JaccardIndex,
    Dice,
    Ngram,
    WordNgram,
    TfIdfCosine,
    TokenSet,
    Soundex,
    Metaphone,
    Phonetic,
}

impl Metric {
    pub const ALL: [Metric; 15] = [
        Metric::Levenshtein,
        Metric::DamerauLevenshtein,
        Metric::Jaro,
        Metric::JaroWinkler,
        Metric::Lcs,
        Metric::Jaccard,
        Metric::JaccardIndex,
        Metric::Dice,
        Metric::Ngram,
        Metric::WordNgram,
        Metric::TfIdfCosine,
        Metric::TokenSet,
        Metric::Soundex,
        Metric::Metaphone,
        Metric::Phonetic,
    ];

    /// Score a pair with this metric's default parameters.
    #[must_use]
    pub fn score(self, a: &str, b: &str) -> f64 {
        match self {
            Metric::Levenshtein => levenshtein_similarity(a, b),
            Metric::DamerauLevenshtein => damerau_levenshtein_similarity(a, b),
            Metric::Jaro => jaro_similarity(a, b),
            Metric::JaroWinkler => jaro_winkler_similarity(a, b),
            Metric::Lcs => lcs_similarity(a, b),
            Metric::Jaccard => jaccard_similarity(a, b),
            Metric::JaccardIndex => jaccard_index(a, b),
            Metric::Dice => dice_similarity(a, b),
            Metric::Ngram => ngram_similarity(a, b, NgramSize::Bigram),
            Metric::WordNgram => word_ngram_similarity(a, b, NgramSize::Bigram),
            Metric::TfIdfCosine => tfidf_cosine_similarity(a, b),
            Metric::TokenSet => TokenSetSimilarity::default().similarity(a, b),
            Metric::Soundex => Soundex.similarity(a, b),
            Metric::Metaphone => Metaphone::default().similarity(a, b),
            Metric::Phonetic => PhoneticMatcher::new().similarity(a, b),
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Metric::Levenshtein => "levenshtein",
            Metric::DamerauLevenshtein => "damerau_levenshtein",
            Metric::Jaro => "jaro",
            Metric::JaroWinkler => "jaro_winkler",
            Metric::Lcs => "lcs",
            Metric::Jaccard => "jaccard",
            Metric::JaccardIndex => "jaccard_index",
            Metric::Dice => "dice",
            Metric::Ngram => "ngram",
            Metric::WordNgram => "word_ngram",
            Metric::TfIdfCosine => "tfidf_cosine",
            Metric::TokenSet => "token_set",
            Metric::Soundex => "soundex",
            Metric::Metaphone => "metaphone",
            Metric::Phonetic => "phonetic",
        }
    }
}

impl Similarity for Metric {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        self.score(a, b)
    }

    fn name(&self) -> &'static str {
        Metric::name(*self)
    }
}
