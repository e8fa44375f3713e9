//! Cosine similarity implementation
//!
//! Treats strings as term vectors and computes the cosine of the angle between
//! them. Terms are words of at least [`MIN_TERM_CHARS`] chars, or character
//! n-grams for [`ngram_cosine_similarity`].
//!
//! The pairwise TF-IDF mode weighs terms over the two-document corpus formed
//! by the pair itself; [`TfIdfModel`] fits document frequencies over a larger
//! caller corpus instead.
//!
//! # Complexity
//! - Time: O(m+n) for building term maps and computing similarity
//! - Space: O(unique_terms)

use super::ngram::{char_ngrams, counts, NgramSize};
use super::normalize::{prepare, prepare_pair, words};
use super::numeric::count_ratio;
use super::Similarity;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// Shorter words are not treated as terms.
pub const MIN_TERM_CHARS: usize = 2;

/// How term vectors are weighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosineMode {
    /// tf × ln((N+1)/(df+1)) over the pair
    #[default]
    TfIdf,
    /// 1 for present terms
    Binary,
    /// Relative term frequency
    Frequency,
}

/// Word-level cosine similarity calculator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CosineSimilarity {
    pub mode: CosineMode,
}

impl CosineSimilarity {
    #[must_use]
    pub fn new(mode: CosineMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn tfidf() -> Self {
        Self::new(CosineMode::TfIdf)
    }

    #[must_use]
    pub fn binary() -> Self {
        Self::new(CosineMode::Binary)
    }

    #[must_use]
    pub fn frequency() -> Self {
        Self::new(CosineMode::Frequency)
    }

    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let (a, b) = prepare_pair(a, b);
        if a == b {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let terms_a = terms(&a);
        let terms_b = terms(&b);

        let (vec_a, vec_b) = match self.mode {
            CosineMode::TfIdf => pair_tfidf_vectors(&terms_a, &terms_b),
            CosineMode::Binary => (binary_vector(&terms_a), binary_vector(&terms_b)),
            CosineMode::Frequency => (frequency_vector(&terms_a), frequency_vector(&terms_b)),
        };
        cosine_from_maps(&vec_a, &vec_b)
    }
}

impl Similarity for CosineSimilarity {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        CosineSimilarity::similarity(self, a, b)
    }

    fn name(&self) -> &'static str {
        match self.mode {
            CosineMode::TfIdf => "tfidf_cosine",
            CosineMode::Binary => "binary_cosine",
            CosineMode::Frequency => "frequency_cosine",
        }
    }
}

/// TF-IDF cosine over the two-document corpus `{a, b}`.
///
/// Terms present in both documents get an IDF of `ln(3/3) = 0`, so only
/// distinguishing terms contribute.
#[must_use]
pub fn tfidf_cosine_similarity(a: &str, b: &str) -> f64 {
    CosineSimilarity::tfidf().similarity(a, b)
}

/// Cosine over relative term frequencies.
#[must_use]
pub fn frequency_cosine_similarity(a: &str, b: &str) -> f64 {
    CosineSimilarity::frequency().similarity(a, b)
}

/// Cosine over padded character n-gram counts.
#[must_use]
pub fn ngram_cosine_similarity(a: &str, b: &str, size: NgramSize) -> f64 {
    let (a, b) = prepare_pair(a, b);
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let vec_a = to_f64(counts(char_ngrams(&a, size, true)));
    let vec_b = to_f64(counts(char_ngrams(&b, size, true)));
    cosine_from_maps(&vec_a, &vec_b)
}

/// Distinct terms present in both strings, in order of first appearance in `b`.
#[must_use]
pub fn common_terms(a: &str, b: &str) -> Vec<String> {
    let (a, b) = prepare_pair(a, b);
    let set_a: AHashSet<&str> = terms(&a).into_iter().collect();
    let mut seen = AHashSet::new();
    terms(&b)
        .into_iter()
        .filter(|t| set_a.contains(t) && seen.insert(*t))
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Vector building
// ============================================================================

fn terms(prepared: &str) -> Vec<&str> {
    words(prepared).filter(|w| w.chars().count() >= MIN_TERM_CHARS).collect()
}

fn to_f64<T: std::hash::Hash + Eq>(map: AHashMap<T, usize>) -> AHashMap<T, f64> {
    map.into_iter().map(|(k, v)| (k, v as f64)).collect()
}

fn binary_vector<'a>(terms: &[&'a str]) -> AHashMap<&'a str, f64> {
    terms.iter().map(|&t| (t, 1.0)).collect()
}

fn frequency_vector<'a>(terms: &[&'a str]) -> AHashMap<&'a str, f64> {
    let total = terms.len();
    counts(terms.iter().copied())
        .into_iter()
        .map(|(t, c)| (t, count_ratio(c, total)))
        .collect()
}

fn pair_tfidf_vectors<'a>(
    terms_a: &[&'a str],
    terms_b: &[&'a str],
) -> (AHashMap<&'a str, f64>, AHashMap<&'a str, f64>) {
    let set_a: AHashSet<&str> = terms_a.iter().copied().collect();
    let set_b: AHashSet<&str> = terms_b.iter().copied().collect();
    let num_docs = 2.0;

    let weigh = |terms: &[&'a str]| -> AHashMap<&'a str, f64> {
        let total = terms.len();
        counts(terms.iter().copied())
            .into_iter()
            .map(|(t, c)| {
                let df = usize::from(set_a.contains(t)) + usize::from(set_b.contains(t));
                let idf = ((num_docs + 1.0) / (df as f64 + 1.0)).ln();
                (t, count_ratio(c, total) * idf)
            })
            .collect()
    };
    (weigh(terms_a), weigh(terms_b))
}

/// Cosine of two sparse vectors, clamped to `[0, 1]`.
///
/// A zero vector on either side yields 0.
pub(crate) fn cosine_from_maps<T: std::hash::Hash + Eq>(vec_a: &AHashMap<T, f64>, vec_b: &AHashMap<T, f64>) -> f64 {
    if vec_a.is_empty() || vec_b.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0f64;
    let mut magnitude_a = 0.0f64;
    for (key, &weight_a) in vec_a {
        magnitude_a += weight_a * weight_a;
        if let Some(&weight_b) = vec_b.get(key) {
            dot_product += weight_a * weight_b;
        }
    }
    let magnitude_b: f64 = vec_b.values().map(|w| w * w).sum();

    let magnitude = (magnitude_a * magnitude_b).sqrt();
    if magnitude == 0.0 {
        0.0
    } else {
        (dot_product / magnitude).clamp(0.0, 1.0)
    }
}

// ============================================================================
// Corpus model
// ============================================================================

/// TF-IDF cosine with document frequencies fitted over a corpus.
///
/// ```
/// use fuzzydedup::algorithms::cosine::TfIdfModel;
///
/// let model = TfIdfModel::fit(["кабель ВВГ 3x2.5", "кабель ПВС 3x1.5", "провод ПВС 2x0.75"]);
/// let sim = model.similarity("кабель ВВГ 3x2.5", "кабель ВВГ 3x1.5");
/// assert!(sim > 0.0 && sim < 1.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TfIdfModel {
    /// Document frequency for each term
    df: AHashMap<String, usize>,
    num_docs: usize,
}

impl TfIdfModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit document frequencies over `corpus`.
    pub fn fit<I, S>(corpus: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut model = Self::new();
        for doc in corpus {
            model.add_document(doc.as_ref());
        }
        model
    }

    pub fn add_document(&mut self, doc: &str) {
        let prepared = prepare(doc);
        let unique: AHashSet<&str> = terms(&prepared).into_iter().collect();
        for term in unique {
            *self.df.entry(term.to_string()).or_insert(0) += 1;
        }
        self.num_docs += 1;
    }

    #[must_use]
    pub fn num_docs(&self) -> usize {
        self.num_docs
    }

    /// Smoothed IDF `ln((N+1)/(df+1)) + 1`; unseen terms get the maximum.
    #[must_use]
    pub fn idf(&self, term: &str) -> f64 {
        let df = self.df.get(term).copied().unwrap_or(0);
        ((self.num_docs as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0
    }

    #[must_use]
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let (a, b) = prepare_pair(a, b);
        if a == b {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        cosine_from_maps(&self.vector(&a), &self.vector(&b))
    }

    fn vector<'a>(&self, prepared: &'a str) -> AHashMap<&'a str, f64> {
        let terms = terms(prepared);
        let total = terms.len();
        counts(terms)
            .into_iter()
            .map(|(t, c)| (t, count_ratio(c, total) * self.idf(t)))
            .collect()
    }
}

impl Similarity for TfIdfModel {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        TfIdfModel::similarity(self, a, b)
    }

    fn name(&self) -> &'static str {
        "tfidf_model"
    }
}
