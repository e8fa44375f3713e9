//! Token and set based similarity metrics
//!
//! Word-level Jaccard/Dice, count-weighted Jaccard and the configurable
//! [`TokenSetSimilarity`] calculator. Tokens come from
//! [`words`](super::normalize::words): whitespace split, punctuation trimmed.

use super::ngram::{bigram_similarity, counts, set_jaccard, weighted_overlap};
use super::normalize::{prepare, prepare_pair, words};
use super::numeric::{count_ratio, ratio};
use super::Similarity;
use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// Strings up to this many chars are compared on bigrams by [`jaccard_index`].
pub const SHORT_STRING_CHARS: usize = 20;

/// Russian stop words dropped by [`TokenSetSimilarity`] when enabled.
pub const RUSSIAN_STOP_WORDS: &[&str] = &[
    "и", "в", "на", "с", "для", "по", "из", "к", "от", "о", "а", "но", "или", "то", "что", "как", "так", "это", "он",
    "она", "оно", "они", "мы", "вы", "я", "ты", "быть", "был", "была", "было", "были", "не", "нет", "ни", "да", "же",
    "ли", "бы",
];

fn word_set(prepared: &str) -> AHashSet<&str> {
    words(prepared).collect()
}

/// Jaccard similarity of the word sets.
#[must_use]
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = prepare_pair(a, b);
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    set_jaccard(&word_set(&a), &word_set(&b))
}

/// Sørensen-Dice coefficient of the word sets: `2|A ∩ B| / (|A| + |B|)`.
#[must_use]
pub fn dice_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = prepare_pair(a, b);
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let set_a = word_set(&a);
    let set_b = word_set(&b);
    if set_a.is_empty() && set_b.is_empty() {
        return 1.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    count_ratio(2 * intersection, set_a.len() + set_b.len())
}

/// Jaccard over word counts: `Σ min / Σ max`.
#[must_use]
pub fn weighted_jaccard_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = prepare_pair(a, b);
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    weighted_overlap(&counts(words(&a)), &counts(words(&b)))
}

/// Jaccard index as used by the hybrid score: padded bigram set similarity
/// for short strings (both at most [`SHORT_STRING_CHARS`] chars), word-set
/// Jaccard otherwise.
#[must_use]
pub fn jaccard_index(a: &str, b: &str) -> f64 {
    let (a, b) = prepare_pair(a, b);
    if a.chars().count() <= SHORT_STRING_CHARS && b.chars().count() <= SHORT_STRING_CHARS {
        bigram_similarity(&a, &b)
    } else {
        jaccard_similarity(&a, &b)
    }
}

// ============================================================================
// Token-set calculator
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenSetMode {
    /// Set Jaccard
    #[default]
    Basic,
    /// Weighted Jaccard over tf-idf weights of the two-document corpus
    Weighted,
    /// Mean positional agreement of shared tokens
    Positional,
}

/// Token-set similarity calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSetSimilarity {
    pub mode: TokenSetMode,
    /// Tokens shorter than this many chars are dropped
    pub min_token_length: usize,
    pub use_stop_words: bool,
}

impl Default for TokenSetSimilarity {
    fn default() -> Self {
        Self {
            mode: TokenSetMode::Basic,
            min_token_length: 2,
            use_stop_words: false,
        }
    }
}

impl TokenSetSimilarity {
    #[must_use]
    pub fn new(mode: TokenSetMode) -> Self {
        Self { mode, ..Self::default() }
    }

    /// Weighted mode with stop words removed.
    #[must_use]
    pub fn weighted() -> Self {
        Self {
            mode: TokenSetMode::Weighted,
            use_stop_words: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_min_token_length(mut self, length: usize) -> Self {
        self.min_token_length = length;
        self
    }

    #[must_use]
    pub fn with_stop_words(mut self, enabled: bool) -> Self {
        self.use_stop_words = enabled;
        self
    }

    /// Tokens of an already prepared string after length and stop-word filtering.
    #[must_use]
    pub fn tokenize<'a>(&self, prepared: &'a str) -> Vec<&'a str> {
        words(prepared)
            .filter(|w| w.chars().count() >= self.min_token_length)
            .filter(|w| !(self.use_stop_words && RUSSIAN_STOP_WORDS.contains(w)))
            .collect()
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
        let tokens_a = self.tokenize(&a);
        let tokens_b = self.tokenize(&b);
        // differing strings that both filter down to nothing share no evidence
        if tokens_a.is_empty() || tokens_b.is_empty() {
            return 0.0;
        }

        match self.mode {
            TokenSetMode::Basic => {
                let set_a: AHashSet<&str> = tokens_a.iter().copied().collect();
                let set_b: AHashSet<&str> = tokens_b.iter().copied().collect();
                set_jaccard(&set_a, &set_b)
            }
            TokenSetMode::Weighted => weighted_tfidf(&tokens_a, &tokens_b),
            TokenSetMode::Positional => positional(&tokens_a, &tokens_b),
        }
    }

    /// Distinct tokens present in both strings, in order of first appearance in `b`.
    #[must_use]
    pub fn common_tokens(&self, a: &str, b: &str) -> Vec<String> {
        let (a, b) = prepare_pair(a, b);
        let set_a: AHashSet<&str> = self.tokenize(&a).into_iter().collect();
        let mut seen = AHashSet::new();
        self.tokenize(&b)
            .into_iter()
            .filter(|t| set_a.contains(t) && seen.insert(*t))
            .map(str::to_string)
            .collect()
    }

    /// Distinct tokens only in `a` and only in `b`, each in order of appearance.
    #[must_use]
    pub fn unique_tokens(&self, a: &str, b: &str) -> (Vec<String>, Vec<String>) {
        let (a, b) = prepare_pair(a, b);
        let tokens_a = self.tokenize(&a);
        let tokens_b = self.tokenize(&b);
        let set_a: AHashSet<&str> = tokens_a.iter().copied().collect();
        let set_b: AHashSet<&str> = tokens_b.iter().copied().collect();

        let only = |tokens: &[&str], other: &AHashSet<&str>| {
            let mut seen = AHashSet::new();
            tokens
                .iter()
                .filter(|t| !other.contains(*t) && seen.insert(**t))
                .map(|t| (*t).to_string())
                .collect::<Vec<_>>()
        };
        (only(&tokens_a, &set_b), only(&tokens_b, &set_a))
    }
}

impl Similarity for TokenSetSimilarity {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        TokenSetSimilarity::similarity(self, a, b)
    }

    fn name(&self) -> &'static str {
        "token_set"
    }
}

fn tfidf_weights<'a>(freq: &AHashMap<&'a str, usize>, total: usize, other: &AHashMap<&str, usize>) -> AHashMap<&'a str, f64> {
    freq.iter()
        .map(|(&token, &count)| {
            // smoothed idf over the two-document corpus
            let df = 1 + usize::from(other.contains_key(token));
            let idf = (3.0 / (df as f64 + 1.0)).ln() + 1.0;
            (token, count_ratio(count, total) * idf)
        })
        .collect()
}

fn weighted_tfidf(tokens_a: &[&str], tokens_b: &[&str]) -> f64 {
    let freq_a = counts(tokens_a.iter().copied());
    let freq_b = counts(tokens_b.iter().copied());
    let w_a = tfidf_weights(&freq_a, tokens_a.len(), &freq_b);
    let w_b = tfidf_weights(&freq_b, tokens_b.len(), &freq_a);

    let mut intersection = 0.0;
    let mut union = 0.0;
    for (token, &wa) in &w_a {
        let wb = w_b.get(token).copied().unwrap_or(0.0);
        intersection += wa.min(wb);
        union += wa.max(wb);
    }
    union += w_b.iter().filter(|(t, _)| !w_a.contains_key(*t)).map(|(_, w)| w).sum::<f64>();
    ratio(intersection, union)
}

fn positional(tokens_a: &[&str], tokens_b: &[&str]) -> f64 {
    let mut positions_b: AHashMap<&str, Vec<usize>> = AHashMap::new();
    for (i, t) in tokens_b.iter().enumerate() {
        positions_b.entry(*t).or_default().push(i);
    }
    let max_len = tokens_a.len().max(tokens_b.len()) as f64;

    // minimum gap per shared token
    let mut gaps: AHashMap<&str, usize> = AHashMap::new();
    for (i, t) in tokens_a.iter().enumerate() {
        if let Some(js) = positions_b.get(t) {
            let gap = js.iter().map(|&j| i.abs_diff(j)).min().unwrap_or(0);
            gaps.entry(*t).and_modify(|g| *g = (*g).min(gap)).or_insert(gap);
        }
    }
    if gaps.is_empty() {
        return 0.0;
    }
    let total: f64 = gaps.values().map(|&g| (1.0 - g as f64 / max_len).max(0.0)).sum();
    total / gaps.len() as f64
}

/// Prepared word tokens, for callers outside the metrics library.
#[must_use]
pub fn tokenize(s: &str) -> Vec<String> {
    words(&prepare(s)).map(str::to_string).collect()
}
