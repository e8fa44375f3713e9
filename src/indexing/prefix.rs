//! Prefix index for candidate reduction.
//!
//! Records are bucketed by the first `prefix_length` chars of their prepared
//! text, so duplicate detection only compares records that start alike. Typos
//! in the first chars are partly covered by [`PrefixIndex::candidates`], which
//! also visits buckets whose key agrees in at least half of its positions.
//! Duplicates whose prefixes are far apart are missed.
//!
//! # Concurrency
//!
//! A single `parking_lot::RwLock` guards both the forward and the reverse map:
//! - queries acquire a shared read lock
//! - `add`, `remove`, `update` and `clear` acquire an exclusive write lock
//!
//! Clones share the same index.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::algorithms::normalize::prepare;
use crate::algorithms::numeric::count_ratio;

/// Default prefix length and minimum indexed length.
pub const DEFAULT_PREFIX_LENGTH: usize = 3;

/// Buckets whose key agrees with the query prefix in at least this share of
/// positions are fuzzy candidates.
pub const FUZZY_PREFIX_SIMILARITY: f64 = 0.5;

#[derive(Debug, Default)]
struct PrefixState {
    /// prefix -> record indices
    buckets: AHashMap<String, Vec<usize>>,
    /// record index -> prefixes it is filed under
    reverse: AHashMap<usize, Vec<String>>,
}

impl PrefixState {
    fn remove(&mut self, index: usize) -> bool {
        let Some(prefixes) = self.reverse.remove(&index) else {
            return false;
        };
        for prefix in prefixes {
            if let Some(indices) = self.buckets.get_mut(&prefix) {
                indices.retain(|&i| i != index);
                if indices.is_empty() {
                    self.buckets.remove(&prefix);
                }
            }
        }
        true
    }
}

/// Summary of the index contents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrefixIndexStats {
    pub total_items: usize,
    pub total_prefixes: usize,
    pub avg_items_per_prefix: f64,
    pub prefix_length: usize,
    pub min_length: usize,
}

/// Thread-safe prefix index over record indices.
#[derive(Debug, Clone)]
pub struct PrefixIndex {
    inner: Arc<RwLock<PrefixState>>,
    prefix_length: usize,
    min_length: usize,
}

impl Default for PrefixIndex {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX_LENGTH, DEFAULT_PREFIX_LENGTH)
    }
}

impl PrefixIndex {
    /// A `prefix_length` of 0 means 3; a `min_length` of 0 means `prefix_length`.
    #[must_use]
    pub fn new(prefix_length: usize, min_length: usize) -> Self {
        let prefix_length = if prefix_length == 0 {
            DEFAULT_PREFIX_LENGTH
        } else {
            prefix_length
        };
        let min_length = if min_length == 0 { prefix_length } else { min_length };
        Self {
            inner: Arc::new(RwLock::new(PrefixState::default())),
            prefix_length,
            min_length,
        }
    }

    #[must_use]
    pub fn prefix_length(&self) -> usize {
        self.prefix_length
    }

    #[must_use]
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Bucket key for `text`, or `None` when it is too short to index.
    #[must_use]
    pub fn prefix_of(&self, text: &str) -> Option<String> {
        let prepared = prepare(text);
        if prepared.chars().count() < self.min_length {
            return None;
        }
        Some(prepared.chars().take(self.prefix_length).collect())
    }

    /// Index `text` as record `index`, replacing any earlier entry for it.
    ///
    /// Returns `false` when the prepared text is shorter than `min_length`.
    pub fn add(&self, index: usize, text: &str) -> bool {
        let Some(prefix) = self.prefix_of(text) else {
            return false;
        };
        let mut state = self.inner.write();
        state.remove(index);
        state.buckets.entry(prefix.clone()).or_default().push(index);
        state.reverse.entry(index).or_default().push(prefix);
        true
    }

    /// Index every text under its position. Returns how many were indexed.
    pub fn add_batch<S: AsRef<str>>(&self, texts: &[S]) -> usize {
        let keyed: Vec<(usize, String)> = texts
            .iter()
            .enumerate()
            .filter_map(|(i, t)| self.prefix_of(t.as_ref()).map(|p| (i, p)))
            .collect();

        let mut state = self.inner.write();
        for (index, prefix) in &keyed {
            state.remove(*index);
            state.buckets.entry(prefix.clone()).or_default().push(*index);
            state.reverse.entry(*index).or_default().push(prefix.clone());
        }
        keyed.len()
    }

    /// Records filed under exactly the same prefix as `text`, `index` excluded.
    #[must_use]
    pub fn candidates_exact(&self, index: usize, text: &str) -> Vec<usize> {
        let Some(prefix) = self.prefix_of(text) else {
            return Vec::new();
        };
        let state = self.inner.read();
        let mut result: Vec<usize> = state
            .buckets
            .get(&prefix)
            .map(|indices| indices.iter().copied().filter(|&i| i != index).collect())
            .unwrap_or_default();
        result.sort_unstable();
        result.dedup();
        result
    }

    /// Exact candidates plus records in buckets whose key is positionally
    /// similar to the query prefix. Sorted ascending, `index` excluded.
    #[must_use]
    pub fn candidates(&self, index: usize, text: &str) -> Vec<usize> {
        let Some(prefix) = self.prefix_of(text) else {
            return Vec::new();
        };
        let state = self.inner.read();
        let mut result: Vec<usize> = state
            .buckets
            .iter()
            .filter(|(key, _)| **key == prefix || prefix_similarity(&prefix, key) >= FUZZY_PREFIX_SIMILARITY)
            .flat_map(|(_, indices)| indices.iter().copied())
            .filter(|&i| i != index)
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    /// Drop record `index` from every bucket. Empty buckets are removed.
    pub fn remove(&self, index: usize) -> bool {
        self.inner.write().remove(index)
    }

    /// Re-index record `index` under `new_text`.
    ///
    /// `old_text` is accepted for call-site symmetry; the reverse map already
    /// knows where the record was filed.
    pub fn update(&self, index: usize, _old_text: &str, new_text: &str) -> bool {
        let prefix = self.prefix_of(new_text);
        let mut state = self.inner.write();
        state.remove(index);
        match prefix {
            Some(prefix) => {
                state.buckets.entry(prefix.clone()).or_default().push(index);
                state.reverse.entry(index).or_default().push(prefix);
                true
            }
            None => false,
        }
    }

    /// Prefixes record `index` is filed under.
    #[must_use]
    pub fn prefixes(&self, index: usize) -> Vec<String> {
        self.inner.read().reverse.get(&index).cloned().unwrap_or_default()
    }

    /// Records whose bucket key starts with the prepared `prefix`, sorted.
    #[must_use]
    pub fn filter_by_prefix(&self, prefix: &str) -> Vec<usize> {
        let wanted: String = prepare(prefix).chars().take(self.prefix_length).collect();
        let state = self.inner.read();
        let mut result: Vec<usize> = state
            .buckets
            .iter()
            .filter(|(key, _)| key.starts_with(&wanted))
            .flat_map(|(_, indices)| indices.iter().copied())
            .collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    /// Whether record `index` is indexed.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.inner.read().reverse.contains_key(&index)
    }

    /// Number of indexed records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().reverse.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.inner.write();
        state.buckets.clear();
        state.reverse.clear();
    }

    #[must_use]
    pub fn stats(&self) -> PrefixIndexStats {
        let state = self.inner.read();
        let filed: usize = state.buckets.values().map(Vec::len).sum();
        PrefixIndexStats {
            total_items: state.reverse.len(),
            total_prefixes: state.buckets.len(),
            avg_items_per_prefix: count_ratio(filed, state.buckets.len()),
            prefix_length: self.prefix_length,
            min_length: self.min_length,
        }
    }
}

/// Share of equal chars over the shorter prefix.
#[must_use]
pub fn prefix_similarity(a: &str, b: &str) -> f64 {
    let len = a.chars().count().min(b.chars().count());
    if len == 0 {
        return if a.is_empty() && b.is_empty() { 1.0 } else { 0.0 };
    }
    let matches = a.chars().zip(b.chars()).filter(|(x, y)| x == y).count();
    count_ratio(matches, len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.001
    }

    fn sample() -> PrefixIndex {
        let index = PrefixIndex::new(3, 3);
        index.add_batch(&["масло сливочное", "масло подсолнечное", "кабель медный"]);
        index
    }

    #[test]
    fn test_exact_candidates_share_prefix() {
        let index = sample();
        let found = index.candidates_exact(0, "масло сливочное");
        assert!(found.contains(&1));
        assert!(!found.contains(&2));
        assert!(!found.contains(&0));
    }

    #[test]
    fn test_defaults_for_zero() {
        let index = PrefixIndex::new(0, 0);
        assert_eq!(index.prefix_length(), 3);
        assert_eq!(index.min_length(), 3);
        let index = PrefixIndex::new(5, 0);
        assert_eq!(index.min_length(), 5);
    }

    #[test]
    fn test_short_text_not_indexed() {
        let index = PrefixIndex::new(3, 4);
        assert!(!index.add(0, " ab "));
        assert!(!index.add(1, "абв"));
        assert!(index.add(2, "абвг"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_prefix_counts_chars() {
        let index = PrefixIndex::new(3, 3);
        index.add(7, "  Кабель");
        assert_eq!(index.prefixes(7), vec!["каб"]);
    }

    #[test]
    fn test_fuzzy_candidates_cover_typos() {
        let index = PrefixIndex::new(3, 3);
        index.add(0, "кабель");
        index.add(1, "кобель");
        index.add(2, "провод");
        assert_eq!(index.candidates_exact(9, "кабель"), vec![0]);
        assert_eq!(index.candidates(9, "кабель"), vec![0, 1]);
        assert!(approx_eq(prefix_similarity("каб", "коб"), 2.0 / 3.0));
    }

    #[test]
    fn test_remove_cleans_both_maps() {
        let index = sample();
        assert!(index.remove(2));
        assert!(index.prefixes(2).is_empty());
        assert!(index.filter_by_prefix("каб").is_empty());
        assert_eq!(index.stats().total_prefixes, 1);
        assert!(!index.remove(2));
    }

    #[test]
    fn test_update_moves_record() {
        let index = sample();
        assert!(index.update(2, "кабель медный", "масло топлёное"));
        assert_eq!(index.candidates_exact(0, "масло"), vec![1, 2]);
        assert_eq!(index.prefixes(2), vec!["мас"]);
    }

    #[test]
    fn test_re_adding_replaces_entry() {
        let index = PrefixIndex::default();
        index.add(0, "кабель");
        index.add(0, "кабель");
        index.add(0, "провод");
        assert_eq!(index.prefixes(0), vec!["про"]);
        assert!(index.filter_by_prefix("ка").is_empty());
    }

    #[test]
    fn test_filter_by_prefix() {
        let index = sample();
        assert_eq!(index.filter_by_prefix("МА"), vec![0, 1]);
        assert_eq!(index.filter_by_prefix("масло"), vec![0, 1]);
    }

    #[test]
    fn test_stats_and_clear() {
        let index = sample();
        let stats = index.stats();
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.total_prefixes, 2);
        assert!(approx_eq(stats.avg_items_per_prefix, 1.5));
        index.clear();
        assert!(index.is_empty());
        assert_eq!(index.stats().total_prefixes, 0);
    }

    #[test]
    fn test_shared_across_threads() {
        let index = PrefixIndex::default();
        std::thread::scope(|s| {
            for t in 0..4 {
                let index = index.clone();
                s.spawn(move || {
                    for i in 0..50 {
                        index.add(t * 100 + i, "кабель");
                    }
                });
            }
        });
        assert_eq!(index.len(), 200);
        assert_eq!(index.candidates_exact(usize::MAX, "кабель").len(), 200);
    }
}
