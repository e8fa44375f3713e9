//! Jaro and Jaro-Winkler similarity implementations
//!
//! Good for short names and codes where typos cluster near the end.
//! Jaro-Winkler adds a bonus for a shared prefix, but only to pairs that are
//! already close (Jaro at or above the boost threshold, 0.7 by default).
//!
//! # Performance
//!
//! Prepared ASCII input is compared on bytes; everything else goes through a
//! `SmallVec<[char; 64]>` so typical catalog names never touch the heap.

use super::normalize::prepare_pair;
use super::Similarity;
use smallvec::SmallVec;

// ============================================================================
// Public API
// ============================================================================

/// Jaro similarity calculator
///
/// # Complexity
/// - Time: O(m*n) for matching characters
/// - Space: O(m+n) for match flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Jaro;

impl Jaro {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Similarity for Jaro {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        jaro_similarity(a, b)
    }

    fn name(&self) -> &'static str {
        "jaro"
    }
}

/// Jaro-Winkler similarity calculator
///
/// # Parameters
/// - `prefix_weight`: boost per shared prefix char (clamped to 0.0-0.25)
/// - `max_prefix_length`: longest prefix that earns a boost
/// - `boost_threshold`: Jaro score below which no boost is applied
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JaroWinkler {
    pub prefix_weight: f64,
    pub max_prefix_length: usize,
    pub boost_threshold: f64,
}

impl Default for JaroWinkler {
    fn default() -> Self {
        Self {
            prefix_weight: 0.1,
            max_prefix_length: 4,
            boost_threshold: 0.7,
        }
    }
}

impl JaroWinkler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_prefix_weight(mut self, weight: f64) -> Self {
        self.prefix_weight = weight.clamp(0.0, 0.25);
        self
    }

    #[must_use]
    pub fn with_max_prefix_length(mut self, length: usize) -> Self {
        self.max_prefix_length = length;
        self
    }

    #[must_use]
    pub fn with_boost_threshold(mut self, threshold: f64) -> Self {
        self.boost_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

impl Similarity for JaroWinkler {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        let (a, b) = prepare_pair(a, b);
        winkler_prepared(&a, &b, self)
    }

    fn name(&self) -> &'static str {
        "jaro_winkler"
    }
}

/// Jaro similarity of two strings after preparation.
#[must_use]
pub fn jaro_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = prepare_pair(a, b);
    jaro_prepared(&a, &b)
}

/// Jaro-Winkler similarity with the standard parameters (0.1, 4, boost at 0.7).
#[must_use]
pub fn jaro_winkler_similarity(a: &str, b: &str) -> f64 {
    JaroWinkler::default().similarity(a, b)
}

// ============================================================================
// Internals
// ============================================================================

fn winkler_prepared(a: &str, b: &str, params: &JaroWinkler) -> f64 {
    let jaro = jaro_prepared(a, b);
    if jaro < params.boost_threshold {
        return jaro;
    }

    let prefix_len = a
        .chars()
        .zip(b.chars())
        .take(params.max_prefix_length)
        .take_while(|(x, y)| x == y)
        .count();

    let weight = params.prefix_weight.clamp(0.0, 0.25);
    (jaro + prefix_len as f64 * weight * (1.0 - jaro)).min(1.0)
}

#[inline]
pub(crate) fn jaro_prepared(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    if a.is_ascii() && b.is_ascii() {
        return jaro_generic(a.as_bytes(), b.as_bytes());
    }

    let a_chars: SmallVec<[char; 64]> = a.chars().collect();
    let b_chars: SmallVec<[char; 64]> = b.chars().collect();
    jaro_generic(&a_chars, &b_chars)
}

fn jaro_generic<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let a_len = a.len();
    let b_len = b.len();

    let match_distance = (a_len.max(b_len) / 2).saturating_sub(1);

    let mut a_matched: SmallVec<[bool; 64]> = smallvec::smallvec![false; a_len];
    let mut b_matched: SmallVec<[bool; 64]> = smallvec::smallvec![false; b_len];
    let mut matches = 0usize;

    for i in 0..a_len {
        let start = i.saturating_sub(match_distance);
        let end = (i + match_distance + 1).min(b_len);

        for j in start..end {
            if b_matched[j] || a[i] != b[j] {
                continue;
            }
            a_matched[i] = true;
            b_matched[j] = true;
            matches += 1;
            break;
        }
    }

    if matches == 0 {
        return 0.0;
    }

    let mut transpositions = 0usize;
    let mut k = 0usize;
    for i in 0..a_len {
        if !a_matched[i] {
            continue;
        }
        while k < b_len && !b_matched[k] {
            k += 1;
        }
        if k >= b_len {
            break;
        }
        if a[i] != b[k] {
            transpositions += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    let t = (transpositions / 2) as f64;
    (m / a_len as f64 + m / b_len as f64 + (m - t) / m) / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.001
    }

    #[test]
    fn test_jaro_basic() {
        assert!(approx_eq(jaro_similarity("", ""), 1.0));
        assert!(approx_eq(jaro_similarity("abc", "abc"), 1.0));
        assert!(approx_eq(jaro_similarity("abc", "xyz"), 0.0));
        assert!(approx_eq(jaro_similarity("abc", ""), 0.0));
    }

    #[test]
    fn test_jaro_examples() {
        assert!(approx_eq(jaro_similarity("MARTHA", "MARHTA"), 0.944));
        assert!(approx_eq(jaro_similarity("DWAYNE", "DUANE"), 0.822));
        assert!(approx_eq(jaro_similarity("martha", "MARHTA"), 0.944));
    }

    #[test]
    fn test_identical_is_exactly_one() {
        assert_eq!(jaro_similarity("Кабель", "кабель "), 1.0);
        assert_eq!(jaro_winkler_similarity("Кабель", "кабель"), 1.0);
    }

    #[test]
    fn test_winkler_boost() {
        let jaro = jaro_similarity("MARTHA", "MARHTA");
        let jw = jaro_winkler_similarity("MARTHA", "MARHTA");
        assert!(jw > jaro);
        assert!(approx_eq(jw, 0.961));
    }

    #[test]
    fn test_no_boost_below_threshold() {
        // Jaro well below 0.7 keeps its plain value despite the shared prefix
        let jaro = jaro_similarity("abcdxyzw", "abcdpqrs");
        assert!(jaro < 0.7);
        assert_eq!(jaro_winkler_similarity("abcdxyzw", "abcdpqrs"), jaro);
    }

    #[test]
    fn test_unicode_matches_ascii_path() {
        // same shape in Cyrillic and Latin must score the same
        let latin = jaro_similarity("abcdef", "abdcef");
        let cyrillic = jaro_similarity("абвгде", "абгвде");
        assert!(approx_eq(latin, cyrillic));
    }

    #[test]
    fn test_builder_clamps() {
        let jw = JaroWinkler::new().with_prefix_weight(0.9).with_boost_threshold(1.5);
        assert_eq!(jw.prefix_weight, 0.25);
        assert_eq!(jw.boost_threshold, 1.0);
        // no boost possible now
        assert!(approx_eq(jw.similarity("MARTHA", "MARHTA"), 0.944));
    }
}
