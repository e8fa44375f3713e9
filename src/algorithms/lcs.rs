//! Longest Common Subsequence (LCS) implementation
//!
//! Finds the longest subsequence present in both strings. Tolerant of
//! insertions such as an extra grade suffix in `"ВВГнг"` vs `"ВВГ"`.
//!
//! # Complexity
//! - Time: O(m*n)
//! - Space: O(min(m,n)), two DP rows

use super::levenshtein::CharBuf;
use super::normalize::prepare_pair;
use super::numeric::count_ratio;
use super::Similarity;
use smallvec::SmallVec;

/// LCS-based similarity calculator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Lcs;

impl Lcs {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Similarity for Lcs {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        lcs_similarity(a, b)
    }

    fn name(&self) -> &'static str {
        "lcs"
    }
}

/// Length of the longest common subsequence of the raw strings, in chars.
#[must_use]
pub fn lcs_length(a: &str, b: &str) -> usize {
    let a: CharBuf = a.chars().collect();
    let b: CharBuf = b.chars().collect();
    lcs_chars(&a, &b)
}

/// `lcs_length / max(len_a, len_b)` over prepared strings.
#[must_use]
pub fn lcs_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = prepare_pair(a, b);
    if a == b {
        return 1.0;
    }
    let a: CharBuf = a.chars().collect();
    let b: CharBuf = b.chars().collect();
    count_ratio(lcs_chars(&a, &b), a.len().max(b.len()))
}

fn lcs_chars(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let (outer, inner) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    let n = inner.len();

    let mut prev: SmallVec<[usize; 64]> = smallvec::smallvec![0; n + 1];
    let mut curr: SmallVec<[usize; 64]> = smallvec::smallvec![0; n + 1];

    for &oc in outer {
        for j in 1..=n {
            curr[j] = if oc == inner[j - 1] {
                prev[j - 1] + 1
            } else {
                prev[j].max(curr[j - 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 0.001
    }

    #[test]
    fn test_lcs_length() {
        assert_eq!(lcs_length("ABCBDAB", "BDCABA"), 4);
        assert_eq!(lcs_length("", "abc"), 0);
        assert_eq!(lcs_length("кабель", "кабел"), 5);
    }

    #[test]
    fn test_lcs_similarity() {
        assert!(approx_eq(lcs_similarity("", ""), 1.0));
        assert!(approx_eq(lcs_similarity("abc", ""), 0.0));
        assert!(approx_eq(lcs_similarity("ВВГнг", "ввг"), 0.6));
        assert!(approx_eq(lcs_similarity("ABCBDAB", "BDCABA"), 4.0 / 7.0));
    }

    #[test]
    fn test_lcs_symmetric() {
        let ab = lcs_similarity("масло сливочное", "масло подсолнечное");
        let ba = lcs_similarity("масло подсолнечное", "масло сливочное");
        assert_eq!(ab, ba);
    }
}
