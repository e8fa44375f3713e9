//! Damerau-Levenshtein distance implementation
//!
//! Extends Levenshtein with transposition of adjacent characters as a single
//! operation. Two variants:
//!
//! - [`damerau_levenshtein_distance`]: unrestricted ("true") distance, where a
//!   transposed pair may be edited further. Used for similarity scoring.
//! - [`osa_distance`]: optimal string alignment, where no substring is edited
//!   more than once. Cheaper in memory.
//!
//! The unrestricted variant keeps an O(m*n) matrix; above
//! [`MAX_QUADRATIC_STRING_LENGTH`] chars it falls back to OSA.

use super::levenshtein::CharBuf;
use super::numeric::{distance_to_similarity, min3};
use super::normalize::prepare_pair;
use super::EditDistance;
use ahash::AHashMap;
use smallvec::SmallVec;

/// Maximum string length for the O(m*n) space algorithm.
pub const MAX_QUADRATIC_STRING_LENGTH: usize = 10_000;

/// Damerau-Levenshtein distance calculator
///
/// # Complexity
/// - Time: O(m*n)
/// - Space: O(m*n) for the unrestricted variant, O(n) when `restricted`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DamerauLevenshtein {
    /// Use the optimal-string-alignment variant
    pub restricted: bool,
}

impl DamerauLevenshtein {
    #[must_use]
    pub fn new() -> Self {
        Self { restricted: false }
    }

    #[must_use]
    pub fn restricted() -> Self {
        Self { restricted: true }
    }
}

impl EditDistance for DamerauLevenshtein {
    fn distance(&self, a: &str, b: &str) -> usize {
        if self.restricted {
            osa_distance(a, b)
        } else {
            damerau_levenshtein_distance(a, b)
        }
    }

    fn name(&self) -> &'static str {
        if self.restricted {
            "osa"
        } else {
            "damerau_levenshtein"
        }
    }
}

/// Unrestricted Damerau-Levenshtein distance over raw strings.
#[must_use]
pub fn damerau_levenshtein_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());

    if m == 0 || n == 0 {
        return m.max(n);
    }
    if m > MAX_QUADRATIC_STRING_LENGTH || n > MAX_QUADRATIC_STRING_LENGTH {
        return osa_chars(&a, &b);
    }

    let max_dist = m + n;
    // last row in `a` where each char was seen
    let mut last_row: AHashMap<char, usize> = AHashMap::new();
    let mut d = vec![vec![0usize; n + 2]; m + 2];

    d[0][0] = max_dist;
    for i in 0..=m {
        d[i + 1][0] = max_dist;
        d[i + 1][1] = i;
    }
    for j in 0..=n {
        d[0][j + 1] = max_dist;
        d[1][j + 1] = j;
    }

    for i in 1..=m {
        let mut last_match_col = 0usize;
        for j in 1..=n {
            let i1 = last_row.get(&b[j - 1]).copied().unwrap_or(0);
            let j1 = last_match_col;
            let cost = if a[i - 1] == b[j - 1] {
                last_match_col = j;
                0
            } else {
                1
            };

            d[i + 1][j + 1] = min3(d[i][j] + cost, d[i + 1][j] + 1, d[i][j + 1] + 1)
                .min(d[i1][j1] + (i - i1 - 1) + 1 + (j - j1 - 1));
        }
        last_row.insert(a[i - 1], i);
    }

    d[m + 1][n + 1]
}

/// Optimal string alignment distance over raw strings.
#[must_use]
pub fn osa_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a: CharBuf = a.chars().collect();
    let b: CharBuf = b.chars().collect();
    osa_chars(&a, &b)
}

fn osa_chars(a: &[char], b: &[char]) -> usize {
    let (m, n) = (a.len(), b.len());
    if m == 0 || n == 0 {
        return m.max(n);
    }

    // three rolling rows: i-2, i-1, i
    let mut prev2: SmallVec<[usize; 64]> = smallvec::smallvec![0; n + 1];
    let mut prev: SmallVec<[usize; 64]> = (0..=n).collect();
    let mut curr: SmallVec<[usize; 64]> = smallvec::smallvec![0; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut cell = min3(prev[j] + 1, curr[j - 1] + 1, prev[j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                cell = cell.min(prev2[j - 2] + 1);
            }
            curr[j] = cell;
        }
        std::mem::swap(&mut prev2, &mut prev);
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Normalized Damerau-Levenshtein similarity over prepared strings.
#[must_use]
pub fn damerau_levenshtein_similarity(a: &str, b: &str) -> f64 {
    EditDistance::similarity(&DamerauLevenshtein::new(), a, b)
}

/// Normalized OSA similarity over prepared strings.
#[must_use]
pub fn osa_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = prepare_pair(a, b);
    let max_len = a.chars().count().max(b.chars().count());
    distance_to_similarity(osa_distance(&a, &b), max_len)
}
