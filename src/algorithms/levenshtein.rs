//! Levenshtein (edit) distance implementation
//!
//! Single-row dynamic programming over Unicode scalar values, with an
//! optional early-termination bound used by candidate filters.
//!
//! # Complexity
//! - Time: O(m*n)
//! - Space: O(min(m,n))

use super::numeric::min3;
use super::EditDistance;
use smallvec::SmallVec;

pub(crate) type CharBuf = SmallVec<[char; 64]>;

/// Levenshtein distance calculator with optional early termination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Levenshtein {
    /// Maximum distance to compute (for early termination)
    pub max_distance: Option<usize>,
}

impl Levenshtein {
    #[must_use]
    pub fn new() -> Self {
        Self { max_distance: None }
    }

    #[must_use]
    pub fn with_max_distance(max_distance: usize) -> Self {
        Self {
            max_distance: Some(max_distance),
        }
    }

    /// Returns `None` if the distance exceeds `max_distance`.
    #[must_use]
    pub fn compute(&self, a: &str, b: &str) -> Option<usize> {
        levenshtein_distance_bounded(a, b, self.max_distance)
    }
}

impl EditDistance for Levenshtein {
    fn distance(&self, a: &str, b: &str) -> usize {
        match self.max_distance {
            Some(max_d) => levenshtein_distance_bounded(a, b, Some(max_d)).unwrap_or(max_d.saturating_add(1)),
            None => levenshtein_distance(a, b),
        }
    }

    fn name(&self) -> &'static str {
        "levenshtein"
    }
}

/// Raw Levenshtein distance (no case folding or trimming).
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let a: CharBuf = a.chars().collect();
    let b: CharBuf = b.chars().collect();
    dp_distance(&a, &b, None).unwrap_or(0)
}

/// Levenshtein distance that gives up once it is certain to exceed `max_distance`.
///
/// ```
/// use fuzzydedup::algorithms::levenshtein::levenshtein_distance_bounded;
///
/// assert_eq!(levenshtein_distance_bounded("kitten", "sitting", None), Some(3));
/// assert_eq!(levenshtein_distance_bounded("abcdef", "ghijkl", Some(3)), None);
/// ```
#[must_use]
pub fn levenshtein_distance_bounded(a: &str, b: &str, max_distance: Option<usize>) -> Option<usize> {
    if a == b {
        return Some(0);
    }
    let a: CharBuf = a.chars().collect();
    let b: CharBuf = b.chars().collect();
    dp_distance(&a, &b, max_distance)
}

/// Normalized similarity `1 - d / max_len` over prepared strings.
#[must_use]
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    EditDistance::similarity(&Levenshtein::new(), a, b)
}

pub(crate) fn dp_distance(a: &[char], b: &[char], max_distance: Option<usize>) -> Option<usize> {
    let (m, n) = (a.len(), b.len());
    let within = |d: usize| max_distance.map_or(true, |max| d <= max);

    if m == 0 || n == 0 {
        let d = m.max(n);
        return within(d).then_some(d);
    }
    if !within(m.abs_diff(n)) {
        return None;
    }

    // Shorter string on the column axis keeps the row small
    let (target, source) = if m < n { (a, b) } else { (b, a) };
    let width = target.len();
    let mut row: SmallVec<[usize; 64]> = (0..=width).collect();

    for (i, &sc) in source.iter().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        let mut row_min = row[0];

        for j in 0..width {
            let cost = usize::from(sc != target[j]);
            let cell = min3(row[j + 1] + 1, row[j] + 1, diag + cost);
            diag = row[j + 1];
            row[j + 1] = cell;
            row_min = row_min.min(cell);
        }

        if !within(row_min) {
            return None;
        }
    }

    let d = row[width];
    within(d).then_some(d)
}
