//! Labeled evaluation, weight learning and reporting
//!
//! - [`metrics`]: confusion counters and the metrics derived from them
//! - [`learner`]: gradient-descent weight tuning, threshold sweep, k-fold validation
//! - [`analyzer`]: batch scoring with statistics and recommendations
//! - [`export`]: JSON/CSV/TSV/Markdown output and training-pair import

pub mod analyzer;
pub mod export;
pub mod learner;
pub mod metrics;

pub use analyzer::*;
pub use export::*;
pub use learner::*;
pub use metrics::*;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimilarityError};

/// An ordered pair of strings to score.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimilarityPair {
    pub s1: String,
    pub s2: String,
}

impl SimilarityPair {
    pub fn new(s1: impl Into<String>, s2: impl Into<String>) -> Self {
        Self {
            s1: s1.into(),
            s2: s2.into(),
        }
    }
}

/// A pair with its ground-truth label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledPair {
    pub s1: String,
    pub s2: String,
    pub is_duplicate: bool,
}

impl LabeledPair {
    pub fn new(s1: impl Into<String>, s2: impl Into<String>, is_duplicate: bool) -> Self {
        Self {
            s1: s1.into(),
            s2: s2.into(),
            is_duplicate,
        }
    }

    pub fn duplicate(s1: impl Into<String>, s2: impl Into<String>) -> Self {
        Self::new(s1, s2, true)
    }

    pub fn distinct(s1: impl Into<String>, s2: impl Into<String>) -> Self {
        Self::new(s1, s2, false)
    }
}

impl From<LabeledPair> for SimilarityPair {
    fn from(pair: LabeledPair) -> Self {
        Self {
            s1: pair.s1,
            s2: pair.s2,
        }
    }
}

fn check_sides(index: usize, s1: &str, s2: &str) -> Result<()> {
    if s1.trim().is_empty() {
        return Err(SimilarityError::invalid_input(Some(index), "s1", "empty string"));
    }
    if s2.trim().is_empty() {
        return Err(SimilarityError::invalid_input(Some(index), "s2", "empty string"));
    }
    Ok(())
}

/// At least one pair, no blank side.
pub fn validate_pairs(pairs: &[SimilarityPair]) -> Result<()> {
    if pairs.is_empty() {
        return Err(SimilarityError::EmptyDataset {
            operation: "analyze_pairs",
        });
    }
    pairs
        .iter()
        .enumerate()
        .try_for_each(|(i, p)| check_sides(i, &p.s1, &p.s2))
}

/// At least one labeled pair, no blank side.
pub fn validate_labeled_pairs(pairs: &[LabeledPair]) -> Result<()> {
    if pairs.is_empty() {
        return Err(SimilarityError::EmptyDataset { operation: "training" });
    }
    pairs
        .iter()
        .enumerate()
        .try_for_each(|(i, p)| check_sides(i, &p.s1, &p.s2))
}

/// Threshold within [0, 1].
pub fn validate_threshold(threshold: f64) -> Result<()> {
    check_threshold("threshold", threshold)
}

pub(crate) fn check_threshold(field: &'static str, threshold: f64) -> Result<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(SimilarityError::InvalidThreshold {
            field,
            actual: threshold,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_validate_pairs() {
        assert!(validate_pairs(&[SimilarityPair::new("a", "b")]).is_ok());

        let err = validate_pairs(&[]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::EmptyDataset);

        let pairs = vec![SimilarityPair::new("a", "b"), SimilarityPair::new("c", "  ")];
        match validate_pairs(&pairs).unwrap_err() {
            SimilarityError::InvalidInput { index, field, .. } => {
                assert_eq!(index, Some(1));
                assert_eq!(field, "s2");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_validate_labeled_pairs() {
        assert!(validate_labeled_pairs(&[LabeledPair::duplicate("a", "a")]).is_ok());
        assert!(validate_labeled_pairs(&[]).is_err());
        assert!(validate_labeled_pairs(&[LabeledPair::distinct("", "a")]).is_err());
    }

    #[test]
    fn test_validate_threshold() {
        assert!(validate_threshold(0.0).is_ok());
        assert!(validate_threshold(1.0).is_ok());
        assert!(validate_threshold(-0.01).is_err());
        assert!(validate_threshold(1.01).is_err());
        assert!(validate_threshold(f64::NAN).is_err());
    }

    #[test]
    fn test_labeled_pair_json_fields() {
        let json = serde_json::to_value(LabeledPair::duplicate("x", "y")).unwrap();
        assert_eq!(json["s1"], "x");
        assert_eq!(json["s2"], "y");
        assert_eq!(json["is_duplicate"], true);
    }
}
