//! fuzzydedup - hybrid string similarity and deduplication
//!
//! Scores short catalog entries, product names and counterparty names against
//! each other and groups duplicates.
//!
//! # Features
//! - Edit-distance, sequence, token, n-gram, cosine and Russian phonetic metrics
//! - A weighted hybrid score over five of them, with learnable weights
//! - A bounded score cache with parallel batch scoring
//! - Prefix blocking and union-find duplicate grouping
//! - Per-reference rule sets for structured records
//! - Confusion-matrix evaluation, analysis reports and CSV/JSON export
//!
//! ```
//! use fuzzydedup::{combine, SimilarityWeights};
//!
//! let score = combine("Иванов Иван", "Иваноф Иван", &SimilarityWeights::default());
//! assert!(score > 0.75);
//! ```

pub mod algorithms;
pub mod cache;
pub mod config;
pub mod dedup;
pub mod error;
pub mod evaluation;
pub mod hybrid;
pub mod indexing;
pub mod logging;
pub mod rules;

pub use algorithms::{EditDistance, Metric, Similarity};
pub use cache::HybridCache;
pub use config::{EngineConfig, LearningConfig};
pub use dedup::{BlockingStrategy, DeduplicationResult, Deduplicator};
pub use error::{ErrorCode, Result, SimilarityError};
pub use evaluation::{
    AnalysisResult, ConfusionCounters, ExportFormat, LabeledPair, SimilarityAnalyzer, SimilarityLearner,
    SimilarityPair,
};
pub use hybrid::{breakdown, combine, AlgorithmBreakdown, SimilarityWeights, WeightSlot};
pub use indexing::PrefixIndex;
pub use logging::Logger;
pub use rules::{MatchingRule, RuleAlgorithm, RuleEngine, RuleMatch, RuleSet};
