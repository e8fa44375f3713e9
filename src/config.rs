//! Engine configuration
//!
//! [`EngineConfig`] gathers every tunable of the engine in one serde struct so
//! a deployment can keep it in a JSON file. Missing fields take their
//! defaults; the result is validated before any component is built from it.
//!
//! ```
//! use fuzzydedup::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "duplicate_threshold": 0.8 }"#).unwrap();
//! assert_eq!(config.cache_capacity, 10_000);
//! assert_eq!(config.duplicate_threshold, 0.8);
//! ```

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::cache::{HybridCache, DEFAULT_BATCH_CONCURRENCY, DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_BATCH_SIZE};
use crate::dedup::{BlockingStrategy, Deduplicator};
use crate::error::{Result, SimilarityError};
use crate::evaluation::{check_threshold, SimilarityLearner};
use crate::hybrid::{SimilarityWeights, DEFAULT_DUPLICATE_THRESHOLD};
use crate::indexing::{PrefixIndex, DEFAULT_PREFIX_LENGTH};
use crate::logging::Logger;

/// Default number of gradient steps.
pub const DEFAULT_LEARNING_ITERATIONS: usize = 100;
/// Default gradient step size.
pub const DEFAULT_LEARNING_RATE: f64 = 0.01;
/// Default fold count for cross-validation.
pub const DEFAULT_FOLDS: usize = 5;

/// Weight learning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub iterations: usize,
    pub learning_rate: f64,
    pub folds: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_LEARNING_ITERATIONS,
            learning_rate: DEFAULT_LEARNING_RATE,
            folds: DEFAULT_FOLDS,
        }
    }
}

/// All engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hybrid score weights
    pub weights: SimilarityWeights,
    /// Cached pair scores before eviction kicks in
    pub cache_capacity: usize,
    /// Worker threads for batch scoring
    pub batch_concurrency: usize,
    /// Largest accepted batch
    pub max_batch_size: usize,
    /// Chars per prefix key
    pub prefix_length: usize,
    /// Shortest prepared text that gets indexed
    pub min_length: usize,
    /// Score at or above which two records are duplicates
    pub duplicate_threshold: f64,
    /// Blocking used by the deduplicator
    pub blocking: BlockingStrategy,
    pub learning: LearningConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: SimilarityWeights::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            prefix_length: DEFAULT_PREFIX_LENGTH,
            min_length: DEFAULT_PREFIX_LENGTH,
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            blocking: BlockingStrategy::default(),
            learning: LearningConfig::default(),
        }
    }
}

impl EngineConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SimilarityError::io(path, e))?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[must_use]
    pub fn with_weights(mut self, weights: SimilarityWeights) -> Self {
        self.weights = weights;
        self
    }

    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency;
        self
    }

    #[must_use]
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix_length: usize, min_length: usize) -> Self {
        self.prefix_length = prefix_length;
        self.min_length = min_length;
        self
    }

    #[must_use]
    pub fn with_duplicate_threshold(mut self, threshold: f64) -> Self {
        self.duplicate_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_blocking(mut self, blocking: BlockingStrategy) -> Self {
        self.blocking = blocking;
        self
    }

    #[must_use]
    pub fn with_learning(mut self, learning: LearningConfig) -> Self {
        self.learning = learning;
        self
    }

    /// Check every field. The first offending field is reported.
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        check_threshold("duplicate_threshold", self.duplicate_threshold)?;
        positive("cache_capacity", self.cache_capacity)?;
        positive("batch_concurrency", self.batch_concurrency)?;
        positive("max_batch_size", self.max_batch_size)?;
        positive("prefix_length", self.prefix_length)?;
        positive("learning.iterations", self.learning.iterations)?;
        if self.min_length != 0 && self.min_length < self.prefix_length {
            return Err(SimilarityError::invalid_input(
                None,
                "min_length",
                format!("must be 0 or at least prefix_length ({})", self.prefix_length),
            ));
        }
        let rate = self.learning.learning_rate;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(SimilarityError::invalid_input(
                None,
                "learning.learning_rate",
                format!("must be a positive number, got {rate}"),
            ));
        }
        if self.learning.folds < 2 {
            return Err(SimilarityError::invalid_input(
                None,
                "learning.folds",
                format!("at least 2 folds are needed, got {}", self.learning.folds),
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Factories
    // ========================================================================

    pub fn build_cache(&self, logger: &Logger) -> Result<HybridCache> {
        self.validate()?;
        Ok(
            HybridCache::with_concurrency(self.weights, self.cache_capacity, self.batch_concurrency)?
                .with_max_batch_size(self.max_batch_size)
                .with_logger(logger.clone()),
        )
    }

    pub fn build_prefix_index(&self) -> Result<PrefixIndex> {
        self.validate()?;
        Ok(PrefixIndex::new(self.prefix_length, self.min_length))
    }

    /// A deduplicator with its own cache.
    pub fn build_deduplicator(&self, logger: &Logger) -> Result<Deduplicator> {
        let cache = Arc::new(self.build_cache(logger)?);
        self.build_deduplicator_with(cache, logger)
    }

    /// A deduplicator sharing `cache` with other callers.
    pub fn build_deduplicator_with(&self, cache: Arc<HybridCache>, logger: &Logger) -> Result<Deduplicator> {
        self.validate()?;
        Deduplicator::new(cache)
            .with_prefix(self.prefix_length, self.min_length)
            .with_strategy(self.blocking)
            .with_logger(logger.clone())
            .with_threshold(self.duplicate_threshold)
    }

    #[must_use]
    pub fn build_learner(&self, logger: &Logger) -> SimilarityLearner {
        SimilarityLearner::new().with_logger(logger.clone())
    }

    /// Run weight optimization with the configured parameters.
    pub fn train(&self, learner: &SimilarityLearner) -> Result<SimilarityWeights> {
        learner.optimize_weights(self.learning.iterations, self.learning.learning_rate)
    }
}

fn positive(field: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(SimilarityError::invalid_input(None, field, "must be greater than 0"));
    }
    Ok(())
}
