//! Memoized hybrid similarity.
//!
//! [`HybridCache`] stores the combined score of every pair it has computed,
//! keyed symmetrically so `(a, b)` and `(b, a)` share one entry. The map is
//! bounded: when it reaches capacity, about a fifth of the entries are dropped
//! in one go. There is no LRU order, only the ceiling is guaranteed.
//!
//! # Concurrency
//!
//! - Lookups acquire a shared read lock
//! - Inserts, eviction and invalidation acquire an exclusive write lock
//! - Scores are computed outside the lock
//! - Batches run on a dedicated rayon pool sized at construction

use ahash::AHashMap;
use parking_lot::RwLock;
use rayon::prelude::*;

use crate::algorithms::normalize::prepare;
use crate::error::{Result, SimilarityError};
use crate::evaluation::SimilarityPair;
use crate::hybrid::{combine, SimilarityWeights};
use crate::logging::Logger;

pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;
pub const DEFAULT_BATCH_CONCURRENCY: usize = 10;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1000;

/// Joins the two prepared strings of a key.
pub const KEY_SEPARATOR: char = '\u{1F}';

/// Share of entries dropped when the cache is full.
const EVICTION_FRACTION: f64 = 0.2;

/// Order-independent key of a pair.
#[must_use]
pub fn cache_key(a: &str, b: &str) -> String {
    let a = prepare(a);
    let b = prepare(b);
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let mut key = String::with_capacity(first.len() + second.len() + 1);
    key.push_str(&first);
    key.push(KEY_SEPARATOR);
    key.push_str(&second);
    key
}

#[derive(Debug)]
struct CacheState {
    entries: AHashMap<String, f64>,
    weights: SimilarityWeights,
}

/// Bounded, thread-safe cache of hybrid scores.
pub struct HybridCache {
    state: RwLock<CacheState>,
    capacity: usize,
    max_batch_size: usize,
    concurrency: usize,
    /// `None` when the dedicated pool could not be built; batches then run on
    /// the global rayon pool
    pool: Option<rayon::ThreadPool>,
    logger: Logger,
}

impl HybridCache {
    /// Cache with the default batch concurrency. A `capacity` of 0 means
    /// [`DEFAULT_CACHE_CAPACITY`].
    pub fn new(weights: SimilarityWeights, capacity: usize) -> Result<Self> {
        Self::with_concurrency(weights, capacity, DEFAULT_BATCH_CONCURRENCY)
    }

    /// Cache whose batch pool runs `concurrency` workers (0 means the default).
    pub fn with_concurrency(weights: SimilarityWeights, capacity: usize, concurrency: usize) -> Result<Self> {
        weights.validate()?;
        let capacity = if capacity == 0 { DEFAULT_CACHE_CAPACITY } else { capacity };
        let concurrency = if concurrency == 0 {
            DEFAULT_BATCH_CONCURRENCY
        } else {
            concurrency
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|i| format!("hybrid-cache-{i}"))
            .build()
            .ok();

        Ok(Self {
            state: RwLock::new(CacheState {
                entries: AHashMap::with_capacity(capacity.min(1024)),
                weights,
            }),
            capacity,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            concurrency,
            pool,
            logger: Logger::disabled(),
        })
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger.component("cache");
        if self.pool.is_none() {
            let concurrency = self.concurrency;
            self.logger.emit(|| {
                tracing::warn!(concurrency, "batch pool unavailable, using the global rayon pool");
            });
        }
        self
    }

    /// Largest batch [`batch_similarity`](Self::batch_similarity) accepts.
    #[must_use]
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size.max(1);
        self
    }

    /// Hybrid score of a pair, computed at most once per key and weight set.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let key = cache_key(a, b);
        let weights = {
            let state = self.state.read();
            if let Some(&score) = state.entries.get(&key) {
                return score;
            }
            state.weights
        };

        let score = combine(a, b, &weights);

        let mut state = self.state.write();
        // weights replaced while computing: the score is stale, do not keep it
        if state.weights != weights {
            return score;
        }
        if !state.entries.contains_key(&key) && state.entries.len() >= self.capacity {
            self.evict(&mut state);
        }
        state.entries.insert(key, score);
        score
    }

    /// Score every pair on the batch pool. Results keep input order.
    pub fn batch_similarity(&self, pairs: &[SimilarityPair]) -> Result<Vec<f64>> {
        if pairs.is_empty() {
            return Err(SimilarityError::EmptyDataset {
                operation: "batch_similarity",
            });
        }
        if pairs.len() > self.max_batch_size {
            return Err(SimilarityError::invalid_input(
                None,
                "pairs",
                format!("batch of {} exceeds the limit of {}", pairs.len(), self.max_batch_size),
            ));
        }

        let score_all = || {
            pairs
                .par_iter()
                .map(|p| self.similarity(&p.s1, &p.s2))
                .collect::<Vec<f64>>()
        };
        Ok(match &self.pool {
            Some(pool) => pool.install(score_all),
            None => score_all(),
        })
    }

    /// Replace the weights and drop every cached score.
    pub fn set_weights(&self, weights: SimilarityWeights) -> Result<()> {
        weights.validate()?;
        let dropped = {
            let mut state = self.state.write();
            let dropped = state.entries.len();
            state.weights = weights;
            state.entries.clear();
            dropped
        };
        self.logger.emit(|| {
            tracing::info!(dropped, ?weights, "weights replaced, cache invalidated");
        });
        Ok(())
    }

    #[must_use]
    pub fn weights(&self) -> SimilarityWeights {
        self.state.read().weights
    }

    /// Whether a score for the pair is cached.
    #[must_use]
    pub fn contains(&self, a: &str, b: &str) -> bool {
        self.state.read().entries.contains_key(&cache_key(a, b))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.state.write().entries.clear();
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    fn evict(&self, state: &mut CacheState) {
        let target = ((state.entries.len() as f64 * EVICTION_FRACTION).ceil() as usize).max(1);
        let victims: Vec<String> = state.entries.keys().take(target).cloned().collect();
        for key in &victims {
            state.entries.remove(key);
        }
        let evicted = victims.len();
        let remaining = state.entries.len();
        self.logger.emit(|| {
            tracing::debug!(evicted, remaining, "cache full, evicted entries");
        });
    }
}

impl std::fmt::Debug for HybridCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hybrid::WeightSlot;

    fn cache(capacity: usize) -> HybridCache {
        HybridCache::new(SimilarityWeights::default(), capacity).unwrap()
    }

    #[test]
    fn test_key_is_symmetric_and_prepared() {
        assert_eq!(cache_key("Б", "а"), cache_key(" а ", "б"));
        assert_eq!(cache_key("a", "b"), format!("a{KEY_SEPARATOR}b"));
    }

    #[test]
    fn test_symmetric_and_repeatable() {
        let c = cache(100);
        let ab = c.similarity("масло сливочное", "масло подсолнечное");
        let ba = c.similarity("масло подсолнечное", "масло сливочное");
        assert_eq!(ab.to_bits(), ba.to_bits());
        assert_eq!(c.len(), 1);
        let again = c.similarity("масло сливочное", "масло подсолнечное");
        assert_eq!(ab.to_bits(), again.to_bits());
    }

    #[test]
    fn test_matches_uncached_combine() {
        let c = cache(100);
        let w = SimilarityWeights::default();
        let (a, b) = ("Кабель ВВГнг 3x2.5", "Провод ПВС 3x2.5");
        assert_eq!(c.similarity(a, b).to_bits(), combine(a, b, &w).to_bits());
    }

    #[test]
    fn test_capacity_is_a_ceiling() {
        let c = cache(10);
        for i in 0..50 {
            c.similarity(&format!("товар {i}"), "товар");
            assert!(c.len() <= 10, "len {} at {i}", c.len());
        }
    }

    #[test]
    fn test_eviction_drops_a_fifth() {
        let c = cache(10);
        for i in 0..10 {
            c.similarity(&format!("товар {i}"), "товар");
        }
        assert_eq!(c.len(), 10);
        c.similarity("новый", "товар");
        // 2 evicted, 1 inserted
        assert_eq!(c.len(), 9);
    }

    #[test]
    fn test_set_weights_invalidates() {
        let c = cache(100);
        c.similarity("кабель", "кабели");
        assert!(c.contains("кабели", "кабель"));
        let w = SimilarityWeights::zero().with(WeightSlot::Lcs, 1.0);
        c.set_weights(w).unwrap();
        assert_eq!(c.len(), 0);
        assert_eq!(c.weights(), w);
        assert!(c.set_weights(SimilarityWeights::zero()).is_err());
        assert_eq!(c.weights(), w);
    }

    #[test]
    fn test_rejects_invalid_weights() {
        let w = SimilarityWeights::default().with(WeightSlot::Phonetic, -1.0);
        assert!(HybridCache::new(w, 10).is_err());
    }

    #[test]
    fn test_batch_keeps_order() {
        let c = HybridCache::with_concurrency(SimilarityWeights::default(), 100, 4).unwrap();
        let pairs = vec![
            SimilarityPair::new("кабель", "кабель"),
            SimilarityPair::new("кабель", "провод"),
            SimilarityPair::new("ООО Рога и Копыта", "Рога и Копыта ООО"),
        ];
        let scores = c.batch_similarity(&pairs).unwrap();
        assert_eq!(scores.len(), 3);
        for (pair, score) in pairs.iter().zip(&scores) {
            assert_eq!(score.to_bits(), c.similarity(&pair.s1, &pair.s2).to_bits());
        }
        assert!((scores[0] - 1.0).abs() < 1e-9);
        assert!(scores[1] < scores[2]);
    }

    #[test]
    fn test_batch_limits() {
        let c = cache(100).with_max_batch_size(2);
        let err = c.batch_similarity(&[]).unwrap_err();
        assert!(matches!(err, SimilarityError::EmptyDataset { .. }));
        let pairs = vec![SimilarityPair::new("a", "b"); 3];
        let err = c.batch_similarity(&pairs).unwrap_err();
        assert!(matches!(err, SimilarityError::InvalidInput { field: "pairs", .. }));
    }

    #[test]
    fn test_concurrent_access() {
        let c = cache(50);
        std::thread::scope(|s| {
            for t in 0..4 {
                let c = &c;
                s.spawn(move || {
                    for i in 0..100 {
                        c.similarity(&format!("поток {t} {i}"), "поток");
                    }
                });
            }
        });
        assert!(c.len() <= 50);
    }

    #[test]
    fn test_logs_invalidation() {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        let logger = Logger::new(tracing::Dispatch::new(subscriber));
        let c = cache(10).with_logger(logger);
        c.similarity("a", "b");
        c.set_weights(SimilarityWeights::default()).unwrap();
        assert!(c.is_empty());
    }
}
