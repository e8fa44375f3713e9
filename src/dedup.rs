//! Duplicate grouping
//!
//! [`Deduplicator::find_duplicates`] blocks records with a [`PrefixIndex`],
//! scores the surviving candidate pairs through a shared [`HybridCache`] and
//! merges every pair at or above the threshold with union-find, so groups are
//! transitive: if a~b and b~c then a, b and c share a group.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cache::HybridCache;
use crate::error::Result;
use crate::evaluation::{check_threshold, normalize_pair};
use crate::hybrid::DEFAULT_DUPLICATE_THRESHOLD;
use crate::indexing::{PrefixIndex, DEFAULT_PREFIX_LENGTH};
use crate::logging::Logger;

/// How candidate pairs are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingStrategy {
    /// Records sharing the exact prefix
    #[default]
    ExactPrefix,
    /// Records whose prefixes agree in at least half of their positions
    FuzzyPrefix,
    /// Every pair (O(N^2)). Full recall, also for records too short to index
    Exhaustive,
}

/// Groups of duplicate records, by input index.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeduplicationResult {
    /// Each group is sorted ascending; groups are ordered by size, largest
    /// first, then by their first index
    pub groups: Vec<Vec<usize>>,
    /// Records without any duplicate, ascending
    pub unique: Vec<usize>,
    /// Records that duplicate another one: Σ (group size - 1)
    pub total_duplicates: usize,
}

impl DeduplicationResult {
    /// Every unordered pair inside a group, smaller index first.
    #[must_use]
    pub fn duplicate_pairs(&self) -> AHashSet<(usize, usize)> {
        let mut pairs = AHashSet::new();
        for group in &self.groups {
            for (k, &a) in group.iter().enumerate() {
                for &b in &group[k + 1..] {
                    pairs.insert(normalize_pair(a, b));
                }
            }
        }
        pairs
    }

    /// Groups with indices replaced by the items they refer to.
    ///
    /// `items` should be the slice that was deduplicated; indices past its
    /// end are skipped.
    #[must_use]
    pub fn resolve<'a, S: AsRef<str>>(&self, items: &'a [S]) -> Vec<Vec<&'a str>> {
        self.groups
            .iter()
            .map(|g| g.iter().filter_map(|&i| items.get(i)).map(|item| item.as_ref()).collect())
            .collect()
    }
}

/// Disjoint sets with path compression and union by rank.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let root_x = self.find(x);
        let root_y = self.find(y);
        if root_x == root_y {
            return;
        }
        match self.rank[root_x].cmp(&self.rank[root_y]) {
            std::cmp::Ordering::Less => self.parent[root_x] = root_y,
            std::cmp::Ordering::Greater => self.parent[root_y] = root_x,
            std::cmp::Ordering::Equal => {
                self.parent[root_y] = root_x;
                self.rank[root_x] += 1;
            }
        }
    }

    /// Members per set, each ascending, in order of their smallest member.
    fn into_sets(mut self) -> Vec<Vec<usize>> {
        let n = self.parent.len();
        let mut by_root: AHashMap<usize, usize> = AHashMap::new();
        let mut sets: Vec<Vec<usize>> = Vec::new();
        for i in 0..n {
            let root = self.find(i);
            let slot = *by_root.entry(root).or_insert_with(|| {
                sets.push(Vec::new());
                sets.len() - 1
            });
            sets[slot].push(i);
        }
        sets
    }
}

/// Groups duplicate records using prefix blocking and cached hybrid scores.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    cache: Arc<HybridCache>,
    prefix_length: usize,
    min_length: usize,
    threshold: f64,
    strategy: BlockingStrategy,
    logger: Logger,
}

impl Deduplicator {
    /// Exact-prefix blocking with 3-char prefixes and the default threshold.
    pub fn new(cache: Arc<HybridCache>) -> Self {
        Self {
            cache,
            prefix_length: DEFAULT_PREFIX_LENGTH,
            min_length: DEFAULT_PREFIX_LENGTH,
            threshold: DEFAULT_DUPLICATE_THRESHOLD,
            strategy: BlockingStrategy::default(),
            logger: Logger::disabled(),
        }
    }

    /// Pairs scoring at or above `threshold` are duplicates.
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        check_threshold("threshold", threshold)?;
        self.threshold = threshold;
        Ok(self)
    }

    /// Prefix geometry of the blocking index (0 means the default).
    #[must_use]
    pub fn with_prefix(mut self, prefix_length: usize, min_length: usize) -> Self {
        self.prefix_length = prefix_length;
        self.min_length = min_length;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: BlockingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger.component("dedup");
        self
    }

    pub fn cache(&self) -> &HybridCache {
        &self.cache
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn strategy(&self) -> BlockingStrategy {
        self.strategy
    }

    /// Group `items` into duplicate clusters.
    pub fn find_duplicates<S: AsRef<str> + Sync>(&self, items: &[S]) -> DeduplicationResult {
        let n = items.len();
        if n < 2 {
            return DeduplicationResult {
                groups: Vec::new(),
                unique: (0..n).collect(),
                total_duplicates: 0,
            };
        }

        let index = PrefixIndex::new(self.prefix_length, self.min_length);
        if self.strategy != BlockingStrategy::Exhaustive {
            index.add_batch(items);
        }

        let candidates = |i: usize| -> Vec<usize> {
            let text = items[i].as_ref();
            let mut found = match self.strategy {
                BlockingStrategy::ExactPrefix => index.candidates_exact(i, text),
                BlockingStrategy::FuzzyPrefix => index.candidates(i, text),
                BlockingStrategy::Exhaustive => return (i + 1..n).collect(),
            };
            found.retain(|&j| j > i);
            found
        };

        let scored: Vec<(usize, Vec<usize>)> = (0..n)
            .into_par_iter()
            .map(|i| {
                let a = items[i].as_ref();
                let cands = candidates(i);
                let compared = cands.len();
                let matches = cands
                    .into_iter()
                    .filter(|&j| self.cache.similarity(a, items[j].as_ref()) >= self.threshold)
                    .collect();
                (compared, matches)
            })
            .collect();

        let mut uf = UnionFind::new(n);
        let mut comparisons = 0;
        for (i, (compared, matches)) in scored.into_iter().enumerate() {
            comparisons += compared;
            for j in matches {
                uf.union(i, j);
            }
        }

        let mut groups = Vec::new();
        let mut unique = Vec::new();
        for set in uf.into_sets() {
            if set.len() > 1 {
                groups.push(set);
            } else {
                unique.extend(set);
            }
        }
        // sets arrive ordered by first index; a stable sort keeps that as the tie-break
        groups.sort_by(|a, b| b.len().cmp(&a.len()));
        let total_duplicates = groups.iter().map(|g| g.len() - 1).sum();

        let group_count = groups.len();
        let strategy = self.strategy;
        self.logger.emit(|| {
            tracing::info!(
                items = n,
                comparisons,
                groups = group_count,
                duplicates = total_duplicates,
                ?strategy,
                "deduplication finished"
            );
        });

        DeduplicationResult {
            groups,
            unique,
            total_duplicates,
        }
    }
}
