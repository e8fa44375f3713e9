//! Per-dictionary matching rules.
//!
//! A [`RuleSet`] is registered for one reference dictionary and holds weighted
//! field-level rules. [`RuleEngine::match_records`] applies the enabled rules
//! of the set registered for a dictionary and folds the scores of the rules
//! that pass their own threshold into one weighted mean. Dictionaries without
//! an enabled set fall back to a combined comparison of the `name` field.

use std::collections::HashMap;
use std::hash::BuildHasher;

use ahash::AHashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::algorithms::normalize::prepare;
use crate::algorithms::numeric::clamp_unit;
use crate::algorithms::{
    damerau_levenshtein_similarity, frequency_cosine_similarity, jaccard_index, levenshtein_similarity,
    ngram_similarity, NgramSize, PhoneticMatcher,
};
use crate::error::{Result, SimilarityError};
use crate::evaluation::check_threshold;
use crate::logging::Logger;

/// Duplicate threshold of the fallback comparison.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.85;
/// Default [`RuleSet::acceptance_threshold`].
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f64 = 0.70;

/// Blend of set, term-frequency and edit-distance similarity.
///
/// `0.2·jaccard_index + 0.3·frequency cosine + 0.3·levenshtein + 0.2·damerau`,
/// or 1.0 when both strings prepare to the same text.
#[must_use]
pub fn combined_similarity(a: &str, b: &str) -> f64 {
    if prepare(a) == prepare(b) {
        return 1.0;
    }
    clamp_unit(
        0.2 * jaccard_index(a, b)
            + 0.3 * frequency_cosine_similarity(a, b)
            + 0.3 * levenshtein_similarity(a, b)
            + 0.2 * damerau_levenshtein_similarity(a, b),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAlgorithm {
    /// Equality of the prepared values
    Exact,
    /// Levenshtein similarity
    #[default]
    Fuzzy,
    /// Token-wise Russian phonetic similarity
    Phonetic,
    /// Padded n-gram frequency overlap
    Ngram,
    /// [`combined_similarity`]
    Combined,
}

impl RuleAlgorithm {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            RuleAlgorithm::Exact => "exact",
            RuleAlgorithm::Fuzzy => "fuzzy",
            RuleAlgorithm::Phonetic => "phonetic",
            RuleAlgorithm::Ngram => "ngram",
            RuleAlgorithm::Combined => "combined",
        }
    }
}

/// Algorithm-specific rule settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleOptions {
    /// Gram length for [`RuleAlgorithm::Ngram`]
    pub ngram_size: NgramSize,
}

fn enabled() -> bool {
    true
}

fn default_acceptance() -> f64 {
    DEFAULT_ACCEPTANCE_THRESHOLD
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Record fields joined with a space before comparison
    pub fields: Vec<String>,
    #[serde(default)]
    pub algorithm: RuleAlgorithm,
    pub threshold: f64,
    pub weight: f64,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub options: RuleOptions,
}

impl MatchingRule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        fields: &[&str],
        algorithm: RuleAlgorithm,
        threshold: f64,
        weight: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            algorithm,
            threshold,
            weight,
            enabled: true,
            options: RuleOptions::default(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_ngram_size(mut self, size: NgramSize) -> Self {
        self.options.ngram_size = size;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Score two prepared values and describe the outcome.
    fn apply(&self, a: &str, b: &str, phonetic: &PhoneticMatcher) -> (f64, String) {
        let name = &self.name;
        match self.algorithm {
            RuleAlgorithm::Exact if a == b => (1.0, format!("{name}: exact match")),
            RuleAlgorithm::Exact => (0.0, format!("{name}: no exact match")),
            RuleAlgorithm::Fuzzy => {
                let s = levenshtein_similarity(a, b);
                (s, format!("{name}: fuzzy similarity {s:.2}"))
            }
            RuleAlgorithm::Phonetic => {
                let s = phonetic.similarity(a, b);
                (s, format!("{name}: phonetic similarity {s:.2}"))
            }
            RuleAlgorithm::Ngram => {
                let s = ngram_similarity(a, b, self.options.ngram_size);
                (s, format!("{name}: ngram similarity {s:.2}"))
            }
            RuleAlgorithm::Combined => {
                let s = combined_similarity(a, b);
                (s, format!("{name}: combined similarity {s:.2}"))
            }
        }
    }

    fn validate(&self, index: usize) -> Result<()> {
        if self.fields.is_empty() {
            return Err(SimilarityError::invalid_input(
                Some(index),
                "fields",
                format!("rule `{}` names no fields", self.id),
            ));
        }
        check_threshold("rule.threshold", self.threshold)?;
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(SimilarityError::invalid_input(
                Some(index),
                "weight",
                format!("rule `{}` weight must be finite and non-negative, got {}", self.id, self.weight),
            ));
        }
        Ok(())
    }
}

/// Rules for one reference dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub id: String,
    pub name: String,
    pub reference_id: String,
    pub rules: Vec<MatchingRule>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "enabled")]
    pub enabled: bool,
    /// Weighted score at or above which a pair is a duplicate
    #[serde(default = "default_acceptance")]
    pub acceptance_threshold: f64,
}

impl RuleSet {
    pub fn new(id: impl Into<String>, name: impl Into<String>, reference_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            reference_id: reference_id.into(),
            rules: Vec::new(),
            priority: 0,
            enabled: true,
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_rule(mut self, rule: MatchingRule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_acceptance_threshold(mut self, threshold: f64) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    /// General-purpose rules: exact code, fuzzy name, combined name and category.
    pub fn default_for(reference_id: &str, name: impl Into<String>) -> Self {
        Self::new(format!("default_{reference_id}"), name, reference_id)
            .with_priority(1)
            .with_rule(exact_code_rule())
            .with_rule(
                MatchingRule::new("fuzzy_name", "Fuzzy name", &["name"], RuleAlgorithm::Fuzzy, 0.85, 0.8)
                    .with_description("Levenshtein similarity of the name field"),
            )
            .with_rule(
                MatchingRule::new(
                    "combined_fields",
                    "Combined fields",
                    &["name", "category"],
                    RuleAlgorithm::Combined,
                    0.80,
                    0.6,
                )
                .with_description("Combined similarity of name and category"),
            )
    }

    /// Rules for product nomenclature: exact code, n-gram normalized name, phonetic name.
    pub fn nomenclature(reference_id: &str) -> Self {
        Self::new(format!("nomenclature_{reference_id}"), "Nomenclature rules", reference_id)
            .with_priority(2)
            .with_rule(exact_code_rule())
            .with_rule(
                MatchingRule::new(
                    "normalized_name",
                    "Normalized name",
                    &["normalized_name"],
                    RuleAlgorithm::Ngram,
                    0.90,
                    0.9,
                )
                .with_description("Bigram overlap of normalized names"),
            )
            .with_rule(
                MatchingRule::new("phonetic_name", "Phonetic name", &["name"], RuleAlgorithm::Phonetic, 0.85, 0.7)
                    .with_description("Phonetic comparison to catch typos"),
            )
    }

    pub fn validate(&self) -> Result<()> {
        if self.reference_id.trim().is_empty() {
            return Err(SimilarityError::invalid_input(None, "reference_id", "empty string"));
        }
        check_threshold("acceptance_threshold", self.acceptance_threshold)?;
        self.rules.iter().enumerate().try_for_each(|(i, rule)| rule.validate(i))
    }
}

fn exact_code_rule() -> MatchingRule {
    MatchingRule::new("exact_code", "Exact code", &["code"], RuleAlgorithm::Exact, 1.0, 1.0)
        .with_description("Exact match of the code field")
}

/// Outcome of comparing two records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleMatch {
    pub score: f64,
    /// Reasons of the rules that fired, joined by `"; "`
    pub reason: String,
    pub is_duplicate: bool,
}

impl RuleMatch {
    fn no_signal() -> Self {
        Self {
            score: 0.0,
            reason: String::new(),
            is_duplicate: false,
        }
    }
}

/// Registry of rule sets keyed by reference dictionary.
#[derive(Debug, Default)]
pub struct RuleEngine {
    sets: RwLock<AHashMap<String, RuleSet>>,
    phonetic: PhoneticMatcher,
    logger: Logger,
}

impl RuleEngine {
    pub fn new(logger: Logger) -> Self {
        Self {
            sets: RwLock::new(AHashMap::new()),
            phonetic: PhoneticMatcher::new(),
            logger: logger.component("rules"),
        }
    }

    /// Validate and register `set`, replacing any set for the same dictionary.
    pub fn register_rule_set(&self, set: RuleSet) -> Result<()> {
        set.validate()?;
        let reference_id = set.reference_id.clone();
        let rules = set.rules.len();
        let replaced = self.sets.write().insert(reference_id.clone(), set).is_some();
        self.logger.emit(|| {
            tracing::info!(reference_id = %reference_id, rules, replaced, "rule set registered");
        });
        Ok(())
    }

    pub fn rule_set(&self, reference_id: &str) -> Option<RuleSet> {
        self.sets.read().get(reference_id).cloned()
    }

    pub fn remove_rule_set(&self, reference_id: &str) -> Option<RuleSet> {
        self.sets.write().remove(reference_id)
    }

    pub fn len(&self) -> usize {
        self.sets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compare two records under the rules registered for `reference_id`.
    pub fn match_records<S: BuildHasher>(
        &self,
        record1: &HashMap<String, String, S>,
        record2: &HashMap<String, String, S>,
        reference_id: &str,
    ) -> RuleMatch {
        let sets = self.sets.read();
        let set = match sets.get(reference_id) {
            Some(set) if set.enabled => set,
            _ => return self.default_match(record1, record2, reference_id),
        };

        let mut total = 0.0;
        let mut weight_sum = 0.0;
        let mut reasons = Vec::new();
        for rule in set.rules.iter().filter(|r| r.enabled) {
            let (Some(a), Some(b)) = (field_text(record1, &rule.fields), field_text(record2, &rule.fields)) else {
                continue;
            };
            let (score, reason) = rule.apply(&a, &b, &self.phonetic);
            if score >= rule.threshold {
                total += score * rule.weight;
                weight_sum += rule.weight;
                reasons.push(reason);
            }
        }

        if weight_sum == 0.0 {
            return RuleMatch::no_signal();
        }
        let score = total / weight_sum;
        RuleMatch {
            score,
            reason: reasons.join("; "),
            is_duplicate: score >= set.acceptance_threshold,
        }
    }

    fn default_match<S: BuildHasher>(
        &self,
        record1: &HashMap<String, String, S>,
        record2: &HashMap<String, String, S>,
        reference_id: &str,
    ) -> RuleMatch {
        self.logger.emit(|| {
            tracing::debug!(reference_id, "no enabled rule set, using default match");
        });
        let (Some(a), Some(b)) = (name_of(record1), name_of(record2)) else {
            return RuleMatch {
                score: 0.0,
                reason: "missing name field".to_string(),
                is_duplicate: false,
            };
        };
        let score = combined_similarity(&a, &b);
        RuleMatch {
            score,
            reason: format!("default: combined similarity {score:.2}"),
            is_duplicate: score >= DEFAULT_MATCH_THRESHOLD,
        }
    }
}

/// Prepared non-empty values of `fields`, joined by a space.
fn field_text<S: BuildHasher>(record: &HashMap<String, String, S>, fields: &[String]) -> Option<String> {
    let values: Vec<String> = fields
        .iter()
        .filter_map(|f| record.get(f))
        .map(|v| prepare(v))
        .filter(|v| !v.is_empty())
        .collect();
    (!values.is_empty()).then(|| values.join(" "))
}

fn name_of<S: BuildHasher>(record: &HashMap<String, String, S>) -> Option<String> {
    record.get("name").map(|v| prepare(v)).filter(|v| !v.is_empty())
}
