//! Per-request search options.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::types::{Strategy, UserPreferences};

/// Multiplicative boost applied to a strategy's raw scores before merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyBoosts {
    #[serde(default = "default_boost")]
    pub exact: f32,
    #[serde(default = "default_boost")]
    pub metadata: f32,
    #[serde(default = "default_boost")]
    pub fuzzy: f32,
    #[serde(default = "default_boost")]
    pub semantic: f32,
}

impl Default for StrategyBoosts {
    fn default() -> Self {
        Self {
            exact: 1.0,
            metadata: 1.0,
            fuzzy: 1.0,
            semantic: 1.0,
        }
    }
}

impl StrategyBoosts {
    /// Boost for a given strategy.
    pub fn for_strategy(&self, strategy: Strategy) -> f32 {
        match strategy {
            Strategy::Exact => self.exact,
            Strategy::Metadata => self.metadata,
            Strategy::Fuzzy => self.fuzzy,
            Strategy::Semantic => self.semantic,
        }
    }
}

/// Caller configuration for one search request. All fields have defaults;
/// invalid combinations fail fast with a configuration error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Maximum results to return.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum final score a result must reach.
    #[serde(default = "default_threshold")]
    pub score_threshold: f32,

    /// Enable the exact-match strategy.
    #[serde(default = "default_true")]
    pub enable_exact: bool,

    /// Enable the metadata-filter strategy.
    #[serde(default = "default_true")]
    pub enable_metadata: bool,

    /// Enable the fuzzy-match strategy.
    #[serde(default = "default_true")]
    pub enable_fuzzy: bool,

    /// Enable the semantic-vector strategy.
    #[serde(default = "default_true")]
    pub enable_semantic: bool,

    /// Per-strategy score boosts.
    #[serde(default)]
    pub boosts: StrategyBoosts,

    /// Fuzzy acceptance threshold.
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f32,

    /// Final-ranking weight for semantic-tagged results.
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Final-ranking weight for keyword (exact) tagged results.
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// Run the second-pass reranker.
    #[serde(default = "default_true")]
    pub rerank: bool,

    /// Skip remaining strategies when an exact match scores >= 0.95.
    /// Latency optimization; a higher-scoring semantic hit can be shadowed.
    #[serde(default = "default_true")]
    pub exact_short_circuit: bool,

    /// Restrict matches to a category.
    #[serde(default)]
    pub category: Option<String>,

    /// Restrict metadata filtering to a provenance tag.
    #[serde(default)]
    pub source_tag: Option<String>,

    /// Requesting user id.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Exclude records authored by this user from semantic results.
    #[serde(default)]
    pub exclude_user: Option<String>,

    /// User preference signals for personalization.
    #[serde(default)]
    pub preferences: Option<UserPreferences>,

    /// Overall timeout budget in milliseconds. Strategies still in flight
    /// at the deadline are abandoned; completed ones are merged.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            score_threshold: default_threshold(),
            enable_exact: true,
            enable_metadata: true,
            enable_fuzzy: true,
            enable_semantic: true,
            boosts: StrategyBoosts::default(),
            fuzzy_threshold: default_fuzzy_threshold(),
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            rerank: true,
            exact_short_circuit: true,
            category: None,
            source_tag: None,
            user_id: None,
            exclude_user: None,
            preferences: None,
            timeout_ms: None,
        }
    }
}

impl SearchOptions {
    /// Strategies enabled by these options, in rank-priority order.
    pub fn enabled_strategies(&self) -> Vec<Strategy> {
        let mut enabled = Vec::new();
        if self.enable_exact {
            enabled.push(Strategy::Exact);
        }
        if self.enable_metadata {
            enabled.push(Strategy::Metadata);
        }
        if self.enable_fuzzy {
            enabled.push(Strategy::Fuzzy);
        }
        if self.enable_semantic {
            enabled.push(Strategy::Semantic);
        }
        enabled
    }

    /// Validate the options. Called before any backend work.
    pub fn validate(&self) -> Result<()> {
        if self.enabled_strategies().is_empty() {
            return Err(EngineError::config("all search strategies are disabled"));
        }
        if self.top_k == 0 {
            return Err(EngineError::config("top_k must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(EngineError::config(format!(
                "score_threshold must be in [0, 1], got {}",
                self.score_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(EngineError::config(format!(
                "fuzzy_threshold must be in [0, 1], got {}",
                self.fuzzy_threshold
            )));
        }
        if self.semantic_weight <= 0.0 || self.keyword_weight <= 0.0 {
            return Err(EngineError::config(
                "semantic_weight and keyword_weight must be positive",
            ));
        }
        for (name, boost) in [
            ("exact", self.boosts.exact),
            ("metadata", self.boosts.metadata),
            ("fuzzy", self.boosts.fuzzy),
            ("semantic", self.boosts.semantic),
        ] {
            if boost < 0.0 {
                return Err(EngineError::config(format!(
                    "{} boost must be non-negative, got {}",
                    name, boost
                )));
            }
        }
        Ok(())
    }
}

// Default value functions

fn default_true() -> bool {
    true
}

fn default_boost() -> f32 {
    1.0
}

fn default_top_k() -> usize {
    10
}

fn default_threshold() -> f32 {
    0.3
}

fn default_fuzzy_threshold() -> f32 {
    0.6
}

fn default_semantic_weight() -> f32 {
    0.6
}

fn default_keyword_weight() -> f32 {
    0.4
}
