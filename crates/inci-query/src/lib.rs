//! inci-query - Hybrid search and ranking engine
//!
//! Runs four independent retrieval strategies (exact, metadata, fuzzy,
//! semantic) concurrently over injected backends, then merges, reranks,
//! personalizes, ranks and filters into one ordered result list.
//!
//! # Example
//!
//! ```rust,ignore
//! use inci_query::SearchEngine;
//! use inci_core::{SearchConfig, SearchOptions};
//! use std::sync::Arc;
//!
//! let engine = SearchEngine::new(records, vectors, embedder, SearchConfig::default())?;
//! let outcome = engine.search("RM000001", &SearchOptions::default()).await?;
//! ```

mod classify;
mod engine;
mod merge;
mod personalize;
mod rank;
mod rerank;
mod strategy;

pub use classify::QueryClassifier;
pub use engine::{format_outcome, SearchEngine};
pub use merge::merge_candidates;
pub use personalize::apply_preferences;
pub use rank::{filter_results, final_rank, FilterOutcome, METADATA_PENALTY};
pub use rerank::{apply_rerank, TermOverlapScorer};
pub use strategy::{
    ExactMatchExecutor, FuzzyMatchExecutor, MetadataFilterExecutor, SemanticVectorExecutor,
    StrategyExecutor,
};

// Re-export for convenience
pub use inci_core::{Candidate, SearchOptions, SearchOutcome};
