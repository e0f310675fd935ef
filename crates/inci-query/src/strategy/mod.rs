//! Strategy executors.
//!
//! Each retrieval strategy implements the same execute contract and runs as
//! an independent failure domain: an executor error degrades that strategy
//! to an empty result list, never the whole search.

mod exact;
mod fuzzy;
mod metadata;
mod semantic;

pub use exact::ExactMatchExecutor;
pub use fuzzy::FuzzyMatchExecutor;
pub use metadata::MetadataFilterExecutor;
pub use semantic::SemanticVectorExecutor;

use async_trait::async_trait;

use inci_core::{Candidate, QueryClassification, Result, SearchOptions, SourceRecord, Strategy};

/// Common contract all strategies satisfy.
#[async_trait]
pub trait StrategyExecutor: Send + Sync {
    /// Which strategy this executor implements.
    fn strategy(&self) -> Strategy;

    /// Run the strategy for a classified query.
    async fn execute(
        &self,
        classification: &QueryClassification,
        options: &SearchOptions,
    ) -> Result<Vec<Candidate>>;
}

/// How many records a strategy fetches before scoring (more than top_k so
/// merging has material to work with).
pub(crate) fn fetch_limit(options: &SearchOptions) -> usize {
    (options.top_k * 2).max(20)
}

/// Build a candidate from a record hit.
pub(crate) fn candidate_from_record(
    record: &SourceRecord,
    score: f32,
    strategy: Strategy,
) -> Candidate {
    let mut parts = vec![record.code.clone()];
    for value in [
        record.trade_name.as_deref(),
        record.inci_name.as_deref(),
        record.category.as_deref(),
        record.function.as_deref(),
    ]
    .into_iter()
    .flatten()
    {
        parts.push(value.to_string());
    }
    if let Some(benefits) = record.benefits.as_deref() {
        let excerpt: String = benefits.chars().take(200).collect();
        parts.push(excerpt);
    }

    let mut candidate = Candidate::new(&record.code, &parts.join(" | "), score, strategy);

    candidate.metadata = record.extra.clone();
    candidate
        .metadata
        .insert("code".to_string(), serde_json::json!(record.code));
    for (key, value) in [
        ("trade_name", record.trade_name.as_deref()),
        ("inci_name", record.inci_name.as_deref()),
        ("category", record.category.as_deref()),
        ("supplier", record.supplier.as_deref()),
        ("source", record.source.as_deref()),
    ] {
        if let Some(value) = value {
            candidate
                .metadata
                .insert(key.to_string(), serde_json::json!(value));
        }
    }

    candidate
}
