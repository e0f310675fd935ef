//! Metadata-filter strategy.
//!
//! Applies structured filters (code list, category, provenance tag) through
//! the record store's native predicate. Matches score a flat 0.8; the final
//! ranker applies the metadata penalty to reflect lower specificity than
//! true relevance scoring.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use inci_core::{
    Candidate, QueryClassification, RecordFilter, RecordStore, Result, SearchOptions, Strategy,
};

use super::{candidate_from_record, fetch_limit, StrategyExecutor};

/// Flat score for a structured-filter match.
const METADATA_SCORE: f32 = 0.8;

pub struct MetadataFilterExecutor {
    store: Arc<dyn RecordStore>,
}

impl MetadataFilterExecutor {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StrategyExecutor for MetadataFilterExecutor {
    fn strategy(&self) -> Strategy {
        Strategy::Metadata
    }

    async fn execute(
        &self,
        classification: &QueryClassification,
        options: &SearchOptions,
    ) -> Result<Vec<Candidate>> {
        let filter = RecordFilter {
            codes: classification.entities.codes.clone(),
            category: options.category.clone(),
            source_tag: options.source_tag.clone(),
            ..Default::default()
        };

        // No structured signal at all: nothing to filter on.
        if filter.codes.is_empty() && filter.category.is_none() && filter.source_tag.is_none() {
            return Ok(Vec::new());
        }

        let records = self.store.find(&filter, fetch_limit(options)).await?;
        debug!(count = records.len(), "metadata filter hits");

        Ok(records
            .iter()
            .map(|record| candidate_from_record(record, METADATA_SCORE, Strategy::Metadata))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inci_core::QueryClassification;

    struct PanicStore;

    #[async_trait]
    impl RecordStore for PanicStore {
        async fn upsert_record(&self, _record: inci_core::SourceRecord) -> Result<()> {
            unreachable!()
        }
        async fn get_record(&self, _code: &str) -> Result<Option<inci_core::SourceRecord>> {
            unreachable!()
        }
        async fn find(
            &self,
            _filter: &RecordFilter,
            _limit: usize,
        ) -> Result<Vec<inci_core::SourceRecord>> {
            panic!("find must not be called without a structured signal");
        }
        async fn count_records(&self) -> Result<u64> {
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_no_structured_signal_is_a_noop() {
        let executor = MetadataFilterExecutor::new(Arc::new(PanicStore));
        let classification = QueryClassification::fallback("free text only");
        let options = SearchOptions::default();

        let candidates = executor.execute(&classification, &options).await.unwrap();
        assert!(candidates.is_empty());
    }
}
