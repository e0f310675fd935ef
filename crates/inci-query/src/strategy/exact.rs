//! Exact-match strategy.
//!
//! OR-queries the extracted codes and names against the indexed identity
//! fields, falling back to the raw query string when classification found
//! no entities.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use inci_core::{
    Candidate, QueryClassification, RecordFilter, RecordStore, Result, SearchOptions,
    SourceRecord, Strategy,
};

use super::{candidate_from_record, fetch_limit, StrategyExecutor};

/// Score for an exact code match.
const CODE_SCORE: f32 = 1.0;
/// Score for trade-name containment.
const TRADE_NAME_SCORE: f32 = 0.95;
/// Score for INCI-name containment.
const INCI_SCORE: f32 = 0.9;
/// Base score for any other filter hit.
const BASE_SCORE: f32 = 0.8;

pub struct ExactMatchExecutor {
    store: Arc<dyn RecordStore>,
}

impl ExactMatchExecutor {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    fn score_record(
        record: &SourceRecord,
        classification: &QueryClassification,
        probes: &[String],
    ) -> f32 {
        if classification
            .entities
            .codes
            .iter()
            .any(|c| record.code.eq_ignore_ascii_case(c))
        {
            return CODE_SCORE;
        }
        if probes.iter().any(|p| record.code.eq_ignore_ascii_case(p)) {
            return CODE_SCORE;
        }

        let contains = |field: Option<&str>| {
            field
                .map(|f| {
                    let f = f.to_lowercase();
                    probes.iter().any(|p| f.contains(&p.to_lowercase()))
                })
                .unwrap_or(false)
        };

        if contains(record.trade_name.as_deref()) {
            return TRADE_NAME_SCORE;
        }
        if contains(record.inci_name.as_deref()) {
            return INCI_SCORE;
        }

        BASE_SCORE
    }
}

#[async_trait]
impl StrategyExecutor for ExactMatchExecutor {
    fn strategy(&self) -> Strategy {
        Strategy::Exact
    }

    async fn execute(
        &self,
        classification: &QueryClassification,
        options: &SearchOptions,
    ) -> Result<Vec<Candidate>> {
        let entities = &classification.entities;

        let mut filter = RecordFilter {
            category: options.category.clone(),
            ..Default::default()
        };
        let probes: Vec<String>;
        if entities.is_empty() {
            // No extracted identifiers: match the raw query string.
            filter.text = Some(classification.query.clone());
            probes = vec![classification.query.clone()];
        } else {
            filter.codes = entities.codes.clone();
            filter.names = entities.names.clone();
            probes = entities
                .codes
                .iter()
                .chain(entities.names.iter())
                .cloned()
                .collect();
        }

        let records = self.store.find(&filter, fetch_limit(options)).await?;
        debug!(count = records.len(), "exact-match filter hits");

        let mut candidates: Vec<Candidate> = records
            .iter()
            .map(|record| {
                let score = Self::score_record(record, classification, &probes);
                candidate_from_record(record, score, Strategy::Exact)
            })
            .collect();

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inci_core::ExtractedEntities;

    fn classification_with_code(code: &str) -> QueryClassification {
        QueryClassification {
            query: code.to_string(),
            query_type: inci_core::QueryType::ExactCode,
            entities: ExtractedEntities {
                codes: vec![code.to_uppercase()],
                names: vec![],
            },
            route: inci_core::SearchRoute::ExactFirst,
            expanded_queries: vec![code.to_string()],
            confidence: 0.95,
        }
    }

    #[test]
    fn test_code_match_scores_full() {
        let mut record = SourceRecord::new("RM000001");
        record.trade_name = Some("Aqua Soothe".to_string());

        let classification = classification_with_code("RM000001");
        let score = ExactMatchExecutor::score_record(
            &record,
            &classification,
            &["RM000001".to_string()],
        );
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_trade_name_containment_score() {
        let mut record = SourceRecord::new("RM000002");
        record.trade_name = Some("Aqua Soothe Extra".to_string());

        let classification = QueryClassification::fallback("aqua soothe");
        let score = ExactMatchExecutor::score_record(
            &record,
            &classification,
            &["aqua soothe".to_string()],
        );
        assert_eq!(score, 0.95);
    }

    #[test]
    fn test_inci_containment_score() {
        let mut record = SourceRecord::new("RM000003");
        record.inci_name = Some("Sodium Hyaluronate".to_string());

        let classification = QueryClassification::fallback("hyaluronate");
        let score = ExactMatchExecutor::score_record(
            &record,
            &classification,
            &["hyaluronate".to_string()],
        );
        assert_eq!(score, 0.9);
    }

    #[test]
    fn test_base_score_for_other_hits() {
        let record = SourceRecord::new("RM000004");
        let classification = QueryClassification::fallback("unrelated");
        let score = ExactMatchExecutor::score_record(
            &record,
            &classification,
            &["unrelated".to_string()],
        );
        assert_eq!(score, 0.8);
    }
}
