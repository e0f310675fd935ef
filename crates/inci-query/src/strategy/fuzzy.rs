//! Fuzzy-match strategy.
//!
//! Scores a bounded window of candidate records against the query probe
//! with Jaro-Winkler similarity over the priority fields, keeping only
//! scores above the configured acceptance threshold.

use std::sync::Arc;

use async_trait::async_trait;
use strsim::jaro_winkler;
use tracing::debug;

use inci_core::{
    Candidate, QueryClassification, RecordFilter, RecordStore, Result, SearchOptions,
    SourceRecord, Strategy,
};

use super::{candidate_from_record, StrategyExecutor};

/// How many records the fuzzy pass scans.
const FUZZY_SCAN_LIMIT: usize = 500;

/// Field weights: code, trade name, INCI name.
const CODE_WEIGHT: f32 = 1.0;
const TRADE_NAME_WEIGHT: f32 = 0.9;
const INCI_WEIGHT: f32 = 0.85;

pub struct FuzzyMatchExecutor {
    store: Arc<dyn RecordStore>,
}

impl FuzzyMatchExecutor {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Best weighted similarity across the priority fields.
    fn similarity(record: &SourceRecord, probe: &str) -> f32 {
        let mut best = jaro_winkler(probe, &record.code.to_lowercase()) as f32 * CODE_WEIGHT;

        if let Some(trade) = record.trade_name.as_deref() {
            let s = jaro_winkler(probe, &trade.to_lowercase()) as f32 * TRADE_NAME_WEIGHT;
            best = best.max(s);
        }
        if let Some(inci) = record.inci_name.as_deref() {
            let s = jaro_winkler(probe, &inci.to_lowercase()) as f32 * INCI_WEIGHT;
            best = best.max(s);
        }

        best
    }

    /// Pick the probe string: first extracted code, else first name, else
    /// the raw query.
    fn probe(classification: &QueryClassification) -> String {
        classification
            .entities
            .codes
            .first()
            .or(classification.entities.names.first())
            .unwrap_or(&classification.query)
            .to_lowercase()
    }
}

#[async_trait]
impl StrategyExecutor for FuzzyMatchExecutor {
    fn strategy(&self) -> Strategy {
        Strategy::Fuzzy
    }

    async fn execute(
        &self,
        classification: &QueryClassification,
        options: &SearchOptions,
    ) -> Result<Vec<Candidate>> {
        let probe = Self::probe(classification);
        if probe.is_empty() {
            return Ok(Vec::new());
        }

        let filter = RecordFilter {
            category: options.category.clone(),
            ..Default::default()
        };
        let records = self.store.find(&filter, FUZZY_SCAN_LIMIT).await?;

        let mut candidates: Vec<Candidate> = records
            .iter()
            .filter_map(|record| {
                let score = Self::similarity(record, &probe);
                if score > options.fuzzy_threshold {
                    Some(candidate_from_record(record, score, Strategy::Fuzzy))
                } else {
                    None
                }
            })
            .collect();

        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(options.top_k);

        debug!(count = candidates.len(), probe = %probe, "fuzzy matches above threshold");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_scores_high() {
        let record = SourceRecord::new("RM000001");
        let score = FuzzyMatchExecutor::similarity(&record, "rm00001");
        assert!(score > 0.8, "got {}", score);
    }

    #[test]
    fn test_misspelled_trade_name_matches() {
        let mut record = SourceRecord::new("RM000001");
        record.trade_name = Some("Aqua Soothe".to_string());

        let score = FuzzyMatchExecutor::similarity(&record, "aqua sooth");
        assert!(score > 0.8, "got {}", score);
    }

    #[test]
    fn test_unrelated_text_scores_low() {
        let mut record = SourceRecord::new("RM000001");
        record.trade_name = Some("Aqua Soothe".to_string());

        let score = FuzzyMatchExecutor::similarity(&record, "zirconium dioxide powder");
        assert!(score < 0.6, "got {}", score);
    }

    #[test]
    fn test_probe_prefers_codes() {
        let mut classification = QueryClassification::fallback("find Aqua Soothe RM000001");
        classification.entities.codes = vec!["RM000001".to_string()];
        classification.entities.names = vec!["Aqua Soothe".to_string()];
        assert_eq!(FuzzyMatchExecutor::probe(&classification), "rm000001");

        classification.entities.codes.clear();
        assert_eq!(FuzzyMatchExecutor::probe(&classification), "aqua soothe");
    }
}
