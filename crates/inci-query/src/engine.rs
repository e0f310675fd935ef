//! Hybrid search engine.
//!
//! Classifies the query, fans the enabled strategies out concurrently,
//! then runs the sequential merge -> rerank -> personalize -> rank ->
//! filter pipeline. Backends are injected at construction; a single
//! strategy's failure degrades that strategy only.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, info, warn};

use inci_core::{
    Candidate, Embedder, EngineError, QueryClassification, RecordStore, RerankScorer, Result,
    SearchConfig, SearchOptions, SearchOutcome, SearchRoute, Strategy, VectorStore,
};

use crate::classify::QueryClassifier;
use crate::merge::merge_candidates;
use crate::personalize::apply_preferences;
use crate::rank::{filter_results, final_rank, FilterOutcome};
use crate::rerank::{apply_rerank, TermOverlapScorer};
use crate::strategy::{
    ExactMatchExecutor, FuzzyMatchExecutor, MetadataFilterExecutor, SemanticVectorExecutor,
    StrategyExecutor,
};

/// An exact result at or above this score can short-circuit the fan-out.
const SHORT_CIRCUIT_SCORE: f32 = 0.95;

/// Hybrid search engine over injected backends.
pub struct SearchEngine {
    classifier: QueryClassifier,
    exact: ExactMatchExecutor,
    metadata: MetadataFilterExecutor,
    fuzzy: FuzzyMatchExecutor,
    semantic: SemanticVectorExecutor,
    reranker: Arc<dyn RerankScorer>,
    defaults: SearchConfig,
}

impl SearchEngine {
    /// Create an engine over the given backends.
    pub fn new(
        record_store: Arc<dyn RecordStore>,
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        defaults: SearchConfig,
    ) -> Result<Self> {
        Ok(Self {
            classifier: QueryClassifier::new()?,
            exact: ExactMatchExecutor::new(record_store.clone()),
            metadata: MetadataFilterExecutor::new(record_store.clone()),
            fuzzy: FuzzyMatchExecutor::new(record_store),
            semantic: SemanticVectorExecutor::new(vector_store, embedder),
            reranker: Arc::new(TermOverlapScorer),
            defaults,
        })
    }

    /// Replace the rerank scorer (e.g. with a cross-encoder client).
    pub fn with_reranker(mut self, reranker: Arc<dyn RerankScorer>) -> Self {
        self.reranker = reranker;
        self
    }

    /// Request options seeded from the configured defaults.
    pub fn default_options(&self) -> SearchOptions {
        SearchOptions {
            top_k: self.defaults.default_top_k,
            score_threshold: self.defaults.score_threshold,
            semantic_weight: self.defaults.semantic_weight,
            keyword_weight: self.defaults.keyword_weight,
            fuzzy_threshold: self.defaults.fuzzy_threshold,
            rerank: self.defaults.rerank,
            exact_short_circuit: self.defaults.exact_short_circuit,
            ..Default::default()
        }
    }

    /// Run a hybrid search.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<SearchOutcome> {
        options.validate()?;
        let start = Instant::now();

        let classification = self.classifier.classify(query);
        debug!(
            query_type = ?classification.query_type,
            codes = classification.entities.codes.len(),
            names = classification.entities.names.len(),
            "classified query"
        );

        let mut lists: Vec<Vec<Candidate>> = Vec::new();
        let mut degraded: Vec<Strategy> = Vec::new();
        let mut attempted = 0usize;
        let mut failed = 0usize;

        // Exact-code routed queries run the exact strategy first: a
        // high-confidence hit skips the remaining strategies. A document the
        // vector store would have scored higher never surfaces then; that is
        // the price of the latency win, and the flag turns it off.
        let mut short_circuit = false;
        let mut exact_done = false;

        if options.enable_exact
            && options.exact_short_circuit
            && classification.route == SearchRoute::ExactFirst
        {
            exact_done = true;
            attempted += 1;
            match self.run_strategy(&self.exact, &classification, options).await {
                Ok(mut candidates) => {
                    short_circuit = candidates.iter().any(|c| c.score >= SHORT_CIRCUIT_SCORE);
                    apply_boost(&mut candidates, options.boosts.exact);
                    if short_circuit {
                        debug!("exact match >= {}, skipping fan-out", SHORT_CIRCUIT_SCORE);
                    }
                    lists.push(candidates);
                }
                Err(e) => {
                    warn!(strategy = %Strategy::Exact, error = %e, "strategy degraded to empty results");
                    degraded.push(Strategy::Exact);
                    failed += 1;
                }
            }
        }

        if !short_circuit {
            let (exact_res, metadata_res, fuzzy_res, semantic_res) = tokio::join!(
                async {
                    if options.enable_exact && !exact_done {
                        Some(self.run_strategy(&self.exact, &classification, options).await)
                    } else {
                        None
                    }
                },
                async {
                    if options.enable_metadata {
                        Some(self.run_strategy(&self.metadata, &classification, options).await)
                    } else {
                        None
                    }
                },
                async {
                    if options.enable_fuzzy {
                        Some(self.run_strategy(&self.fuzzy, &classification, options).await)
                    } else {
                        None
                    }
                },
                async {
                    if options.enable_semantic {
                        Some(self.run_strategy(&self.semantic, &classification, options).await)
                    } else {
                        None
                    }
                },
            );

            let outcomes = [
                (Strategy::Exact, exact_res),
                (Strategy::Metadata, metadata_res),
                (Strategy::Fuzzy, fuzzy_res),
                (Strategy::Semantic, semantic_res),
            ];
            for (strategy, outcome) in outcomes {
                let Some(result) = outcome else { continue };
                attempted += 1;
                match result {
                    Ok(mut candidates) => {
                        apply_boost(&mut candidates, options.boosts.for_strategy(strategy));
                        lists.push(candidates);
                    }
                    Err(e) => {
                        warn!(strategy = %strategy, error = %e, "strategy degraded to empty results");
                        degraded.push(strategy);
                        failed += 1;
                    }
                }
            }
        }

        if attempted > 0 && failed == attempted {
            return Err(EngineError::unavailable(
                "all enabled strategies failed; see warnings for causes",
            ));
        }

        let mut merged = merge_candidates(lists);
        debug!(count = merged.len(), "merged candidates");

        if options.rerank {
            if let Err(e) = apply_rerank(self.reranker.as_ref(), &classification.query, &mut merged).await
            {
                warn!(error = %e, "rerank failed, keeping original scores");
            }
        }

        if let Some(preferences) = &options.preferences {
            apply_preferences(&mut merged, preferences);
        }

        let ranked = final_rank(merged, options);
        let FilterOutcome {
            results,
            pre_filter_count,
            filtered_out,
        } = filter_results(ranked, options.score_threshold, options.top_k);

        let latency_ms = start.elapsed().as_millis() as u64;
        info!(
            results = results.len(),
            pre_filter = pre_filter_count,
            latency_ms,
            "search completed"
        );

        Ok(SearchOutcome {
            query: query.to_string(),
            results,
            pre_filter_count,
            filtered_out,
            degraded_strategies: degraded,
            latency_ms,
        })
    }

    /// Search and render the outcome as text for a chat/UI caller.
    pub async fn search_and_format(&self, query: &str, options: &SearchOptions) -> Result<String> {
        let outcome = self.search(query, options).await?;
        Ok(format_outcome(&outcome, options.score_threshold))
    }

    /// Run one strategy under the request's timeout budget. A timed-out
    /// strategy is abandoned; completed strategies still merge.
    async fn run_strategy(
        &self,
        executor: &dyn StrategyExecutor,
        classification: &QueryClassification,
        options: &SearchOptions,
    ) -> Result<Vec<Candidate>> {
        match options.timeout_ms {
            Some(ms) => {
                match timeout(
                    Duration::from_millis(ms),
                    executor.execute(classification, options),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(EngineError::backend(
                        executor.strategy().to_string(),
                        format!("timed out after {}ms", ms),
                    )),
                }
            }
            None => executor.execute(classification, options).await,
        }
    }
}

fn apply_boost(candidates: &mut [Candidate], boost: f32) {
    if (boost - 1.0).abs() < f32::EPSILON {
        return;
    }
    for candidate in candidates {
        candidate.score *= boost;
    }
}

/// Render an outcome for direct consumption by a chat/UI caller.
pub fn format_outcome(outcome: &SearchOutcome, threshold: f32) -> String {
    if outcome.results.is_empty() {
        if outcome.no_matches() {
            return format!("No matches found for \"{}\".", outcome.query);
        }
        return format!(
            "No results above score threshold {:.2} for \"{}\" ({} candidates filtered out).",
            threshold, outcome.query, outcome.filtered_out
        );
    }

    let mut out = format!(
        "Results for \"{}\" ({} of {} candidates):\n",
        outcome.query,
        outcome.results.len(),
        outcome.pre_filter_count
    );

    for (i, candidate) in outcome.results.iter().enumerate() {
        let strategies: Vec<String> = candidate.strategies.iter().map(|s| s.to_string()).collect();
        let tag = if candidate.is_hybrid() {
            format!("hybrid: {}", strategies.join("+"))
        } else {
            strategies.join("+")
        };

        let summary: String = candidate
            .content
            .lines()
            .next()
            .unwrap_or("")
            .chars()
            .take(120)
            .collect();

        out.push_str(&format!(
            "{}. {} [{}] score {:.2}\n   {}\n",
            i + 1,
            candidate.document_id,
            tag,
            candidate.score,
            summary
        ));
    }

    if !outcome.degraded_strategies.is_empty() {
        let names: Vec<String> = outcome
            .degraded_strategies
            .iter()
            .map(|s| s.to_string())
            .collect();
        out.push_str(&format!("(degraded strategies: {})\n", names.join(", ")));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use inci_chunk::ChunkBuilder;
    use inci_core::{
        Chunk, ChunkingConfig, RecordFilter, SourceRecord, UserPreferences, VectorFilter,
        VectorHit,
    };
    use inci_embed::TrigramEmbedder;
    use inci_store::MemoryStore;

    fn catalog() -> Vec<SourceRecord> {
        let mut aqua = SourceRecord::new("RM000001");
        aqua.trade_name = Some("Aqua Soothe".to_string());
        aqua.inci_name = Some("Sodium Hyaluronate".to_string());
        aqua.category = Some("humectant".to_string());
        aqua.benefits = Some("Deep hydration for dry and sensitive skin".to_string());

        let mut shield = SourceRecord::new("RM000002");
        shield.trade_name = Some("Sun Shield 50".to_string());
        shield.inci_name = Some("Zinc Oxide".to_string());
        shield.category = Some("uv_filter".to_string());
        shield.benefits = Some("Broad spectrum UV protection".to_string());

        let mut thai = SourceRecord::new("RM000010");
        thai.trade_name = Some("Hydra Silk".to_string());
        thai.category = Some("humectant".to_string());
        thai.benefits = Some("ให้ความชุ่มชื่นแก่ผิว ลดการระคายเคือง".to_string());

        vec![aqua, shield, thai]
    }

    async fn seeded_engine() -> SearchEngine {
        let store = Arc::new(MemoryStore::new());
        let embedder = Arc::new(TrigramEmbedder::new());
        let builder = ChunkBuilder::new(ChunkingConfig::default()).unwrap();

        for record in catalog() {
            store.upsert_record(record.clone()).await.unwrap();
            let chunks = builder.chunk_record(&record).unwrap();
            let mut embeddings = Vec::with_capacity(chunks.len());
            for chunk in &chunks {
                embeddings.push(embedder.embed(&chunk.text).await.unwrap());
            }
            store.upsert(&chunks, &embeddings).await.unwrap();
        }

        SearchEngine::new(store.clone(), store, embedder, SearchConfig::default()).unwrap()
    }

    struct FailingVectorStore;

    #[async_trait]
    impl VectorStore for FailingVectorStore {
        async fn upsert(&self, _chunks: &[Chunk], _embeddings: &[Vec<f32>]) -> Result<()> {
            Err(EngineError::database("vector backend down"))
        }
        async fn query(
            &self,
            _embedding: &[f32],
            _top_k: usize,
            _filter: &VectorFilter,
        ) -> Result<Vec<VectorHit>> {
            Err(EngineError::database("vector backend down"))
        }
        async fn count_chunks(&self) -> Result<u64> {
            Err(EngineError::database("vector backend down"))
        }
    }

    struct FailingRecordStore;

    #[async_trait]
    impl RecordStore for FailingRecordStore {
        async fn upsert_record(&self, _record: SourceRecord) -> Result<()> {
            Err(EngineError::database("record backend down"))
        }
        async fn get_record(&self, _code: &str) -> Result<Option<SourceRecord>> {
            Err(EngineError::database("record backend down"))
        }
        async fn find(&self, _filter: &RecordFilter, _limit: usize) -> Result<Vec<SourceRecord>> {
            Err(EngineError::database("record backend down"))
        }
        async fn count_records(&self) -> Result<u64> {
            Err(EngineError::database("record backend down"))
        }
    }

    #[tokio::test]
    async fn test_exact_code_query_tops_ranking() {
        let engine = seeded_engine().await;
        let outcome = engine
            .search("RM000001", &SearchOptions::default())
            .await
            .unwrap();

        assert!(!outcome.results.is_empty());
        let top = &outcome.results[0];
        assert_eq!(top.document_id, "RM000001");
        assert!(top.strategies.contains(&Strategy::Exact));
        assert!((0.0..=1.0).contains(&top.score));
        assert!(outcome.pre_filter_count >= 1);
    }

    #[tokio::test]
    async fn test_exact_short_circuit_skips_other_strategies() {
        let engine = seeded_engine().await;
        let outcome = engine
            .search("RM000001", &SearchOptions::default())
            .await
            .unwrap();

        // The fan-out never ran, so nothing is tagged semantic.
        assert!(outcome
            .results
            .iter()
            .all(|c| !c.strategies.contains(&Strategy::Semantic)));
        assert!(outcome.degraded_strategies.is_empty());
    }

    #[tokio::test]
    async fn test_short_circuit_disabled_runs_fan_out() {
        let engine = seeded_engine().await;
        let options = SearchOptions {
            exact_short_circuit: false,
            ..Default::default()
        };
        let outcome = engine.search("RM000001", &options).await.unwrap();

        assert_eq!(outcome.results[0].document_id, "RM000001");
        // With the fan-out active the same record is also found by other
        // strategies and merges hybrid.
        assert!(outcome.results[0].is_hybrid());
    }

    #[tokio::test]
    async fn test_thai_natural_language_routes_to_semantic() {
        let engine = seeded_engine().await;
        let outcome = engine
            .search("ให้ความชุ่มชื่น", &SearchOptions::default())
            .await
            .unwrap();

        assert!(!outcome.results.is_empty());
        let top = &outcome.results[0];
        assert_eq!(top.document_id, "RM000010");
        assert!(top.strategies.contains(&Strategy::Semantic));
        assert!(!top.strategies.contains(&Strategy::Exact));
    }

    #[tokio::test]
    async fn test_vector_backend_outage_degrades_gracefully() {
        let store = Arc::new(MemoryStore::new());
        for record in catalog() {
            store.upsert_record(record).await.unwrap();
        }
        let engine = SearchEngine::new(
            store,
            Arc::new(FailingVectorStore),
            Arc::new(TrigramEmbedder::new()),
            SearchConfig::default(),
        )
        .unwrap();

        let outcome = engine
            .search("Aqua Soothe", &SearchOptions::default())
            .await
            .unwrap();

        assert!(!outcome.results.is_empty());
        assert_eq!(outcome.degraded_strategies, vec![Strategy::Semantic]);
        assert_eq!(outcome.results[0].document_id, "RM000001");
    }

    #[tokio::test]
    async fn test_all_strategies_failing_is_search_unavailable() {
        let engine = SearchEngine::new(
            Arc::new(FailingRecordStore),
            Arc::new(FailingVectorStore),
            Arc::new(TrigramEmbedder::new()),
            SearchConfig::default(),
        )
        .unwrap();

        let err = engine
            .search("RM000001", &SearchOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "SEARCH_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_unreachable_threshold_reports_prefilter_count() {
        let engine = seeded_engine().await;
        let options = SearchOptions {
            score_threshold: 0.9,
            exact_short_circuit: false,
            ..Default::default()
        };
        let outcome = engine.search("Aqua Soothe", &options).await.unwrap();

        assert!(outcome.results.is_empty());
        assert!(outcome.pre_filter_count > 0);
        assert!(outcome.filtered_out > 0);
        assert!(!outcome.no_matches());
    }

    #[tokio::test]
    async fn test_invalid_options_rejected_before_backends() {
        let engine = SearchEngine::new(
            Arc::new(FailingRecordStore),
            Arc::new(FailingVectorStore),
            Arc::new(TrigramEmbedder::new()),
            SearchConfig::default(),
        )
        .unwrap();

        let options = SearchOptions {
            enable_exact: false,
            enable_metadata: false,
            enable_fuzzy: false,
            enable_semantic: false,
            ..Default::default()
        };
        let err = engine.search("RM000001", &options).await.unwrap_err();
        assert_eq!(err.error_code(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_scores_bounded_after_personalization() {
        let engine = seeded_engine().await;
        let options = SearchOptions {
            exact_short_circuit: false,
            preferences: Some(UserPreferences {
                preferred_categories: vec!["humectant".to_string()],
                interests: vec!["hydration".to_string()],
                complexity: None,
            }),
            ..Default::default()
        };
        let outcome = engine.search("hydrating humectant", &options).await.unwrap();

        for candidate in &outcome.results {
            assert!((0.0..=1.0).contains(&candidate.score));
        }
    }

    #[tokio::test]
    async fn test_search_and_format_renders_results() {
        let engine = seeded_engine().await;
        let text = engine
            .search_and_format("RM000001", &SearchOptions::default())
            .await
            .unwrap();
        assert!(text.contains("RM000001"));
        assert!(text.contains("score"));
    }

    #[tokio::test]
    async fn test_format_distinguishes_empty_cases() {
        let engine = seeded_engine().await;

        let nothing = engine
            .search_and_format("xyzzyplugh", &SearchOptions::default())
            .await
            .unwrap();
        assert!(nothing.contains("No matches found"));

        let options = SearchOptions {
            score_threshold: 0.99,
            exact_short_circuit: false,
            ..Default::default()
        };
        let filtered = engine.search_and_format("Aqua Soothe", &options).await.unwrap();
        assert!(filtered.contains("threshold"));
        assert!(filtered.contains("filtered out"));
    }
}
