//! Semantic-vector strategy.
//!
//! Embeds each expanded query and runs a pre-filtered vector query per
//! embedding, deduplicating hits by record code and keeping the highest
//! score per document.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use inci_core::{
    Candidate, Embedder, QueryClassification, Result, SearchOptions, Strategy, VectorFilter,
    VectorStore,
};

use super::StrategyExecutor;

/// At most this many expanded queries are embedded per request.
const MAX_EXPANDED_QUERIES: usize = 3;

pub struct SemanticVectorExecutor {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl SemanticVectorExecutor {
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
        }
    }
}

#[async_trait]
impl StrategyExecutor for SemanticVectorExecutor {
    fn strategy(&self) -> Strategy {
        Strategy::Semantic
    }

    async fn execute(
        &self,
        classification: &QueryClassification,
        options: &SearchOptions,
    ) -> Result<Vec<Candidate>> {
        let filter = VectorFilter {
            category: options.category.clone(),
            exclude_user: options.exclude_user.clone(),
        };

        let mut best: HashMap<String, Candidate> = HashMap::new();

        for query in classification
            .expanded_queries
            .iter()
            .take(MAX_EXPANDED_QUERIES)
        {
            let embedding = self.embedder.embed(query).await?;
            let hits = self
                .vector_store
                .query(&embedding, options.top_k, &filter)
                .await?;

            for hit in hits {
                let score = hit.score.clamp(0.0, 1.0);
                let key = hit.record_code.to_lowercase();

                let entry = best.entry(key).or_insert_with(|| {
                    let mut candidate =
                        Candidate::new(&hit.record_code, &hit.content, score, Strategy::Semantic);
                    candidate.metadata = hit.metadata.clone();
                    candidate
                });
                if score > entry.score {
                    entry.score = score;
                    entry.content = hit.content;
                    entry.metadata = hit.metadata;
                }
            }
        }

        let mut candidates: Vec<Candidate> = best.into_values().collect();
        candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(options.top_k);

        debug!(
            count = candidates.len(),
            queries = classification.expanded_queries.len().min(MAX_EXPANDED_QUERIES),
            "semantic hits after dedup"
        );
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inci_core::VectorHit;

    struct CannedVectorStore {
        per_query: Vec<Vec<VectorHit>>,
        calls: std::sync::Mutex<usize>,
    }

    #[async_trait]
    impl VectorStore for CannedVectorStore {
        async fn upsert(
            &self,
            _chunks: &[inci_core::Chunk],
            _embeddings: &[Vec<f32>],
        ) -> Result<()> {
            unreachable!()
        }

        async fn query(
            &self,
            _embedding: &[f32],
            _top_k: usize,
            _filter: &VectorFilter,
        ) -> Result<Vec<VectorHit>> {
            let mut calls = self.calls.lock().unwrap();
            let hits = self.per_query.get(*calls).cloned().unwrap_or_default();
            *calls += 1;
            Ok(hits)
        }

        async fn count_chunks(&self) -> Result<u64> {
            unreachable!()
        }
    }

    struct ZeroEmbedder;

    #[async_trait]
    impl Embedder for ZeroEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0; 4])
        }
        fn dimension(&self) -> usize {
            4
        }
    }

    fn hit(code: &str, score: f32) -> VectorHit {
        VectorHit {
            id: format!("{}-chunk", code),
            record_code: code.to_string(),
            score,
            content: format!("content for {}", code),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_dedup_across_expanded_queries_keeps_max() {
        let store = CannedVectorStore {
            per_query: vec![
                vec![hit("RM000001", 0.55), hit("RM000002", 0.70)],
                vec![hit("RM000001", 0.72)],
                vec![hit("RM000001", 0.40)],
            ],
            calls: std::sync::Mutex::new(0),
        };
        let executor = SemanticVectorExecutor::new(Arc::new(store), Arc::new(ZeroEmbedder));

        let mut classification = QueryClassification::fallback("hydrating");
        classification.expanded_queries = vec![
            "hydrating".to_string(),
            "moisturizing".to_string(),
            "humectant".to_string(),
        ];

        let candidates = executor
            .execute(&classification, &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(candidates.len(), 2);
        let top = candidates
            .iter()
            .find(|c| c.document_id == "RM000001")
            .unwrap();
        assert!((top.score - 0.72).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_at_most_three_queries_embedded() {
        let store = CannedVectorStore {
            per_query: vec![vec![], vec![], vec![], vec![hit("RM000009", 0.9)]],
            calls: std::sync::Mutex::new(0),
        };
        let store = Arc::new(store);
        let executor = SemanticVectorExecutor::new(store.clone(), Arc::new(ZeroEmbedder));

        let mut classification = QueryClassification::fallback("q");
        classification.expanded_queries =
            vec!["a".into(), "b".into(), "c".into(), "d".into(), "e".into()];

        let candidates = executor
            .execute(&classification, &SearchOptions::default())
            .await
            .unwrap();

        // The fourth expansion is never queried.
        assert!(candidates.is_empty());
        assert_eq!(*store.calls.lock().unwrap(), 3);
    }
}
