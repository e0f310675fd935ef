//! Second-pass reranking.
//!
//! The scorer is pluggable: the default is a term-overlap heuristic, and a
//! cross-encoder client satisfies the same trait. Scores are computed for
//! every candidate before any is applied, so a scorer failure leaves the
//! candidate list untouched.

use async_trait::async_trait;

use inci_core::{Candidate, RerankScorer, Result};

/// Weight of the original score in the rerank-stage blend.
const ORIGINAL_WEIGHT: f32 = 0.3;
/// Weight of the rerank score in the rerank-stage blend.
const RERANK_WEIGHT: f32 = 0.7;

/// Term-overlap relevance heuristic.
///
/// Fraction of query tokens contained in the candidate content. Containment
/// (rather than token-set intersection) keeps unsegmented scripts such as
/// Thai scoreable.
pub struct TermOverlapScorer;

#[async_trait]
impl RerankScorer for TermOverlapScorer {
    async fn score(&self, query: &str, content: &str) -> Result<f32> {
        let content_lower = content.to_lowercase();
        let query_lower = query.to_lowercase();
        let tokens: Vec<&str> = query_lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        if tokens.is_empty() {
            return Ok(0.0);
        }

        let matched = tokens
            .iter()
            .filter(|t| content_lower.contains(**t))
            .count();

        Ok(matched as f32 / tokens.len() as f32)
    }
}

/// Apply rerank scores to merged candidates.
///
/// All scores are computed first; candidates are only mutated once every
/// scorer call succeeded. Returns the scorer's error otherwise so the
/// caller can fall back to unmodified results.
pub async fn apply_rerank(
    scorer: &dyn RerankScorer,
    query: &str,
    candidates: &mut [Candidate],
) -> Result<()> {
    let mut scores = Vec::with_capacity(candidates.len());
    for candidate in candidates.iter() {
        let score = scorer.score(query, &candidate.content).await?;
        scores.push(score.clamp(0.0, 1.0));
    }

    for (candidate, rerank_score) in candidates.iter_mut().zip(scores) {
        candidate.rerank_score = Some(rerank_score);
        candidate.combined_score =
            Some(ORIGINAL_WEIGHT * candidate.score + RERANK_WEIGHT * rerank_score);
    }

    Ok(())
}
