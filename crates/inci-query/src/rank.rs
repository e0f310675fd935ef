//! Final ranking and threshold filtering.

use inci_core::{Candidate, SearchOptions, Strategy};

/// Penalty multiplier for metadata-only matches.
pub const METADATA_PENALTY: f32 = 0.9;

/// Weight of the strategy-weighted score in the final blend.
const WEIGHTED_SHARE: f32 = 0.4;
/// Weight of the rerank score in the final blend.
const RERANK_SHARE: f32 = 0.6;

/// Strategy multiplier for a candidate's tag set. Semantic takes precedence
/// for hybrid sets, then keyword (exact), then the metadata penalty; fuzzy
/// passes through unweighted.
fn strategy_multiplier(candidate: &Candidate, options: &SearchOptions) -> f32 {
    if candidate.strategies.contains(&Strategy::Semantic) {
        options.semantic_weight
    } else if candidate.strategies.contains(&Strategy::Exact) {
        options.keyword_weight
    } else if candidate.strategies.contains(&Strategy::Metadata) {
        METADATA_PENALTY
    } else {
        1.0
    }
}

/// Best (lowest) rank priority among a candidate's strategies, for
/// deterministic tie-breaking.
fn tie_break_priority(candidate: &Candidate) -> u8 {
    candidate
        .strategies
        .iter()
        .map(|s| s.rank_priority())
        .min()
        .unwrap_or(u8::MAX)
}

/// Apply strategy weights and the rerank blend, clamp to [0, 1], and sort
/// descending. The final score is written back into `score`.
pub fn final_rank(mut candidates: Vec<Candidate>, options: &SearchOptions) -> Vec<Candidate> {
    for candidate in candidates.iter_mut() {
        let weighted = candidate.score * strategy_multiplier(candidate, options);
        let final_score = match candidate.rerank_score {
            Some(rerank) => WEIGHTED_SHARE * weighted + RERANK_SHARE * rerank,
            None => weighted,
        };
        candidate.score = final_score.clamp(0.0, 1.0);
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| tie_break_priority(a).cmp(&tie_break_priority(b)))
            .then_with(|| a.document_id.cmp(&b.document_id))
    });

    candidates
}

/// Result of threshold filtering, carrying the counts that distinguish
/// "filtered out" from "no matches".
#[derive(Debug)]
pub struct FilterOutcome {
    pub results: Vec<Candidate>,
    pub pre_filter_count: usize,
    pub filtered_out: usize,
}

/// Drop candidates below the threshold and truncate to top_k.
pub fn filter_results(ranked: Vec<Candidate>, threshold: f32, top_k: usize) -> FilterOutcome {
    let pre_filter_count = ranked.len();
    let mut results: Vec<Candidate> = ranked
        .into_iter()
        .filter(|c| c.score >= threshold)
        .collect();
    let filtered_out = pre_filter_count - results.len();
    results.truncate(top_k);

    FilterOutcome {
        results,
        pre_filter_count,
        filtered_out,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inci_core::Strategy;

    fn candidate(id: &str, score: f32, strategy: Strategy) -> Candidate {
        Candidate::new(id, "content", score, strategy)
    }

    #[test]
    fn test_semantic_weight_applied() {
        let options = SearchOptions::default();
        let ranked = final_rank(
            vec![candidate("RM000001", 0.8, Strategy::Semantic)],
            &options,
        );
        assert!((ranked[0].score - 0.8 * 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_keyword_weight_applied_to_exact() {
        let options = SearchOptions::default();
        let ranked = final_rank(vec![candidate("RM000001", 1.0, Strategy::Exact)], &options);
        assert!((ranked[0].score - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_metadata_penalty_applied() {
        let options = SearchOptions::default();
        let ranked = final_rank(
            vec![candidate("RM000001", 0.8, Strategy::Metadata)],
            &options,
        );
        assert!((ranked[0].score - 0.8 * METADATA_PENALTY).abs() < 1e-6);
    }

    #[test]
    fn test_fuzzy_passes_through() {
        let options = SearchOptions::default();
        let ranked = final_rank(vec![candidate("RM000001", 0.65, Strategy::Fuzzy)], &options);
        assert!((ranked[0].score - 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_rerank_blend() {
        let options = SearchOptions::default();
        let mut c = candidate("RM000001", 1.0, Strategy::Exact);
        c.rerank_score = Some(1.0);

        let ranked = final_rank(vec![c], &options);
        // 0.4 * (1.0 * 0.4) + 0.6 * 1.0
        assert!((ranked[0].score - 0.76).abs() < 1e-6);
    }

    #[test]
    fn test_scores_clamped_to_unit_interval() {
        let options = SearchOptions::default();
        let mut over = candidate("RM000001", 3.0, Strategy::Fuzzy);
        over.rerank_score = Some(1.0);
        let under = candidate("RM000002", -0.5, Strategy::Fuzzy);

        let ranked = final_rank(vec![over, under], &options);
        for c in &ranked {
            assert!((0.0..=1.0).contains(&c.score), "score {} out of bounds", c.score);
        }
    }

    #[test]
    fn test_tie_broken_by_strategy_priority() {
        let options = SearchOptions::default();
        // Same final score: fuzzy 0.4 pass-through vs exact 1.0 * 0.4.
        let fuzzy = candidate("RM000002", 0.4, Strategy::Fuzzy);
        let exact = candidate("RM000001", 1.0, Strategy::Exact);

        let ranked = final_rank(vec![fuzzy, exact], &options);
        assert_eq!(ranked[0].document_id, "RM000001");
        assert_eq!(ranked[1].document_id, "RM000002");
    }

    #[test]
    fn test_filter_reports_counts() {
        let candidates = vec![
            candidate("RM000001", 0.9, Strategy::Fuzzy),
            candidate("RM000002", 0.5, Strategy::Fuzzy),
            candidate("RM000003", 0.2, Strategy::Fuzzy),
        ];

        let outcome = filter_results(candidates, 0.3, 10);
        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.pre_filter_count, 3);
        assert_eq!(outcome.filtered_out, 1);
        assert!(outcome.results.iter().all(|c| c.score >= 0.3));
    }

    #[test]
    fn test_high_threshold_empties_but_counts() {
        let candidates = vec![
            candidate("RM000001", 0.8, Strategy::Fuzzy),
            candidate("RM000002", 0.7, Strategy::Fuzzy),
        ];

        let outcome = filter_results(candidates, 0.9, 10);
        assert!(outcome.results.is_empty());
        assert_eq!(outcome.pre_filter_count, 2);
        assert_eq!(outcome.filtered_out, 2);
    }

    #[test]
    fn test_top_k_truncation() {
        let candidates: Vec<Candidate> = (0..20)
            .map(|i| candidate(&format!("RM{:06}", i), 0.9, Strategy::Fuzzy))
            .collect();

        let outcome = filter_results(candidates, 0.3, 5);
        assert_eq!(outcome.results.len(), 5);
        assert_eq!(outcome.pre_filter_count, 20);
        assert_eq!(outcome.filtered_out, 0);
    }
}
