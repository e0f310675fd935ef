//! Cross-strategy result merging.
//!
//! Deduplicates candidates by stable document identity. When two or more
//! strategies find the same document the maximum raw score wins, the
//! strategy sets union (making the result hybrid) and metadata gaps are
//! filled from the losing candidate. Winner selection is a total order, so
//! the merge is commutative and associative: strategy arrival order cannot
//! change the outcome.

use std::collections::HashMap;

use inci_core::Candidate;

/// Merge candidate lists from any number of strategies.
pub fn merge_candidates(lists: Vec<Vec<Candidate>>) -> Vec<Candidate> {
    let mut merged: HashMap<String, Candidate> = HashMap::new();

    for list in lists {
        for candidate in list {
            let key = candidate.merge_key();
            match merged.remove(&key) {
                None => {
                    merged.insert(key, candidate);
                }
                Some(existing) => {
                    merged.insert(key, merge_pair(existing, candidate));
                }
            }
        }
    }

    merged.into_values().collect()
}

/// Merge two candidates for the same document.
fn merge_pair(a: Candidate, b: Candidate) -> Candidate {
    // Total order: higher score wins; ties break on content so the result
    // is independent of argument order.
    let b_wins = b.score > a.score || (b.score == a.score && b.content < a.content);
    let (mut winner, loser) = if b_wins { (b, a) } else { (a, b) };

    winner.strategies.extend(loser.strategies);
    for (key, value) in loser.metadata {
        winner.metadata.entry(key).or_insert(value);
    }

    winner
}
