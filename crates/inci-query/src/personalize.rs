//! Preference-based score adjustment.
//!
//! Multiplicative boosts applied independently, so they compound. No
//! clamping happens here; the final ranker clamps.

use inci_core::{Candidate, Complexity, UserPreferences};

/// Boost when the candidate's category is one the user prefers.
const CATEGORY_BOOST: f32 = 1.2;
/// Boost when an interest keyword appears in the content.
const INTEREST_BOOST: f32 = 1.1;
/// Boost when the content complexity matches the user's preference.
const COMPLEXITY_BOOST: f32 = 1.15;

/// Apply preference boosts to every candidate.
pub fn apply_preferences(candidates: &mut [Candidate], preferences: &UserPreferences) {
    for candidate in candidates.iter_mut() {
        let mut boost = 1.0f32;

        if category_matches(candidate, preferences) {
            boost *= CATEGORY_BOOST;
        }
        if interest_matches(candidate, preferences) {
            boost *= INTEREST_BOOST;
        }
        if complexity_matches(candidate, preferences) {
            boost *= COMPLEXITY_BOOST;
        }

        candidate.score *= boost;
    }
}

fn category_matches(candidate: &Candidate, preferences: &UserPreferences) -> bool {
    let category = match candidate.metadata.get("category").and_then(|v| v.as_str()) {
        Some(c) => c,
        None => return false,
    };
    preferences
        .preferred_categories
        .iter()
        .any(|p| p.eq_ignore_ascii_case(category))
}

fn interest_matches(candidate: &Candidate, preferences: &UserPreferences) -> bool {
    if preferences.interests.is_empty() {
        return false;
    }
    let content = candidate.content.to_lowercase();
    preferences
        .interests
        .iter()
        .filter(|i| !i.is_empty())
        .any(|i| content.contains(&i.to_lowercase()))
}

fn complexity_matches(candidate: &Candidate, preferences: &UserPreferences) -> bool {
    let wanted = match preferences.complexity {
        Some(c) => c,
        None => return false,
    };
    candidate
        .metadata
        .get("complexity")
        .and_then(|v| v.as_str())
        .and_then(Complexity::from_str_opt)
        .map(|c| c == wanted)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inci_core::Strategy;

    fn candidate() -> Candidate {
        let mut c = Candidate::new(
            "RM000001",
            "RM000001 | Aqua Soothe | hydrating humectant",
            0.5,
            Strategy::Semantic,
        );
        c.metadata
            .insert("category".to_string(), serde_json::json!("humectant"));
        c.metadata
            .insert("complexity".to_string(), serde_json::json!("advanced"));
        c
    }

    #[test]
    fn test_no_preferences_no_change() {
        let mut candidates = vec![candidate()];
        apply_preferences(&mut candidates, &UserPreferences::default());
        assert!((candidates[0].score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_category_boost() {
        let mut candidates = vec![candidate()];
        let preferences = UserPreferences {
            preferred_categories: vec!["Humectant".to_string()],
            ..Default::default()
        };
        apply_preferences(&mut candidates, &preferences);
        assert!((candidates[0].score - 0.5 * 1.2).abs() < 1e-6);
    }

    #[test]
    fn test_all_boosts_compound() {
        let mut candidates = vec![candidate()];
        let preferences = UserPreferences {
            preferred_categories: vec!["humectant".to_string()],
            interests: vec!["hydrating".to_string()],
            complexity: Some(Complexity::Advanced),
        };
        apply_preferences(&mut candidates, &preferences);

        let expected = 0.5 * 1.2 * 1.1 * 1.15;
        assert!((candidates[0].score - expected).abs() < 1e-6);
    }

    #[test]
    fn test_boost_may_exceed_one_before_final_clamp() {
        let mut c = candidate();
        c.score = 0.9;
        let mut candidates = vec![c];
        let preferences = UserPreferences {
            preferred_categories: vec!["humectant".to_string()],
            interests: vec!["hydrating".to_string()],
            complexity: Some(Complexity::Advanced),
        };
        apply_preferences(&mut candidates, &preferences);
        assert!(candidates[0].score > 1.0);
    }

    #[test]
    fn test_mismatched_complexity_no_boost() {
        let mut candidates = vec![candidate()];
        let preferences = UserPreferences {
            complexity: Some(Complexity::Basic),
            ..Default::default()
        };
        apply_preferences(&mut candidates, &preferences);
        assert!((candidates[0].score - 0.5).abs() < 1e-6);
    }
}
