//! Similarity scoring for description matching.
//!
//! Reference descriptions are full of boilerplate ("unspecified", "with",
//! "due to") that drowns out the clinically meaningful words. Token overlap
//! is computed over the meaningful subset; whole-string similarity uses
//! Jaro-Winkler, which rewards the long shared prefixes typical of related
//! diagnosis descriptions.

use std::collections::HashSet;

/// Tokens that carry no discriminating power in reference descriptions.
const STOP_TOKENS: [&str; 12] = [
    "unspecified",
    "other",
    "with",
    "without",
    "due",
    "to",
    "of",
    "and",
    "the",
    "in",
    "on",
    "for",
];

/// Whole-string similarity in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(a, b)
}

/// The discriminating tokens of a normalized description: stop-words and
/// tokens of length <= 2 excluded. If that empties the set, only stop-words
/// are filtered.
pub fn meaningful_tokens(text: &str) -> HashSet<&str> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let filtered: HashSet<&str> = tokens
        .iter()
        .copied()
        .filter(|token| !STOP_TOKENS.contains(token) && token.len() > 2)
        .collect();
    if !filtered.is_empty() {
        return filtered;
    }
    tokens
        .into_iter()
        .filter(|token| !STOP_TOKENS.contains(token))
        .collect()
}

/// Composite match score between two normalized descriptions, or None when
/// they share no meaningful tokens or clear neither threshold.
///
/// The score weights token overlap over raw string similarity
/// (`0.7 * overlap + 0.3 * similarity`); a candidate is considered at all
/// only when its overlap ratio or its similarity individually clears the
/// given minimum.
pub fn description_match_score(
    description: &str,
    candidate_description: &str,
    min_overlap: f64,
    min_similarity: f64,
) -> Option<f64> {
    if description.is_empty() || candidate_description.is_empty() {
        return None;
    }

    let description_tokens = meaningful_tokens(description);
    let candidate_tokens = meaningful_tokens(candidate_description);
    if description_tokens.is_empty() || candidate_tokens.is_empty() {
        return None;
    }

    let overlap = description_tokens.intersection(&candidate_tokens).count();
    if overlap == 0 {
        return None;
    }

    let smaller = description_tokens.len().min(candidate_tokens.len());
    let overlap_ratio = overlap as f64 / smaller as f64;
    let string_similarity = similarity(description, candidate_description);
    if overlap_ratio < min_overlap && string_similarity < min_similarity {
        return None;
    }

    Some(overlap_ratio * 0.7 + string_similarity * 0.3)
}
