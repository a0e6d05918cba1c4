//! The HCC match cascade.
//!
//! Strategies run in strict priority order, stopping at the first success:
//! exact code, exact description, partial description, fuzzy description,
//! code-prefix fuzzy. Ambiguity is rejection: a partial or fuzzy candidate
//! set that does not resolve to a single clear winner produces no match.

use std::sync::Arc;

use acuity_core::models::{Condition, MatchMethod};

use crate::lookup::HccCodeLookup;

const PREFIX_OVERLAP_THRESHOLD: f64 = 0.5;
const PREFIX_SIMILARITY_THRESHOLD: f64 = 0.35;

pub struct HccEvaluator {
    lookup: Arc<HccCodeLookup>,
    enable_fuzzy_match: bool,
    fuzzy_threshold: f64,
}

impl HccEvaluator {
    pub fn new(lookup: Arc<HccCodeLookup>, enable_fuzzy_match: bool, fuzzy_threshold: f64) -> Self {
        Self {
            lookup,
            enable_fuzzy_match,
            fuzzy_threshold,
        }
    }

    /// Evaluator with fuzzy matching on at the default cutoff.
    pub fn with_defaults(lookup: Arc<HccCodeLookup>) -> Self {
        Self::new(lookup, true, 0.92)
    }

    /// Annotate each condition with its HCC relevance, match, and match
    /// method. Takes ownership of the list and returns it annotated; a
    /// matched condition with no description gets the reference description
    /// backfilled.
    pub fn evaluate(&self, mut conditions: Vec<Condition>) -> Vec<Condition> {
        for condition in &mut conditions {
            self.evaluate_condition(condition);
        }
        conditions
    }

    fn evaluate_condition(&self, condition: &mut Condition) {
        if let Some(code_match) = self.lookup.match_by_code(condition.icd10_code.as_deref()) {
            condition.hcc_relevant = Some(true);
            condition.hcc_match = Some(code_match.clone());
            condition.match_method = Some(MatchMethod::Code);
            if condition.icd10_description.is_none() {
                condition.icd10_description = Some(code_match.description.clone());
            }
            return;
        }

        let query = condition
            .icd10_description
            .as_deref()
            .or(Some(condition.condition.as_str()));

        let matched = self
            .lookup
            .match_by_description(query)
            .map(|m| (m, MatchMethod::DescriptionExact))
            .or_else(|| {
                self.lookup
                    .match_by_description_partial(query)
                    .map(|m| (m, MatchMethod::DescriptionPartial))
            })
            .or_else(|| {
                if !self.enable_fuzzy_match {
                    return None;
                }
                self.lookup
                    .match_by_description_fuzzy(query, self.fuzzy_threshold)
                    .map(|m| (m, MatchMethod::DescriptionFuzzy))
            })
            .or_else(|| {
                if !self.enable_fuzzy_match {
                    return None;
                }
                self.lookup
                    .match_by_code_prefix_and_description(
                        condition.icd10_code.as_deref(),
                        query,
                        PREFIX_OVERLAP_THRESHOLD,
                        PREFIX_SIMILARITY_THRESHOLD,
                    )
                    .map(|m| (m, MatchMethod::CodePrefixFuzzy))
            });

        match matched {
            Some((reference, method)) => {
                condition.hcc_relevant = Some(true);
                condition.hcc_match = Some(reference.clone());
                condition.match_method = Some(method);
                if condition.icd10_description.is_none() {
                    condition.icd10_description = Some(reference.description.clone());
                }
            }
            None => {
                condition.hcc_relevant = Some(false);
                condition.match_method = None;
            }
        }
    }
}
