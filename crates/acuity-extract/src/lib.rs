//! acuity-extract
//!
//! Turns Assessment/Plan text into structured condition records. Two
//! extractors satisfy the same capability: a deterministic rule-based one and
//! a language-model-backed one that degrades through a repair prompt and a
//! fallback extractor instead of failing. Extracted records are normalized
//! and deduplicated before HCC evaluation.

pub mod llm;
pub mod normalize;
pub mod prompts;
pub mod rule_based;
pub mod salvage;
pub mod segment;

use std::future::Future;

use acuity_core::models::Condition;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("condition extraction failed: {0}")]
    Failed(String),
}

/// A condition-extraction capability over Assessment/Plan text.
///
/// The pipeline depends only on this trait; rule-based and model-backed
/// extractors (and any future one) implement it.
pub trait ConditionExtractor: Send + Sync {
    fn extract(
        &self,
        assessment_text: &str,
        note_id: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Condition>, ExtractError>> + Send;
}
