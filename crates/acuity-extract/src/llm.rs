//! Model-backed condition extraction.
//!
//! Drives an [`LlmClient`] with the extraction prompt and salvage-parses the
//! response. Escalation runs as an explicit sequence (direct parse, repair
//! retry, fallback delegate, give up) so each transition is auditable and
//! testable on its own. This extractor never fails: every failure mode
//! degrades to an emptier but well-typed result.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use acuity_core::llm::LlmClient;
use acuity_core::models::Condition;
use acuity_core::text::truncate_chars;

use crate::salvage::{conditions_from_response, parse_response};
use crate::{ConditionExtractor, ExtractError, prompts};

/// Knobs for the model-backed extractor.
#[derive(Debug, Clone)]
pub struct LlmExtractorConfig {
    /// Character budget for the Assessment/Plan text embedded in the prompt.
    pub max_chars: usize,
    /// Whether a malformed response earns one repair-prompt retry.
    pub repair_enabled: bool,
    /// Character budget for the raw response embedded in the repair prompt.
    pub repair_max_chars: usize,
    /// When set, raw model output is dumped here on salvage/fallback paths.
    pub debug_dir: Option<PathBuf>,
}

impl Default for LlmExtractorConfig {
    fn default() -> Self {
        Self {
            max_chars: 6000,
            repair_enabled: true,
            repair_max_chars: 6000,
            debug_dir: None,
        }
    }
}

/// Condition extractor backed by a language model, with a repair retry and
/// an optional fallback extractor.
pub struct LlmConditionExtractor<C, F> {
    client: C,
    fallback: Option<F>,
    config: LlmExtractorConfig,
}

impl<C, F> LlmConditionExtractor<C, F>
where
    C: LlmClient,
    F: ConditionExtractor,
{
    pub fn new(client: C, fallback: Option<F>, config: LlmExtractorConfig) -> Self {
        Self {
            client,
            fallback,
            config,
        }
    }

    async fn run(&self, assessment_text: &str, note_id: Option<&str>) -> Vec<Condition> {
        let trimmed = assessment_text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }

        let mut prompt_text = trimmed;
        if prompt_text.chars().count() > self.config.max_chars {
            prompt_text = truncate_chars(prompt_text, self.config.max_chars);
            warn!(note_id = note_id.unwrap_or(""), "truncated assessment/plan");
        }

        let prompt = prompts::extraction_prompt(prompt_text);
        let raw = match self.client.generate(&prompt).await {
            Ok(raw) => raw,
            Err(err) => {
                error!(note_id = note_id.unwrap_or(""), %err, "model extraction failed");
                return self.delegate_to_fallback(assessment_text, note_id).await;
            }
        };

        let (response, parse_error) = parse_response(&raw);
        let conditions = conditions_from_response(&response);

        // Repair retry: one shot at having the model fix its own output.
        if parse_error && conditions.is_empty() && self.config.repair_enabled {
            if let Some(repaired) = self.attempt_repair(&raw, note_id).await {
                return repaired;
            }
        }

        // Fallback delegate: the response was unusable.
        if parse_error && conditions.is_empty() && self.fallback.is_some() {
            info!(
                note_id = note_id.unwrap_or(""),
                "model returned invalid payload, using fallback"
            );
            self.write_debug_output(note_id, &raw, "invalid_json");
            return self.delegate_to_fallback(assessment_text, note_id).await;
        }

        if parse_error {
            debug!(note_id = note_id.unwrap_or(""), "model response required salvage");
            self.write_debug_output(note_id, &raw, "salvaged_json");
        }

        if conditions.is_empty() && self.fallback.is_some() {
            info!(
                note_id = note_id.unwrap_or(""),
                "model returned no conditions, using fallback"
            );
            self.write_debug_output(note_id, &raw, "empty_conditions");
            return self.delegate_to_fallback(assessment_text, note_id).await;
        }

        conditions
    }

    async fn attempt_repair(&self, raw: &str, note_id: Option<&str>) -> Option<Vec<Condition>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let trimmed = truncate_chars(trimmed, self.config.repair_max_chars);

        let prompt = prompts::repair_prompt(trimmed);
        let repaired = match self.client.generate(&prompt).await {
            Ok(repaired) => repaired,
            Err(err) => {
                info!(note_id = note_id.unwrap_or(""), %err, "repair attempt failed");
                return None;
            }
        };

        let (response, parse_error) = parse_response(&repaired);
        let conditions = conditions_from_response(&response);
        if parse_error {
            debug!(note_id = note_id.unwrap_or(""), "repair response required salvage");
        }
        if conditions.is_empty() {
            return None;
        }
        self.write_debug_output(note_id, &repaired, "repaired_json");
        Some(conditions)
    }

    async fn delegate_to_fallback(
        &self,
        assessment_text: &str,
        note_id: Option<&str>,
    ) -> Vec<Condition> {
        match &self.fallback {
            Some(fallback) => fallback
                .extract(assessment_text, note_id)
                .await
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    fn write_debug_output(&self, note_id: Option<&str>, raw: &str, suffix: &str) {
        let Some(debug_dir) = &self.config.debug_dir else {
            return;
        };
        if let Err(err) = dump_raw_output(debug_dir, note_id, raw, suffix) {
            debug!(%err, "failed to write model debug output");
        }
    }
}

impl<C, F> ConditionExtractor for LlmConditionExtractor<C, F>
where
    C: LlmClient,
    F: ConditionExtractor,
{
    async fn extract(
        &self,
        assessment_text: &str,
        note_id: Option<&str>,
    ) -> Result<Vec<Condition>, ExtractError> {
        Ok(self.run(assessment_text, note_id).await)
    }
}

fn dump_raw_output(
    debug_dir: &Path,
    note_id: Option<&str>,
    raw: &str,
    suffix: &str,
) -> std::io::Result<()> {
    std::fs::create_dir_all(debug_dir)?;
    let filename = format!("{}_{suffix}.txt", safe_note_id(note_id));
    std::fs::write(debug_dir.join(filename), raw)
}

fn safe_note_id(note_id: Option<&str>) -> String {
    let note_id = match note_id {
        Some(id) if !id.is_empty() => id,
        _ => return "unknown_note".to_string(),
    };
    note_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
