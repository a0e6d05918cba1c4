//! Deterministic rule-based condition extraction.
//!
//! Assessment/Plan sections are usually numbered problem lists. Each numbered
//! entry becomes a block; the block's first line names the condition, and the
//! rest of the block may carry a status word, a severity word, and one or
//! more ICD-10 codes with inline descriptions. No I/O and no failure modes,
//! which is why this is also the fallback when model-backed extraction comes
//! back unusable.

use std::sync::LazyLock;

use regex::Regex;

use acuity_core::models::Condition;
use acuity_core::text::{extract_icd10_codes, find_description_for_code};

use crate::{ConditionExtractor, ExtractError};

static BLOCK_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+[).]\s*").expect("static pattern"));

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(stable|improving|worsening|unchanged|acute|chronic)\b")
        .expect("static pattern")
});

static SEVERITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(mild|moderate|severe|end[- ]?stage)\b").expect("static pattern")
});

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleBasedExtractor;

impl RuleBasedExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extract conditions from segmented Assessment/Plan text.
    pub fn extract_conditions(&self, assessment_text: &str) -> Vec<Condition> {
        if assessment_text.trim().is_empty() {
            return Vec::new();
        }

        let lines: Vec<&str> = assessment_text.lines().map(str::trim_end).collect();

        let mut blocks: Vec<Vec<&str>> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for &line in &lines {
            if BLOCK_START_RE.is_match(line) {
                if !current.is_empty() {
                    blocks.push(std::mem::take(&mut current));
                }
                current.push(line);
            } else if !current.is_empty() {
                current.push(line);
            }
        }
        if !current.is_empty() {
            blocks.push(current);
        }

        // No numbered markers at all: treat the whole section as one block.
        if blocks.is_empty() {
            blocks.push(lines);
        }

        let mut conditions = Vec::new();
        for block in &blocks {
            let block_text = block
                .iter()
                .map(|part| part.trim())
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if block_text.is_empty() {
                continue;
            }

            let first_line = BLOCK_START_RE.replace(block[0], "");
            let mut condition_name = first_line.trim();
            for delim in [" - ", "-", ":"] {
                if let Some((head, _)) = condition_name.split_once(delim) {
                    condition_name = head;
                    break;
                }
            }
            let condition_name = condition_name.trim_matches([' ', '-', ':']);
            if condition_name.is_empty() {
                continue;
            }

            let clinical_status = STATUS_RE
                .captures(&block_text)
                .map(|c| c[1].to_lowercase());

            let severity = SEVERITY_RE.captures(&block_text).map(|c| {
                let value = c[1].to_lowercase();
                if value.contains("end") {
                    "severe".to_string()
                } else {
                    value
                }
            });

            let codes = extract_icd10_codes(&block_text);
            if codes.is_empty() {
                conditions.push(Condition {
                    condition: condition_name.to_string(),
                    clinical_status,
                    severity,
                    ..Condition::default()
                });
                continue;
            }

            for code in codes {
                let mut icd10_description = None;
                for line in block {
                    icd10_description = find_description_for_code(line, &code);
                    if icd10_description.is_some() {
                        break;
                    }
                }
                if icd10_description.is_none() {
                    icd10_description = find_description_for_code(&block_text, &code);
                }

                conditions.push(Condition {
                    condition: condition_name.to_string(),
                    icd10_code: Some(code),
                    icd10_description,
                    clinical_status: clinical_status.clone(),
                    severity: severity.clone(),
                    ..Condition::default()
                });
            }
        }

        conditions
    }
}

impl ConditionExtractor for RuleBasedExtractor {
    async fn extract(
        &self,
        assessment_text: &str,
        _note_id: Option<&str>,
    ) -> Result<Vec<Condition>, ExtractError> {
        Ok(self.extract_conditions(assessment_text))
    }
}
