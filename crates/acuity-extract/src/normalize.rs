//! Condition normalization and deduplication.
//!
//! Extracted records arrive messy: codes embedded in names, descriptions
//! carrying their own code prefix, abbreviations standing in for full
//! condition names, and the same diagnosis reported several times. This pass
//! canonicalizes every field, strips invalid codes (with a warning tag), and
//! merges duplicates under fixed priority rules. Running it on its own output
//! is a no-op.

use std::collections::HashMap;

use acuity_core::models::{Condition, Confidence, MatchMethod};
use acuity_core::text::{
    clean_text, expand_abbreviation, extract_icd10_codes, format_icd10_code, is_valid_icd10_code,
    normalize_description, normalize_icd10_code, split_code_description, strip_first_code,
};

/// Normalize every record, drop unusable ones, and merge duplicates.
/// Returns the surviving conditions and the accumulated warning tags.
pub fn post_process_conditions(conditions: Vec<Condition>) -> (Vec<Condition>, Vec<String>) {
    let mut normalized = Vec::new();
    let mut warnings = Vec::new();

    for condition in conditions {
        let (normalized_condition, condition_warnings) = normalize_condition_fields(&condition);
        warnings.extend(condition_warnings);
        if is_empty_condition(&normalized_condition) {
            warnings.push("condition_empty".to_string());
            continue;
        }
        normalized.push(normalized_condition);
    }

    (dedupe_conditions(normalized), warnings)
}

/// Canonicalize a single record's fields. Returns the cleaned condition and
/// any warning tags produced along the way.
pub fn normalize_condition_fields(condition: &Condition) -> (Condition, Vec<String>) {
    let mut warnings = Vec::new();
    let mut condition_text = condition.condition.clone();
    let mut icd10_code = condition.icd10_code.clone();
    let mut icd10_description = condition.icd10_description.clone();
    let clinical_status = condition.clinical_status.as_deref().and_then(clean_text);
    let severity = condition.severity.as_deref().and_then(clean_text);

    // The name itself may be a "<code> : <description>" pair.
    if let Some((code, description)) = split_code_description(&condition_text) {
        if icd10_code.is_none() {
            icd10_code = Some(code);
        }
        if icd10_description.is_none() && description.is_some() {
            icd10_description = description.clone();
        }
        if let Some(description) = description {
            condition_text = description;
        }
    }

    // So may the description field.
    if let Some(description_text) = icd10_description.clone() {
        if let Some((code, cleaned)) = split_code_description(&description_text) {
            if icd10_code.is_none() {
                icd10_code = Some(code);
            }
            icd10_description = cleaned;
        }
    }

    // No code yet: lift one embedded in the name, then in the description.
    if icd10_code.is_none() {
        let (stripped, code) = strip_first_code(&condition_text);
        if let Some(code) = code {
            icd10_code = Some(code);
            if !stripped.is_empty() {
                condition_text = stripped;
            }
        }
    }
    if icd10_code.is_none() {
        if let Some(description) = &icd10_description {
            if let Some(first) = extract_icd10_codes(description).into_iter().next() {
                icd10_code = Some(first);
            }
        }
    }

    if let Some(code) = &icd10_code {
        if !is_valid_icd10_code(code) {
            warnings.push(format!("invalid_icd10_code:{code}"));
            icd10_code = None;
        }
    }

    // A name that is just the code restated adds nothing; prefer the
    // description when one exists.
    if let Some(code) = &icd10_code {
        if clean_text(&condition_text).is_some()
            && normalize_icd10_code(&condition_text) == normalize_icd10_code(code)
        {
            if let Some(description) = &icd10_description {
                condition_text = description.clone();
            }
        }
    }

    condition_text = expand_abbreviation(&condition_text);
    let cleaned_condition = clean_text(&condition_text);
    let cleaned_description = icd10_description.as_deref().and_then(clean_text);

    let resolved_name = cleaned_condition
        .or_else(|| cleaned_description.clone())
        .or_else(|| icd10_code.as_deref().and_then(clean_text))
        .unwrap_or_else(|| condition.condition.clone());

    if resolved_name.is_empty() {
        warnings.push("condition_missing_name".to_string());
    }

    let normalized = Condition {
        condition: resolved_name,
        icd10_code: icd10_code.as_deref().and_then(format_icd10_code),
        icd10_description: cleaned_description,
        clinical_status,
        severity,
        confidence: condition.confidence,
        hcc_relevant: condition.hcc_relevant,
        hcc_match: condition.hcc_match.clone(),
        match_method: condition.match_method,
    };
    (normalized, warnings)
}

fn is_empty_condition(condition: &Condition) -> bool {
    clean_text(&condition.condition).is_none()
        && condition
            .icd10_description
            .as_deref()
            .and_then(clean_text)
            .is_none()
        && condition.icd10_code.as_deref().and_then(clean_text).is_none()
}

/// Identity key for deduplication: normalized code, else normalized
/// description, else normalized name.
#[derive(Debug, PartialEq, Eq, Hash)]
enum ConditionKey {
    Code(String),
    Description(String),
    Name(String),
}

fn condition_key(condition: &Condition) -> ConditionKey {
    let code_key = condition
        .icd10_code
        .as_deref()
        .map(normalize_icd10_code)
        .unwrap_or_default();
    if !code_key.is_empty() {
        return ConditionKey::Code(code_key);
    }
    let description_key = condition
        .icd10_description
        .as_deref()
        .map(normalize_description)
        .unwrap_or_default();
    if !description_key.is_empty() {
        return ConditionKey::Description(description_key);
    }
    ConditionKey::Name(normalize_description(&condition.condition))
}

fn dedupe_conditions(conditions: Vec<Condition>) -> Vec<Condition> {
    let mut merged: Vec<Condition> = Vec::new();
    let mut index_by_key: HashMap<ConditionKey, usize> = HashMap::new();

    for condition in conditions {
        let key = condition_key(&condition);
        if let Some(&idx) = index_by_key.get(&key) {
            merged[idx] = merge_conditions(&merged[idx], &condition);
            continue;
        }
        index_by_key.insert(key, merged.len());
        merged.push(condition);
    }

    merged
}

fn merge_conditions(left: &Condition, right: &Condition) -> Condition {
    Condition {
        condition: prefer_longer(&left.condition, &right.condition),
        icd10_code: left.icd10_code.clone().or_else(|| right.icd10_code.clone()),
        icd10_description: prefer_longer_opt(&left.icd10_description, &right.icd10_description),
        clinical_status: prefer_longer_opt(&left.clinical_status, &right.clinical_status),
        severity: prefer_longer_opt(&left.severity, &right.severity),
        confidence: merge_confidence(left.confidence, right.confidence),
        hcc_relevant: merge_relevance(left.hcc_relevant, right.hcc_relevant),
        hcc_match: left.hcc_match.clone().or_else(|| right.hcc_match.clone()),
        match_method: merge_match_method(left.match_method, right.match_method),
    }
}

fn prefer_longer(left: &str, right: &str) -> String {
    if left.is_empty() {
        return right.to_string();
    }
    if right.is_empty() {
        return left.to_string();
    }
    if right.len() > left.len() {
        right.to_string()
    } else {
        left.to_string()
    }
}

fn prefer_longer_opt(left: &Option<String>, right: &Option<String>) -> Option<String> {
    match (left, right) {
        (None, _) => right.clone(),
        (_, None) => left.clone(),
        (Some(l), Some(r)) => Some(prefer_longer(l, r)),
    }
}

fn merge_confidence(left: Option<Confidence>, right: Option<Confidence>) -> Option<Confidence> {
    match (left, right) {
        (None, _) => right,
        (_, None) => left,
        (Some(l), Some(r)) => Some(if l.priority() >= r.priority() { l } else { r }),
    }
}

fn merge_match_method(left: Option<MatchMethod>, right: Option<MatchMethod>) -> Option<MatchMethod> {
    match (left, right) {
        (None, _) => right,
        (_, None) => left,
        (Some(l), Some(r)) => Some(if l.priority() >= r.priority() { l } else { r }),
    }
}

/// Tri-state relevance: a confirmed match dominates a confirmed miss, which
/// dominates "never evaluated".
fn merge_relevance(left: Option<bool>, right: Option<bool>) -> Option<bool> {
    if left == Some(true) || right == Some(true) {
        return Some(true);
    }
    if left == Some(false) || right == Some(false) {
        return Some(false);
    }
    None
}
