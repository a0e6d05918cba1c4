//! Model-output salvage parsing.
//!
//! Language models asked for JSON return JSON most of the time, and fenced
//! JSON, single-quoted pseudo-JSON, prose-wrapped JSON, or bare lists the
//! rest of the time. This module converts a raw model response into a typed
//! condition list, escalating from a strict parse through sanitization,
//! loose-literal translation, and a balanced-bracket scan, and reports
//! whether salvage was needed.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use acuity_core::models::{Condition, Confidence};

/// One candidate condition as the model reported it, before normalization.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LlmConditionPayload {
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub icd10_code: Option<String>,
    #[serde(default)]
    pub icd10_description: Option<String>,
    #[serde(default)]
    pub clinical_status: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub confidence: Option<String>,
}

/// The typed shape of a model extraction response.
#[derive(Debug, Default, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub conditions: Vec<LlmConditionPayload>,
}

static CODE_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?si)```(?:json)?\s*(.*?)```").expect("static pattern")
});

static NULL_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:NULL|NONE|N/A)\b").expect("static pattern"));

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("static pattern"));

static UNQUOTED_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([{\[,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").expect("static pattern")
});

/// Parse a raw model response into a typed response plus a flag indicating
/// whether salvage was required (no direct parse succeeded, or the final
/// result is empty).
pub fn parse_response(text: &str) -> (LlmResponse, bool) {
    let stripped = strip_code_fence(text.trim());
    let sanitized = sanitize_json_text(stripped);

    for candidate in [stripped, sanitized.as_str()] {
        if candidate.is_empty() {
            continue;
        }
        if candidate.trim_start().starts_with('[') {
            if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                return (coerce_response(value), false);
            }
        } else if let Ok(response) = serde_json::from_str::<LlmResponse>(candidate) {
            return (response, false);
        }
    }

    let mut parse_error = false;
    let payload = match parse_json_like(stripped) {
        Some(payload) => payload,
        None => {
            parse_error = true;
            extract_json_payload(stripped)
        }
    };

    let response = coerce_response(payload);
    if response.conditions.is_empty() {
        return (response, true);
    }
    (response, parse_error)
}

/// Convert a typed response into condition records, dropping items with no
/// usable name/description/code.
pub fn conditions_from_response(response: &LlmResponse) -> Vec<Condition> {
    let mut conditions = Vec::new();
    for item in &response.conditions {
        let name = [&item.condition, &item.icd10_description, &item.icd10_code]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .map(str::trim)
            .find(|value| !value.is_empty());
        let Some(name) = name else {
            continue;
        };
        conditions.push(Condition {
            condition: name.to_string(),
            icd10_code: nullify(&item.icd10_code),
            icd10_description: nullify(&item.icd10_description),
            clinical_status: nullify(&item.clinical_status),
            severity: nullify(&item.severity),
            confidence: item.confidence.as_deref().and_then(Confidence::parse),
            ..Condition::default()
        });
    }
    conditions
}

fn nullify(value: &Option<String>) -> Option<String> {
    let trimmed = value.as_deref()?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Strip one surrounding triple-backtick fence (optional `json` tag).
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE_RE.captures(text) {
        Some(captures) => captures.get(1).map(|m| m.as_str().trim()).unwrap_or(text),
        None => text,
    }
}

/// Mechanical cleanup of near-JSON: smart quotes, NULL/NONE/N-A tokens,
/// trailing commas, unquoted object keys.
pub fn sanitize_json_text(text: &str) -> String {
    let text = text
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    let text = NULL_TOKEN_RE.replace_all(&text, "null");
    let text = TRAILING_COMMA_RE.replace_all(&text, "${1}");
    UNQUOTED_KEY_RE
        .replace_all(&text, "${1}\"${2}\":")
        .into_owned()
}

/// Best-effort parse of JSON-ish text: strict JSON, then a Python-literal
/// translation, then both again on the sanitized text.
pub fn parse_json_like(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text) {
        return Some(value);
    }
    if let Ok(value) = serde_json::from_str(&python_literal_to_json(text)) {
        return Some(value);
    }
    let cleaned = sanitize_json_text(text);
    if let Ok(value) = serde_json::from_str(&cleaned) {
        return Some(value);
    }
    serde_json::from_str(&python_literal_to_json(&cleaned)).ok()
}

/// Translate Python-literal syntax into JSON: single-quoted strings become
/// double-quoted (escapes adjusted), and bare `True`/`False`/`None` become
/// `true`/`false`/`null`. Double-quoted strings pass through untouched.
fn python_literal_to_json(text: &str) -> String {
    #[derive(PartialEq)]
    enum State {
        Outside,
        Single,
        Double,
    }

    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let mut state = State::Outside;
    let mut chars = text.chars();

    let flush_word = |out: &mut String, word: &mut String| {
        if !word.is_empty() {
            match word.as_str() {
                "True" => out.push_str("true"),
                "False" => out.push_str("false"),
                "None" => out.push_str("null"),
                other => out.push_str(other),
            }
            word.clear();
        }
    };

    while let Some(c) = chars.next() {
        match state {
            State::Outside => match c {
                '\'' => {
                    flush_word(&mut out, &mut word);
                    out.push('"');
                    state = State::Single;
                }
                '"' => {
                    flush_word(&mut out, &mut word);
                    out.push('"');
                    state = State::Double;
                }
                c if c.is_ascii_alphanumeric() || c == '_' => word.push(c),
                c => {
                    flush_word(&mut out, &mut word);
                    out.push(c);
                }
            },
            State::Single => match c {
                '\\' => {
                    // Unwrap \' (not a JSON escape); keep everything else.
                    match chars.next() {
                        Some('\'') => out.push('\''),
                        Some(next) => {
                            out.push('\\');
                            out.push(next);
                        }
                        None => out.push('\\'),
                    }
                }
                '"' => out.push_str("\\\""),
                '\'' => {
                    out.push('"');
                    state = State::Outside;
                }
                c => out.push(c),
            },
            State::Double => match c {
                '\\' => {
                    out.push('\\');
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                '"' => {
                    out.push('"');
                    state = State::Outside;
                }
                c => out.push(c),
            },
        }
    }
    flush_word(&mut out, &mut word);
    out
}

/// Longest balanced-bracket substrings of `text`, tracking `{}` and `[]`
/// nesting independently, in scan order.
pub fn iter_json_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    for (open, close) in [('{', '}'), ('[', ']')] {
        let mut depth = 0usize;
        let mut start = None;
        for (idx, c) in text.char_indices() {
            if c == open {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            } else if c == close && depth > 0 {
                depth -= 1;
                if depth == 0 {
                    if let Some(begin) = start.take() {
                        candidates.push(&text[begin..=idx]);
                    }
                }
            }
        }
    }
    candidates
}

/// Last-resort payload extraction: parse the whole text loosely, then each
/// balanced-bracket candidate, preferring one keyed `conditions`, else the
/// first recognizable object, else an empty-conditions object.
fn extract_json_payload(text: &str) -> Value {
    let text = strip_code_fence(text.trim());
    if text.is_empty() {
        return json!({ "conditions": [] });
    }

    if let Some(payload) = parse_json_like(text) {
        match payload {
            Value::Object(map) => return Value::Object(map),
            Value::Array(items) => return json!({ "conditions": items }),
            _ => {}
        }
    }

    let mut best: Option<Value> = None;
    for candidate in iter_json_candidates(text) {
        let Some(payload) = parse_json_like(candidate) else {
            continue;
        };
        let normalized = normalize_payload(payload);
        if let Value::Object(map) = normalized {
            if map.contains_key("conditions") {
                return Value::Object(map);
            }
            if best.is_none() {
                best = Some(Value::Object(map));
            }
        }
    }

    best.unwrap_or_else(|| json!({ "conditions": [] }))
}

/// Reshape a parsed payload so its condition list sits under `conditions`:
/// case-insensitive `conditions`/`items`/`results`/`data` keys are adopted,
/// a bare list is wrapped, and an object that itself looks like a single
/// condition becomes a one-element list.
fn normalize_payload(payload: Value) -> Value {
    match payload {
        Value::Object(map) => {
            if map.contains_key("conditions") {
                return Value::Object(map);
            }
            for (key, value) in &map {
                if key.to_lowercase() == "conditions" {
                    return json!({ "conditions": value.clone() });
                }
            }
            for (key, value) in &map {
                if matches!(key.to_lowercase().as_str(), "items" | "results" | "data") {
                    return json!({ "conditions": value.clone() });
                }
            }
            if looks_like_condition(&map) {
                return json!({ "conditions": [Value::Object(map)] });
            }
            Value::Object(map)
        }
        Value::Array(items) => json!({ "conditions": items }),
        other => other,
    }
}

/// Coerce an arbitrary parsed payload into the typed response, mapping key
/// variants onto canonical field names and silently dropping items that fail
/// structural validation.
fn coerce_response(payload: Value) -> LlmResponse {
    let normalized = normalize_payload(payload);
    let raw_items = match normalized {
        Value::Object(mut map) => map.remove("conditions").unwrap_or(Value::Array(Vec::new())),
        Value::Array(items) => Value::Array(items),
        _ => Value::Array(Vec::new()),
    };
    let raw_items = match raw_items {
        Value::Array(items) => items,
        Value::Object(map) => vec![Value::Object(map)],
        _ => Vec::new(),
    };

    let mut items = Vec::new();
    for item in raw_items {
        let Some(normalized_item) = normalize_condition_item(&item) else {
            continue;
        };
        if let Ok(payload) =
            serde_json::from_value::<LlmConditionPayload>(Value::Object(normalized_item))
        {
            items.push(payload);
        }
    }
    LlmResponse { conditions: items }
}

/// Map one raw item onto canonical field names. Bare strings become a
/// name-only condition; non-objects and objects with no recognizable keys
/// are dropped.
fn normalize_condition_item(item: &Value) -> Option<Map<String, Value>> {
    if let Value::String(text) = item {
        let mut map = Map::new();
        map.insert("condition".to_string(), Value::String(text.clone()));
        return Some(map);
    }
    let Value::Object(fields) = item else {
        return None;
    };

    let mut normalized = Map::new();
    for (key, value) in fields {
        let Some(canonical) = canonical_key(key) else {
            continue;
        };
        // A nested code object ({"code": ..., "description": ...}) is
        // flattened into the two flat fields.
        if canonical == "icd10_code" {
            if let Value::Object(code_fields) = value {
                let code_value = code_fields.get("code").or_else(|| code_fields.get("value"));
                let desc_value = code_fields
                    .get("description")
                    .or_else(|| code_fields.get("desc"));
                if let Some(code) = code_value {
                    normalized.insert("icd10_code".to_string(), code.clone());
                }
                if let Some(desc) = desc_value {
                    if !normalized.contains_key("icd10_description") {
                        normalized.insert("icd10_description".to_string(), desc.clone());
                    }
                }
                continue;
            }
        }
        normalized.insert(canonical.to_string(), value.clone());
    }

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn canonical_key(key: &str) -> Option<&'static str> {
    let cleaned: String = key
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    match cleaned.as_str() {
        "condition" | "conditionname" | "name" | "diagnosis" | "dx" | "problem" | "problemname" => {
            Some("condition")
        }
        "icd10" | "icd10code" | "icd10cm" | "code" => Some("icd10_code"),
        "icd10description" | "icd10desc" | "description" | "desc" => Some("icd10_description"),
        "clinicalstatus" | "status" => Some("clinical_status"),
        "severity" => Some("severity"),
        "confidence" => Some("confidence"),
        _ => None,
    }
}

fn looks_like_condition(map: &Map<String, Value>) -> bool {
    map.keys().any(|key| canonical_key(key).is_some())
}
