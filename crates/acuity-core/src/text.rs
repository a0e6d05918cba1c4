//! ICD-10 code and description normalization.
//!
//! Clinical notes and model output write the same diagnosis in many shapes:
//! `I50.22`, `i5022`, `Hypertension (I10)`, `E11.9 - Type 2 diabetes`. These
//! helpers reduce codes and descriptions to canonical comparison forms and
//! pull embedded code/description pairs out of free text.

use std::sync::LazyLock;

use regex::Regex;

/// An ICD-10-CM-shaped token: one letter (no U), two digits, optional 1–4
/// alphanumeric/decimal suffix. Word-bounded, case-insensitive.
const ICD10_TOKEN: &str = r"[A-TV-Z][0-9]{2}(?:\.[0-9A-TV-Z]{1,4}|[0-9A-TV-Z]{1,4})?";

static ICD10_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b{ICD10_TOKEN}\b")).expect("static pattern")
});

static ICD10_NORMALIZED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[A-TV-Z][0-9]{2}[0-9A-TV-Z]{0,4}$").expect("static pattern")
});

static CODE_DESC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)^\s*({ICD10_TOKEN})\s*[:\-]\s*(.+)$")).expect("static pattern")
});

static EMPTY_PARENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\s*\)").expect("static pattern"));

/// Canonical comparison form of a code: alphanumerics only, uppercase.
///
/// `normalize_icd10_code("I50.22") == "I5022"`.
pub fn normalize_icd10_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

/// Canonical comparison form of a description: lowercase, punctuation runs
/// collapsed to single spaces, trimmed.
pub fn normalize_description(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Display form of a code: normalized, with the dot re-inserted after the
/// category (first three characters) when a suffix exists.
pub fn format_icd10_code(code: &str) -> Option<String> {
    let normalized = normalize_icd10_code(code);
    if normalized.is_empty() {
        return None;
    }
    if normalized.len() <= 3 {
        return Some(normalized);
    }
    Some(format!("{}.{}", &normalized[..3], &normalized[3..]))
}

/// Whether a code matches the strict ICD-10 shape after normalization.
pub fn is_valid_icd10_code(code: &str) -> bool {
    let normalized = normalize_icd10_code(code);
    !normalized.is_empty() && ICD10_NORMALIZED_RE.is_match(&normalized)
}

/// All ICD-10-shaped tokens in `text`, in order of appearance, deduplicated
/// by normalized form. The raw appearance (dots, case) is preserved.
pub fn extract_icd10_codes(text: &str) -> Vec<String> {
    let mut codes = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for m in ICD10_RE.find_iter(text) {
        let normalized = normalize_icd10_code(m.as_str());
        if normalized.is_empty() || !seen.insert(normalized) {
            continue;
        }
        codes.push(m.as_str().to_string());
    }
    codes
}

/// Split a `"<code> : <description>"` / `"<code> - <description>"` string.
/// Returns the raw code and the cleaned description.
pub fn split_code_description(text: &str) -> Option<(String, Option<String>)> {
    let captures = CODE_DESC_RE.captures(text.trim())?;
    let code = captures.get(1)?.as_str().to_string();
    let description = clean_text(captures.get(2).map(|m| m.as_str()).unwrap_or(""));
    Some((code, description))
}

/// Find the description written after `code` in `text`, as
/// `"<code> : <description>"` or `"<code> - <description>"` running to the
/// end of the text. Case-insensitive on the code.
pub fn find_description_for_code(text: &str, code: &str) -> Option<String> {
    if text.is_empty() || code.is_empty() {
        return None;
    }
    let pattern = format!(r"(?i){}\s*[:\-]\s*(.+)$", regex::escape(code));
    let re = Regex::new(&pattern).ok()?;
    let captures = re.captures(text)?;
    clean_text(captures.get(1)?.as_str())
}

/// Remove the first ICD-10-shaped token from `text`, collapsing the hole
/// (and any parentheses it leaves empty). Returns the stripped text and the
/// removed code, if any.
pub fn strip_first_code(text: &str) -> (String, Option<String>) {
    let Some(m) = ICD10_RE.find(text) else {
        return (text.to_string(), None);
    };
    let code = m.as_str().to_string();
    let stitched = format!("{} {}", &text[..m.start()], &text[m.end()..]);
    let without_parens = EMPTY_PARENS_RE.replace_all(&stitched, "");
    let collapsed = without_parens.split_whitespace().collect::<Vec<_>>().join(" ");
    let stripped = collapsed.trim_matches([' ', '-', ':', ';']).to_string();
    (stripped, Some(code))
}

/// Collapse whitespace and strip boundary ` -:;`. Empty results become None.
pub fn clean_text(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned = collapsed.trim_matches([' ', '-', ':', ';']);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Expand a known clinical abbreviation when the whole text matches one
/// (case/punctuation-insensitive). Unknown text passes through unchanged.
pub fn expand_abbreviation(text: &str) -> String {
    let key: String = text
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase();
    if key.is_empty() {
        return text.to_string();
    }
    match abbreviation_expansion(&key) {
        Some(expanded) => expanded.to_string(),
        None => text.to_string(),
    }
}

fn abbreviation_expansion(key: &str) -> Option<&'static str> {
    match key {
        "cad" => Some("Coronary artery disease"),
        "chf" => Some("Congestive heart failure"),
        "ckd" => Some("Chronic kidney disease"),
        "copd" => Some("Chronic obstructive pulmonary disease"),
        "dm" => Some("Diabetes mellitus"),
        "gerd" => Some("Gastroesophageal reflux disease"),
        "hld" => Some("Hyperlipidemia"),
        "htn" => Some("Hypertension"),
        "ibd" => Some("Inflammatory bowel disease"),
        "mdd" => Some("Major depressive disorder"),
        "sud" => Some("Substance use disorder"),
        "t1dm" => Some("Type 1 diabetes mellitus"),
        "t2dm" => Some("Type 2 diabetes mellitus"),
        _ => None,
    }
}

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
