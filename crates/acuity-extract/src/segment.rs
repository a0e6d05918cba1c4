//! Assessment/Plan segmentation.
//!
//! Notes arrive as one flat text blob. The extraction target is the section
//! between the "Assessment / Plan" header (whitespace and slash variants
//! tolerated) and the next administrative stop header, or the end of the note.

use std::sync::LazyLock;

use regex::Regex;

static ASSESSMENT_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)assessment\s*/\s*plan").expect("static pattern"));

static STOP_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*(return to office|encounter sign[- ]?off)\b").expect("static pattern")
});

/// Extract the Assessment/Plan section from a full note.
///
/// Returns an empty string when no header is present; the caller decides how
/// to surface that.
pub fn extract_assessment_plan(note_text: &str) -> String {
    let Some(header) = ASSESSMENT_HEADER_RE.find(note_text) else {
        return String::new();
    };

    let remainder = note_text[header.end()..].trim_start_matches([' ', ':', '\n', '\r', '\t']);
    let remainder = match STOP_HEADER_RE.find(remainder) {
        Some(stop) => &remainder[..stop.start()],
        None => remainder,
    };
    remainder.trim().to_string()
}
