//! Result serialization: one JSON file per note plus a tabular summary.

use std::path::Path;

use acuity_core::models::NoteResult;

use crate::error::PipelineError;

/// Write one note's result as pretty-printed JSON.
pub fn write_note_result(path: &Path, result: &NoteResult) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Write the batch summary: one row per condition per note.
pub fn write_summary_csv(path: &Path, results: &[NoteResult]) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "note_id",
        "condition",
        "icd10_code",
        "icd10_description",
        "clinical_status",
        "severity",
        "confidence",
        "hcc_relevant",
        "hcc_code",
        "hcc_description",
        "match_method",
    ])?;

    for result in results {
        for condition in &result.conditions {
            writer.write_record([
                result.note_id.as_str(),
                condition.condition.as_str(),
                condition.icd10_code.as_deref().unwrap_or(""),
                condition.icd10_description.as_deref().unwrap_or(""),
                condition.clinical_status.as_deref().unwrap_or(""),
                condition.severity.as_deref().unwrap_or(""),
                condition.confidence.map(|c| c.as_str()).unwrap_or(""),
                condition
                    .hcc_relevant
                    .map(|relevant| if relevant { "true" } else { "false" })
                    .unwrap_or(""),
                condition
                    .hcc_match
                    .as_ref()
                    .map(|m| m.code.as_str())
                    .unwrap_or(""),
                condition
                    .hcc_match
                    .as_ref()
                    .map(|m| m.description.as_str())
                    .unwrap_or(""),
                condition.match_method.map(|m| m.as_str()).unwrap_or(""),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}
