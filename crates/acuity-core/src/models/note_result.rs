use serde::{Deserialize, Serialize};

use crate::models::condition::Condition;

/// Aggregate output for one processed note. Created once by the pipeline and
/// never mutated after return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteResult {
    pub note_id: String,
    pub source_file: String,
    pub assessment_plan: String,
    pub conditions: Vec<Condition>,
    pub errors: Vec<String>,
    pub created_at: jiff::Timestamp,
}

impl NoteResult {
    pub fn new(
        note_id: impl Into<String>,
        source_file: impl Into<String>,
        assessment_plan: impl Into<String>,
        conditions: Vec<Condition>,
        errors: Vec<String>,
    ) -> Self {
        Self {
            note_id: note_id.into(),
            source_file: source_file.into(),
            assessment_plan: assessment_plan.into(),
            conditions,
            errors,
            created_at: jiff::Timestamp::now(),
        }
    }
}
