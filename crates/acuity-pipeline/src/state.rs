//! Per-note pipeline state.
//!
//! Each stage reads the current state and returns a delta; the orchestrator
//! merges deltas. Later stages only add or replace their own fields and
//! append error tags; nothing is ever removed. The state lives for one
//! note's processing and is discarded once a result is produced.

use acuity_core::models::Condition;

#[derive(Debug, Clone)]
pub struct PipelineState {
    pub note_id: String,
    pub note_text: String,
    pub assessment_plan: String,
    pub conditions: Vec<Condition>,
    pub errors: Vec<String>,
}

impl PipelineState {
    pub fn new(note_id: impl Into<String>, note_text: impl Into<String>) -> Self {
        Self {
            note_id: note_id.into(),
            note_text: note_text.into(),
            assessment_plan: String::new(),
            conditions: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Merge a stage's delta. Error tags already present are not repeated.
    pub fn apply(&mut self, update: StageUpdate) {
        if let Some(assessment_plan) = update.assessment_plan {
            self.assessment_plan = assessment_plan;
        }
        if let Some(conditions) = update.conditions {
            self.conditions = conditions;
        }
        for tag in update.errors {
            if !self.errors.contains(&tag) {
                self.errors.push(tag);
            }
        }
    }
}

/// What one stage contributes: its own fields, plus any error tags.
#[derive(Debug, Default)]
pub struct StageUpdate {
    pub assessment_plan: Option<String>,
    pub conditions: Option<Vec<Condition>>,
    pub errors: Vec<String>,
}
