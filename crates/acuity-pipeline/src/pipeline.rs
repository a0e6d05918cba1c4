//! The three-stage per-note orchestrator.
//!
//! Segment → extract+normalize → evaluate, each stage a function of the
//! current state returning a delta. Every stage failure, whether an extractor
//! error or an outright panic, becomes an error tag on the running list, and the
//! pipeline always completes with a well-formed [`NoteResult`].

use futures::FutureExt;
use tracing::error;

use acuity_core::models::NoteResult;
use acuity_extract::normalize::post_process_conditions;
use acuity_extract::segment::extract_assessment_plan;
use acuity_extract::ConditionExtractor;
use acuity_hcc::HccEvaluator;

use crate::state::{PipelineState, StageUpdate};

pub struct Pipeline<E> {
    extractor: E,
    evaluator: HccEvaluator,
}

impl<E: ConditionExtractor> Pipeline<E> {
    pub fn new(extractor: E, evaluator: HccEvaluator) -> Self {
        Self {
            extractor,
            evaluator,
        }
    }

    /// Run one note through all three stages. Never fails; diagnostics end up
    /// in the result's `errors`.
    pub async fn process_note(
        &self,
        note_id: &str,
        note_text: &str,
        source_file: &str,
    ) -> NoteResult {
        let mut state = PipelineState::new(note_id, note_text);

        let update = segment_stage(&state);
        state.apply(update);

        let update = self.extract_stage(&state).await;
        state.apply(update);

        let update = self.evaluate_stage(&state);
        state.apply(update);

        NoteResult::new(
            note_id,
            source_file,
            state.assessment_plan,
            state.conditions,
            state.errors,
        )
    }

    async fn extract_stage(&self, state: &PipelineState) -> StageUpdate {
        let extraction = std::panic::AssertUnwindSafe(
            self.extractor
                .extract(&state.assessment_plan, Some(&state.note_id)),
        )
        .catch_unwind()
        .await;

        match extraction {
            Ok(Ok(conditions)) => {
                let (conditions, warnings) = post_process_conditions(conditions);
                StageUpdate {
                    conditions: Some(conditions),
                    errors: warnings,
                    ..StageUpdate::default()
                }
            }
            Ok(Err(err)) => {
                error!(note_id = %state.note_id, %err, "condition extraction failed");
                extraction_failed_update()
            }
            Err(_) => {
                error!(note_id = %state.note_id, "condition extraction panicked");
                extraction_failed_update()
            }
        }
    }

    fn evaluate_stage(&self, state: &PipelineState) -> StageUpdate {
        let conditions = state.conditions.clone();
        let evaluated = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.evaluator.evaluate(conditions)
        }));

        match evaluated {
            Ok(conditions) => StageUpdate {
                conditions: Some(conditions),
                ..StageUpdate::default()
            },
            Err(_) => {
                error!(note_id = %state.note_id, "HCC evaluation panicked");
                // The note keeps its pre-evaluation, unannotated conditions.
                StageUpdate {
                    errors: vec!["hcc_evaluation_failed".to_string()],
                    ..StageUpdate::default()
                }
            }
        }
    }
}

fn segment_stage(state: &PipelineState) -> StageUpdate {
    let assessment_plan = extract_assessment_plan(&state.note_text);
    let errors = if assessment_plan.is_empty() {
        vec!["assessment_plan_not_found".to_string()]
    } else {
        Vec::new()
    };
    StageUpdate {
        assessment_plan: Some(assessment_plan),
        errors,
        conditions: None,
    }
}

fn extraction_failed_update() -> StageUpdate {
    StageUpdate {
        conditions: Some(Vec::new()),
        errors: vec!["condition_extraction_failed".to_string()],
        ..StageUpdate::default()
    }
}
