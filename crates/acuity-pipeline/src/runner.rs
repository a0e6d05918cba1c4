//! Batch execution over a bounded worker pool.
//!
//! Each note is processed by its own task; a bounded semaphore caps
//! concurrency (1 = sequential). A note that panics or cannot be read yields
//! the forced `note_processing_failed` result and leaves its siblings alone.

use std::path::PathBuf;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use acuity_core::models::NoteResult;
use acuity_extract::ConditionExtractor;

use crate::notes::load_note_text;
use crate::pipeline::Pipeline;

/// Process every note file, `max_workers` at a time. Results come back
/// sorted by note id.
pub async fn run_batch<E>(
    pipeline: Arc<Pipeline<E>>,
    note_paths: Vec<PathBuf>,
    max_workers: usize,
) -> Vec<NoteResult>
where
    E: ConditionExtractor + 'static,
{
    let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut tasks = JoinSet::new();

    for note_path in note_paths {
        let pipeline = Arc::clone(&pipeline);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            // Semaphore is never closed, so acquire cannot fail.
            let _permit = semaphore.acquire_owned().await;
            process_one(pipeline, note_path).await
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(err) => {
                // The task itself died before it could produce a result;
                // there is no note id left to report against.
                error!(%err, "note task aborted");
            }
        }
    }

    results.sort_by(|a, b| a.note_id.cmp(&b.note_id));
    info!(notes = results.len(), "batch complete");
    results
}

async fn process_one<E>(pipeline: Arc<Pipeline<E>>, note_path: PathBuf) -> NoteResult
where
    E: ConditionExtractor,
{
    let note_id = note_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| note_path.display().to_string());
    let source_file = note_path.display().to_string();

    let note_text = match load_note_text(&note_path) {
        Ok(text) => text,
        Err(err) => {
            error!(note_id = %note_id, %err, "failed to read note");
            return failed_note_result(&note_id, &source_file);
        }
    };

    let processed = std::panic::AssertUnwindSafe(pipeline.process_note(
        &note_id,
        &note_text,
        &source_file,
    ))
    .catch_unwind()
    .await;

    match processed {
        Ok(result) => result,
        Err(_) => {
            error!(note_id = %note_id, "note processing panicked");
            failed_note_result(&note_id, &source_file)
        }
    }
}

/// The forced result for a note whose processing failed outright: empty
/// assessment and conditions, a single tag. Partial progress is intentionally
/// discarded to keep the failure visible.
fn failed_note_result(note_id: &str, source_file: &str) -> NoteResult {
    NoteResult::new(
        note_id,
        source_file,
        "",
        Vec::new(),
        vec!["note_processing_failed".to_string()],
    )
}
