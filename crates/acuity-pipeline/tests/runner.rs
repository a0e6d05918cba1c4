use std::path::PathBuf;
use std::sync::Arc;

use acuity_core::models::HccMatch;
use acuity_extract::rule_based::RuleBasedExtractor;
use acuity_hcc::{HccCodeLookup, HccEvaluator};
use acuity_pipeline::notes::{iter_note_files, load_note_text};
use acuity_pipeline::output::{write_note_result, write_summary_csv};
use acuity_pipeline::runner::run_batch;
use acuity_pipeline::Pipeline;

fn pipeline() -> Arc<Pipeline<RuleBasedExtractor>> {
    let lookup = Arc::new(HccCodeLookup::from_rows(vec![HccMatch {
        code: "I10".to_string(),
        description: "Essential (primary) hypertension".to_string(),
        tags: None,
    }]));
    Arc::new(Pipeline::new(
        RuleBasedExtractor::new(),
        HccEvaluator::with_defaults(lookup),
    ))
}

fn write_note(dir: &std::path::Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("write note");
    path
}

const NOTE_BODY: &str = "Assessment / Plan\n1. HTN - I10\nReturn to Office\n";

#[tokio::test]
async fn batch_results_come_back_sorted_by_note_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_note(dir.path(), "b.txt", NOTE_BODY);
    write_note(dir.path(), "a.txt", NOTE_BODY);
    write_note(dir.path(), "c.txt", NOTE_BODY);

    let note_paths = iter_note_files(dir.path()).expect("list notes");
    let results = run_batch(pipeline(), note_paths, 4).await;

    let ids: Vec<&str> = results.iter().map(|r| r.note_id.as_str()).collect();
    assert_eq!(ids, vec!["a.txt", "b.txt", "c.txt"]);
    assert!(results.iter().all(|r| r.errors.is_empty()));
    assert!(results.iter().all(|r| r.conditions[0].hcc_relevant == Some(true)));
}

#[tokio::test]
async fn unreadable_note_fails_alone() {
    let dir = tempfile::tempdir().expect("tempdir");
    let good = write_note(dir.path(), "good.txt", NOTE_BODY);
    let missing = dir.path().join("missing.txt");

    let results = run_batch(pipeline(), vec![good, missing], 1).await;

    assert_eq!(results.len(), 2);
    let good_result = results.iter().find(|r| r.note_id == "good.txt").expect("good note");
    assert!(good_result.errors.is_empty());
    assert_eq!(good_result.conditions.len(), 1);

    let failed = results
        .iter()
        .find(|r| r.note_id == "missing.txt")
        .expect("failed note");
    assert_eq!(failed.errors, vec!["note_processing_failed".to_string()]);
    assert_eq!(failed.assessment_plan, "");
    assert!(failed.conditions.is_empty());
}

#[tokio::test]
async fn sequential_and_parallel_runs_agree() {
    let dir = tempfile::tempdir().expect("tempdir");
    for i in 0..6 {
        write_note(dir.path(), &format!("note-{i}.txt"), NOTE_BODY);
    }
    let note_paths = iter_note_files(dir.path()).expect("list notes");

    let sequential = run_batch(pipeline(), note_paths.clone(), 1).await;
    let parallel = run_batch(pipeline(), note_paths, 4).await;

    let ids = |results: &[acuity_core::models::NoteResult]| {
        results.iter().map(|r| r.note_id.clone()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&sequential), ids(&parallel));
}

#[test]
fn note_listing_is_sorted_and_files_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_note(dir.path(), "z.txt", "z");
    write_note(dir.path(), "a.txt", "a");
    std::fs::create_dir(dir.path().join("subdir")).expect("mkdir");

    let files = iter_note_files(dir.path()).expect("list notes");
    let names: Vec<String> = files
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    assert_eq!(names, vec!["a.txt", "z.txt"]);
}

#[test]
fn missing_notes_dir_is_an_error() {
    assert!(iter_note_files(std::path::Path::new("/nonexistent/notes")).is_err());
}

#[test]
fn non_utf8_notes_fall_back_to_latin1() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("latin1.txt");
    // "café" in Latin-1: 0xE9 is not valid UTF-8 on its own.
    std::fs::write(&path, [b'c', b'a', b'f', 0xE9]).expect("write");

    let text = load_note_text(&path).expect("decoded");
    assert_eq!(text, "café");
}

#[tokio::test]
async fn results_serialize_to_json_and_summary_csv() {
    let dir = tempfile::tempdir().expect("tempdir");
    let note = write_note(dir.path(), "note.txt", NOTE_BODY);

    let results = run_batch(pipeline(), vec![note], 1).await;

    let json_path = dir.path().join("note.txt.json");
    write_note_result(&json_path, &results[0]).expect("write json");
    let raw = std::fs::read_to_string(&json_path).expect("read json");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("valid json");
    assert_eq!(value["note_id"], "note.txt");
    // Optional fields are present as null, not omitted.
    assert!(value["conditions"][0].get("severity").is_some());

    let csv_path = dir.path().join("summary.csv");
    write_summary_csv(&csv_path, &results).expect("write csv");
    let summary = std::fs::read_to_string(&csv_path).expect("read csv");
    let mut lines = summary.lines();
    assert!(lines.next().expect("header").starts_with("note_id,condition"));
    let row = lines.next().expect("one condition row");
    assert!(row.contains("Hypertension"));
    assert!(row.contains("code"));
}
