use std::io::Write;
use std::sync::Arc;

use acuity_core::models::{Condition, HccMatch, MatchMethod};
use acuity_extract::normalize::post_process_conditions;
use acuity_hcc::{HccCodeLookup, HccEvaluator};

fn row(code: &str, description: &str) -> HccMatch {
    HccMatch {
        code: code.to_string(),
        description: description.to_string(),
        tags: None,
    }
}

fn lookup(rows: Vec<HccMatch>) -> Arc<HccCodeLookup> {
    Arc::new(HccCodeLookup::from_rows(rows))
}

#[test]
fn exact_code_match_wins_first() {
    let lookup = lookup(vec![row("I5022", "Chronic systolic heart failure")]);
    let evaluator = HccEvaluator::with_defaults(lookup);

    let conditions = evaluator.evaluate(vec![Condition {
        condition: "CHF".to_string(),
        icd10_code: Some("I50.22".to_string()),
        ..Condition::default()
    }]);

    assert_eq!(conditions[0].hcc_relevant, Some(true));
    assert_eq!(conditions[0].match_method, Some(MatchMethod::Code));
    let matched = conditions[0].hcc_match.as_ref().expect("match present");
    assert_eq!(matched.code, "I5022");
    // Missing description is backfilled from the reference row.
    assert_eq!(
        conditions[0].icd10_description.as_deref(),
        Some("Chronic systolic heart failure")
    );
}

#[test]
fn exact_description_match_is_case_and_punctuation_insensitive() {
    let lookup = lookup(vec![row(
        "E1122",
        "Type 2 diabetes mellitus with diabetic chronic kidney disease",
    )]);
    let evaluator = HccEvaluator::with_defaults(lookup);

    let conditions = evaluator.evaluate(vec![Condition::named(
        "Type 2 Diabetes Mellitus, with diabetic chronic kidney disease",
    )]);

    assert_eq!(conditions[0].hcc_relevant, Some(true));
    assert_eq!(
        conditions[0].match_method,
        Some(MatchMethod::DescriptionExact)
    );
}

#[test]
fn abbreviation_expansion_enables_partial_match() {
    let lookup = lookup(vec![row(
        "J449",
        "Chronic obstructive pulmonary disease, unspecified",
    )]);
    let evaluator = HccEvaluator::with_defaults(lookup);

    let (conditions, _warnings) = post_process_conditions(vec![Condition::named("COPD")]);
    let conditions = evaluator.evaluate(conditions);

    assert_eq!(conditions[0].hcc_relevant, Some(true));
    assert_eq!(
        conditions[0].match_method,
        Some(MatchMethod::DescriptionPartial)
    );
    assert_eq!(
        conditions[0].icd10_description.as_deref(),
        Some("Chronic obstructive pulmonary disease, unspecified")
    );
}

#[test]
fn ambiguous_partial_match_is_rejected() {
    let lookup = lookup(vec![
        row(
            "E1122",
            "Type 2 diabetes mellitus with diabetic chronic kidney disease",
        ),
        row("E1121", "Type 2 diabetes mellitus with diabetic nephropathy"),
    ]);
    let evaluator = HccEvaluator::with_defaults(lookup);

    let conditions = evaluator.evaluate(vec![Condition::named("Type 2 diabetes mellitus")]);

    assert_eq!(conditions[0].hcc_relevant, Some(false));
    assert_eq!(conditions[0].match_method, None);
}

#[test]
fn fuzzy_description_match_clears_cutoff() {
    let lookup = lookup(vec![row("N184", "Chronic kidney disease, stage 4 (severe)")]);
    let evaluator = HccEvaluator::new(lookup, true, 0.85);

    let conditions =
        evaluator.evaluate(vec![Condition::named("Chronic kidney disease stage four")]);

    assert_eq!(conditions[0].hcc_relevant, Some(true));
    assert_eq!(
        conditions[0].match_method,
        Some(MatchMethod::DescriptionFuzzy)
    );
}

#[test]
fn fuzzy_match_disabled_means_no_fuzzy_strategies() {
    let lookup = lookup(vec![row("N184", "Chronic kidney disease, stage 4 (severe)")]);
    let evaluator = HccEvaluator::new(lookup, false, 0.85);

    let conditions =
        evaluator.evaluate(vec![Condition::named("Chronic kidney disease stage four")]);

    assert_eq!(conditions[0].hcc_relevant, Some(false));
    assert_eq!(conditions[0].match_method, None);
}

#[test]
fn code_prefix_fuzzy_matches_on_shared_prefix() {
    let lookup = lookup(vec![row("N184", "Chronic kidney disease, stage 4 (severe)")]);
    // Cutoff high enough that the description-fuzzy strategy rejects.
    let evaluator = HccEvaluator::new(lookup, true, 0.99);

    let conditions = evaluator.evaluate(vec![Condition {
        condition: "CKD stage five".to_string(),
        icd10_code: Some("N18.9".to_string()),
        icd10_description: Some("Chronic kidney disease stage five".to_string()),
        ..Condition::default()
    }]);

    assert_eq!(conditions[0].hcc_relevant, Some(true));
    assert_eq!(
        conditions[0].match_method,
        Some(MatchMethod::CodePrefixFuzzy)
    );
    assert_eq!(
        conditions[0].hcc_match.as_ref().map(|m| m.code.as_str()),
        Some("N184")
    );
}

#[test]
fn unrelated_condition_matches_nothing() {
    let lookup = lookup(vec![row("I5022", "Chronic systolic heart failure")]);
    let evaluator = HccEvaluator::with_defaults(lookup);

    let conditions = evaluator.evaluate(vec![Condition::named("Seasonal allergies")]);

    assert_eq!(conditions[0].hcc_relevant, Some(false));
    assert_eq!(conditions[0].match_method, None);
    assert!(conditions[0].hcc_match.is_none());
}

#[test]
fn loads_reference_table_from_csv() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "ICD-10-CM Codes,Description,Tags").expect("write");
    writeln!(
        file,
        "I50.22,Chronic systolic heart failure,cardiovascular"
    )
    .expect("write");
    writeln!(file, "J449,\"Chronic obstructive pulmonary disease, unspecified\",").expect("write");
    writeln!(file, ",Row without a code is skipped,").expect("write");
    writeln!(file, "N184,Ragged row without a tags column").expect("write");

    let lookup = HccCodeLookup::from_csv_path(file.path()).expect("lookup builds");

    // Codes are stored normalized.
    let heart = lookup.match_by_code(Some("I50.22")).expect("code match");
    assert_eq!(heart.code, "I5022");
    assert_eq!(heart.tags.as_deref(), Some("cardiovascular"));

    let copd = lookup
        .match_by_description(Some("Chronic obstructive pulmonary disease, unspecified"))
        .expect("description match");
    assert_eq!(copd.code, "J449");

    let ragged = lookup.match_by_code(Some("N184")).expect("ragged row kept");
    assert_eq!(ragged.tags, None);

    assert!(lookup.match_by_description(Some("Row without a code is skipped")).is_none());
}

#[test]
fn missing_reference_file_is_an_error() {
    let result = HccCodeLookup::from_csv_path(std::path::Path::new("/nonexistent/hcc.csv"));
    assert!(result.is_err());
}
