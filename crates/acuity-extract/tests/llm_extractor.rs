//! Escalation-order tests for the model-backed extractor, driven by a
//! scripted fake client. No live model is involved.

use std::sync::Mutex;

use acuity_core::llm::{LlmClient, LlmError};
use acuity_extract::llm::{LlmConditionExtractor, LlmExtractorConfig};
use acuity_extract::rule_based::RuleBasedExtractor;
use acuity_extract::ConditionExtractor;

/// Replays a fixed sequence of responses and records the prompts it saw.
struct ScriptedClient {
    responses: Mutex<Vec<Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl LlmClient for &ScriptedClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(LlmError::Invocation("script exhausted".to_string()));
        }
        responses.remove(0)
    }
}

const ASSESSMENT: &str = "1) Hypertension - I10\n2) GERD - K21.9\n";

fn extractor_with_fallback(
    client: &ScriptedClient,
    config: LlmExtractorConfig,
) -> LlmConditionExtractor<&ScriptedClient, RuleBasedExtractor> {
    LlmConditionExtractor::new(client, Some(RuleBasedExtractor::new()), config)
}

#[tokio::test]
async fn valid_response_is_returned_directly() {
    let client = ScriptedClient::new(vec![Ok(
        r#"{"conditions": [{"condition": "Hypertension", "icd10_code": "I10"}]}"#.to_string(),
    )]);
    let extractor = extractor_with_fallback(&client, LlmExtractorConfig::default());

    let conditions = extractor.extract(ASSESSMENT, Some("note-1")).await.unwrap();

    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].condition, "Hypertension");
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn malformed_response_earns_one_repair_retry() {
    let client = ScriptedClient::new(vec![
        Ok("here you go, doctor!".to_string()),
        Ok(r#"{"conditions": [{"condition": "GERD", "icd10_code": "K21.9"}]}"#.to_string()),
    ]);
    let extractor = extractor_with_fallback(&client, LlmExtractorConfig::default());

    let conditions = extractor.extract(ASSESSMENT, Some("note-2")).await.unwrap();

    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].condition, "GERD");
    assert_eq!(client.calls(), 2);
    // The second prompt embeds the raw first response for repair.
    assert!(client.prompts.lock().unwrap()[1].contains("here you go, doctor!"));
}

#[tokio::test]
async fn failed_repair_falls_back_to_rules() {
    let client = ScriptedClient::new(vec![
        Ok("not json".to_string()),
        Ok("still not json".to_string()),
    ]);
    let extractor = extractor_with_fallback(&client, LlmExtractorConfig::default());

    let conditions = extractor.extract(ASSESSMENT, Some("note-3")).await.unwrap();

    // Rule-based fallback extracted both numbered entries.
    assert_eq!(conditions.len(), 2);
    assert_eq!(conditions[0].condition, "Hypertension");
    assert_eq!(conditions[1].condition, "GERD");
    assert_eq!(client.calls(), 2);
}

#[tokio::test]
async fn repair_disabled_goes_straight_to_fallback() {
    let client = ScriptedClient::new(vec![Ok("not json".to_string())]);
    let config = LlmExtractorConfig {
        repair_enabled: false,
        ..LlmExtractorConfig::default()
    };
    let extractor = extractor_with_fallback(&client, config);

    let conditions = extractor.extract(ASSESSMENT, Some("note-4")).await.unwrap();

    assert_eq!(conditions.len(), 2);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn generation_failure_falls_back_to_rules() {
    let client = ScriptedClient::new(vec![Err(LlmError::Invocation("throttled".to_string()))]);
    let extractor = extractor_with_fallback(&client, LlmExtractorConfig::default());

    let conditions = extractor.extract(ASSESSMENT, Some("note-5")).await.unwrap();

    assert_eq!(conditions.len(), 2);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn generation_failure_without_fallback_yields_empty() {
    let client = ScriptedClient::new(vec![Err(LlmError::Invocation("throttled".to_string()))]);
    let extractor: LlmConditionExtractor<_, RuleBasedExtractor> =
        LlmConditionExtractor::new(&client, None, LlmExtractorConfig::default());

    let conditions = extractor.extract(ASSESSMENT, Some("note-6")).await.unwrap();

    assert!(conditions.is_empty());
}

#[tokio::test]
async fn valid_but_empty_response_uses_fallback() {
    let client = ScriptedClient::new(vec![Ok(r#"{"conditions": []}"#.to_string())]);
    let extractor = extractor_with_fallback(&client, LlmExtractorConfig::default());

    let conditions = extractor.extract(ASSESSMENT, Some("note-7")).await.unwrap();

    // No repair attempt: the response parsed cleanly, it was just empty.
    assert_eq!(conditions.len(), 2);
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn salvaged_response_with_conditions_is_kept() {
    let client = ScriptedClient::new(vec![Ok(
        "Here are the findings: {\"conditions\": [{\"condition\": \"CKD\"}]}".to_string(),
    )]);
    let extractor = extractor_with_fallback(&client, LlmExtractorConfig::default());

    let conditions = extractor.extract(ASSESSMENT, Some("note-8")).await.unwrap();

    // Salvage produced conditions, so neither repair nor fallback runs.
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].condition, "CKD");
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn empty_assessment_short_circuits() {
    let client = ScriptedClient::new(vec![]);
    let extractor = extractor_with_fallback(&client, LlmExtractorConfig::default());

    let conditions = extractor.extract("   ", Some("note-9")).await.unwrap();

    assert!(conditions.is_empty());
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn long_input_is_truncated_to_budget() {
    let client = ScriptedClient::new(vec![Ok(r#"{"conditions": []}"#.to_string())]);
    let config = LlmExtractorConfig {
        max_chars: 50,
        ..LlmExtractorConfig::default()
    };
    let extractor: LlmConditionExtractor<_, RuleBasedExtractor> =
        LlmConditionExtractor::new(&client, None, config);

    let long_text = "1) Hypertension - I10\n".repeat(40);
    let _ = extractor.extract(&long_text, Some("note-10")).await.unwrap();

    let prompts = client.prompts.lock().unwrap();
    // The prompt embeds at most the configured budget of assessment text.
    let embedded = prompts[0]
        .split("\"\"\"")
        .nth(1)
        .expect("prompt embeds the assessment between triple quotes");
    assert!(embedded.chars().count() <= 50);
}
