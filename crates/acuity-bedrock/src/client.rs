//! Text generation via the Bedrock Converse API.

use std::time::Duration;

use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, InferenceConfiguration, Message,
};
use tracing::{info, warn};

use acuity_core::llm::{LlmClient, LlmError};

use crate::error::BedrockError;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE_SECS: u64 = 1;
const BACKOFF_CAP_SECS: u64 = 10;

/// Model and inference settings for the Bedrock client.
#[derive(Debug, Clone)]
pub struct BedrockClientConfig {
    /// Inference profile ID, e.g. `us.anthropic.claude-sonnet-4-20250514-v1:0`.
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: i32,
}

impl BedrockClientConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            temperature: 0.0,
            max_tokens: 1024,
        }
    }
}

/// A Bedrock-backed text generator.
pub struct BedrockClient {
    client: aws_sdk_bedrockruntime::Client,
    config: BedrockClientConfig,
}

impl BedrockClient {
    pub fn new(sdk_config: &aws_config::SdkConfig, config: BedrockClientConfig) -> Self {
        Self {
            client: aws_sdk_bedrockruntime::Client::new(sdk_config),
            config,
        }
    }

    /// Send a single-turn prompt and return the concatenated text blocks of
    /// the reply. Retries transient failures with exponential backoff before
    /// giving up.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, BedrockError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.invoke_converse(prompt).await {
                Ok(text) => return Ok(text),
                Err(err) if attempt < MAX_ATTEMPTS => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        model_id = %self.config.model_id,
                        attempt,
                        delay_secs = delay.as_secs(),
                        %err,
                        "model invocation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn invoke_converse(&self, prompt: &str) -> Result<String, BedrockError> {
        let inference_config = InferenceConfiguration::builder()
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build();

        let response = self
            .client
            .converse()
            .model_id(&self.config.model_id)
            .inference_config(inference_config)
            .messages(
                Message::builder()
                    .role(ConversationRole::User)
                    .content(ContentBlock::Text(prompt.to_string()))
                    .build()
                    .map_err(|e| BedrockError::Invocation(e.to_string()))?,
            )
            .send()
            .await
            .map_err(|e| BedrockError::Invocation(e.into_service_error().to_string()))?;

        let output_message = response
            .output()
            .and_then(|o| o.as_message().ok())
            .ok_or_else(|| BedrockError::ResponseParse("no message in response".to_string()))?;

        let text = output_message
            .content()
            .iter()
            .filter_map(|block| {
                if let ContentBlock::Text(text) = block {
                    Some(text.as_str())
                } else {
                    None
                }
            })
            .collect::<Vec<_>>()
            .join("");

        info!(
            model_id = %self.config.model_id,
            response_len = text.len(),
            "model invocation complete"
        );

        Ok(text)
    }
}

impl LlmClient for BedrockClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.generate_text(prompt)
            .await
            .map_err(|err| LlmError::Invocation(err.to_string()))
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let secs = BACKOFF_BASE_SECS << (attempt - 1);
    Duration::from_secs(secs.min(BACKOFF_CAP_SECS))
}
