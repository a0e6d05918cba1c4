//! Language-model client capability.
//!
//! The pipeline only needs one operation from a model provider: turn a prompt
//! into text. Implementations own their transport, credentials, and retry
//! policy; a failed `generate` is an ordinary error the caller is expected to
//! recover from.

use std::future::Future;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model invocation failed: {0}")]
    Invocation(String),

    #[error("model returned an unusable response: {0}")]
    Response(String),
}

/// A text-generation capability: `prompt -> text`.
///
/// Implementations must apply their own bounded retry for transient
/// failures and surface permanent failure as an [`LlmError`].
pub trait LlmClient: Send + Sync {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, LlmError>> + Send;
}
