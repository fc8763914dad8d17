use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::types::ChatRequest;

/// Transport-level failure talking to an LLM backend.
///
/// Timeouts are a distinct variant so the pipeline can report them
/// without string matching.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("backend request failed: {0}")]
    Request(String),
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("malformed backend response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "ollama")
    fn name(&self) -> &str;

    /// check if the provider is healthy/reachable
    async fn health_check(&self) -> Result<bool, LlmError>;

    /// chat completion (non-streaming)
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, LlmError>;

    /// generate embeddings, one vector per input, in input order
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, LlmError>;
}
