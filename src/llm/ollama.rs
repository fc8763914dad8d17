use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{LlmError, LlmProvider};
use super::types::ChatRequest;

/// Ollama HTTP provider.
///
/// Talks to the local Ollama daemon over its native API (`/api/chat`,
/// `/api/embed`). Every request carries the configured timeout so a
/// stalled backend can never hang a pipeline stage.
#[derive(Clone)]
pub struct OllamaProvider {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::Request(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    fn map_send_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.timeout)
        } else {
            LlmError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn health_check(&self) -> Result<bool, LlmError> {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut body = json!({
            "model": model_id,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            let mut options = serde_json::Map::new();
            if let Some(t) = request.temperature {
                options.insert("temperature".to_string(), json!(t));
            }
            if let Some(n) = request.max_tokens {
                options.insert("num_predict".to_string(), json!(n));
            }
            if !options.is_empty() {
                obj.insert("options".to_string(), Value::Object(options));
            }
        }

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        parse_chat_response(&payload)
    }

    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, LlmError> {
        let url = format!("{}/api/embed", self.base_url);

        let body = json!({
            "model": model_id,
            "input": inputs,
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Status { status, body });
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| LlmError::Malformed(e.to_string()))?;

        let embeddings = parse_embed_response(&payload)?;
        if embeddings.len() != inputs.len() {
            return Err(LlmError::Malformed(format!(
                "expected {} embeddings, got {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}

fn parse_chat_response(payload: &Value) -> Result<String, LlmError> {
    payload["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| LlmError::Malformed("missing message.content".to_string()))
}

fn parse_embed_response(payload: &Value) -> Result<Vec<Vec<f32>>, LlmError> {
    let rows = payload["embeddings"]
        .as_array()
        .ok_or_else(|| LlmError::Malformed("missing embeddings array".to_string()))?;

    let mut embeddings = Vec::with_capacity(rows.len());
    for row in rows {
        let vals = row
            .as_array()
            .ok_or_else(|| LlmError::Malformed("embedding row is not an array".to_string()))?;
        let vec: Vec<f32> = vals
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();
        if vec.len() != vals.len() {
            return Err(LlmError::Malformed(
                "embedding row contains non-numeric values".to_string(),
            ));
        }
        embeddings.push(vec);
    }

    Ok(embeddings)
}
