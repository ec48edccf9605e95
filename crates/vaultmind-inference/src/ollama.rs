//! Ollama inference backend implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use vaultmind_core::{ChatBackend, ChatMessage, EmbeddingBackend, Error, Result, Vector};

use crate::config::InferenceConfig;

/// Substrings the provider uses to signal that an input exceeded the
/// embedding model's context window.
const OVERSIZE_MARKERS: &[&str] = &["context length", "input length", "too long", "too large"];

/// Ollama inference backend serving both embeddings and chat.
pub struct OllamaBackend {
    client: Client,
    config: InferenceConfig,
}

impl OllamaBackend {
    /// Create a new Ollama backend with the given configuration.
    pub fn new(config: InferenceConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.gen_timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            subsystem = "inference",
            component = "ollama",
            url = %config.base_url,
            embed_model = %config.embed_model,
            gen_model = %config.gen_model,
            dimension = config.embed_dimension,
            "Initializing Ollama backend"
        );

        Self { client, config }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self::new(InferenceConfig::from_env())
    }

    fn classify_embed_failure(status: reqwest::StatusCode, body: &str) -> Error {
        let lowered = body.to_lowercase();
        if OVERSIZE_MARKERS.iter().any(|m| lowered.contains(m)) {
            Error::OversizeInput(format!("Ollama returned {status}: {body}"))
        } else {
            Error::Embedding(format!("Ollama returned {status}: {body}"))
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Request payload for the Ollama `/api/chat` endpoint.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

/// Response from the Ollama `/api/chat` endpoint.
#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[async_trait]
impl EmbeddingBackend for OllamaBackend {
    #[instrument(skip(self, texts), fields(subsystem = "inference", component = "ollama", op = "embed_texts", model = %self.config.embed_model, input_count = texts.len()))]
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let start = Instant::now();

        let request = EmbeddingRequest {
            model: &self.config.embed_model,
            input: texts,
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.config.base_url))
            .timeout(Duration::from_secs(self.config.embed_timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Embedding(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_embed_failure(status, &body));
        }

        let result: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Embedding(format!("Failed to parse response: {e}")))?;

        if result.embeddings.len() != texts.len() {
            return Err(Error::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                result.embeddings.len()
            )));
        }
        for vec in &result.embeddings {
            if vec.len() != self.config.embed_dimension {
                return Err(Error::Embedding(format!(
                    "Model returned dimension {}, configured {}",
                    vec.len(),
                    self.config.embed_dimension
                )));
            }
        }

        let vectors: Vec<Vector> = result.embeddings.into_iter().map(Vector::from).collect();
        let elapsed = start.elapsed().as_millis() as u64;

        debug!(
            result_count = vectors.len(),
            duration_ms = elapsed,
            "Embedding complete"
        );
        if elapsed > 5000 {
            warn!(
                duration_ms = elapsed,
                input_count = texts.len(),
                slow = true,
                "Slow embedding operation"
            );
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.embed_dimension
    }

    fn model_name(&self) -> &str {
        &self.config.embed_model
    }
}

#[async_trait]
impl ChatBackend for OllamaBackend {
    #[instrument(skip(self, messages), fields(subsystem = "inference", component = "ollama", op = "complete", model = %self.config.gen_model, input_count = messages.len()))]
    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String> {
        let start = Instant::now();

        let request = ChatRequest {
            model: &self.config.gen_model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature,
                num_predict: max_tokens,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.config.base_url))
            .timeout(Duration::from_secs(self.config.gen_timeout_secs))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("Request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!("Ollama returned {status}: {body}")));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("Failed to parse response: {e}")))?;

        let content = result.message.content;
        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            response_len = content.len(),
            duration_ms = elapsed,
            "Generation complete"
        );
        if elapsed > 30000 {
            warn!(duration_ms = elapsed, slow = true, "Slow generation operation");
        }
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.config.gen_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oversize_classification() {
        let err = OllamaBackend::classify_embed_failure(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "input length exceeds maximum context length",
        );
        assert!(matches!(err, Error::OversizeInput(_)));
    }

    #[test]
    fn test_generic_embed_failure_classification() {
        let err = OllamaBackend::classify_embed_failure(
            reqwest::StatusCode::NOT_FOUND,
            "model not found",
        );
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[test]
    fn test_chat_request_serialization() {
        let messages = vec![
            ChatMessage::system("persona"),
            ChatMessage::user("question"),
        ];
        let request = ChatRequest {
            model: "qwen3:8b",
            messages: &messages,
            stream: false,
            options: ChatOptions {
                temperature: 0.3,
                num_predict: 512,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["options"]["num_predict"], 512);
        assert_eq!(json["stream"], false);
    }
}
