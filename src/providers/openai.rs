//! OpenAI-backed providers for embeddings and answer generation

use async_trait::async_trait;
use std::time::Duration;

use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;
use super::{map_request_error, map_status_error};

const PROVIDER: &str = "openai";

/// OpenAI embedding provider using the `/v1/embeddings` endpoint
///
/// Enforces the per-text input limit (head truncation after newline
/// normalization), sub-batches large requests, and reassembles responses
/// in input order.
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
    max_input_chars: usize,
    timeout_secs: u64,
}

impl OpenAiEmbedder {
    /// Create a new embedder from configuration and an API key
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key must not be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
            max_input_chars: config.max_input_chars,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Normalize and bound a text before submission
    ///
    /// Newlines become spaces and inputs longer than the model limit are
    /// head-truncated (trailing content dropped). Empty or whitespace-only
    /// input is rejected before any provider call.
    fn prepare_input(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "cannot embed empty text".to_string(),
            ));
        }

        let mut normalized = text.replace('\n', " ");
        if let Some((cut, _)) = normalized.char_indices().nth(self.max_input_chars) {
            normalized.truncate(cut);
        }
        Ok(normalized)
    }

    fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }

    async fn request_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let response = self
            .client
            .post(self.embeddings_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(PROVIDER, self.timeout_secs, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(PROVIDER, "embedding", status, &body));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            Error::ProviderUnavailable {
                provider: PROVIDER.to_string(),
                message: format!("failed to parse embedding response: {}", e),
            }
        })?;

        if parsed.data.len() != inputs.len() {
            return Err(Error::ProviderUnavailable {
                provider: PROVIDER.to_string(),
                message: format!(
                    "embedding response has {} items for {} inputs",
                    parsed.data.len(),
                    inputs.len()
                ),
            });
        }

        // The index field is authoritative for ordering
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(serde::Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(serde::Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(serde::Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = self.prepare_input(text)?;
        let mut embeddings = self.request_batch(std::slice::from_ref(&input)).await?;
        embeddings.pop().ok_or_else(|| Error::ProviderUnavailable {
            provider: PROVIDER.to_string(),
            message: "no embedding in response".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Validate every input before the first provider call
        let inputs = texts
            .iter()
            .map(|t| self.prepare_input(t))
            .collect::<Result<Vec<_>>>()?;

        let mut all_embeddings = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(self.batch_size) {
            tracing::debug!(
                batch_size = batch.len(),
                model = %self.model,
                "requesting embedding batch"
            );
            all_embeddings.extend(self.request_batch(batch).await?);
        }

        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| map_request_error(PROVIDER, self.timeout_secs, e))?;
        Ok(response.status().is_success())
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}

/// OpenAI answer generation provider using chat completions
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl OpenAiChat {
    /// Create a new chat provider from configuration and an API key
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key must not be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(serde::Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl LlmProvider for OpenAiChat {
    async fn generate_answer(&self, question: &str, context: &str) -> Result<String> {
        let prompt = PromptBuilder::build_answer_prompt(question, context);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(PROVIDER, self.timeout_secs, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(PROVIDER, "chat", status, &body));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            Error::ProviderUnavailable {
                provider: PROVIDER.to_string(),
                message: format!("failed to parse chat response: {}", e),
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .ok_or_else(|| Error::ProviderUnavailable {
                provider: PROVIDER.to_string(),
                message: "no choices in chat response".to_string(),
            })
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/v1/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| map_request_error(PROVIDER, self.timeout_secs, e))?;
        Ok(response.status().is_success())
    }

    fn name(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}
