//! LLM provider trait for answer generation

use async_trait::async_trait;

use crate::error::Result;

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OpenAiChat`: OpenAI chat completions API
///
/// The generated text is surfaced verbatim, including any refusal the
/// model produces when the context is insufficient.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate an answer for a question given the assembled context
    async fn generate_answer(&self, question: &str, context: &str) -> Result<String>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// The model being used
    fn model(&self) -> &str;
}
