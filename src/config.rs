//! Configuration for the RAG pipeline

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::providers::vector_index::DistanceMetric;

/// Main pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RagConfig {
    /// Embedding service configuration
    #[serde(default)]
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,
    /// Vector index configuration
    #[serde(default)]
    pub index: IndexConfig,
    /// Query pipeline configuration
    #[serde(default)]
    pub query: QueryConfig,
    /// Answer generation configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Ingestion processing configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
}

impl RagConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }
}

/// Embedding service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Embedding API base URL
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Model to use
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Embedding dimensions (1536 for text-embedding-ada-002)
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    /// Maximum texts per provider request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum input length per text in characters; longer inputs are
    /// head-truncated before submission
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
    /// Request timeout in seconds
    #[serde(default = "default_embed_timeout")]
    pub timeout_secs: u64,
}

fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_batch_size() -> usize {
    100
}

fn default_max_input_chars() -> usize {
    8192
}

fn default_embed_timeout() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_embedding_model(),
            dimensions: default_dimensions(),
            batch_size: default_batch_size(),
            max_input_chars: default_max_input_chars(),
            timeout_secs: default_embed_timeout(),
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Chunk size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    8192
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Index name
    #[serde(default = "default_index_name")]
    pub name: String,
    /// Distance metric for the index
    #[serde(default = "default_metric")]
    pub metric: DistanceMetric,
    /// Control plane URL for index management
    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,
    /// Data plane host, if already known (skips discovery)
    #[serde(default)]
    pub host: Option<String>,
    /// Cloud provider for serverless index creation
    #[serde(default = "default_cloud")]
    pub cloud: String,
    /// Region for serverless index creation
    #[serde(default = "default_region")]
    pub region: String,
    /// Maximum vectors per upsert request
    #[serde(default = "default_upsert_batch_size")]
    pub upsert_batch_size: usize,
    /// Request timeout in seconds
    #[serde(default = "default_index_timeout")]
    pub timeout_secs: u64,
}

fn default_index_name() -> String {
    "financial-search-index".to_string()
}

fn default_metric() -> DistanceMetric {
    DistanceMetric::Cosine
}

fn default_control_plane_url() -> String {
    "https://api.pinecone.io".to_string()
}

fn default_cloud() -> String {
    "aws".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_upsert_batch_size() -> usize {
    100
}

fn default_index_timeout() -> u64 {
    30
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
            metric: default_metric(),
            control_plane_url: default_control_plane_url(),
            host: None,
            cloud: default_cloud(),
            region: default_region(),
            upsert_batch_size: default_upsert_batch_size(),
            timeout_secs: default_index_timeout(),
        }
    }
}

/// Query pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of results to retrieve
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Assembled context budget in characters
    #[serde(default = "default_context_budget")]
    pub context_budget: usize,
}

fn default_top_k() -> usize {
    5
}

fn default_context_budget() -> usize {
    15000
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            context_budget: default_context_budget(),
        }
    }
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat API base URL
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    /// Generation model name
    #[serde(default = "default_generation_model")]
    pub model: String,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Maximum tokens in the generated answer
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_generation_model() -> String {
    "gpt-4-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    150
}

fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_generation_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Ingestion processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Retry attempts for a failed embedding or upsert batch
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base delay for exponential backoff in milliseconds
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// Number of embedding batches submitted concurrently per document
    /// (default: CPU count, max 4)
    #[serde(default)]
    pub parallel_batches: Option<usize>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            parallel_batches: None,
        }
    }
}

impl ProcessingConfig {
    /// Resolve the embedding parallelism, auto-detecting from CPU count
    pub fn effective_parallel_batches(&self) -> usize {
        self.parallel_batches
            .unwrap_or_else(|| num_cpus::get().min(4))
            .max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_model_limits() {
        let config = RagConfig::default();
        assert_eq!(config.embeddings.dimensions, 1536);
        assert_eq!(config.embeddings.max_input_chars, 8192);
        assert_eq!(config.embeddings.batch_size, 100);
        assert_eq!(config.chunking.chunk_size, 8192);
        assert_eq!(config.query.top_k, 5);
        assert_eq!(config.query.context_budget, 15000);
        assert_eq!(config.index.metric, DistanceMetric::Cosine);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: RagConfig = toml::from_str(
            r#"
            [chunking]
            chunk_size = 1024

            [query]
            top_k = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.chunking.chunk_size, 1024);
        assert_eq!(config.query.top_k, 3);
        assert_eq!(config.query.context_budget, 15000);
        assert_eq!(config.embeddings.model, "text-embedding-ada-002");
    }

    #[test]
    fn parallelism_is_at_least_one() {
        let config = ProcessingConfig {
            parallel_batches: Some(0),
            ..Default::default()
        };
        assert_eq!(config.effective_parallel_batches(), 1);
    }
}
