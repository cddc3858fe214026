//! Provider abstractions for embeddings, vector search, and answer generation
//!
//! Adapters are constructed once at startup and injected into the
//! pipelines, so tests can substitute fakes.

pub mod embedding;
pub mod llm;
pub mod memory;
pub mod openai;
pub mod pinecone;
pub mod vector_index;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use memory::MemoryVectorIndex;
pub use openai::{OpenAiChat, OpenAiEmbedder};
pub use pinecone::PineconeIndex;
pub use vector_index::{DistanceMetric, VectorIndexProvider};

use crate::error::Error;

#[derive(serde::Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(serde::Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Map a transport-level failure to the error taxonomy
pub(crate) fn map_request_error(provider: &str, timeout_secs: u64, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout {
            provider: provider.to_string(),
            secs: timeout_secs,
        }
    } else {
        Error::ProviderUnavailable {
            provider: provider.to_string(),
            message: err.to_string(),
        }
    }
}

/// Map a non-success status to the error taxonomy
///
/// Rate limits and server errors are transient; other rejections are
/// treated as bad requests and not retried.
pub(crate) fn map_status_error(
    provider: &str,
    operation: &str,
    status: reqwest::StatusCode,
    body: &str,
) -> Error {
    let detail = serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Error::ProviderUnavailable {
            provider: provider.to_string(),
            message: format!("{} request failed ({}): {}", operation, status, detail),
        }
    } else {
        Error::InvalidArgument(format!(
            "{} rejected {} request ({}): {}",
            provider, operation, status, detail
        ))
    }
}
