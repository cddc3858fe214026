//! Error types for the RAG pipeline

use thiserror::Error as ThisError;

/// Errors produced by the pipeline and its provider adapters
#[derive(Debug, ThisError)]
pub enum Error {
    /// Bad caller input; never retried
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Transient provider failure (rate limit, connection refused, 5xx)
    #[error("{provider} unavailable: {message}")]
    ProviderUnavailable {
        /// Provider name (e.g. "openai", "pinecone")
        provider: String,
        /// Description of the failure
        message: String,
    },

    /// Provider call exceeded the configured timeout
    #[error("{provider} request timed out after {secs}s")]
    Timeout {
        /// Provider name
        provider: String,
        /// Timeout that was exceeded
        secs: u64,
    },

    /// Existing index has a different dimensionality or metric
    #[error("index configuration conflict: {0}")]
    ConfigurationConflict(String),

    /// Query pipeline failed while embedding the query
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    /// Query pipeline failed while searching the vector index
    #[error("retrieval failed: {0}")]
    RetrievalFailed(String),

    /// Query pipeline failed while generating the answer
    #[error("generation failed: {0}")]
    GenerationFailed(String),

    /// Configuration loading or validation error
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (config files, document loading)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error class may succeed on retry
    ///
    /// Only used by the ingestion pipeline's bounded backoff; query
    /// pipeline failures are terminal for their request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable { .. } | Self::Timeout { .. }
        )
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
