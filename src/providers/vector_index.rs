//! Vector index provider trait for storing and searching embeddings

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;
use crate::types::document::StoredVector;
use crate::types::response::SearchResult;

/// Distance metric for the similarity index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Cosine similarity
    Cosine,
    /// Euclidean distance
    Euclidean,
    /// Dot product
    Dotproduct,
}

impl DistanceMetric {
    /// Wire name used by index services
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::Dotproduct => "dotproduct",
        }
    }
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `PineconeIndex`: managed similarity-search service
/// - `MemoryVectorIndex`: in-process index for tests and demos
#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Create the backing index if absent
    ///
    /// No-ops when an index with matching dimensionality and metric
    /// already exists; fails with `ConfigurationConflict` when the
    /// existing index differs.
    async fn ensure_index(&self, dimensions: usize, metric: DistanceMetric) -> Result<()>;

    /// Insert or overwrite vectors by id
    ///
    /// Idempotent: re-upserting an id replaces its values and metadata.
    /// Vectors with the wrong dimensionality are rejected with
    /// `InvalidArgument` before any request is made.
    async fn upsert(&self, vectors: &[StoredVector]) -> Result<()>;

    /// Search for the `top_k` nearest vectors
    ///
    /// Returns at most `top_k` results in descending score order, ties
    /// broken by insertion order. `top_k == 0` fails with
    /// `InvalidArgument`.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<SearchResult>>;

    /// Check if the index service is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Provider name for logging
    fn name(&self) -> &str;
}
