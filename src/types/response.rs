//! Response types for queries and ingestion

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A match returned by the vector index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Stored vector id
    pub id: String,
    /// Similarity score, higher is closer (bounds depend on the metric)
    pub score: f32,
    /// Copy of the stored metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl SearchResult {
    /// Text content of the underlying chunk, empty if absent
    pub fn content(&self) -> &str {
        self.metadata
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or("")
    }

    /// Apply metadata equality filters
    ///
    /// A result survives when every filter key is either absent from its
    /// metadata or exactly equal to the requested value. Mismatches are
    /// exclusionary; missing keys are permissive.
    pub fn matches_filters(&self, filters: &HashMap<String, String>) -> bool {
        filters.iter().all(|(key, expected)| {
            match self.metadata.get(key) {
                None => true,
                Some(serde_json::Value::String(actual)) => actual == expected,
                Some(other) => other.to_string() == *expected,
            }
        })
    }
}

/// Response from the query pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer (surfaced verbatim from the generation service)
    pub answer: String,
    /// The results used to ground the answer, in retrieval order
    pub sources: Vec<SearchResult>,
}

/// Outcome of ingesting one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Document was chunked, embedded, and indexed
    Indexed,
    /// Content hash matched the previous ingestion; nothing was done
    Unchanged,
}

/// Report from ingesting one document
///
/// Ingestion is best-effort per chunk: a failed batch is skipped and
/// counted here rather than aborting the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Document id
    pub document_id: String,
    /// Original filename
    pub filename: String,
    /// Chunks produced by the chunker
    pub total_chunks: usize,
    /// Chunks embedded and upserted successfully
    pub indexed_chunks: usize,
    /// Chunks skipped after exhausting retries
    pub failed_chunks: usize,
    /// What happened to the document
    pub outcome: IngestOutcome,
}

impl IngestReport {
    /// Report for a document skipped because its content was unchanged
    pub fn unchanged(document_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            filename: filename.into(),
            total_chunks: 0,
            indexed_chunks: 0,
            failed_chunks: 0,
            outcome: IngestOutcome::Unchanged,
        }
    }

    /// Whether every chunk made it into the index
    pub fn is_complete(&self) -> bool {
        self.failed_chunks == 0
    }
}
