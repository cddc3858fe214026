//! Document, chunk, and vector types

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::ingestion::chunker::flatten_tables;

/// An extracted document ready for ingestion
///
/// Produced by the upstream extraction step as `{filename, text, tables}`;
/// tables arrive as arbitrarily nested lists of cell strings. The document
/// id is stable across re-ingestion so the index overwrites prior vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Stable document id (filename stem by convention)
    pub id: String,
    /// Original filename
    pub filename: String,
    /// Extracted plain text
    pub text: String,
    /// Extracted tables (nested lists of cell strings)
    #[serde(default)]
    pub tables: Vec<serde_json::Value>,
    /// Content hash for unchanged-document detection
    #[serde(default)]
    pub content_hash: String,
    /// Ingestion timestamp
    #[serde(default = "chrono::Utc::now")]
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a document with an explicit id
    pub fn new(
        id: impl Into<String>,
        filename: impl Into<String>,
        text: impl Into<String>,
        tables: Vec<serde_json::Value>,
    ) -> Self {
        let text = text.into();
        let content_hash = Self::hash_content(&text, &tables);
        Self {
            id: id.into(),
            filename: filename.into(),
            text,
            tables,
            content_hash,
            ingested_at: chrono::Utc::now(),
        }
    }

    /// Create a document from extraction output, deriving the id from the
    /// filename stem
    pub fn from_extraction(
        filename: impl Into<String>,
        text: impl Into<String>,
        tables: Vec<serde_json::Value>,
    ) -> Self {
        let filename = filename.into();
        let id = filename
            .rsplit_once('.')
            .map(|(stem, _)| stem.to_string())
            .unwrap_or_else(|| filename.clone());
        Self::new(id, filename, text, tables)
    }

    /// Hash text plus flattened tables
    fn hash_content(text: &str, tables: &[serde_json::Value]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        hasher.update(flatten_tables(tables).as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// A bounded slice of document text, the unit of embedding and retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Parent document id
    pub document_id: String,
    /// 0-based position within the document
    pub index: usize,
    /// Chunk text (at most the configured chunk size)
    pub text: String,
    /// Total chunks produced for the owning document
    pub total_chunks: usize,
}

impl Chunk {
    /// The id this chunk's vector is stored under
    pub fn vector_id(&self) -> String {
        format!("{}_chunk_{}", self.document_id, self.index)
    }
}

/// An embedding with the metadata it will carry into the index
#[derive(Debug, Clone)]
pub struct EmbeddingVector {
    /// Chunk or query identifier this embedding belongs to
    pub owner_id: String,
    /// Embedding values (fixed dimensionality per index)
    pub values: Vec<f32>,
    /// Metadata stored alongside the vector
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EmbeddingVector {
    /// Attach index metadata to an embedded chunk
    pub fn for_chunk(
        chunk: &Chunk,
        values: Vec<f32>,
        filename: &str,
        tables_flat: &str,
    ) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("filename".to_string(), serde_json::json!(filename));
        metadata.insert("chunk_index".to_string(), serde_json::json!(chunk.index));
        metadata.insert(
            "total_chunks".to_string(),
            serde_json::json!(chunk.total_chunks),
        );
        metadata.insert("content".to_string(), serde_json::json!(chunk.text));
        metadata.insert("tables".to_string(), serde_json::json!(tables_flat));

        Self {
            owner_id: chunk.vector_id(),
            values,
            metadata,
        }
    }

    /// Convert into a stored vector keyed by the owner id
    pub fn into_stored(self) -> StoredVector {
        StoredVector {
            id: self.owner_id,
            values: self.values,
            metadata: self.metadata,
        }
    }
}

/// A vector under its index-assigned identity
///
/// Serializes to the wire shape the index service expects for upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredVector {
    /// Vector id (`{document_id}_chunk_{index}` for chunk vectors)
    pub id: String,
    /// Embedding values
    pub values: Vec<f32>,
    /// Stored metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}
