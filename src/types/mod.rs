//! Core data types for documents, queries, and responses

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, Document, EmbeddingVector, StoredVector};
pub use query::QueryRequest;
pub use response::{IngestOutcome, IngestReport, QueryResponse, SearchResult};
