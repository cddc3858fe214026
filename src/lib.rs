//! findoc-rag: retrieval-augmented query pipeline for financial documents
//!
//! Ingests extracted documents (text plus tables), splits them into
//! bounded chunks, embeds them in batches, and stores the vectors in a
//! managed similarity index. At query time it embeds the question,
//! retrieves the closest chunks, applies metadata filters, assembles a
//! size-bounded context, and grounds an LLM-generated answer in it.
//!
//! Providers (embedding, vector index, answer generation) are trait
//! objects injected at construction, so any of them can be replaced with
//! fakes in tests.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use ingestion::IngestionPipeline;
pub use retrieval::QueryPipeline;
pub use types::{
    document::{Chunk, Document, StoredVector},
    query::QueryRequest,
    response::{IngestOutcome, IngestReport, QueryResponse, SearchResult},
};
