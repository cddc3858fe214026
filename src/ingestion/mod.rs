//! Document ingestion: chunking and the chunk-embed-upsert pipeline

pub mod chunker;
mod pipeline;

pub use chunker::{chunk_text, flatten_tables, TextChunker};
pub use pipeline::IngestionPipeline;
