//! Fixed-width text chunking and table flattening

use crate::error::{Error, Result};
use crate::types::document::{Chunk, Document};

/// Split text into contiguous, non-overlapping slices of `chunk_size`
/// characters
///
/// The last slice is shorter when the text length is not a multiple of
/// `chunk_size`. Slicing counts characters, not bytes, so multi-byte
/// input never splits inside a code point. Concatenating the output in
/// order reconstructs the input exactly.
pub fn chunk_text(text: &str, chunk_size: usize) -> Result<Vec<String>> {
    if chunk_size == 0 {
        return Err(Error::InvalidArgument(
            "chunk size must be greater than zero".to_string(),
        ));
    }

    let mut chunks = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        let cut = rest
            .char_indices()
            .nth(chunk_size)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    Ok(chunks)
}

/// Flatten extracted tables into a single string
///
/// Walks the nested structure depth-first, left-to-right, joining leaf
/// cells with single spaces. Null cells are dropped. Deterministic for a
/// given input.
pub fn flatten_tables(tables: &[serde_json::Value]) -> String {
    let mut cells = Vec::new();
    for table in tables {
        flatten_value(table, &mut cells);
    }
    cells.join(" ")
}

fn flatten_value(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::String(s) => {
            if !s.is_empty() {
                out.push(s.clone());
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                flatten_value(item, out);
            }
        }
        serde_json::Value::Null => {}
        other => out.push(other.to_string()),
    }
}

/// Chunker for whole documents
///
/// Document text is chunked first; the flattened table text is appended
/// to the chunking input stream as the final unit(s). Indices are
/// continuous across both and `total_chunks` covers the combined
/// sequence, so re-running with the same parameters regenerates the same
/// vector ids.
pub struct TextChunker {
    chunk_size: usize,
}

impl TextChunker {
    /// Create a chunker with the given chunk size in characters
    pub fn new(chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidArgument(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        Ok(Self { chunk_size })
    }

    /// Chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Chunk a document's text and tables
    pub fn chunk_document(&self, doc: &Document) -> Result<Vec<Chunk>> {
        let mut texts = chunk_text(&doc.text, self.chunk_size)?;

        let tables_flat = flatten_tables(&doc.tables);
        if !tables_flat.is_empty() {
            texts.extend(chunk_text(&tables_flat, self.chunk_size)?);
        }

        let total_chunks = texts.len();
        Ok(texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk {
                document_id: doc.id.clone(),
                index,
                text,
                total_chunks,
            })
            .collect())
    }
}
