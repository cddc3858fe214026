//! Ingestion pipeline: chunk, embed in batches, upsert

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::RagConfig;
use crate::error::Result;
use crate::providers::{EmbeddingProvider, VectorIndexProvider};
use crate::types::document::{Document, EmbeddingVector, StoredVector};
use crate::types::response::{IngestOutcome, IngestReport};

use super::chunker::{flatten_tables, TextChunker};

/// Turns one document into stored vectors end-to-end
///
/// Ingestion is best-effort: an embedding or upsert batch that keeps
/// failing after bounded retries is skipped and counted, never aborting
/// the rest of the document. Vector ids are derived from the document id
/// and chunk index, so re-running with the same chunking parameters
/// overwrites the previous vectors.
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    chunker: TextChunker,
    embed_batch_size: usize,
    upsert_batch_size: usize,
    max_retries: u32,
    retry_base_delay: Duration,
    parallel_batches: usize,
}

impl IngestionPipeline {
    /// Create a new pipeline from configuration and injected providers
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
    ) -> Result<Self> {
        Ok(Self {
            embedder,
            index,
            chunker: TextChunker::new(config.chunking.chunk_size)?,
            embed_batch_size: config.embeddings.batch_size.max(1),
            upsert_batch_size: config.index.upsert_batch_size.max(1),
            max_retries: config.processing.max_retries.max(1),
            retry_base_delay: Duration::from_millis(config.processing.retry_base_delay_ms),
            parallel_batches: config.processing.effective_parallel_batches(),
        })
    }

    /// Ingest a document, skipping it when the content hash matches the
    /// previous ingestion
    pub async fn ingest_if_changed(
        &self,
        document: &Document,
        previous_hash: Option<&str>,
    ) -> Result<IngestReport> {
        if previous_hash == Some(document.content_hash.as_str()) {
            tracing::info!(document_id = %document.id, "content unchanged, skipping ingestion");
            return Ok(IngestReport::unchanged(&document.id, &document.filename));
        }
        self.ingest(document).await
    }

    /// Ingest a document: chunk, embed, upsert
    pub async fn ingest(&self, document: &Document) -> Result<IngestReport> {
        let chunks = self.chunker.chunk_document(document)?;
        let total_chunks = chunks.len();

        if chunks.is_empty() {
            tracing::info!(document_id = %document.id, "document has no content to index");
            return Ok(IngestReport {
                document_id: document.id.clone(),
                filename: document.filename.clone(),
                total_chunks: 0,
                indexed_chunks: 0,
                failed_chunks: 0,
                outcome: IngestOutcome::Indexed,
            });
        }

        tracing::info!(
            document_id = %document.id,
            total_chunks,
            "ingesting document"
        );

        // Embed batches concurrently; join_all yields results in batch
        // order, so vector ids always line up with the original chunk
        // indices regardless of completion order.
        let semaphore = Arc::new(Semaphore::new(self.parallel_batches));
        let batch_futures: Vec<_> = chunks
            .chunks(self.embed_batch_size)
            .map(|batch| {
                let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
                let semaphore = Arc::clone(&semaphore);
                async move {
                    let _permit = semaphore.acquire().await.unwrap();
                    self.with_retry("embedding batch", || self.embedder.embed_batch(&texts))
                        .await
                }
            })
            .collect();
        let embed_results = join_all(batch_futures).await;

        let tables_flat = flatten_tables(&document.tables);
        let mut pending: Vec<StoredVector> = Vec::new();
        let mut indexed_chunks = 0usize;
        let mut failed_chunks = 0usize;

        for (batch, result) in chunks.chunks(self.embed_batch_size).zip(embed_results) {
            match result {
                Ok(embeddings) => {
                    for (chunk, values) in batch.iter().zip(embeddings) {
                        pending.push(
                            EmbeddingVector::for_chunk(
                                chunk,
                                values,
                                &document.filename,
                                &tables_flat,
                            )
                            .into_stored(),
                        );
                    }
                }
                Err(e) => {
                    failed_chunks += batch.len();
                    tracing::warn!(
                        document_id = %document.id,
                        chunks = batch.len(),
                        error = %e,
                        "skipping chunks after embedding failure"
                    );
                }
            }

            while pending.len() >= self.upsert_batch_size {
                let batch_vectors: Vec<StoredVector> =
                    pending.drain(..self.upsert_batch_size).collect();
                self.flush(document, batch_vectors, &mut indexed_chunks, &mut failed_chunks)
                    .await;
            }
        }

        if !pending.is_empty() {
            self.flush(document, pending, &mut indexed_chunks, &mut failed_chunks)
                .await;
        }

        if failed_chunks > 0 {
            tracing::warn!(
                document_id = %document.id,
                indexed_chunks,
                failed_chunks,
                "document partially indexed"
            );
        } else {
            tracing::info!(
                document_id = %document.id,
                indexed_chunks,
                "document indexed"
            );
        }

        Ok(IngestReport {
            document_id: document.id.clone(),
            filename: document.filename.clone(),
            total_chunks,
            indexed_chunks,
            failed_chunks,
            outcome: IngestOutcome::Indexed,
        })
    }

    /// Upsert one accumulated batch, counting outcomes instead of failing
    async fn flush(
        &self,
        document: &Document,
        vectors: Vec<StoredVector>,
        indexed_chunks: &mut usize,
        failed_chunks: &mut usize,
    ) {
        let count = vectors.len();
        match self
            .with_retry("vector upsert", || self.index.upsert(&vectors))
            .await
        {
            Ok(()) => *indexed_chunks += count,
            Err(e) => {
                *failed_chunks += count;
                tracing::warn!(
                    document_id = %document.id,
                    chunks = count,
                    error = %e,
                    "skipping chunks after upsert failure"
                );
            }
        }
    }

    /// Run an operation with bounded exponential backoff
    ///
    /// Only transient errors are retried; bad-input errors surface
    /// immediately.
    async fn with_retry<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_attempts = self.max_retries;
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt + 1 < max_attempts => {
                    let delay = self.retry_base_delay * 2u32.saturating_pow(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        what,
                        attempt + 1,
                        max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
