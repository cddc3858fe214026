//! End-to-end tests for ingestion and query against the in-memory index

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use findoc_rag::config::RagConfig;
use findoc_rag::error::Result;
use findoc_rag::ingestion::IngestionPipeline;
use findoc_rag::providers::{
    DistanceMetric, EmbeddingProvider, LlmProvider, MemoryVectorIndex, VectorIndexProvider,
};
use findoc_rag::retrieval::QueryPipeline;
use findoc_rag::types::document::{Document, StoredVector};
use findoc_rag::types::query::QueryRequest;

/// Deterministic embedder: every text maps to the same unit vector, so
/// ranking is controlled entirely by what the tests store.
struct ConstantEmbedder;

#[async_trait]
impl EmbeddingProvider for ConstantEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    fn dimensions(&self) -> usize {
        2
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "constant"
    }
}

/// LLM that echoes how much context it received
struct EchoLlm;

#[async_trait]
impl LlmProvider for EchoLlm {
    async fn generate_answer(&self, _question: &str, context: &str) -> Result<String> {
        if context.is_empty() {
            Ok("The answer is not available in the provided documents.".to_string())
        } else {
            Ok(format!("answer from {} context chars", context.chars().count()))
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "echo"
    }

    fn model(&self) -> &str {
        "echo-model"
    }
}

fn config() -> RagConfig {
    let mut config = RagConfig::default();
    config.processing.retry_base_delay_ms = 1;
    config
}

async fn seed_scored(index: &MemoryVectorIndex, id: &str, similarity: f32, content: &str) {
    let mut metadata = HashMap::new();
    metadata.insert("filename".to_string(), serde_json::json!("report.pdf"));
    metadata.insert("content".to_string(), serde_json::json!(content));
    let y = (1.0 - similarity * similarity).sqrt();
    index
        .upsert(&[StoredVector {
            id: id.to_string(),
            values: vec![similarity, y],
            metadata,
        }])
        .await
        .unwrap();
}

#[tokio::test]
async fn nine_thousand_char_document_yields_two_chunks() {
    let index = Arc::new(MemoryVectorIndex::new(2));
    let pipeline =
        IngestionPipeline::new(&config(), Arc::new(ConstantEmbedder), index.clone()).unwrap();

    let doc = Document::new("doc1", "doc1.pdf", "x".repeat(9000), Vec::new());
    let report = pipeline.ingest(&doc).await.unwrap();

    assert_eq!(report.total_chunks, 2);
    assert_eq!(report.indexed_chunks, 2);
    assert_eq!(report.failed_chunks, 0);
    assert_eq!(index.len(), 2);

    let results = index.query(&[1.0, 0.0], 2, None).await.unwrap();
    let mut ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["doc1_chunk_0", "doc1_chunk_1"]);
    for result in &results {
        assert_eq!(result.metadata["total_chunks"], serde_json::json!(2));
        assert_eq!(result.metadata["filename"], serde_json::json!("doc1.pdf"));
    }
}

#[tokio::test]
async fn top_k_returns_best_three_in_descending_order() {
    let index = Arc::new(MemoryVectorIndex::new(2));
    for (id, score) in [
        ("v1", 0.9f32),
        ("v2", 0.8),
        ("v3", 0.7),
        ("v4", 0.6),
        ("v5", 0.5),
    ] {
        seed_scored(&index, id, score, &format!("content {}", id)).await;
    }

    let pipeline = QueryPipeline::new(
        &config(),
        Arc::new(ConstantEmbedder),
        index,
        Arc::new(EchoLlm),
    );

    let response = pipeline
        .query(QueryRequest::new("top results?").with_top_k(3))
        .await
        .unwrap();

    assert_eq!(response.sources.len(), 3);
    let ids: Vec<&str> = response.sources.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["v1", "v2", "v3"]);
    assert!(response.sources[0].score >= response.sources[1].score);
    assert!(response.sources[1].score >= response.sources[2].score);
}

#[tokio::test]
async fn oversized_context_is_cut_at_budget_in_retrieval_order() {
    let index = Arc::new(MemoryVectorIndex::new(2));
    // Two results totalling 20000 chars of content against a 15000 budget
    seed_scored(&index, "big1", 0.9, &"a".repeat(12000)).await;
    seed_scored(&index, "big2", 0.8, &"b".repeat(8000)).await;

    let pipeline = QueryPipeline::new(
        &config(),
        Arc::new(ConstantEmbedder),
        index,
        Arc::new(EchoLlm),
    );

    let response = pipeline
        .query(QueryRequest::new("summarize the filings").with_top_k(2))
        .await
        .unwrap();

    // 15000 budget chars plus the "..." marker reached the generator
    assert_eq!(response.answer, "answer from 15003 context chars");
    // Both sources still reported, in retrieval order
    let ids: Vec<&str> = response.sources.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["big1", "big2"]);
}

#[tokio::test]
async fn fully_filtered_retrieval_still_reaches_generation() {
    let index = Arc::new(MemoryVectorIndex::new(2));
    seed_scored(&index, "v1", 0.9, "content").await;

    let pipeline = QueryPipeline::new(
        &config(),
        Arc::new(ConstantEmbedder),
        index,
        Arc::new(EchoLlm),
    );

    let response = pipeline
        .query(QueryRequest::new("anything?").with_filter("filename", "nonexistent.pdf"))
        .await
        .unwrap();

    assert!(response.sources.is_empty());
    assert_eq!(
        response.answer,
        "The answer is not available in the provided documents."
    );
}

#[tokio::test]
async fn tables_are_indexed_as_final_chunks() {
    let index = Arc::new(MemoryVectorIndex::new(2));
    let pipeline =
        IngestionPipeline::new(&config(), Arc::new(ConstantEmbedder), index.clone()).unwrap();

    let doc = Document::new(
        "fund",
        "fund.pdf",
        "Fund overview text.",
        vec![serde_json::json!([[["Expense ratio", "0.45%"]]])],
    );
    let report = pipeline.ingest(&doc).await.unwrap();

    assert_eq!(report.total_chunks, 2);
    let results = index.query(&[1.0, 0.0], 2, None).await.unwrap();
    let table_chunk = results
        .iter()
        .find(|r| r.id == "fund_chunk_1")
        .expect("table chunk present");
    assert_eq!(table_chunk.content(), "Expense ratio 0.45%");
    assert_eq!(
        table_chunk.metadata["tables"],
        serde_json::json!("Expense ratio 0.45%")
    );
}

#[tokio::test]
async fn ensure_index_is_idempotent_and_conflicts_on_mismatch() {
    let index = MemoryVectorIndex::new(2);
    index.ensure_index(2, DistanceMetric::Cosine).await.unwrap();
    index.ensure_index(2, DistanceMetric::Cosine).await.unwrap();
    assert!(index.ensure_index(4, DistanceMetric::Cosine).await.is_err());
}

#[tokio::test]
async fn ingest_then_query_round_trip() {
    let index = Arc::new(MemoryVectorIndex::new(2));
    let embedder = Arc::new(ConstantEmbedder);
    let ingestion =
        IngestionPipeline::new(&config(), embedder.clone(), index.clone()).unwrap();

    let doc = Document::new(
        "annual_report",
        "annual_report.pdf",
        "Net revenue grew 14% year over year.",
        Vec::new(),
    );
    ingestion.ingest(&doc).await.unwrap();

    let query = QueryPipeline::new(&config(), embedder, index, Arc::new(EchoLlm));
    let response = query
        .query(QueryRequest::new("How much did revenue grow?"))
        .await
        .unwrap();

    assert_eq!(response.sources.len(), 1);
    assert_eq!(response.sources[0].id, "annual_report_chunk_0");
    assert_eq!(
        response.sources[0].content(),
        "Net revenue grew 14% year over year."
    );
    assert!(response.answer.starts_with("answer from"));
}
