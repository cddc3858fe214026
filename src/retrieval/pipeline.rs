//! Query pipeline: embed, retrieve, filter, assemble, generate

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::{EmbeddingProvider, LlmProvider, VectorIndexProvider};
use crate::types::query::QueryRequest;
use crate::types::response::{QueryResponse, SearchResult};

/// Per-request query pipeline
///
/// Each request runs the steps strictly in order: embed the query,
/// retrieve candidates, filter by metadata, assemble a bounded context,
/// generate the answer. A failing step aborts the request with an error
/// naming that step; a request never returns a partial answer.
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndexProvider>,
    llm: Arc<dyn LlmProvider>,
    context_budget: usize,
}

impl QueryPipeline {
    /// Create a new pipeline from configuration and injected providers
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            context_budget: config.query.context_budget,
        }
    }

    /// Answer a query against the indexed documents
    ///
    /// Retrieval runs without a structural filter; the caller's metadata
    /// filters are applied to the retrieved candidates afterwards. When
    /// nothing survives filtering, generation still runs with an empty
    /// context and the generator's response is surfaced as-is.
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse> {
        if request.query.trim().is_empty() {
            return Err(Error::InvalidArgument("query must not be empty".to_string()));
        }
        if request.top_k == 0 {
            return Err(Error::InvalidArgument(
                "top_k must be greater than zero".to_string(),
            ));
        }

        tracing::info!(query = %request.query, top_k = request.top_k, "processing query");

        let query_embedding = self
            .embedder
            .embed(&request.query)
            .await
            .map_err(|e| Error::EmbeddingFailed(e.to_string()))?;

        let candidates = self
            .index
            .query(&query_embedding, request.top_k, None)
            .await
            .map_err(|e| Error::RetrievalFailed(e.to_string()))?;

        let retrieved = candidates.len();
        let sources: Vec<SearchResult> = candidates
            .into_iter()
            .filter(|r| r.matches_filters(&request.filters))
            .collect();

        if sources.len() < retrieved {
            tracing::debug!(
                retrieved,
                kept = sources.len(),
                "metadata filters dropped candidates"
            );
        }

        let context = PromptBuilder::build_context(&sources, self.context_budget);

        let answer = self
            .llm
            .generate_answer(&request.query, &context)
            .await
            .map_err(|e| Error::GenerationFailed(e.to_string()))?;

        tracing::info!(sources = sources.len(), "query answered");

        Ok(QueryResponse { answer, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::providers::MemoryVectorIndex;
    use crate::types::document::StoredVector;

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
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
            "fixed"
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Err(Error::ProviderUnavailable {
                provider: "fixed".to_string(),
                message: "down".to_string(),
            })
        }

        fn dimensions(&self) -> usize {
            2
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(false)
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    /// LLM that records the context it was handed
    struct RecordingLlm {
        contexts: Mutex<Vec<String>>,
    }

    impl RecordingLlm {
        fn new() -> Self {
            Self {
                contexts: Mutex::new(Vec::new()),
            }
        }

        fn last_context(&self) -> Option<String> {
            self.contexts.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl LlmProvider for RecordingLlm {
        async fn generate_answer(&self, _question: &str, context: &str) -> Result<String> {
            self.contexts.lock().unwrap().push(context.to_string());
            if context.is_empty() {
                Ok("I cannot answer from the provided documents.".to_string())
            } else {
                Ok("grounded answer".to_string())
            }
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn model(&self) -> &str {
            "fake-model"
        }
    }

    fn seeded_index() -> Arc<MemoryVectorIndex> {
        Arc::new(MemoryVectorIndex::new(2))
    }

    async fn seed(
        index: &MemoryVectorIndex,
        id: &str,
        similarity: f32,
        filename: &str,
        content: &str,
    ) {
        let mut metadata = HashMap::new();
        metadata.insert("filename".to_string(), serde_json::json!(filename));
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

    fn pipeline(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndexProvider>,
        llm: Arc<RecordingLlm>,
    ) -> QueryPipeline {
        QueryPipeline::new(&RagConfig::default(), embedder, index, llm)
    }

    #[tokio::test]
    async fn empty_query_is_invalid() {
        let p = pipeline(
            Arc::new(FixedEmbedder),
            seeded_index(),
            Arc::new(RecordingLlm::new()),
        );
        let result = p.query(QueryRequest::new("  ")).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn embedding_failure_names_the_stage() {
        let p = pipeline(
            Arc::new(FailingEmbedder),
            seeded_index(),
            Arc::new(RecordingLlm::new()),
        );
        let result = p.query(QueryRequest::new("what is revenue?")).await;
        assert!(matches!(result, Err(Error::EmbeddingFailed(_))));
    }

    #[tokio::test]
    async fn filters_drop_mismatches_and_keep_absent_keys() {
        let index = seeded_index();
        seed(&index, "a", 0.9, "keep.pdf", "kept content").await;
        seed(&index, "b", 0.8, "drop.pdf", "dropped content").await;
        // No filename key at all: must survive the filter
        let mut metadata = HashMap::new();
        metadata.insert("content".to_string(), serde_json::json!("keyless content"));
        index
            .upsert(&[StoredVector {
                id: "c".to_string(),
                values: vec![0.7, (1.0 - 0.49f32).sqrt()],
                metadata,
            }])
            .await
            .unwrap();

        let llm = Arc::new(RecordingLlm::new());
        let p = pipeline(Arc::new(FixedEmbedder), index, llm.clone());

        let response = p
            .query(QueryRequest::new("question").with_filter("filename", "keep.pdf"))
            .await
            .unwrap();

        let ids: Vec<&str> = response.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(llm.last_context().unwrap(), "kept content keyless content");
    }

    #[tokio::test]
    async fn no_survivors_still_generates_with_empty_context() {
        let index = seeded_index();
        seed(&index, "a", 0.9, "other.pdf", "content a").await;

        let llm = Arc::new(RecordingLlm::new());
        let p = pipeline(Arc::new(FixedEmbedder), index, llm.clone());

        let response = p
            .query(QueryRequest::new("question").with_filter("filename", "missing.pdf"))
            .await
            .unwrap();

        assert!(response.sources.is_empty());
        assert_eq!(llm.last_context().unwrap(), "");
        assert_eq!(response.answer, "I cannot answer from the provided documents.");
    }

    #[tokio::test]
    async fn sources_come_back_in_score_order() {
        let index = seeded_index();
        for (id, s) in [("v1", 0.9f32), ("v2", 0.8), ("v3", 0.7), ("v4", 0.6), ("v5", 0.5)] {
            seed(&index, id, s, "f.pdf", &format!("content {}", id)).await;
        }

        let llm = Arc::new(RecordingLlm::new());
        let p = pipeline(Arc::new(FixedEmbedder), index, llm);

        let response = p
            .query(QueryRequest::new("question").with_top_k(3))
            .await
            .unwrap();

        let ids: Vec<&str> = response.sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2", "v3"]);
        assert!(response.sources[0].score > response.sources[1].score);
        assert!(response.sources[1].score > response.sources[2].score);
    }
}
