//! Query request types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Query request for the RAG pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    pub query: String,

    /// Number of results to retrieve (default: 5)
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Metadata equality filters; a result is kept only if every filter
    /// key is absent from its metadata or exactly equal to the requested
    /// value
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

fn default_top_k() -> usize {
    5
}

impl QueryRequest {
    /// Create a new query request with default retrieval settings
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: default_top_k(),
            filters: HashMap::new(),
        }
    }

    /// Set the number of results to retrieve
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Add a metadata equality filter
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }
}
