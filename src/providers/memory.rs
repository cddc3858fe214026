//! In-process vector index for tests and demos
//!
//! Not a persistence engine: vectors live in memory and scoring is a
//! linear scan. Behaves like the managed index for upsert idempotence,
//! ranking, and tie order.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::document::StoredVector;
use crate::types::response::SearchResult;

use super::vector_index::{DistanceMetric, VectorIndexProvider};

/// In-memory cosine-similarity index
pub struct MemoryVectorIndex {
    dimensions: usize,
    metric: DistanceMetric,
    /// Insertion-ordered entries; upserts replace in place so tie order
    /// stays stable
    entries: RwLock<Vec<StoredVector>>,
}

impl MemoryVectorIndex {
    /// Create an empty index with fixed dimensionality
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            metric: DistanceMetric::Cosine,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn check_dimensions(&self, id: &str, values: &[f32]) -> Result<()> {
        if values.len() != self.dimensions {
            return Err(Error::InvalidArgument(format!(
                "vector '{}' has {} dimensions, index expects {}",
                id,
                values.len(),
                self.dimensions
            )));
        }
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndexProvider for MemoryVectorIndex {
    async fn ensure_index(&self, dimensions: usize, metric: DistanceMetric) -> Result<()> {
        if dimensions != self.dimensions {
            return Err(Error::ConfigurationConflict(format!(
                "index has dimension {}, expected {}",
                self.dimensions, dimensions
            )));
        }
        if metric != self.metric {
            return Err(Error::ConfigurationConflict(format!(
                "index uses metric '{}', expected '{}'",
                self.metric.as_str(),
                metric.as_str()
            )));
        }
        Ok(())
    }

    async fn upsert(&self, vectors: &[StoredVector]) -> Result<()> {
        for vector in vectors {
            self.check_dimensions(&vector.id, &vector.values)?;
        }

        let mut entries = self.entries.write();
        for vector in vectors {
            match entries.iter_mut().find(|e| e.id == vector.id) {
                Some(existing) => *existing = vector.clone(),
                None => entries.push(vector.clone()),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Err(Error::InvalidArgument(
                "top_k must be greater than zero".to_string(),
            ));
        }
        self.check_dimensions("query", vector)?;

        let entries = self.entries.read();
        let mut results: Vec<SearchResult> = entries
            .iter()
            .map(|e| SearchResult {
                id: e.id.clone(),
                score: cosine_similarity(vector, &e.values),
                metadata: e.metadata.clone(),
            })
            .filter(|r| filter.map_or(true, |f| r.matches_filters(f)))
            .collect();

        // Stable sort keeps insertion order for equal scores
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        Ok(results)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
