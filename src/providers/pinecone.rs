//! Pinecone vector index provider
//!
//! Talks to the control plane for index management and to the index data
//! plane host for upserts and queries.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::types::document::StoredVector;
use crate::types::response::SearchResult;

use super::vector_index::{DistanceMetric, VectorIndexProvider};
use super::{map_request_error, map_status_error};

const PROVIDER: &str = "pinecone";

/// Managed similarity-search index provider
pub struct PineconeIndex {
    client: reqwest::Client,
    api_key: String,
    index_name: String,
    dimensions: usize,
    metric: DistanceMetric,
    control_plane_url: String,
    cloud: String,
    region: String,
    upsert_batch_size: usize,
    timeout_secs: u64,
    /// Data plane host, discovered by `ensure_index` or set from config
    host: RwLock<Option<String>>,
}

impl PineconeIndex {
    /// Create a new index provider from configuration and an API key
    ///
    /// `dimensions` fixes the dimensionality every stored vector must
    /// match; it is validated locally before any request.
    pub fn new(config: &IndexConfig, api_key: impl Into<String>, dimensions: usize) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(Error::Config(
                "Pinecone API key must not be empty".to_string(),
            ));
        }
        if dimensions == 0 {
            return Err(Error::InvalidArgument(
                "index dimensionality must be greater than zero".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            index_name: config.name.clone(),
            dimensions,
            metric: config.metric,
            control_plane_url: config.control_plane_url.trim_end_matches('/').to_string(),
            cloud: config.cloud.clone(),
            region: config.region.clone(),
            upsert_batch_size: config.upsert_batch_size.max(1),
            timeout_secs: config.timeout_secs,
            host: RwLock::new(config.host.clone()),
        })
    }

    fn describe_url(&self) -> String {
        format!("{}/indexes/{}", self.control_plane_url, self.index_name)
    }

    fn data_url(&self, path: &str) -> Result<String> {
        let host = self.host.read().clone().ok_or_else(|| {
            Error::Config(format!(
                "data plane host for index '{}' unknown; call ensure_index first",
                self.index_name
            ))
        })?;
        Ok(format!("https://{}/{}", host.trim_end_matches('/'), path))
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

    async fn describe_index(&self) -> Result<Option<IndexDescription>> {
        let response = self
            .client
            .get(self.describe_url())
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| map_request_error(PROVIDER, self.timeout_secs, e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(PROVIDER, "describe index", status, &body));
        }

        let description = response
            .json()
            .await
            .map_err(|e| Error::ProviderUnavailable {
                provider: PROVIDER.to_string(),
                message: format!("failed to parse index description: {}", e),
            })?;
        Ok(Some(description))
    }

    async fn create_index(
        &self,
        dimensions: usize,
        metric: DistanceMetric,
    ) -> Result<IndexDescription> {
        let request = CreateIndexRequest {
            name: &self.index_name,
            dimension: dimensions,
            metric: metric.as_str(),
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &self.cloud,
                    region: &self.region,
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/indexes", self.control_plane_url))
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(PROVIDER, self.timeout_secs, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(PROVIDER, "create index", status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| Error::ProviderUnavailable {
                provider: PROVIDER.to_string(),
                message: format!("failed to parse create index response: {}", e),
            })
    }
}

#[derive(serde::Deserialize)]
struct IndexDescription {
    dimension: usize,
    metric: String,
    #[serde(default)]
    host: Option<String>,
}

#[derive(serde::Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(serde::Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(serde::Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(serde::Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [StoredVector],
}

#[derive(serde::Serialize)]
struct QueryApiRequest<'a> {
    vector: &'a [f32],
    #[serde(rename = "topK")]
    top_k: usize,
    #[serde(rename = "includeMetadata")]
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
}

#[derive(serde::Deserialize)]
struct QueryApiResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(serde::Deserialize)]
struct QueryMatch {
    id: String,
    score: f32,
    #[serde(default)]
    metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Build the service-side equality filter document
fn equality_filter(filter: &HashMap<String, String>) -> serde_json::Value {
    let clauses: serde_json::Map<String, serde_json::Value> = filter
        .iter()
        .map(|(k, v)| (k.clone(), serde_json::json!({ "$eq": v })))
        .collect();
    serde_json::Value::Object(clauses)
}

#[async_trait]
impl VectorIndexProvider for PineconeIndex {
    async fn ensure_index(&self, dimensions: usize, metric: DistanceMetric) -> Result<()> {
        if dimensions != self.dimensions {
            return Err(Error::InvalidArgument(format!(
                "ensure_index called with {} dimensions, provider configured for {}",
                dimensions, self.dimensions
            )));
        }

        let description = match self.describe_index().await? {
            Some(existing) => {
                if existing.dimension != dimensions {
                    return Err(Error::ConfigurationConflict(format!(
                        "index '{}' has dimension {}, expected {}",
                        self.index_name, existing.dimension, dimensions
                    )));
                }
                if existing.metric != metric.as_str() {
                    return Err(Error::ConfigurationConflict(format!(
                        "index '{}' uses metric '{}', expected '{}'",
                        self.index_name,
                        existing.metric,
                        metric.as_str()
                    )));
                }
                tracing::debug!(index = %self.index_name, "index already exists");
                existing
            }
            None => {
                tracing::info!(
                    index = %self.index_name,
                    dimensions,
                    metric = metric.as_str(),
                    "creating index"
                );
                self.create_index(dimensions, metric).await?
            }
        };

        if let Some(host) = description.host {
            *self.host.write() = Some(host);
        }

        Ok(())
    }

    async fn upsert(&self, vectors: &[StoredVector]) -> Result<()> {
        if vectors.is_empty() {
            return Ok(());
        }

        for vector in vectors {
            self.check_dimensions(&vector.id, &vector.values)?;
        }

        let url = self.data_url("vectors/upsert")?;

        for batch in vectors.chunks(self.upsert_batch_size) {
            let request = UpsertRequest { vectors: batch };
            let response = self
                .client
                .post(&url)
                .header("Api-Key", &self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|e| map_request_error(PROVIDER, self.timeout_secs, e))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(map_status_error(PROVIDER, "upsert", status, &body));
            }

            tracing::debug!(count = batch.len(), "upserted vector batch");
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

        let url = self.data_url("query")?;
        let request = QueryApiRequest {
            vector,
            top_k,
            include_metadata: true,
            filter: filter.filter(|f| !f.is_empty()).map(equality_filter),
        };

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(PROVIDER, self.timeout_secs, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(map_status_error(PROVIDER, "query", status, &body));
        }

        let parsed: QueryApiResponse =
            response
                .json()
                .await
                .map_err(|e| Error::ProviderUnavailable {
                    provider: PROVIDER.to_string(),
                    message: format!("failed to parse query response: {}", e),
                })?;

        let mut results: Vec<SearchResult> = parsed
            .matches
            .into_iter()
            .map(|m| SearchResult {
                id: m.id,
                score: m.score,
                metadata: m.metadata.unwrap_or_default(),
            })
            .collect();

        // The service returns ranked matches; the stable sort keeps the
        // service's tie order while guaranteeing descending scores.
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(top_k);

        Ok(results)
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/indexes", self.control_plane_url))
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| map_request_error(PROVIDER, self.timeout_secs, e))?;
        Ok(response.status().is_success())
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
