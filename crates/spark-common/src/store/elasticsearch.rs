//! Elasticsearch REST adapter for [`DocumentStore`]
//!
//! Talks JSON over HTTP with `reqwest`. The underlying client pools
//! connections and is safe to share between concurrent requests, so one
//! `ElasticsearchStore` serves the whole process.
//!
//! Failure mapping:
//!
//! - connect errors and timeouts become [`StoreError::Connectivity`]
//! - `index_not_found_exception` becomes [`StoreError::IndexNotFound`]
//! - any other error status becomes [`StoreError::Rejected`]

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{
    encode_bulk_body, BulkItemFailure, BulkOperation, BulkSummary, DocumentStore,
    IndexCreation, IndexDeletion, IndexSettings, SearchHit, SearchQuery,
};
use crate::error::{StoreError, StoreResult};

const ALREADY_EXISTS: &str = "resource_already_exists_exception";
const INDEX_NOT_FOUND: &str = "index_not_found_exception";

/// Document store backed by an Elasticsearch cluster
#[derive(Debug, Clone)]
pub struct ElasticsearchStore {
    client: Client,
    base_url: Url,
}

impl ElasticsearchStore {
    /// Create a store for the cluster at `base_url`.
    ///
    /// `timeout` bounds every request; an expired request surfaces as a
    /// connectivity failure.
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("Invalid Elasticsearch URL '{}': {}", base_url, e))?;

        if base_url.cannot_be_a_base() {
            anyhow::bail!("Elasticsearch URL '{}' cannot carry a path", base_url);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, segments: &[&str]) -> StoreResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                StoreError::connectivity(format!("base URL {} cannot carry a path", self.base_url))
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }
}

fn transport_error(operation: &str, err: reqwest::Error) -> StoreError {
    if err.is_decode() {
        StoreError::decode(format!("{}: {}", operation, err))
    } else {
        StoreError::connectivity(format!("{}: {}", operation, err))
    }
}

fn error_type(body: &Value) -> Option<&str> {
    body.get("error")?.get("type")?.as_str()
}

fn error_reason(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    match error {
        Value::String(reason) => Some(reason.clone()),
        _ => error
            .get("reason")
            .and_then(Value::as_str)
            .or_else(|| error.get("type").and_then(Value::as_str))
            .map(str::to_string),
    }
}

/// Turn an error response into a typed failure
async fn rejection(index: &str, response: Response) -> StoreError {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status == StatusCode::NOT_FOUND && error_type(&body) == Some(INDEX_NOT_FOUND) {
        return StoreError::IndexNotFound(index.to_string());
    }

    let reason = error_reason(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
    StoreError::rejected(status.as_u16(), reason)
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<HashMap<String, BulkItemResult>>,
}

#[derive(Debug, Deserialize)]
struct BulkItemResult {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    status: u16,
    #[serde(default)]
    error: Option<Value>,
}

impl BulkResponse {
    fn summarize(self) -> BulkSummary {
        let mut summary = BulkSummary::default();

        for item in self.items.into_iter().flat_map(|entry| entry.into_values()) {
            match item.error {
                None if item.status < 300 => summary.succeeded += 1,
                error => {
                    let reason = error
                        .map(|e| error_reason(&json!({ "error": e })).unwrap_or_default())
                        .unwrap_or_else(|| format!("status {}", item.status));
                    summary.failed += 1;
                    summary.failures.push(BulkItemFailure {
                        id: item.id.unwrap_or_default(),
                        status: item.status,
                        reason,
                    });
                },
            }
        }

        summary
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source", default)]
    source: Value,
}

#[async_trait]
impl DocumentStore for ElasticsearchStore {
    #[instrument(skip(self))]
    async fn index_exists(&self, index: &str) -> StoreResult<bool> {
        let response = self
            .client
            .head(self.url(&[index])?)
            .send()
            .await
            .map_err(|e| transport_error("index_exists", e))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(StoreError::rejected(
                status.as_u16(),
                status.canonical_reason().unwrap_or("unexpected status"),
            )),
        }
    }

    #[instrument(skip(self, settings))]
    async fn create_index(
        &self,
        index: &str,
        settings: &IndexSettings,
    ) -> StoreResult<IndexCreation> {
        let response = self
            .client
            .put(self.url(&[index])?)
            .json(&settings.to_body())
            .send()
            .await
            .map_err(|e| transport_error("create_index", e))?;

        let status = response.status();
        if status.is_success() {
            debug!(index, "Index created");
            return Ok(IndexCreation::Created);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        if status == StatusCode::BAD_REQUEST && error_type(&body) == Some(ALREADY_EXISTS) {
            debug!(index, "Index already exists");
            return Ok(IndexCreation::AlreadyExists);
        }

        let reason = error_reason(&body).unwrap_or_else(|| status.to_string());
        Err(StoreError::rejected(status.as_u16(), reason))
    }

    #[instrument(skip(self))]
    async fn delete_index(&self, index: &str) -> StoreResult<IndexDeletion> {
        let response = self
            .client
            .delete(self.url(&[index])?)
            .send()
            .await
            .map_err(|e| transport_error("delete_index", e))?;

        match response.status() {
            status if status.is_success() => Ok(IndexDeletion::Deleted),
            StatusCode::NOT_FOUND => Ok(IndexDeletion::NotFound),
            _ => Err(rejection(index, response).await),
        }
    }

    #[instrument(skip(self, body))]
    async fn put_document(&self, index: &str, id: &str, body: &Value) -> StoreResult<()> {
        let response = self
            .client
            .put(self.url(&[index, "_doc", id])?)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error("put_document", e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(rejection(index, response).await)
        }
    }

    #[instrument(skip(self))]
    async fn get_document(&self, index: &str, id: &str) -> StoreResult<Option<Value>> {
        let response = self
            .client
            .get(self.url(&[index, "_doc", id])?)
            .send()
            .await
            .map_err(|e| transport_error("get_document", e))?;

        match response.status() {
            StatusCode::OK => {
                let mut body: Value = response
                    .json()
                    .await
                    .map_err(|e| transport_error("get_document", e))?;
                Ok(body.get_mut("_source").map(Value::take))
            },
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(rejection(index, response).await),
        }
    }

    #[instrument(skip(self, operations), fields(operations = operations.len()))]
    async fn bulk_write(
        &self,
        operations: &[BulkOperation],
        refresh: bool,
    ) -> StoreResult<BulkSummary> {
        if operations.is_empty() {
            return Ok(BulkSummary::default());
        }

        let body = encode_bulk_body(operations)?;
        let response = self
            .client
            .post(self.url(&["_bulk"])?)
            .query(&[("refresh", if refresh { "true" } else { "false" })])
            .header(header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error("bulk_write", e))?;

        if !response.status().is_success() {
            return Err(rejection("_bulk", response).await);
        }

        let parsed: BulkResponse = response
            .json()
            .await
            .map_err(|e| transport_error("bulk_write", e))?;
        let summary = parsed.summarize();

        if summary.failed > 0 {
            warn!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                "Bulk request completed with item failures"
            );
        }

        Ok(summary)
    }

    #[instrument(skip(self, query))]
    async fn search(
        &self,
        index: &str,
        query: &SearchQuery,
        size: usize,
    ) -> StoreResult<Vec<SearchHit>> {
        let response = self
            .client
            .post(self.url(&[index, "_search"])?)
            .json(&json!({ "query": query.to_dsl(), "size": size }))
            .send()
            .await
            .map_err(|e| transport_error("search", e))?;

        if !response.status().is_success() {
            return Err(rejection(index, response).await);
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| transport_error("search", e))?;

        Ok(parsed
            .hits
            .hits
            .into_iter()
            .map(|hit| SearchHit {
                id: hit.id,
                source: hit.source,
            })
            .collect())
    }
}
