//! Document store capability
//!
//! Every component that persists or queries documents goes through the
//! [`DocumentStore`] trait. Implementations are stateless gateways; the store
//! itself owns all data. Callers hold an `Arc<dyn DocumentStore>` handed to them
//! at construction, never a process-wide client.
//!
//! Two implementations ship with this crate:
//!
//! - [`ElasticsearchStore`]: the Elasticsearch REST API over `reqwest`
//! - [`InMemoryStore`]: a process-local store for tests and local runs

pub mod config;
pub mod elasticsearch;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::StoreResult;

pub use config::{StoreBackend, StoreConfig};
pub use elasticsearch::ElasticsearchStore;
pub use memory::InMemoryStore;

/// Default shard count for indices created by this workspace
pub const DEFAULT_SHARDS: u32 = 1;

/// Default replica count for indices created by this workspace
pub const DEFAULT_REPLICAS: u32 = 0;

/// Index settings fixed at creation time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub shards: u32,
    pub replicas: u32,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            replicas: DEFAULT_REPLICAS,
        }
    }
}

impl IndexSettings {
    /// Request body for index creation
    pub fn to_body(&self) -> Value {
        json!({
            "settings": {
                "number_of_shards": self.shards,
                "number_of_replicas": self.replicas,
            }
        })
    }
}

/// Outcome of an index creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexCreation {
    Created,
    /// Someone else created it first. Not an error.
    AlreadyExists,
}

/// Outcome of an index deletion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexDeletion {
    Deleted,
    NotFound,
}

/// One entry of a bulk request: an `index` descriptor paired with its document
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    pub index: String,
    pub id: String,
    pub document: Value,
}

impl BulkOperation {
    pub fn new(index: impl Into<String>, id: impl Into<String>, document: Value) -> Self {
        Self {
            index: index.into(),
            id: id.into(),
            document,
        }
    }

    /// The operation descriptor line that precedes the document
    pub fn descriptor(&self) -> Value {
        json!({ "index": { "_index": self.index, "_id": self.id } })
    }
}

/// Encode operations as newline-delimited JSON, descriptor then document,
/// in the order given. The body always ends with a newline.
pub fn encode_bulk_body(operations: &[BulkOperation]) -> StoreResult<String> {
    let mut body = String::new();
    for op in operations {
        body.push_str(&serde_json::to_string(&op.descriptor())?);
        body.push('\n');
        body.push_str(&serde_json::to_string(&op.document)?);
        body.push('\n');
    }
    Ok(body)
}

/// A single rejected item of a bulk request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkItemFailure {
    pub id: String,
    pub status: u16,
    pub reason: String,
}

/// Per-item result of a bulk request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub failures: Vec<BulkItemFailure>,
}

impl BulkSummary {
    /// Fold another summary into this one
    pub fn merge(&mut self, other: BulkSummary) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.failures.extend(other.failures);
    }
}

/// Queries understood by every store implementation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchQuery {
    MatchAll,
    /// Exact match on a keyword-like field
    Term { field: String, value: String },
}

impl SearchQuery {
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        SearchQuery::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Query DSL representation
    pub fn to_dsl(&self) -> Value {
        match self {
            SearchQuery::MatchAll => json!({ "match_all": {} }),
            // `.keyword` sub-field so dynamically mapped text fields match exactly
            SearchQuery::Term { field, value } => {
                json!({ "term": { format!("{}.keyword", field): value } })
            },
        }
    }
}

/// A document returned by a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub source: Value,
}

/// Narrow interface to the document store
///
/// Every method is a network round trip from the caller's point of view.
/// Nothing is cached: an answer such as "index exists" is only valid at the
/// moment it was given.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn index_exists(&self, index: &str) -> StoreResult<bool>;

    /// Create an index. An index that already exists yields
    /// [`IndexCreation::AlreadyExists`] rather than an error.
    async fn create_index(&self, index: &str, settings: &IndexSettings)
        -> StoreResult<IndexCreation>;

    async fn delete_index(&self, index: &str) -> StoreResult<IndexDeletion>;

    /// Point write; last writer wins on an existing id
    async fn put_document(&self, index: &str, id: &str, body: &Value) -> StoreResult<()>;

    /// Realtime lookup by id
    async fn get_document(&self, index: &str, id: &str) -> StoreResult<Option<Value>>;

    /// Submit operations in one request. With `refresh` the documents are
    /// searchable once the call returns.
    async fn bulk_write(
        &self,
        operations: &[BulkOperation],
        refresh: bool,
    ) -> StoreResult<BulkSummary>;

    async fn search(
        &self,
        index: &str,
        query: &SearchQuery,
        size: usize,
    ) -> StoreResult<Vec<SearchHit>>;
}

/// Create the index unless it exists. Losing a creation race is success.
pub async fn ensure_index(
    store: &dyn DocumentStore,
    index: &str,
    settings: &IndexSettings,
) -> StoreResult<()> {
    if store.index_exists(index).await? {
        debug!(index, "Index already present");
        return Ok(());
    }

    match store.create_index(index, settings).await? {
        IndexCreation::Created => info!(
            index,
            shards = settings.shards,
            replicas = settings.replicas,
            "Created index"
        ),
        IndexCreation::AlreadyExists => {
            debug!(index, "Index created concurrently by another writer")
        },
    }
    Ok(())
}

/// Drop the index if present, then create it empty
pub async fn recreate_index(
    store: &dyn DocumentStore,
    index: &str,
    settings: &IndexSettings,
) -> StoreResult<()> {
    if store.index_exists(index).await? {
        info!(index, "Deleting index");
        let outcome = store.delete_index(index).await?;
        debug!(index, ?outcome, "Delete acknowledged");
    }

    info!(index, shards = settings.shards, replicas = settings.replicas, "Creating index");
    if store.create_index(index, settings).await? == IndexCreation::AlreadyExists {
        // Another writer recreated it between our delete and create
        debug!(index, "Index reappeared before creation");
    }
    Ok(())
}

/// Build the store selected by configuration
pub fn connect(config: &StoreConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match config.backend {
        StoreBackend::Elasticsearch => {
            info!(url = %config.url, "Using Elasticsearch document store");
            Ok(Arc::new(ElasticsearchStore::new(&config.url, config.timeout())?))
        },
        StoreBackend::Memory => {
            info!("Using in-memory document store");
            Ok(Arc::new(InMemoryStore::new()))
        },
    }
}
