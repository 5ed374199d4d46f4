//! Process-local [`DocumentStore`]
//!
//! Mirrors the Elasticsearch semantics the rest of the workspace relies on:
//! creation of an existing index reports `AlreadyExists`, writes to a missing
//! index fail, and documents are readable as soon as a write returns. Unlike
//! Elasticsearch, a bulk or point write never creates an index implicitly.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{
    BulkItemFailure, BulkOperation, BulkSummary, DocumentStore, IndexCreation, IndexDeletion,
    IndexSettings, SearchHit, SearchQuery,
};
use crate::error::{StoreError, StoreResult};

#[derive(Debug, Default)]
struct MemoryIndex {
    settings: Option<IndexSettings>,
    documents: BTreeMap<String, Value>,
}

/// In-memory document store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    indices: RwLock<HashMap<String, MemoryIndex>>,
    offline: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable store. While offline every call fails with
    /// [`StoreError::Connectivity`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Settings the index was created with
    pub async fn settings(&self, index: &str) -> Option<IndexSettings> {
        self.indices.read().await.get(index).and_then(|i| i.settings)
    }

    /// Number of documents currently held by the index
    pub async fn document_count(&self, index: &str) -> usize {
        self.indices
            .read()
            .await
            .get(index)
            .map(|i| i.documents.len())
            .unwrap_or(0)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::connectivity("in-memory store is offline"))
        } else {
            Ok(())
        }
    }
}

fn matches(query: &SearchQuery, document: &Value) -> bool {
    match query {
        SearchQuery::MatchAll => true,
        SearchQuery::Term { field, value } => match document.get(field) {
            Some(Value::String(s)) => s == value,
            Some(other) => other.to_string() == *value,
            None => false,
        },
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn index_exists(&self, index: &str) -> StoreResult<bool> {
        self.check_online()?;
        Ok(self.indices.read().await.contains_key(index))
    }

    async fn create_index(
        &self,
        index: &str,
        settings: &IndexSettings,
    ) -> StoreResult<IndexCreation> {
        self.check_online()?;
        let mut indices = self.indices.write().await;
        if indices.contains_key(index) {
            return Ok(IndexCreation::AlreadyExists);
        }
        indices.insert(
            index.to_string(),
            MemoryIndex {
                settings: Some(*settings),
                documents: BTreeMap::new(),
            },
        );
        Ok(IndexCreation::Created)
    }

    async fn delete_index(&self, index: &str) -> StoreResult<IndexDeletion> {
        self.check_online()?;
        match self.indices.write().await.remove(index) {
            Some(_) => Ok(IndexDeletion::Deleted),
            None => Ok(IndexDeletion::NotFound),
        }
    }

    async fn put_document(&self, index: &str, id: &str, body: &Value) -> StoreResult<()> {
        self.check_online()?;
        let mut indices = self.indices.write().await;
        let target = indices
            .get_mut(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;
        target.documents.insert(id.to_string(), body.clone());
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> StoreResult<Option<Value>> {
        self.check_online()?;
        Ok(self
            .indices
            .read()
            .await
            .get(index)
            .and_then(|i| i.documents.get(id).cloned()))
    }

    async fn bulk_write(
        &self,
        operations: &[BulkOperation],
        _refresh: bool,
    ) -> StoreResult<BulkSummary> {
        self.check_online()?;
        let mut indices = self.indices.write().await;
        let mut summary = BulkSummary::default();

        for op in operations {
            match indices.get_mut(&op.index) {
                Some(target) => {
                    target.documents.insert(op.id.clone(), op.document.clone());
                    summary.succeeded += 1;
                },
                None => {
                    summary.failed += 1;
                    summary.failures.push(BulkItemFailure {
                        id: op.id.clone(),
                        status: 404,
                        reason: format!("no such index [{}]", op.index),
                    });
                },
            }
        }

        Ok(summary)
    }

    async fn search(
        &self,
        index: &str,
        query: &SearchQuery,
        size: usize,
    ) -> StoreResult<Vec<SearchHit>> {
        self.check_online()?;
        let indices = self.indices.read().await;
        let target = indices
            .get(index)
            .ok_or_else(|| StoreError::IndexNotFound(index.to_string()))?;

        Ok(target
            .documents
            .iter()
            .filter(|(_, doc)| matches(query, doc))
            .take(size)
            .map(|(id, doc)| SearchHit {
                id: id.clone(),
                source: doc.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_reports_existing_index() {
        let store = InMemoryStore::new();
        let settings = IndexSettings::default();

        assert_eq!(
            store.create_index("spark-jobs", &settings).await.unwrap(),
            IndexCreation::Created
        );
        assert_eq!(
            store.create_index("spark-jobs", &settings).await.unwrap(),
            IndexCreation::AlreadyExists
        );
        assert_eq!(store.settings("spark-jobs").await, Some(settings));
    }

    #[tokio::test]
    async fn test_concurrent_creation_has_single_winner() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = Vec::new();

        for _ in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .create_index("spark-jobs", &IndexSettings::default())
                    .await
                    .unwrap()
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap() == IndexCreation::Created {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_put_requires_index() {
        let store = InMemoryStore::new();
        let err = store
            .put_document("missing", "1", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::IndexNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_put_overwrites_same_id() {
        let store = InMemoryStore::new();
        store
            .create_index("spark-jobs", &IndexSettings::default())
            .await
            .unwrap();
        store
            .put_document("spark-jobs", "42", &json!({"current": 0}))
            .await
            .unwrap();
        store
            .put_document("spark-jobs", "42", &json!({"current": 7}))
            .await
            .unwrap();

        let doc = store.get_document("spark-jobs", "42").await.unwrap().unwrap();
        assert_eq!(doc["current"], 7);
        assert_eq!(store.document_count("spark-jobs").await, 1);
    }

    #[tokio::test]
    async fn test_bulk_reports_missing_index_per_item() {
        let store = InMemoryStore::new();
        store
            .create_index("titanic", &IndexSettings::default())
            .await
            .unwrap();

        let summary = store
            .bulk_write(
                &[
                    BulkOperation::new("titanic", "1", json!({"passengerid": "1"})),
                    BulkOperation::new("elsewhere", "2", json!({"passengerid": "2"})),
                ],
                true,
            )
            .await
            .unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].id, "2");
    }

    #[tokio::test]
    async fn test_term_search_and_size() {
        let store = InMemoryStore::new();
        store
            .create_index("titanic", &IndexSettings::default())
            .await
            .unwrap();
        for (id, name) in [("1", "Alice"), ("2", "Bob"), ("3", "Alice")] {
            store
                .put_document("titanic", id, &json!({"passengerid": id, "name": name}))
                .await
                .unwrap();
        }

        let alices = store
            .search("titanic", &SearchQuery::term("name", "Alice"), 10)
            .await
            .unwrap();
        assert_eq!(alices.len(), 2);

        let page = store.search("titanic", &SearchQuery::MatchAll, 2).await.unwrap();
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn test_offline_store_fails_with_connectivity() {
        let store = InMemoryStore::new();
        store.set_offline(true);
        let err = store.index_exists("spark-jobs").await.unwrap_err();
        assert!(err.is_retryable());

        store.set_offline(false);
        assert!(!store.index_exists("spark-jobs").await.unwrap());
    }
}
