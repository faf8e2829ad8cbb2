//! Document store seam
//!
//! The core only ever looks documents up by collection and id, or inserts a
//! new one. Backends are external; the in-memory store backs tests and local
//! runs.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Fetch a document; `Ok(None)` when it does not exist
    async fn get(&self, collection: &str, doc_id: &str) -> StoreResult<Option<Value>>;

    /// Store a document under the given id
    async fn insert(&self, collection: &str, doc_id: &str, document: Value) -> StoreResult<()>;
}

/// DashMap-backed document store
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<(String, String), Value>,
    unavailable: AtomicBool,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document
    pub fn with_document(self, collection: &str, doc_id: &str, document: Value) -> Self {
        self.documents
            .insert((collection.to_string(), doc_id.to_string()), document);
        self
    }

    /// Make every call fail as if the backend were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// All documents stored in a collection
    pub fn documents_in(&self, collection: &str) -> Vec<Value> {
        self.documents
            .iter()
            .filter(|entry| entry.key().0 == collection)
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn check_available(&self, operation: &str) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::unavailable(operation, "document store offline"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, collection: &str, doc_id: &str) -> StoreResult<Option<Value>> {
        self.check_available("get")?;
        Ok(self
            .documents
            .get(&(collection.to_string(), doc_id.to_string()))
            .map(|entry| entry.value().clone()))
    }

    async fn insert(&self, collection: &str, doc_id: &str, document: Value) -> StoreResult<()> {
        self.check_available("insert")?;
        self.documents
            .insert((collection.to_string(), doc_id.to_string()), document);
        Ok(())
    }
}
