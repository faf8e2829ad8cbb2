//! # Distilleries
//!
//! A distillery is a named destination collection for one structured data
//! source. Saving a document into a distillery stamps it with provenance
//! metadata, stores it under a fresh id and notifies the registered
//! [`DocumentSavedListener`]s (monitor heartbeats, watchdog inspection).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::constants::{document_keys, events};
use crate::documents::{CollectionRef, DocumentObj, DocumentStore};
use crate::error::StoreError;
use crate::events::EventPublisher;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distillery {
    /// `backend.warehouse.collection`
    pub name: String,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Distillery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            categories: Vec::new(),
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn collection_ref(&self) -> Option<CollectionRef> {
        self.name.parse().ok()
    }

    pub fn shares_category(&self, categories: &[String]) -> bool {
        self.categories.iter().any(|c| categories.contains(c))
    }
}

impl fmt::Display for Distillery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DistilleryError {
    #[error("Unknown distillery: {name}")]
    UnknownDistillery { name: String },

    #[error("Failed to save into {distillery}: {source}")]
    Store {
        distillery: String,
        #[source]
        source: StoreError,
    },

    #[error("Listener {listener} failed for {document}: {message}")]
    Listener {
        listener: String,
        document: String,
        message: String,
    },
}

impl DistilleryError {
    pub fn unknown_distillery(name: impl Into<String>) -> Self {
        Self::UnknownDistillery { name: name.into() }
    }

    pub fn store(distillery: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            distillery: distillery.into(),
            source,
        }
    }

    pub fn listener(
        listener: impl Into<String>,
        document: impl fmt::Display,
        message: impl Into<String>,
    ) -> Self {
        Self::Listener {
            listener: listener.into(),
            document: document.to_string(),
            message: message.into(),
        }
    }
}

/// Reacts to a document having been saved into a distillery
///
/// The document passed in carries the distillery as its collection and the
/// newly assigned id as its doc id.
#[async_trait]
pub trait DocumentSavedListener: Send + Sync {
    async fn document_saved(
        &self,
        distillery: &Distillery,
        saved: &DocumentObj,
        now: DateTime<Utc>,
    ) -> Result<(), DistilleryError>;

    fn listener_name(&self) -> &str;
}

pub struct DistilleryRegistry {
    distilleries: HashMap<String, Distillery>,
    documents: Arc<dyn DocumentStore>,
    publisher: EventPublisher,
    listeners: Vec<Arc<dyn DocumentSavedListener>>,
}

impl fmt::Debug for DistilleryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistilleryRegistry")
            .field("distilleries", &self.distilleries.keys().collect::<Vec<_>>())
            .field(
                "listeners",
                &self
                    .listeners
                    .iter()
                    .map(|l| l.listener_name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl DistilleryRegistry {
    pub fn new(
        distilleries: impl IntoIterator<Item = Distillery>,
        documents: Arc<dyn DocumentStore>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            distilleries: distilleries
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
            documents,
            publisher,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn DocumentSavedListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Distillery> {
        self.distilleries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.distilleries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.distilleries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distilleries.is_empty()
    }

    /// Save a document into a distillery and notify listeners
    ///
    /// Every listener runs even when an earlier one fails; the first listener
    /// failure is returned after the document has been stored.
    pub async fn save_data(
        &self,
        name: &str,
        doc: &DocumentObj,
        now: DateTime<Utc>,
    ) -> Result<DocumentObj, DistilleryError> {
        let distillery = self
            .distilleries
            .get(name)
            .ok_or_else(|| DistilleryError::unknown_distillery(name))?;

        let mut data = doc.data.clone();
        data.insert(document_keys::SAVED_DATE.to_string(), json!(now));
        data.insert(document_keys::DISTILLERY.to_string(), json!(distillery.name));
        if doc.doc_id.is_some() && doc.collection.is_some() {
            if let Some(location) = doc.location_ref() {
                data.insert(document_keys::RAW_DATA.to_string(), location);
            }
        }
        if let Some(platform) = &doc.platform {
            data.insert(document_keys::PLATFORM.to_string(), json!(platform));
        }

        let doc_id = Uuid::new_v4().to_string();
        self.documents
            .insert(&distillery.name, &doc_id, Value::Object(data.clone()))
            .await
            .map_err(|e| DistilleryError::store(&distillery.name, e))?;

        let mut saved = DocumentObj::with_identity(
            data,
            Some(doc_id.clone()),
            Some(distillery.name.clone()),
        );
        saved.platform = doc.platform.clone();

        info!(
            distillery = %distillery.name,
            doc_id = %doc_id,
            source = %doc,
            "Document saved"
        );
        if let Err(e) = self
            .publisher
            .publish(
                events::DOCUMENT_SAVED,
                json!({
                    "distillery": distillery.name,
                    "doc_id": doc_id,
                    "source": doc.to_string(),
                }),
            )
            .await
        {
            debug!(error = %e, "Document saved event not published");
        }

        let mut first_error = None;
        for listener in &self.listeners {
            if let Err(e) = listener.document_saved(distillery, &saved, now).await {
                error!(
                    listener = listener.listener_name(),
                    document = %saved,
                    error = %e,
                    "Document saved listener failed"
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(saved),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::InMemoryDocumentStore;
    use parking_lot::Mutex;
    use serde_json::Map;

    const MAIL: &str = "elasticsearch.test_index.mail";

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl DocumentSavedListener for Recorder {
        async fn document_saved(
            &self,
            distillery: &Distillery,
            saved: &DocumentObj,
            _now: DateTime<Utc>,
        ) -> Result<(), DistilleryError> {
            self.seen.lock().push(format!("{}:{}", distillery, saved.doc_id.is_some()));
            if self.fail {
                return Err(DistilleryError::listener("recorder", saved, "boom"));
            }
            Ok(())
        }

        fn listener_name(&self) -> &str {
            "recorder"
        }
    }

    fn source() -> DocumentObj {
        let mut data = Map::new();
        data.insert("subject".to_string(), json!("hello"));
        DocumentObj::with_identity(data, Some("abc".to_string()), Some("mongodb.raw.posts".to_string()))
            .with_platform("twitter")
    }

    #[tokio::test]
    async fn test_save_data_stamps_metadata() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let recorder = Arc::new(Recorder::default());
        let registry = DistilleryRegistry::new([Distillery::new(MAIL)], store.clone(), EventPublisher::new(8))
            .with_listener(recorder.clone());

        let now = Utc::now();
        let saved = registry.save_data(MAIL, &source(), now).await.unwrap();

        assert_eq!(saved.collection.as_deref(), Some(MAIL));
        let stored = store.documents_in(MAIL);
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0]["subject"], "hello");
        assert_eq!(stored[0]["_distillery"], MAIL);
        assert_eq!(stored[0]["_platform"], "twitter");
        assert_eq!(stored[0]["_raw_data"]["backend"], "mongodb");
        assert_eq!(stored[0]["_raw_data"]["database"], "raw");
        assert_eq!(stored[0]["_raw_data"]["doc_id"], "abc");
        assert_eq!(*recorder.seen.lock(), vec![format!("{MAIL}:true")]);
    }

    #[tokio::test]
    async fn test_unknown_distillery() {
        let registry = DistilleryRegistry::new(
            Vec::new(),
            Arc::new(InMemoryDocumentStore::new()),
            EventPublisher::new(8),
        );
        let err = registry.save_data(MAIL, &source(), Utc::now()).await.unwrap_err();
        assert_eq!(err, DistilleryError::unknown_distillery(MAIL));
    }

    #[tokio::test]
    async fn test_listener_failure_after_store() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let failing = Arc::new(Recorder {
            fail: true,
            ..Recorder::default()
        });
        let after = Arc::new(Recorder::default());
        let registry = DistilleryRegistry::new([Distillery::new(MAIL)], store.clone(), EventPublisher::new(8))
            .with_listener(failing)
            .with_listener(after.clone());

        let err = registry.save_data(MAIL, &source(), Utc::now()).await.unwrap_err();
        assert!(matches!(err, DistilleryError::Listener { .. }));
        assert_eq!(store.documents_in(MAIL).len(), 1);
        assert_eq!(after.seen.lock().len(), 1);
    }
}
