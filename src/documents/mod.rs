//! # Documents
//!
//! The document-identity contract shared by the dispatcher, the processors
//! and the monitor engine: a payload plus the collection and id that locate
//! it in the document store.

pub mod store;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::error;

use crate::constants::document_keys;

pub use store::{DocumentStore, InMemoryDocumentStore};

/// A payload travelling through the pipeline with its storage identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentObj {
    pub data: Map<String, Value>,
    pub doc_id: Option<String>,
    /// `backend.warehouse.collection`
    pub collection: Option<String>,
    pub platform: Option<String>,
}

impl DocumentObj {
    /// Wrap a payload, reading identity from its `@uuid` and `collection` fields
    pub fn new(data: Map<String, Value>) -> Self {
        let doc_id = data.get(document_keys::DOC_ID).and_then(scalar_to_string);
        let collection = data
            .get(document_keys::COLLECTION)
            .and_then(scalar_to_string);
        Self {
            data,
            doc_id,
            collection,
            platform: None,
        }
    }

    pub fn with_identity(
        data: Map<String, Value>,
        doc_id: Option<String>,
        collection: Option<String>,
    ) -> Self {
        Self {
            data,
            doc_id,
            collection,
            platform: None,
        }
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    /// Look up a dotted field path in the payload
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.data.get(first)?;
        for part in parts {
            current = step(current, part)?;
        }
        Some(current)
    }

    /// The parsed collection reference, if the collection is well formed
    pub fn collection_ref(&self) -> Option<CollectionRef> {
        self.collection
            .as_deref()
            .and_then(|c| c.parse::<CollectionRef>().ok())
    }

    /// Breakdown of where the source document lives
    ///
    /// Logs and returns `None` when the collection is missing or malformed.
    pub fn location_ref(&self) -> Option<Value> {
        match self.collection_ref() {
            Some(collection_ref) => Some(json!({
                (document_keys::BACKEND): collection_ref.backend,
                (document_keys::WAREHOUSE): collection_ref.warehouse,
                (document_keys::RAW_COLLECTION): collection_ref.collection,
                (document_keys::RAW_DOC_ID): self.doc_id,
            })),
            None => {
                error!(document = %self, "Info for raw data document could not be added");
                None
            }
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }
}

impl fmt::Display for DocumentObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.collection.as_deref().unwrap_or("None"),
            self.doc_id.as_deref().unwrap_or("None")
        )
    }
}

/// Look up a dotted field path in any JSON value
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, step)
}

fn step<'a>(value: &'a Value, part: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(part),
        Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A collection name split into its three parts
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    pub backend: String,
    pub warehouse: String,
    pub collection: String,
}

impl std::str::FromStr for CollectionRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [backend, warehouse, collection]
                if !backend.is_empty() && !warehouse.is_empty() && !collection.is_empty() =>
            {
                Ok(Self {
                    backend: backend.to_string(),
                    warehouse: warehouse.to_string(),
                    collection: collection.to_string(),
                })
            }
            _ => Err(format!("improperly formatted collection string: {s}")),
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.backend, self.warehouse, self.collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_identity_read_from_payload() {
        let doc = DocumentObj::new(payload(json!({
            "@uuid": "abc123",
            "collection": "elasticsearch.test_index.mail",
            "subject": "hello"
        })));
        assert_eq!(doc.doc_id.as_deref(), Some("abc123"));
        assert_eq!(doc.collection.as_deref(), Some("elasticsearch.test_index.mail"));
        assert_eq!(doc.to_string(), "elasticsearch.test_index.mail:abc123");
    }

    #[test]
    fn test_location_ref() {
        let doc = DocumentObj::with_identity(
            Map::new(),
            Some("1".to_string()),
            Some("elasticsearch.cyphon.syslog".to_string()),
        );
        let location = doc.location_ref().unwrap();
        assert_eq!(location["backend"], "elasticsearch");
        assert_eq!(location["database"], "cyphon");
        assert_eq!(location["collection"], "syslog");
        assert_eq!(location["doc_id"], "1");
    }

    #[test]
    fn test_malformed_collection_has_no_location() {
        let doc = DocumentObj::with_identity(Map::new(), None, Some("syslog".to_string()));
        assert!(doc.collection_ref().is_none());
        assert!(doc.location_ref().is_none());
        assert!("a..c".parse::<CollectionRef>().is_err());
    }

    #[test]
    fn test_dotted_lookup() {
        let doc = DocumentObj::new(payload(json!({
            "user": {"name": "jdoe", "tags": ["a", "b"]}
        })));
        assert_eq!(doc.get("user.name"), Some(&json!("jdoe")));
        assert_eq!(doc.get("user.tags.1"), Some(&json!("b")));
        assert_eq!(doc.get("user.missing"), None);
        assert_eq!(lookup_path(&doc.to_value(), "user.name"), Some(&json!("jdoe")));
    }
}
