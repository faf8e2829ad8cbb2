use thiserror::Error;
use uuid::Uuid;

use crate::error::StoreError;

/// Failures of a single monitor operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    #[error("Monitor not found: {name}")]
    NotFound { name: String },

    #[error("Monitor store error for {name}: {source}")]
    Store {
        name: String,
        #[source]
        source: StoreError,
    },

    /// The alert exists in the sink but the status it belongs to was not saved
    #[error("Monitor store error for {name} after creating alert {alert_id}: {source}")]
    UnsavedAlert {
        name: String,
        alert_id: Uuid,
        #[source]
        source: StoreError,
    },

    #[error("Alert sink error for {name}: {source}")]
    AlertSink {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("Document store error for {name}: {source}")]
    DocumentStore {
        name: String,
        #[source]
        source: StoreError,
    },
}

impl MonitorError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn store(name: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            name: name.into(),
            source,
        }
    }

    pub fn unsaved_alert(name: impl Into<String>, alert_id: Uuid, source: StoreError) -> Self {
        Self::UnsavedAlert {
            name: name.into(),
            alert_id,
            source,
        }
    }

    pub fn alert_sink(name: impl Into<String>, source: StoreError) -> Self {
        Self::AlertSink {
            name: name.into(),
            source,
        }
    }

    pub fn document_store(name: impl Into<String>, source: StoreError) -> Self {
        Self::DocumentStore {
            name: name.into(),
            source,
        }
    }
}
