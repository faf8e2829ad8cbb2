//! # Error Types
//!
//! Crate-level error enum plus the storage error shared by every store seam
//! (documents, alerts, monitors). Concern-specific errors live next to their
//! modules and convert into [`DistillError`].

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::distilleries::DistilleryError;
use crate::messaging::{DecodeError, MessagingError};
use crate::monitors::MonitorError;
use crate::processors::ProcessorError;
use crate::watchdogs::WatchdogError;

/// Errors raised by a storage backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("{kind} not found: {key}")]
    NotFound { kind: String, key: String },

    #[error("Store unavailable: {operation}: {message}")]
    Unavailable { operation: String, message: String },

    #[error("Write rejected for {kind} {key}: {message}")]
    WriteRejected {
        kind: String,
        key: String,
        message: String,
    },
}

impl StoreError {
    /// Create a not-found error
    pub fn not_found(kind: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            key: key.into(),
        }
    }

    /// Create an unavailable-backend error
    pub fn unavailable(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a rejected-write error
    pub fn write_rejected(
        kind: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::WriteRejected {
            kind: kind.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Top-level error for the distill core
#[derive(Error, Debug)]
pub enum DistillError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error(transparent)]
    Distillery(#[from] DistilleryError),

    #[error(transparent)]
    Watchdog(#[from] WatchdogError),
}

pub type Result<T> = std::result::Result<T, DistillError>;
