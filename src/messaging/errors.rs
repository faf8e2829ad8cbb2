//! # Messaging Error Types
//!
//! Structured errors for message decoding and queue transport.

use thiserror::Error;

/// A queued message body that cannot become a document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("Message body is not valid UTF-8: {message}")]
    InvalidUtf8 { message: String },

    #[error("Message body is not valid JSON: {message}")]
    MalformedJson { message: String },

    #[error("Message body must be a JSON object, found {found}")]
    NotAnObject { found: String },
}

impl DecodeError {
    pub fn invalid_utf8(message: impl Into<String>) -> Self {
        Self::InvalidUtf8 {
            message: message.into(),
        }
    }

    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::MalformedJson {
            message: message.into(),
        }
    }

    pub fn not_an_object(found: impl Into<String>) -> Self {
        Self::NotAnObject {
            found: found.into(),
        }
    }
}

/// Queue transport errors
#[derive(Error, Debug)]
pub enum MessagingError {
    #[error("Broker connection error: {message}")]
    Connection { message: String },

    #[error("Queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("Queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("Invalid receipt handle: {handle}")]
    InvalidReceiptHandle { handle: String },

    #[error("Message not found: {queue_name}: {handle}")]
    MessageNotFound { queue_name: String, handle: String },

    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Internal messaging error: {message}")]
    Internal { message: String },
}

impl MessagingError {
    /// Create a broker connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a queue operation error
    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a queue not found error
    pub fn queue_not_found(queue_name: impl Into<String>) -> Self {
        Self::QueueNotFound {
            queue_name: queue_name.into(),
        }
    }

    pub fn invalid_receipt_handle(handle: impl Into<String>) -> Self {
        Self::InvalidReceiptHandle {
            handle: handle.into(),
        }
    }

    pub fn message_not_found(queue_name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self::MessageNotFound {
            queue_name: queue_name.into(),
            handle: handle.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
