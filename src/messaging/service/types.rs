//! # Queue Service Types

/// Handle for acknowledging a received message
///
/// The format is provider-specific:
/// - RabbitMQ: delivery tag as string
/// - InMemory: sequence number as string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(pub String);

impl ReceiptHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

impl std::fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ReceiptHandle {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for ReceiptHandle {
    fn from(handle: &str) -> Self {
        Self(handle.to_string())
    }
}

/// A raw message received from a queue
///
/// The body stays undecoded; decoding belongs to the dispatcher so a bad body
/// is reported with its original text.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub receipt_handle: ReceiptHandle,
    /// Routing key the message was published with
    pub routing_key: String,
    pub body: Vec<u8>,
    /// Number of times this message has been received
    pub receive_count: u32,
    pub enqueued_at: chrono::DateTime<chrono::Utc>,
}

impl Delivery {
    pub fn new(
        receipt_handle: ReceiptHandle,
        routing_key: impl Into<String>,
        body: Vec<u8>,
        receive_count: u32,
        enqueued_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            receipt_handle,
            routing_key: routing_key.into(),
            body,
            receive_count,
            enqueued_at,
        }
    }
}
