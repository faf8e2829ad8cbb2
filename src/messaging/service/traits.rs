//! # Queue Service Traits
//!
//! Provider-agnostic queue operations used by the consumers.

use async_trait::async_trait;

use super::types::{Delivery, ReceiptHandle};
use crate::messaging::MessagingError;

/// Queue backend consumed by [`crate::dispatch::QueueConsumer`]
///
/// Each routing key has its own queue, named after the key and bound to the
/// configured exchange with that key. The trait carries raw bytes so it stays
/// object safe and can be shared as `Arc<dyn QueueService>`.
#[async_trait]
pub trait QueueService: Send + Sync + 'static {
    /// Create and bind the queue for a routing key (idempotent)
    async fn ensure_queue(&self, routing_key: &str) -> Result<(), MessagingError>;

    /// Publish a raw body under a routing key
    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), MessagingError>;

    /// Pull up to `max_messages` from the queue for a routing key
    async fn receive(
        &self,
        routing_key: &str,
        max_messages: usize,
    ) -> Result<Vec<Delivery>, MessagingError>;

    /// Acknowledge a message (remove it from the queue)
    async fn ack(
        &self,
        routing_key: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError>;

    /// Negative acknowledge; `requeue = false` discards the message
    async fn nack(
        &self,
        routing_key: &str,
        receipt_handle: &ReceiptHandle,
        requeue: bool,
    ) -> Result<(), MessagingError>;

    /// Verify the backend is reachable
    async fn health_check(&self) -> Result<bool, MessagingError>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}
