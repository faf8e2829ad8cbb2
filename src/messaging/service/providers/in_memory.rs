//! # In-Memory Queue Service
//!
//! Thread-safe in-memory queues for tests and local runs. Received messages
//! stay in the queue, hidden, until they are acked or nacked.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::messaging::service::traits::QueueService;
use crate::messaging::service::types::{Delivery, ReceiptHandle};
use crate::messaging::MessagingError;

#[derive(Debug, Clone)]
struct InMemoryQueuedMessage {
    id: u64,
    body: Vec<u8>,
    enqueued_at: DateTime<Utc>,
    in_flight: bool,
    receive_count: u32,
}

#[derive(Debug, Default)]
struct InMemoryQueue {
    messages: VecDeque<InMemoryQueuedMessage>,
    total_acked: u64,
    total_nacked: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryQueueService {
    queues: RwLock<HashMap<String, InMemoryQueue>>,
    next_id: AtomicU64,
}

impl InMemoryQueueService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with queues for the given routing keys
    pub fn with_queues(routing_keys: &[&str]) -> Self {
        let queues = routing_keys
            .iter()
            .map(|key| (key.to_string(), InMemoryQueue::default()))
            .collect();
        Self {
            queues: RwLock::new(queues),
            next_id: AtomicU64::new(0),
        }
    }

    /// Messages still held by a queue, in flight or not
    pub async fn queue_length(&self, routing_key: &str) -> usize {
        let queues = self.queues.read().await;
        queues
            .get(routing_key)
            .map(|q| q.messages.len())
            .unwrap_or(0)
    }

    pub async fn acked_count(&self, routing_key: &str) -> u64 {
        let queues = self.queues.read().await;
        queues.get(routing_key).map(|q| q.total_acked).unwrap_or(0)
    }

    pub async fn nacked_count(&self, routing_key: &str) -> u64 {
        let queues = self.queues.read().await;
        queues.get(routing_key).map(|q| q.total_nacked).unwrap_or(0)
    }

    fn parse_handle(receipt_handle: &ReceiptHandle) -> Result<u64, MessagingError> {
        receipt_handle
            .as_u64()
            .ok_or_else(|| MessagingError::invalid_receipt_handle(receipt_handle.as_str()))
    }
}

#[async_trait]
impl QueueService for InMemoryQueueService {
    async fn ensure_queue(&self, routing_key: &str) -> Result<(), MessagingError> {
        let mut queues = self.queues.write().await;
        queues.entry(routing_key.to_string()).or_default();
        Ok(())
    }

    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), MessagingError> {
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(routing_key)
            .ok_or_else(|| MessagingError::queue_not_found(routing_key))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        queue.messages.push_back(InMemoryQueuedMessage {
            id,
            body: body.to_vec(),
            enqueued_at: Utc::now(),
            in_flight: false,
            receive_count: 0,
        });
        Ok(())
    }

    async fn receive(
        &self,
        routing_key: &str,
        max_messages: usize,
    ) -> Result<Vec<Delivery>, MessagingError> {
        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(routing_key)
            .ok_or_else(|| MessagingError::queue_not_found(routing_key))?;

        let mut received = Vec::new();
        for msg in queue.messages.iter_mut().filter(|m| !m.in_flight) {
            if received.len() >= max_messages {
                break;
            }
            msg.in_flight = true;
            msg.receive_count += 1;
            received.push(Delivery::new(
                ReceiptHandle::from(msg.id),
                routing_key,
                msg.body.clone(),
                msg.receive_count,
                msg.enqueued_at,
            ));
        }

        Ok(received)
    }

    async fn ack(
        &self,
        routing_key: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError> {
        let message_id = Self::parse_handle(receipt_handle)?;

        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(routing_key)
            .ok_or_else(|| MessagingError::queue_not_found(routing_key))?;

        match queue.messages.iter().position(|m| m.id == message_id) {
            Some(pos) => {
                queue.messages.remove(pos);
                queue.total_acked += 1;
                Ok(())
            }
            None => Err(MessagingError::message_not_found(
                routing_key,
                receipt_handle.as_str(),
            )),
        }
    }

    async fn nack(
        &self,
        routing_key: &str,
        receipt_handle: &ReceiptHandle,
        requeue: bool,
    ) -> Result<(), MessagingError> {
        let message_id = Self::parse_handle(receipt_handle)?;

        let mut queues = self.queues.write().await;
        let queue = queues
            .get_mut(routing_key)
            .ok_or_else(|| MessagingError::queue_not_found(routing_key))?;

        let pos = queue
            .messages
            .iter()
            .position(|m| m.id == message_id)
            .ok_or_else(|| MessagingError::message_not_found(routing_key, receipt_handle.as_str()))?;

        if requeue {
            if let Some(msg) = queue.messages.get_mut(pos) {
                msg.in_flight = false;
            }
        } else {
            queue.messages.remove(pos);
        }
        queue.total_nacked += 1;
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, MessagingError> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}
