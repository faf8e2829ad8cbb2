//! # Queue Consumer
//!
//! Worker loops that pull raw messages from a [`QueueService`], hand each to
//! the [`Dispatcher`] and acknowledge it. Dispatch never fails, so every
//! received message is acknowledged; redelivery is left to the broker.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::dispatcher::{DispatchOutcome, Dispatcher};
use crate::config::ConsumerConfig;
use crate::lifecycle::ShutdownSignal;
use crate::messaging::{MessagingError, QueueService, RoutingKey};

/// Tally of one receive-dispatch-ack pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub received: usize,
    pub processed: usize,
    pub dropped: usize,
    pub ack_failures: usize,
}

#[derive(Clone)]
pub struct QueueConsumer {
    queue: Arc<dyn QueueService>,
    dispatcher: Arc<Dispatcher>,
    config: ConsumerConfig,
}

impl std::fmt::Debug for QueueConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueConsumer")
            .field("provider", &self.queue.provider_name())
            .field("config", &self.config)
            .finish()
    }
}

impl QueueConsumer {
    pub fn new(
        queue: Arc<dyn QueueService>,
        dispatcher: Arc<Dispatcher>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            queue,
            dispatcher,
            config,
        }
    }

    /// Receive up to one batch, dispatch and acknowledge each message
    pub async fn consume_batch(&self, routing_key: &str) -> Result<BatchReport, MessagingError> {
        let deliveries = self
            .queue
            .receive(routing_key, self.config.batch_size)
            .await?;

        let mut report = BatchReport {
            received: deliveries.len(),
            ..BatchReport::default()
        };

        for delivery in deliveries {
            match self.dispatcher.dispatch(&delivery.routing_key, &delivery.body).await {
                DispatchOutcome::Processed { .. } => report.processed += 1,
                DispatchOutcome::Dropped(_) => report.dropped += 1,
            }

            if let Err(e) = self.queue.ack(routing_key, &delivery.receipt_handle).await {
                report.ack_failures += 1;
                warn!(
                    routing_key = %routing_key,
                    receipt_handle = %delivery.receipt_handle,
                    error = %e,
                    "Failed to acknowledge message"
                );
            }
        }

        Ok(report)
    }

    /// Worker loop for one routing key, until shutdown
    pub async fn run_worker(&self, routing_key: String, worker_id: usize, shutdown: ShutdownSignal) {
        info!(routing_key = %routing_key, worker_id, "Waiting for messages");
        let idle = self.config.polling_interval();

        while !shutdown.is_triggered() {
            match self.consume_batch(&routing_key).await {
                Ok(report) if report.received > 0 => {
                    debug!(routing_key = %routing_key, worker_id, ?report, "Batch consumed");
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(
                        routing_key = %routing_key,
                        worker_id,
                        error = %e,
                        "An error occurred while consuming messages"
                    );
                }
            }

            if !shutdown.sleep(idle).await {
                break;
            }
        }

        info!(routing_key = %routing_key, worker_id, "Consumer worker stopped");
    }

    /// Spawn `count` workers for one routing key
    ///
    /// The queue is declared first so a broker problem surfaces here rather
    /// than inside the workers.
    pub async fn create_consumers(
        &self,
        routing_key: &str,
        count: usize,
        shutdown: &ShutdownSignal,
    ) -> Result<Vec<JoinHandle<()>>, MessagingError> {
        self.queue.ensure_queue(routing_key).await?;

        let handles = (0..count)
            .map(|worker_id| {
                let consumer = self.clone();
                let routing_key = routing_key.to_string();
                let shutdown = shutdown.clone();
                tokio::spawn(async move { consumer.run_worker(routing_key, worker_id, shutdown).await })
            })
            .collect();

        info!(routing_key = %routing_key, workers = count, provider = self.queue.provider_name(), "Consumers started");
        Ok(handles)
    }

    /// Spawn the configured workers for every known routing key
    pub async fn start(&self, shutdown: &ShutdownSignal) -> Result<Vec<JoinHandle<()>>, MessagingError> {
        let mut handles = Vec::new();
        for key in RoutingKey::known() {
            let count = self.config.workers_for(key.as_str());
            handles.extend(self.create_consumers(key.as_str(), count, shutdown).await?);
        }
        Ok(handles)
    }
}
