//! # RabbitMQ Queue Service
//!
//! `QueueService` over AMQP 0.9.1 using `lapin`. Messages are published to
//! the configured exchange; every routing key gets a queue of the same name
//! bound with that key.

use std::collections::HashSet;

use async_trait::async_trait;
use lapin::options::{
    BasicAckOptions, BasicGetOptions, BasicNackOptions, BasicPublishOptions, BasicQosOptions,
    ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::BrokerConfig;
use crate::messaging::service::traits::QueueService;
use crate::messaging::service::types::{Delivery, ReceiptHandle};
use crate::messaging::MessagingError;

#[derive(Debug)]
pub struct RabbitMqQueueService {
    connection: Connection,
    channel: Channel,
    config: BrokerConfig,
    declared_queues: RwLock<HashSet<String>>,
}

impl RabbitMqQueueService {
    /// Connect and declare the exchange
    pub async fn connect(config: &BrokerConfig) -> Result<Self, MessagingError> {
        let connection = Connection::connect(
            &config.url,
            ConnectionProperties::default().with_connection_name("distill-receiver".into()),
        )
        .await
        .map_err(|e| MessagingError::connection(format!("RabbitMQ connection failed: {e}")))?;

        let channel = connection.create_channel().await.map_err(|e| {
            MessagingError::connection(format!("RabbitMQ channel creation failed: {e}"))
        })?;

        channel
            .basic_qos(config.prefetch_count, BasicQosOptions::default())
            .await
            .map_err(|e| {
                MessagingError::configuration("rabbitmq", format!("Failed to set QoS: {e}"))
            })?;

        channel
            .exchange_declare(
                &config.exchange,
                exchange_kind(&config.exchange_type),
                ExchangeDeclareOptions {
                    durable: config.durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::queue_operation(
                    &config.exchange,
                    "exchange_declare",
                    e.to_string(),
                )
            })?;

        info!(
            exchange = %config.exchange,
            exchange_type = %config.exchange_type,
            url = %redacted(&config.url),
            "Connected to RabbitMQ"
        );

        Ok(Self {
            connection,
            channel,
            config: config.clone(),
            declared_queues: RwLock::new(HashSet::new()),
        })
    }

    fn parse_tag(receipt_handle: &ReceiptHandle) -> Result<u64, MessagingError> {
        receipt_handle
            .as_u64()
            .ok_or_else(|| MessagingError::invalid_receipt_handle(receipt_handle.as_str()))
    }
}

fn exchange_kind(exchange_type: &str) -> ExchangeKind {
    match exchange_type {
        "direct" => ExchangeKind::Direct,
        "fanout" => ExchangeKind::Fanout,
        "topic" => ExchangeKind::Topic,
        "headers" => ExchangeKind::Headers,
        other => ExchangeKind::Custom(other.to_string()),
    }
}

/// Scheme and host only, credentials hidden
fn redacted(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}***{}", &url[..scheme_end + 3], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl QueueService for RabbitMqQueueService {
    async fn ensure_queue(&self, routing_key: &str) -> Result<(), MessagingError> {
        if self.declared_queues.read().await.contains(routing_key) {
            return Ok(());
        }

        self.channel
            .queue_declare(
                routing_key,
                QueueDeclareOptions {
                    durable: self.config.durable,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                MessagingError::queue_operation(routing_key, "queue_declare", e.to_string())
            })?;

        self.channel
            .queue_bind(
                routing_key,
                &self.config.exchange,
                routing_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| MessagingError::queue_operation(routing_key, "queue_bind", e.to_string()))?;

        debug!(queue = %routing_key, exchange = %self.config.exchange, "Queue declared and bound");
        self.declared_queues
            .write()
            .await
            .insert(routing_key.to_string());
        Ok(())
    }

    async fn publish(&self, routing_key: &str, body: &[u8]) -> Result<(), MessagingError> {
        let confirm = self
            .channel
            .basic_publish(
                &self.config.exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default()
                    .with_delivery_mode(2)
                    .with_content_type("application/json".into()),
            )
            .await
            .map_err(|e| MessagingError::queue_operation(routing_key, "publish", e.to_string()))?;

        confirm.await.map_err(|e| {
            MessagingError::queue_operation(routing_key, "publish_confirm", e.to_string())
        })?;
        Ok(())
    }

    async fn receive(
        &self,
        routing_key: &str,
        max_messages: usize,
    ) -> Result<Vec<Delivery>, MessagingError> {
        let mut deliveries = Vec::with_capacity(max_messages);

        for _ in 0..max_messages {
            let fetched = self
                .channel
                .basic_get(routing_key, BasicGetOptions { no_ack: false })
                .await
                .map_err(|e| {
                    MessagingError::queue_operation(routing_key, "basic_get", e.to_string())
                })?;

            match fetched {
                Some(message) => {
                    let delivery = message.delivery;
                    // redelivered is the only receive history AMQP exposes
                    let receive_count = if delivery.redelivered { 2 } else { 1 };
                    deliveries.push(Delivery::new(
                        ReceiptHandle::from(delivery.delivery_tag),
                        delivery.routing_key.as_str(),
                        delivery.data,
                        receive_count,
                        chrono::Utc::now(),
                    ));
                }
                None => break,
            }
        }

        Ok(deliveries)
    }

    async fn ack(
        &self,
        routing_key: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError> {
        let delivery_tag = Self::parse_tag(receipt_handle)?;
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| MessagingError::queue_operation(routing_key, "ack", e.to_string()))
    }

    async fn nack(
        &self,
        routing_key: &str,
        receipt_handle: &ReceiptHandle,
        requeue: bool,
    ) -> Result<(), MessagingError> {
        let delivery_tag = Self::parse_tag(receipt_handle)?;
        self.channel
            .basic_nack(
                delivery_tag,
                BasicNackOptions {
                    requeue,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| MessagingError::queue_operation(routing_key, "nack", e.to_string()))
    }

    async fn health_check(&self) -> Result<bool, MessagingError> {
        Ok(self.connection.status().connected() && self.channel.status().connected())
    }

    fn provider_name(&self) -> &'static str {
        "rabbitmq"
    }
}
