//! # Dispatcher
//!
//! The single error boundary for message processing. A message is decoded,
//! routed by key to its processor and processed; whatever goes wrong on the
//! way (bad body, unknown key, processor error or panic) is logged with the
//! original body and the message is reported as dropped. Callers never see
//! an error.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::json;
use tracing::{debug, warn};

use crate::constants::events;
use crate::events::EventPublisher;
use crate::logging::{log_dispatch_operation, log_error};
use crate::messaging::{DecodeError, Message, RoutingKey};
use crate::processors::{Processor, ProcessorError};

/// Why a message was dropped
#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    Decode(DecodeError),
    Unroutable(String),
    ProcessorFailure {
        processor: &'static str,
        error: ProcessorError,
    },
}

impl DropReason {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode_error",
            Self::Unroutable(_) => "unroutable_key",
            Self::ProcessorFailure { .. } => "processor_failure",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "could not decode message: {e}"),
            Self::Unroutable(key) => write!(f, "no processor for routing key '{key}'"),
            Self::ProcessorFailure { processor, error } => write!(f, "{processor} failed: {error}"),
        }
    }
}

/// Result of dispatching one message; the message is consumed either way
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Processed { processor: &'static str },
    Dropped(DropReason),
}

impl DispatchOutcome {
    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed { .. })
    }
}

pub struct Dispatcher {
    log_chutes: Arc<dyn Processor>,
    data_chutes: Arc<dyn Processor>,
    watchdogs: Arc<dyn Processor>,
    monitors: Arc<dyn Processor>,
    publisher: EventPublisher,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("logchutes", &self.log_chutes.name())
            .field("datachutes", &self.data_chutes.name())
            .field("watchdogs", &self.watchdogs.name())
            .field("monitors", &self.monitors.name())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(
        log_chutes: Arc<dyn Processor>,
        data_chutes: Arc<dyn Processor>,
        watchdogs: Arc<dyn Processor>,
        monitors: Arc<dyn Processor>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            log_chutes,
            data_chutes,
            watchdogs,
            monitors,
            publisher,
        }
    }

    /// The processor registered for a routing key
    pub fn processor_for(&self, routing_key: &RoutingKey) -> Option<&Arc<dyn Processor>> {
        match routing_key {
            RoutingKey::LogChutes => Some(&self.log_chutes),
            RoutingKey::DataChutes => Some(&self.data_chutes),
            RoutingKey::Watchdogs => Some(&self.watchdogs),
            RoutingKey::Monitors => Some(&self.monitors),
            RoutingKey::Unknown(_) => None,
        }
    }

    /// Decode, route and process one raw message
    pub async fn dispatch(&self, routing_key: &str, raw: &[u8]) -> DispatchOutcome {
        let key = RoutingKey::parse(routing_key);

        let message = match Message::decode(key, raw) {
            Ok(message) => message,
            Err(e) => return self.drop_message(routing_key, raw, DropReason::Decode(e)).await,
        };

        let Some(processor) = self.processor_for(&message.routing_key) else {
            return self
                .drop_message(routing_key, raw, DropReason::Unroutable(routing_key.to_string()))
                .await;
        };

        let result = AssertUnwindSafe(processor.process(&message))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ProcessorError::panicked(
                    processor.name(),
                    panic_message(panic.as_ref()),
                ))
            });

        match result {
            Ok(()) => {
                log_dispatch_operation(
                    "dispatch",
                    routing_key,
                    message.collection(),
                    message.doc_id(),
                    "processed",
                    Some(processor.name()),
                );
                DispatchOutcome::Processed {
                    processor: processor.name(),
                }
            }
            Err(error) => {
                let reason = DropReason::ProcessorFailure {
                    processor: processor.name(),
                    error,
                };
                self.drop_message(routing_key, raw, reason).await
            }
        }
    }

    async fn drop_message(&self, routing_key: &str, raw: &[u8], reason: DropReason) -> DispatchOutcome {
        let body = String::from_utf8_lossy(raw);

        match &reason {
            DropReason::Unroutable(_) => warn!(
                routing_key = %routing_key,
                body = %body,
                reason = %reason,
                "Dropping message with unknown routing key"
            ),
            _ => log_error(
                "dispatcher",
                "dispatch",
                &format!("An error occurred while processing the message: {reason}"),
                Some(&body),
            ),
        }

        if let Err(e) = self
            .publisher
            .publish(
                events::MESSAGE_DROPPED,
                json!({
                    "routing_key": routing_key,
                    "reason": reason.kind(),
                    "description": reason.to_string(),
                    "body": body,
                }),
            )
            .await
        {
            debug!(error = %e, "Drop event not published");
        }

        DispatchOutcome::Dropped(reason)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
