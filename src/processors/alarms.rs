//! Watchdog inspection and monitor heartbeats for routed messages

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::{Processor, ProcessorError};
use crate::constants::document_keys;
use crate::messaging::Message;
use crate::monitors::MonitorEngine;
use crate::watchdogs::WatchdogRegistry;

/// Runs the relevant watchdogs over the message document
#[derive(Debug, Clone)]
pub struct WatchdogProcessor {
    watchdogs: Arc<WatchdogRegistry>,
}

impl WatchdogProcessor {
    pub fn new(watchdogs: Arc<WatchdogRegistry>) -> Self {
        Self { watchdogs }
    }
}

#[async_trait]
impl Processor for WatchdogProcessor {
    fn name(&self) -> &'static str {
        "WatchdogProcessor"
    }

    async fn process(&self, message: &Message) -> Result<(), ProcessorError> {
        let inspections = self
            .watchdogs
            .process_document(&message.document, Utc::now())
            .await?;
        debug!(
            processor = self.name(),
            document = %message.document,
            watchdogs = inspections.len(),
            "Document inspected"
        );
        Ok(())
    }
}

/// Heartbeats the monitors watching the message's collection
#[derive(Debug, Clone)]
pub struct MonitorProcessor {
    engine: Arc<MonitorEngine>,
}

impl MonitorProcessor {
    pub fn new(engine: Arc<MonitorEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Processor for MonitorProcessor {
    fn name(&self) -> &'static str {
        "MonitorProcessor"
    }

    async fn process(&self, message: &Message) -> Result<(), ProcessorError> {
        if message.collection().is_none() {
            return Err(ProcessorError::missing_field(
                self.name(),
                document_keys::COLLECTION,
            ));
        }

        let monitors = self
            .engine
            .process_document(&message.document, Utc::now())
            .await?;
        debug!(
            processor = self.name(),
            document = %message.document,
            monitors = ?monitors,
            "Monitors updated"
        );
        Ok(())
    }
}
