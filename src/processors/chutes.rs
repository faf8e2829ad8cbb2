//! Log and data ingestion through chute sets

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use super::{Processor, ProcessorError};
use crate::messaging::Message;
use crate::sifter::ChuteSet;

/// Sifts log documents into distilleries
#[derive(Debug, Clone)]
pub struct LogProcessor {
    chutes: Arc<ChuteSet>,
}

impl LogProcessor {
    pub fn new(chutes: Arc<ChuteSet>) -> Self {
        Self { chutes }
    }
}

#[async_trait]
impl Processor for LogProcessor {
    fn name(&self) -> &'static str {
        "LogProcessor"
    }

    async fn process(&self, message: &Message) -> Result<(), ProcessorError> {
        let outcome = self.chutes.process(&message.document, Utc::now()).await?;
        debug!(
            processor = self.name(),
            document = %message.document,
            saved = outcome.saved.len(),
            used_default = outcome.used_default,
            "Log document sifted"
        );
        Ok(())
    }
}

/// Sifts data documents into distilleries, stamping chute platforms
#[derive(Debug, Clone)]
pub struct DataProcessor {
    chutes: Arc<ChuteSet>,
}

impl DataProcessor {
    pub fn new(chutes: Arc<ChuteSet>) -> Self {
        Self { chutes }
    }
}

#[async_trait]
impl Processor for DataProcessor {
    fn name(&self) -> &'static str {
        "DataProcessor"
    }

    async fn process(&self, message: &Message) -> Result<(), ProcessorError> {
        let outcome = self.chutes.process(&message.document, Utc::now()).await?;
        debug!(
            processor = self.name(),
            document = %message.document,
            saved = outcome.saved.len(),
            used_default = outcome.used_default,
            "Data document sifted"
        );
        Ok(())
    }
}
