//! # Processors
//!
//! One processor per routing key. Each consumes a decoded [`Message`] and
//! performs its side effect; failures are returned to the dispatcher, which
//! logs and drops the message.

use async_trait::async_trait;
use thiserror::Error;

use crate::distilleries::DistilleryError;
use crate::messaging::Message;
use crate::monitors::MonitorError;
use crate::watchdogs::WatchdogError;

pub mod alarms;
pub mod chutes;

pub use alarms::{MonitorProcessor, WatchdogProcessor};
pub use chutes::{DataProcessor, LogProcessor};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProcessorError {
    #[error("{processor} requires field '{field}'")]
    MissingField {
        processor: &'static str,
        field: &'static str,
    },

    #[error(transparent)]
    Distillery(#[from] DistilleryError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error(transparent)]
    Watchdog(#[from] WatchdogError),

    #[error("{processor} panicked: {message}")]
    Panicked {
        processor: String,
        message: String,
    },
}

impl ProcessorError {
    pub fn missing_field(processor: &'static str, field: &'static str) -> Self {
        Self::MissingField { processor, field }
    }

    pub fn panicked(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Panicked {
            processor: processor.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait Processor: Send + Sync {
    /// Name used in logs and drop reports
    fn name(&self) -> &'static str;

    async fn process(&self, message: &Message) -> Result<(), ProcessorError>;
}
