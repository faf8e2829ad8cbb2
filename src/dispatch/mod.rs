//! # Dispatch
//!
//! Routing of queued messages to processors, and the consumer workers that
//! feed it.

pub mod consumer;
pub mod dispatcher;

pub use consumer::{BatchReport, QueueConsumer};
pub use dispatcher::{DispatchOutcome, Dispatcher, DropReason};
