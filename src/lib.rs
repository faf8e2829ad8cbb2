#![allow(clippy::doc_markdown)] // Allow technical terms like RabbitMQ, DashMap in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Distill Core
//!
//! Message routing and data-source health monitoring for the distillery
//! collection pipeline.
//!
//! ## Overview
//!
//! Documents arrive on a broker, one queue per routing key. The
//! [`dispatch::Dispatcher`] decodes each message and hands it to the
//! processor registered for its key; whatever fails is logged with the
//! original body and dropped, so a bad message never stops a consumer.
//!
//! Alongside, the [`monitors::MonitorEngine`] keeps a GREEN/RED state per
//! monitor. Saved documents are heartbeats; a periodic sweep marks monitors
//! RED once they have been silent longer than their interval and raises one
//! alert per escalation (or one per sweep when repeating alerts are on).
//!
//! ## Routing
//!
//! | Routing key  | Processor                               |
//! |--------------|-----------------------------------------|
//! | `logchutes`  | [`processors::LogProcessor`]            |
//! | `datachutes` | [`processors::DataProcessor`]           |
//! | `watchdogs`  | [`processors::WatchdogProcessor`]       |
//! | `monitors`   | [`processors::MonitorProcessor`]        |
//!
//! ## Module Organization
//!
//! - [`config`] - Layered configuration and the administrative catalog
//! - [`messaging`] - Decoding, routing keys and queue providers
//! - [`dispatch`] - Error boundary and consumer workers
//! - [`processors`] - One processor per routing key
//! - [`monitors`] - Monitor state machine and sweep
//! - [`watchdogs`] - Rule-based alarms with muzzles
//! - [`sifter`] / [`sieves`] - Chutes and the rules they evaluate
//! - [`distilleries`] / [`documents`] - Destination collections and storage seams
//! - [`alerts`] - Alert records and the alert sink seam
//! - [`events`] - Lifecycle event broadcast
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use distill_core::config::{Catalog, DistillConfig};
//! use distill_core::lifecycle::ShutdownSignal;
//! use distill_core::messaging::InMemoryQueueService;
//! use distill_core::runtime::Runtime;
//!
//! # async fn example() -> distill_core::Result<()> {
//! let config = DistillConfig::default();
//! let runtime = Runtime::build(&config, Catalog::default(), Arc::new(InMemoryQueueService::new()));
//!
//! let shutdown = ShutdownSignal::new();
//! let handles = runtime.start(&shutdown).await?;
//!
//! shutdown.trigger();
//! for handle in handles {
//!     let _ = handle.await;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod alerts;
pub mod config;
pub mod constants;
pub mod dispatch;
pub mod distilleries;
pub mod documents;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod logging;
pub mod messaging;
pub mod monitors;
pub mod processors;
pub mod runtime;
pub mod sieves;
pub mod sifter;
pub mod watchdogs;

pub use config::{Catalog, ConfigManager, DistillConfig};
pub use constants::{AlertLevel, TimeUnit};
pub use dispatch::{DispatchOutcome, Dispatcher, QueueConsumer};
pub use error::{DistillError, Result, StoreError};
pub use lifecycle::ShutdownSignal;
pub use messaging::{decode, Message, RoutingKey};
pub use monitors::{Monitor, MonitorEngine, MonitorStatus, MonitorSweeper};
pub use runtime::Runtime;
