//! # Runtime
//!
//! Wires the stores, registries, processors, dispatcher, consumers and sweep
//! from a [`DistillConfig`] and a [`Catalog`]. The in-memory stores are used
//! for documents, alerts and monitors; the queue provider is supplied by the
//! caller.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::alerts::{AlertSink, InMemoryAlertSink};
use crate::config::{Catalog, DistillConfig};
use crate::dispatch::{Dispatcher, QueueConsumer};
use crate::distilleries::DistilleryRegistry;
use crate::documents::{DocumentStore, InMemoryDocumentStore};
use crate::error::Result;
use crate::events::EventPublisher;
use crate::lifecycle::ShutdownSignal;
use crate::messaging::QueueService;
use crate::monitors::{InMemoryMonitorStore, MonitorEngine, MonitorStore, MonitorSweeper};
use crate::processors::{DataProcessor, LogProcessor, MonitorProcessor, WatchdogProcessor};
use crate::sifter::ChuteSet;
use crate::watchdogs::WatchdogRegistry;

/// Every long-lived component of the receiver
#[derive(Debug, Clone)]
pub struct Runtime {
    pub publisher: EventPublisher,
    pub documents: Arc<InMemoryDocumentStore>,
    pub alerts: Arc<InMemoryAlertSink>,
    pub monitors: Arc<InMemoryMonitorStore>,
    pub engine: Arc<MonitorEngine>,
    pub watchdogs: Arc<WatchdogRegistry>,
    pub distilleries: Arc<DistilleryRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub consumer: QueueConsumer,
    pub sweeper: MonitorSweeper,
    sweep_enabled: bool,
}

impl Runtime {
    pub fn build(config: &DistillConfig, catalog: Catalog, queue: Arc<dyn QueueService>) -> Self {
        let publisher = EventPublisher::default();
        let documents = Arc::new(InMemoryDocumentStore::new());
        let alerts = Arc::new(InMemoryAlertSink::new());
        let monitors = Arc::new(InMemoryMonitorStore::with_monitors(catalog.monitors));

        let document_store: Arc<dyn DocumentStore> = documents.clone();
        let alert_sink: Arc<dyn AlertSink> = alerts.clone();
        let monitor_store: Arc<dyn MonitorStore> = monitors.clone();

        let engine = Arc::new(
            MonitorEngine::new(
                monitor_store,
                document_store.clone(),
                alert_sink.clone(),
                publisher.clone(),
            )
            .with_teaser_config(config.teasers.clone())
            .with_alert_config(config.alerts.clone()),
        );

        let watchdogs = Arc::new(
            WatchdogRegistry::new(
                catalog.watchdogs,
                catalog.distilleries.clone(),
                alert_sink,
                publisher.clone(),
            )
            .with_teaser_config(config.teasers.clone())
            .with_alert_config(config.alerts.clone()),
        );

        let distilleries = Arc::new(
            DistilleryRegistry::new(catalog.distilleries, document_store, publisher.clone())
                .with_listener(engine.clone())
                .with_listener(watchdogs.clone()),
        );

        let log_chutes = Arc::new(ChuteSet::new(
            "log",
            catalog.log_chutes,
            config.sifter.log.clone(),
            distilleries.clone(),
        ));
        let data_chutes = Arc::new(ChuteSet::new(
            "data",
            catalog.data_chutes,
            config.sifter.data.clone(),
            distilleries.clone(),
        ));

        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(LogProcessor::new(log_chutes)),
            Arc::new(DataProcessor::new(data_chutes)),
            Arc::new(WatchdogProcessor::new(watchdogs.clone())),
            Arc::new(MonitorProcessor::new(engine.clone())),
            publisher.clone(),
        ));

        let consumer = QueueConsumer::new(queue, dispatcher.clone(), config.consumers.clone());
        let sweeper = MonitorSweeper::new(engine.clone(), config.sweep.interval());

        Self {
            publisher,
            documents,
            alerts,
            monitors,
            engine,
            watchdogs,
            distilleries,
            dispatcher,
            consumer,
            sweeper,
            sweep_enabled: config.sweep.enabled,
        }
    }

    /// Spawn the consumers and, when enabled, the monitor sweep
    pub async fn start(&self, shutdown: &ShutdownSignal) -> Result<Vec<JoinHandle<()>>> {
        let mut handles = self.consumer.start(shutdown).await?;

        if self.sweep_enabled {
            let sweeper = self.sweeper.clone();
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move { sweeper.run(shutdown).await }));
        }

        info!(tasks = handles.len(), sweep = self.sweep_enabled, "Receiver started");
        Ok(handles)
    }
}
