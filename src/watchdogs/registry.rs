//! # Watchdog Registry
//!
//! Runs the relevant watchdogs over a document and raises their alerts.
//! The muzzle check and the alert creation for one watchdog happen under that
//! watchdog's lock, so two concurrent duplicates cannot both get through.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::model::Watchdog;
use crate::alerts::{self, AlarmRef, AlertRecord, AlertSink, NewAlert, Teaser};
use crate::config::{AlertConfig, TeaserConfig};
use crate::constants::{events, AlertLevel};
use crate::distilleries::{Distillery, DistilleryError, DocumentSavedListener};
use crate::documents::DocumentObj;
use crate::error::StoreError;
use crate::events::EventPublisher;
use crate::logging::log_alert_operation;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WatchdogError {
    #[error("Alert sink error for watchdog {watchdog}: {source}")]
    AlertSink {
        watchdog: String,
        #[source]
        source: StoreError,
    },
}

impl WatchdogError {
    pub fn alert_sink(watchdog: impl Into<String>, source: StoreError) -> Self {
        Self::AlertSink {
            watchdog: watchdog.into(),
            source,
        }
    }
}

/// What one watchdog did with one document
#[derive(Debug, Clone, PartialEq)]
pub enum Inspection {
    /// No trigger matched
    Ignored,
    /// A new alert was raised
    Alerted(AlertRecord),
    /// A matching alert already existed; its incident count was bumped
    Muzzled(AlertRecord),
}

struct Guarded {
    watchdog: Watchdog,
    lock: Mutex<()>,
}

pub struct WatchdogRegistry {
    watchdogs: Vec<Guarded>,
    distilleries: HashMap<String, Distillery>,
    alerts: Arc<dyn AlertSink>,
    publisher: EventPublisher,
    teasers: TeaserConfig,
    alert_config: AlertConfig,
}

impl std::fmt::Debug for WatchdogRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchdogRegistry")
            .field(
                "watchdogs",
                &self
                    .watchdogs
                    .iter()
                    .map(|g| g.watchdog.name.as_str())
                    .collect::<Vec<_>>(),
            )
            .field("distilleries", &self.distilleries.len())
            .finish_non_exhaustive()
    }
}

impl WatchdogRegistry {
    pub fn new(
        watchdogs: impl IntoIterator<Item = Watchdog>,
        distilleries: impl IntoIterator<Item = Distillery>,
        alerts: Arc<dyn AlertSink>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            watchdogs: watchdogs
                .into_iter()
                .map(|watchdog| Guarded {
                    watchdog,
                    lock: Mutex::new(()),
                })
                .collect(),
            distilleries: distilleries
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
            alerts,
            publisher,
            teasers: TeaserConfig::default(),
            alert_config: AlertConfig::default(),
        }
    }

    pub fn with_teaser_config(mut self, teasers: TeaserConfig) -> Self {
        self.teasers = teasers;
        self
    }

    pub fn with_alert_config(mut self, alert_config: AlertConfig) -> Self {
        self.alert_config = alert_config;
        self
    }

    /// Names of the watchdogs covering documents from `distillery`
    pub fn find_relevant(&self, distillery: Option<&Distillery>) -> Vec<&str> {
        self.watchdogs
            .iter()
            .filter(|g| g.watchdog.is_relevant(distillery))
            .map(|g| g.watchdog.name.as_str())
            .collect()
    }

    /// Run every relevant watchdog over a document
    ///
    /// The distillery is resolved from the document's collection. Every
    /// relevant watchdog runs; the first sink failure is returned at the end.
    pub async fn process_document(
        &self,
        doc: &DocumentObj,
        now: DateTime<Utc>,
    ) -> Result<Vec<Inspection>, WatchdogError> {
        let distillery = doc
            .collection
            .as_deref()
            .and_then(|c| self.distilleries.get(c));

        let data = doc.to_value();
        let mut inspections = Vec::new();
        let mut first_error = None;
        for guarded in self
            .watchdogs
            .iter()
            .filter(|g| g.watchdog.is_relevant(distillery))
        {
            match self.run_watchdog(guarded, doc, &data, now).await {
                Ok(inspection) => inspections.push(inspection),
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(inspections),
        }
    }

    async fn run_watchdog(
        &self,
        guarded: &Guarded,
        doc: &DocumentObj,
        data: &Value,
        now: DateTime<Utc>,
    ) -> Result<Inspection, WatchdogError> {
        let watchdog = &guarded.watchdog;
        let Some(level) = watchdog.inspect(data) else {
            return Ok(Inspection::Ignored);
        };

        let alarm = AlarmRef::Watchdog(watchdog.name.clone());
        let teaser = Teaser::from_document(data, doc.collection.as_deref(), &self.teasers);
        let mut alert = NewAlert::new(alarm.clone(), level)
            .with_source(doc.collection.clone(), doc.doc_id.clone())
            .with_data(data.clone());
        if let Some(title) = &teaser.title {
            alert = alert.with_title(title, self.alert_config.title_max_length);
        }
        let alert = alert.with_teaser(teaser);

        let _held = guarded.lock.lock().await;

        if let Some(existing) = self.find_duplicate(watchdog, &alarm, level, doc, data, now).await? {
            let record = self
                .alerts
                .add_incident(existing.id)
                .await
                .map_err(|e| WatchdogError::alert_sink(&watchdog.name, e))?;
            log_alert_operation(
                "muzzle",
                &alarm.to_string(),
                level.as_str(),
                record.distillery.as_deref(),
                Some(&record.id.to_string()),
                Some(&format!("incidents={}", record.incidents)),
            );
            if let Err(e) = self
                .publisher
                .publish(
                    events::ALERT_MUZZLED,
                    json!({
                        "alert_id": record.id,
                        "alarm": alarm,
                        "incidents": record.incidents,
                    }),
                )
                .await
            {
                debug!(error = %e, "Muzzle event not published");
            }
            return Ok(Inspection::Muzzled(record));
        }

        let record = alerts::create_alert(self.alerts.as_ref(), &self.publisher, alert)
            .await
            .map_err(|e| WatchdogError::alert_sink(&watchdog.name, e))?;
        info!(watchdog = %watchdog.name, document = %doc, level = %level, "Watchdog raised alert");
        Ok(Inspection::Alerted(record))
    }

    async fn find_duplicate(
        &self,
        watchdog: &Watchdog,
        alarm: &AlarmRef,
        level: AlertLevel,
        doc: &DocumentObj,
        data: &Value,
        now: DateTime<Utc>,
    ) -> Result<Option<AlertRecord>, WatchdogError> {
        let Some(muzzle) = watchdog.active_muzzle() else {
            return Ok(None);
        };

        let recent = self
            .alerts
            .find_recent(alarm, level, doc.collection.as_deref(), muzzle.window_start(now))
            .await
            .map_err(|e| WatchdogError::alert_sink(&watchdog.name, e))?;

        Ok(recent.into_iter().find(|old| {
            old.data
                .as_ref()
                .is_some_and(|old_data| muzzle.is_duplicate(data, old_data))
        }))
    }
}

#[async_trait]
impl DocumentSavedListener for WatchdogRegistry {
    async fn document_saved(
        &self,
        _distillery: &Distillery,
        saved: &DocumentObj,
        now: DateTime<Utc>,
    ) -> Result<(), DistilleryError> {
        self.process_document(saved, now)
            .await
            .map(|_| ())
            .map_err(|e| DistilleryError::listener(self.listener_name(), saved, e.to_string()))
    }

    fn listener_name(&self) -> &str {
        "watchdogs"
    }
}
