//! # Monitor Engine
//!
//! Heartbeats and status evaluation for monitors.
//!
//! ## Transitions
//!
//! - `process` (heartbeat): always GREEN, never alerts
//! - `update_status`, not overdue: GREEN, recovery is silent
//! - `update_status`, overdue, alerts disabled: RED, no alert
//! - `update_status`, overdue, already RED and not repeating: RED, no alert
//! - `update_status`, overdue otherwise: one alert, RED
//!
//! Each operation holds the monitor's row lock from read to save, so a
//! heartbeat arriving mid-evaluation waits and is applied afterwards.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::duration::format_duration;
use super::errors::MonitorError;
use super::model::{Monitor, MonitorStatus};
use super::store::MonitorStore;
use crate::alerts::{self, AlarmRef, AlertRecord, AlertSink, NewAlert, Teaser};
use crate::config::{AlertConfig, TeaserConfig};
use crate::constants::events;
use crate::distilleries::{Distillery, DistilleryError, DocumentSavedListener};
use crate::documents::{DocumentObj, DocumentStore};
use crate::error::StoreResult;
use crate::events::EventPublisher;
use crate::logging::log_monitor_operation;

/// Outcome of one status evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub monitor: String,
    pub previous_status: MonitorStatus,
    pub status: MonitorStatus,
    pub inactive_seconds: i64,
    pub alert: Option<AlertRecord>,
}

pub struct MonitorEngine {
    store: Arc<dyn MonitorStore>,
    documents: Arc<dyn DocumentStore>,
    alerts: Arc<dyn AlertSink>,
    publisher: EventPublisher,
    teasers: TeaserConfig,
    alert_config: AlertConfig,
}

impl std::fmt::Debug for MonitorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorEngine")
            .field("teasers", &self.teasers)
            .field("alert_config", &self.alert_config)
            .finish_non_exhaustive()
    }
}

impl MonitorEngine {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        documents: Arc<dyn DocumentStore>,
        alerts: Arc<dyn AlertSink>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            store,
            documents,
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

    pub fn store(&self) -> &Arc<dyn MonitorStore> {
        &self.store
    }

    /// Record a heartbeat for one monitor
    pub async fn process(
        &self,
        name: &str,
        doc: &DocumentObj,
        now: DateTime<Utc>,
    ) -> Result<Monitor, MonitorError> {
        let _row = self
            .store
            .lock(name)
            .await
            .map_err(|e| MonitorError::store(name, e))?;

        let mut monitor = self.load(name).await?;
        let previous_status = monitor.status();
        monitor.record_heartbeat(doc.collection.clone(), doc.doc_id.clone(), now);
        self.store
            .save(&monitor)
            .await
            .map_err(|e| MonitorError::store(name, e))?;

        log_monitor_operation(
            "heartbeat",
            name,
            Some(previous_status.as_str()),
            MonitorStatus::Green.as_str(),
            Some(0),
            Some(&doc.to_string()),
        );
        self.announce(
            events::MONITOR_HEARTBEAT,
            json!({
                "monitor": name,
                "distillery": doc.collection,
                "doc_id": doc.doc_id,
                "last_healthy": now,
            }),
        )
        .await;
        if previous_status != MonitorStatus::Green {
            self.announce_status_change(name, previous_status, MonitorStatus::Green, now)
                .await;
        }

        Ok(monitor)
    }

    /// Heartbeat every enabled monitor watching the document's collection
    ///
    /// Every watching monitor is attempted; the first failure is returned
    /// after the rest have been processed.
    pub async fn process_document(
        &self,
        doc: &DocumentObj,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>, MonitorError> {
        let Some(collection) = doc.collection.as_deref() else {
            debug!(document = %doc, "Document has no collection, no monitors to update");
            return Ok(Vec::new());
        };

        let names = self
            .store
            .names_watching(collection)
            .await
            .map_err(|e| MonitorError::store(collection, e))?;

        let mut processed = Vec::with_capacity(names.len());
        let mut first_error = None;
        for name in names {
            match self.process(&name, doc, now).await {
                Ok(_) => processed.push(name),
                Err(error) => {
                    warn!(monitor = %name, error = %error, "Monitor heartbeat failed");
                    first_error.get_or_insert(error);
                }
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(processed),
        }
    }

    /// Evaluate staleness and return the resulting status
    pub async fn update_status(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<MonitorStatus, MonitorError> {
        self.evaluate(name, now).await.map(|e| e.status)
    }

    /// Evaluate staleness, alerting on escalation or when repeating
    pub async fn evaluate(
        &self,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Evaluation, MonitorError> {
        let _row = self
            .store
            .lock(name)
            .await
            .map_err(|e| MonitorError::store(name, e))?;

        let mut monitor = self.load(name).await?;
        let previous_status = monitor.status();
        let inactive_seconds = monitor.inactive_seconds(now);

        let mut alert = None;
        let status = if !monitor.is_overdue(now) {
            MonitorStatus::Green
        } else if !monitor.alerts_enabled {
            MonitorStatus::Red
        } else if previous_status == MonitorStatus::Red && !monitor.repeating_alerts {
            MonitorStatus::Red
        } else {
            let record = self.create_alert(&monitor, now).await?;
            monitor.record_alert(record.id, record.created_date);
            alert = Some(record);
            MonitorStatus::Red
        };

        monitor.record_evaluation(status, now);
        if let Err(e) = self.store.save(&monitor).await {
            return Err(match &alert {
                Some(record) => {
                    warn!(
                        monitor = %name,
                        alert_id = %record.id,
                        error = %e,
                        "Alert created but monitor status not saved"
                    );
                    MonitorError::unsaved_alert(name, record.id, e)
                }
                None => MonitorError::store(name, e),
            });
        }

        log_monitor_operation(
            "update_status",
            name,
            Some(previous_status.as_str()),
            status.as_str(),
            Some(inactive_seconds),
            alert.as_ref().map(|a| a.display_title()),
        );
        if previous_status != status {
            self.announce_status_change(name, previous_status, status, now)
                .await;
        }

        Ok(Evaluation {
            monitor: name.to_string(),
            previous_status,
            status,
            inactive_seconds,
            alert,
        })
    }

    /// Raise an alert describing the monitor's current inactivity
    ///
    /// Does not decide whether an alert is due and does not touch the
    /// monitor's state.
    pub async fn create_alert(
        &self,
        monitor: &Monitor,
        now: DateTime<Utc>,
    ) -> Result<AlertRecord, MonitorError> {
        let title = format!(
            "Health monitor \"{}\" has seen no activity for over {}.",
            monitor.name,
            format_duration(monitor.inactive_seconds(now))
        );

        let state = monitor.state();
        let mut alert = NewAlert::new(AlarmRef::Monitor(monitor.name.clone()), monitor.alert_level)
            .with_title(title, self.alert_config.title_max_length)
            .with_source(
                state.last_active_distillery.clone(),
                state.last_saved_doc.clone(),
            );

        // a missing or unreachable document only costs the teaser
        match self.last_document(monitor).await {
            Ok(Some(document)) => {
                alert = alert.with_teaser(Teaser::from_document(
                    &document,
                    state.last_active_distillery.as_deref(),
                    &self.teasers,
                ));
            }
            Ok(None) => {}
            Err(error) => {
                warn!(monitor = %monitor.name, error = %error, "Could not fetch teaser document");
            }
        }

        alerts::create_alert(self.alerts.as_ref(), &self.publisher, alert)
            .await
            .map_err(|e| MonitorError::alert_sink(&monitor.name, e))
    }

    /// Pretty-printed last document seen by a monitor
    ///
    /// `None` when the monitor has no recorded distillery or the document is
    /// gone.
    pub async fn last_doc(&self, name: &str) -> Result<Option<String>, MonitorError> {
        let monitor = self.load(name).await?;
        let document = self
            .last_document(&monitor)
            .await
            .map_err(|e| MonitorError::document_store(name, e))?;
        Ok(document.as_ref().and_then(pretty_json))
    }

    async fn last_document(&self, monitor: &Monitor) -> StoreResult<Option<Value>> {
        let state = monitor.state();
        match (&state.last_active_distillery, &state.last_saved_doc) {
            (Some(distillery), Some(doc_id)) => self.documents.get(distillery, doc_id).await,
            _ => Ok(None),
        }
    }

    async fn load(&self, name: &str) -> Result<Monitor, MonitorError> {
        self.store
            .get(name)
            .await
            .map_err(|e| MonitorError::store(name, e))?
            .ok_or_else(|| MonitorError::not_found(name))
    }

    async fn announce_status_change(
        &self,
        name: &str,
        from: MonitorStatus,
        to: MonitorStatus,
        at: DateTime<Utc>,
    ) {
        self.announce(
            events::MONITOR_STATUS_CHANGED,
            json!({"monitor": name, "from": from, "to": to, "at": at}),
        )
        .await;
    }

    async fn announce(&self, event: &str, context: Value) {
        if let Err(error) = self.publisher.publish(event, context).await {
            debug!(event = %event, error = %error, "Event not published");
        }
    }
}

#[async_trait]
impl DocumentSavedListener for MonitorEngine {
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
        "monitors"
    }
}

/// JSON with four-space indentation
fn pretty_json(value: &Value) -> Option<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer).ok()?;
    String::from_utf8(buffer).ok()
}
