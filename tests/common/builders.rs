//! Fixtures shared by the integration tests: fixed timestamps around a
//! five-minute monitor interval and harnesses wired against the in-memory
//! stores.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

use distill_core::alerts::InMemoryAlertSink;
use distill_core::documents::InMemoryDocumentStore;
use distill_core::events::EventPublisher;
use distill_core::monitors::{InMemoryMonitorStore, Monitor, MonitorEngine, MonitorState, MonitorStatus};
use distill_core::{AlertLevel, TimeUnit};

pub const DISTILLERY: &str = "elasticsearch.test_index.test_docs";
pub const MONITOR_NAME: &str = "health_alerts";
pub const DOC_ID: &str = "1";

/// Last heartbeat of the fixture monitors
pub fn last_healthy() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2016, 1, 1, 9, 0, 0).unwrap()
}

/// Inside the interval
pub fn early() -> DateTime<Utc> {
    last_healthy() + Duration::minutes(4)
}

/// Exactly on the interval, not yet overdue
pub fn on_time() -> DateTime<Utc> {
    last_healthy() + Duration::minutes(5)
}

/// Past the interval
pub fn late() -> DateTime<Utc> {
    last_healthy() + Duration::minutes(6)
}

pub fn seconds_after_healthy(seconds: i64) -> DateTime<Utc> {
    last_healthy() + Duration::seconds(seconds)
}

/// Builder for monitors with persisted state
pub struct MonitorBuilder {
    name: String,
    status: MonitorStatus,
    time_interval: u64,
    time_unit: TimeUnit,
    level: AlertLevel,
    alerts_enabled: bool,
    repeating_alerts: bool,
    enabled: bool,
    last_active: Option<String>,
    last_doc: Option<String>,
}

impl MonitorBuilder {
    pub fn new() -> Self {
        Self {
            name: MONITOR_NAME.to_string(),
            status: MonitorStatus::Green,
            time_interval: 5,
            time_unit: TimeUnit::Minutes,
            level: AlertLevel::High,
            alerts_enabled: true,
            repeating_alerts: false,
            enabled: true,
            last_active: Some(DISTILLERY.to_string()),
            last_doc: Some(DOC_ID.to_string()),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_status(mut self, status: MonitorStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_interval(mut self, time_interval: u64, time_unit: TimeUnit) -> Self {
        self.time_interval = time_interval;
        self.time_unit = time_unit;
        self
    }

    pub fn with_alerts_enabled(mut self, alerts_enabled: bool) -> Self {
        self.alerts_enabled = alerts_enabled;
        self
    }

    pub fn with_repeating_alerts(mut self, repeating_alerts: bool) -> Self {
        self.repeating_alerts = repeating_alerts;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn without_last_document(mut self) -> Self {
        self.last_active = None;
        self.last_doc = None;
        self
    }

    pub fn with_last_document(mut self, distillery: &str, doc_id: &str) -> Self {
        self.last_active = Some(distillery.to_string());
        self.last_doc = Some(doc_id.to_string());
        self
    }

    pub fn build(self) -> Monitor {
        Monitor::new(self.name, vec![DISTILLERY.to_string()], self.time_interval, self.time_unit)
            .with_alert_level(self.level)
            .with_alerts_enabled(self.alerts_enabled)
            .with_repeating_alerts(self.repeating_alerts)
            .with_enabled(self.enabled)
            .with_created_date(last_healthy() - Duration::days(1))
            .with_state(MonitorState {
                status: self.status,
                last_healthy: Some(last_healthy()),
                last_active_distillery: self.last_active,
                last_saved_doc: self.last_doc,
                ..MonitorState::default()
            })
    }
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A monitor engine over in-memory stores, seeded with one document
pub struct EngineHarness {
    pub engine: Arc<MonitorEngine>,
    pub monitors: Arc<InMemoryMonitorStore>,
    pub alerts: Arc<InMemoryAlertSink>,
    pub documents: Arc<InMemoryDocumentStore>,
    pub publisher: EventPublisher,
}

impl EngineHarness {
    pub fn new(monitors: impl IntoIterator<Item = Monitor>) -> Self {
        let monitors = Arc::new(InMemoryMonitorStore::with_monitors(monitors));
        let alerts = Arc::new(InMemoryAlertSink::new());
        let documents = Arc::new(
            InMemoryDocumentStore::new().with_document(DISTILLERY, DOC_ID, sample_document()),
        );
        let publisher = EventPublisher::new(256);
        let engine = Arc::new(MonitorEngine::new(
            monitors.clone(),
            documents.clone(),
            alerts.clone(),
            publisher.clone(),
        ));
        Self {
            engine,
            monitors,
            alerts,
            documents,
            publisher,
        }
    }

    pub fn status(&self, name: &str) -> MonitorStatus {
        self.monitors
            .snapshot(name)
            .map(|m| m.status())
            .expect("monitor exists")
    }
}

pub fn sample_document() -> Value {
    json!({
        "title": "foo",
        "content": "the quick brown fox",
        "author": "jdoe",
    })
}

/// A raw queue body for a document saved in the fixture distillery
pub fn message_body(doc_id: &str, extra: Value) -> Vec<u8> {
    let mut body = json!({
        "@uuid": doc_id,
        "collection": DISTILLERY,
    });
    if let (Some(target), Value::Object(fields)) = (body.as_object_mut(), extra) {
        target.extend(fields);
    }
    serde_json::to_vec(&body).expect("serializable body")
}
