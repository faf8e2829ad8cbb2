//! # Alerts
//!
//! Alert records raised by monitors and watchdogs, and the sink that
//! persists them. The core creates alerts and, for muzzled watchdog alerts,
//! bumps the incident count of an earlier one; everything else about an
//! alert's life belongs to the sink's owner.

pub mod sink;
pub mod teaser;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use crate::constants::{events, AlertLevel};
use crate::error::StoreResult;
use crate::events::EventPublisher;
use crate::logging::log_alert_operation;

pub use sink::{AlertSink, InMemoryAlertSink};
pub use teaser::{truncate_chars, Teaser};

/// Fallback shown for alerts without a title
pub const NO_TITLE: &str = "No title available";

/// The alarm that raised an alert, by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "name", rename_all = "snake_case")]
pub enum AlarmRef {
    Monitor(String),
    Watchdog(String),
}

impl AlarmRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Monitor(name) | Self::Watchdog(name) => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Monitor(_) => "monitor",
            Self::Watchdog(_) => "watchdog",
        }
    }
}

impl fmt::Display for AlarmRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.name())
    }
}

/// An alert about to be handed to the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlert {
    pub title: Option<String>,
    pub alarm: AlarmRef,
    pub level: AlertLevel,
    pub distillery: Option<String>,
    pub doc_id: Option<String>,
    pub teaser: Option<Teaser>,
    pub data: Option<Value>,
}

impl NewAlert {
    pub fn new(alarm: AlarmRef, level: AlertLevel) -> Self {
        Self {
            title: None,
            alarm,
            level,
            distillery: None,
            doc_id: None,
            teaser: None,
            data: None,
        }
    }

    /// Set the title, cut to `max_length` characters
    pub fn with_title(mut self, title: impl AsRef<str>, max_length: usize) -> Self {
        self.title = Some(truncate_chars(title.as_ref(), max_length));
        self
    }

    pub fn with_source(mut self, distillery: Option<String>, doc_id: Option<String>) -> Self {
        self.distillery = distillery;
        self.doc_id = doc_id;
        self
    }

    pub fn with_teaser(mut self, teaser: Teaser) -> Self {
        self.teaser = Some(teaser);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A persisted alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: Uuid,
    pub created_date: DateTime<Utc>,
    pub title: Option<String>,
    pub alarm: AlarmRef,
    pub level: AlertLevel,
    pub distillery: Option<String>,
    pub doc_id: Option<String>,
    pub teaser: Option<Teaser>,
    pub data: Option<Value>,
    /// Times this alert was seen, counting suppressed duplicates
    pub incidents: u32,
}

impl AlertRecord {
    pub fn from_new(alert: NewAlert, created_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_date,
            title: alert.title,
            alarm: alert.alarm,
            level: alert.level,
            distillery: alert.distillery,
            doc_id: alert.doc_id,
            teaser: alert.teaser,
            data: alert.data,
            incidents: 1,
        }
    }

    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => NO_TITLE,
        }
    }
}

/// Create an alert, then log and announce it
pub async fn create_alert(
    sink: &dyn AlertSink,
    publisher: &EventPublisher,
    alert: NewAlert,
) -> StoreResult<AlertRecord> {
    let record = sink.create(alert).await?;

    log_alert_operation(
        "create",
        &record.alarm.to_string(),
        record.level.as_str(),
        record.distillery.as_deref(),
        Some(&record.id.to_string()),
        Some(record.display_title()),
    );

    if let Err(e) = publisher
        .publish(
            events::ALERT_CREATED,
            json!({
                "alert_id": record.id,
                "alarm": record.alarm,
                "level": record.level,
                "distillery": record.distillery,
                "doc_id": record.doc_id,
                "created_date": record.created_date,
            }),
        )
        .await
    {
        debug!(alert_id = %record.id, error = %e, "Alert event not published");
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alarm_ref_serde() {
        let alarm = AlarmRef::Monitor("health_alerts".to_string());
        let value = serde_json::to_value(&alarm).unwrap();
        assert_eq!(value, json!({"type": "monitor", "name": "health_alerts"}));
        assert_eq!(alarm.to_string(), "monitor:health_alerts");
    }

    #[test]
    fn test_title_truncated_to_limit() {
        let alert = NewAlert::new(AlarmRef::Watchdog("inspect_emails".to_string()), AlertLevel::High)
            .with_title("0123456789", 9);
        assert_eq!(alert.title.as_deref(), Some("012345678"));
    }

    #[test]
    fn test_display_title_fallback() {
        let alert = NewAlert::new(AlarmRef::Watchdog("inspect_emails".to_string()), AlertLevel::Low);
        let record = AlertRecord::from_new(alert, Utc::now());
        assert_eq!(record.display_title(), NO_TITLE);
        assert_eq!(record.incidents, 1);
    }

    #[tokio::test]
    async fn test_create_alert_publishes_event() {
        let sink = InMemoryAlertSink::new();
        let publisher = EventPublisher::new(8);
        let mut events_rx = publisher.subscribe();

        let alert = NewAlert::new(AlarmRef::Monitor("health_alerts".to_string()), AlertLevel::High)
            .with_title("Health monitor", 255);
        let record = create_alert(&sink, &publisher, alert).await.unwrap();

        let event = events_rx.recv().await.unwrap();
        assert_eq!(event.name, events::ALERT_CREATED);
        assert_eq!(event.context["alert_id"], json!(record.id));
        assert_eq!(sink.count(), 1);
    }

    #[tokio::test]
    async fn test_create_alert_without_subscribers() {
        let sink = InMemoryAlertSink::new();
        let publisher = EventPublisher::new(8);

        let alert = NewAlert::new(AlarmRef::Watchdog("inspect_emails".to_string()), AlertLevel::Low);
        let record = create_alert(&sink, &publisher, alert).await.unwrap();

        assert_eq!(sink.alerts()[0].id, record.id);
        assert_eq!(publisher.subscriber_count(), 0);
    }
}
