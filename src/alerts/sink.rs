//! Alert sink seam and in-memory implementation

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::{AlarmRef, AlertRecord, NewAlert};
use crate::constants::AlertLevel;
use crate::error::{StoreError, StoreResult};

#[async_trait]
pub trait AlertSink: Send + Sync + 'static {
    /// Persist a new alert, assigning its id and creation date
    async fn create(&self, alert: NewAlert) -> StoreResult<AlertRecord>;

    /// Alerts from one alarm with the given level and distillery created at
    /// or after `since`, oldest first
    async fn find_recent(
        &self,
        alarm: &AlarmRef,
        level: AlertLevel,
        distillery: Option<&str>,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<AlertRecord>>;

    /// Count one more occurrence of an existing alert
    async fn add_incident(&self, id: Uuid) -> StoreResult<AlertRecord>;
}

/// Vec-backed alert sink for tests and local runs
#[derive(Debug, Default)]
pub struct InMemoryAlertSink {
    alerts: RwLock<Vec<AlertRecord>>,
    rejecting: AtomicBool,
}

impl InMemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `create` fail until switched back
    pub fn set_rejecting(&self, rejecting: bool) {
        self.rejecting.store(rejecting, Ordering::SeqCst);
    }

    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.alerts.read().clone()
    }

    pub fn alerts_for(&self, alarm: &AlarmRef) -> Vec<AlertRecord> {
        self.alerts
            .read()
            .iter()
            .filter(|a| &a.alarm == alarm)
            .cloned()
            .collect()
    }

    pub fn count(&self) -> usize {
        self.alerts.read().len()
    }

    /// Insert a prepared record, e.g. one backdated for a test
    pub fn insert(&self, record: AlertRecord) {
        self.alerts.write().push(record);
    }
}

#[async_trait]
impl AlertSink for InMemoryAlertSink {
    async fn create(&self, alert: NewAlert) -> StoreResult<AlertRecord> {
        if self.rejecting.load(Ordering::SeqCst) {
            return Err(StoreError::write_rejected(
                "alert",
                alert.alarm.to_string(),
                "alert sink is rejecting writes",
            ));
        }
        let record = AlertRecord::from_new(alert, Utc::now());
        self.alerts.write().push(record.clone());
        Ok(record)
    }

    async fn find_recent(
        &self,
        alarm: &AlarmRef,
        level: AlertLevel,
        distillery: Option<&str>,
        since: DateTime<Utc>,
    ) -> StoreResult<Vec<AlertRecord>> {
        let mut found: Vec<AlertRecord> = self
            .alerts
            .read()
            .iter()
            .filter(|a| {
                &a.alarm == alarm
                    && a.level == level
                    && a.distillery.as_deref() == distillery
                    && a.created_date >= since
            })
            .cloned()
            .collect();
        found.sort_by_key(|a| a.created_date);
        Ok(found)
    }

    async fn add_incident(&self, id: Uuid) -> StoreResult<AlertRecord> {
        let mut alerts = self.alerts.write();
        let record = alerts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::not_found("alert", id.to_string()))?;
        record.incidents += 1;
        Ok(record.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn watchdog() -> AlarmRef {
        AlarmRef::Watchdog("inspect_emails".to_string())
    }

    #[tokio::test]
    async fn test_find_recent_filters() {
        let sink = InMemoryAlertSink::new();
        let mut old = AlertRecord::from_new(
            NewAlert::new(watchdog(), AlertLevel::High)
                .with_source(Some("elasticsearch.test_index.mail".to_string()), None),
            Utc::now() - Duration::hours(2),
        );
        old.title = Some("old".to_string());
        sink.insert(old);

        let fresh = sink
            .create(
                NewAlert::new(watchdog(), AlertLevel::High)
                    .with_source(Some("elasticsearch.test_index.mail".to_string()), None),
            )
            .await
            .unwrap();
        sink.create(NewAlert::new(watchdog(), AlertLevel::Low))
            .await
            .unwrap();

        let recent = sink
            .find_recent(
                &watchdog(),
                AlertLevel::High,
                Some("elasticsearch.test_index.mail"),
                Utc::now() - Duration::hours(1),
            )
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id, fresh.id);
    }

    #[tokio::test]
    async fn test_add_incident_and_rejection() {
        let sink = InMemoryAlertSink::new();
        let record = sink
            .create(NewAlert::new(watchdog(), AlertLevel::Medium))
            .await
            .unwrap();
        let updated = sink.add_incident(record.id).await.unwrap();
        assert_eq!(updated.incidents, 2);

        assert!(sink.add_incident(Uuid::new_v4()).await.unwrap_err().is_not_found());

        sink.set_rejecting(true);
        assert!(sink
            .create(NewAlert::new(watchdog(), AlertLevel::Medium))
            .await
            .is_err());
        assert_eq!(sink.count(), 1);
    }
}
