//! Monitor persistence seam
//!
//! Heartbeats and sweeps both read-modify-write a monitor. A store hands out
//! a per-monitor [`MonitorLock`]; holding it across the read, the change and
//! the save makes that sequence atomic for the row. Different monitors never
//! contend.

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::model::Monitor;
use crate::error::{StoreError, StoreResult};

/// Exclusive hold on one monitor row, released on drop
pub struct MonitorLock {
    _held: Box<dyn Any + Send + Sync>,
}

impl MonitorLock {
    pub fn new<T: Send + Sync + 'static>(held: T) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

impl std::fmt::Debug for MonitorLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MonitorLock")
    }
}

#[async_trait]
pub trait MonitorStore: Send + Sync + 'static {
    /// Names of enabled monitors, the sweep's work list
    async fn enabled_names(&self) -> StoreResult<Vec<String>>;

    /// Names of enabled monitors watching a distillery
    async fn names_watching(&self, distillery: &str) -> StoreResult<Vec<String>>;

    async fn get(&self, name: &str) -> StoreResult<Option<Monitor>>;

    /// Wait for exclusive access to one monitor
    async fn lock(&self, name: &str) -> StoreResult<MonitorLock>;

    async fn save(&self, monitor: &Monitor) -> StoreResult<()>;
}

/// DashMap-backed monitor store with per-row tokio mutexes
#[derive(Debug, Default)]
pub struct InMemoryMonitorStore {
    monitors: DashMap<String, Monitor>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    failing_saves: AtomicBool,
    saves: AtomicUsize,
}

impl InMemoryMonitorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_monitors(monitors: impl IntoIterator<Item = Monitor>) -> Self {
        let store = Self::new();
        for monitor in monitors {
            store.insert(monitor);
        }
        store
    }

    /// Add or replace a monitor definition
    pub fn insert(&self, monitor: Monitor) {
        self.monitors.insert(monitor.name.clone(), monitor);
    }

    /// Current stored copy of a monitor
    pub fn snapshot(&self, name: &str) -> Option<Monitor> {
        self.monitors.get(name).map(|m| m.value().clone())
    }

    /// Make `save` fail until switched back
    pub fn set_failing_saves(&self, failing: bool) {
        self.failing_saves.store(failing, Ordering::SeqCst);
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn row_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait]
impl MonitorStore for InMemoryMonitorStore {
    async fn enabled_names(&self) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .monitors
            .iter()
            .filter(|m| m.enabled)
            .map(|m| m.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn names_watching(&self, distillery: &str) -> StoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .monitors
            .iter()
            .filter(|m| m.enabled && m.watches(distillery))
            .map(|m| m.name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn get(&self, name: &str) -> StoreResult<Option<Monitor>> {
        Ok(self.snapshot(name))
    }

    async fn lock(&self, name: &str) -> StoreResult<MonitorLock> {
        let guard = self.row_lock(name).lock_owned().await;
        Ok(MonitorLock::new(guard))
    }

    async fn save(&self, monitor: &Monitor) -> StoreResult<()> {
        if self.failing_saves.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("save", "monitor store offline"));
        }
        self.monitors.insert(monitor.name.clone(), monitor.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::TimeUnit;
    use std::time::Duration;

    fn monitor(name: &str, enabled: bool) -> Monitor {
        Monitor::new(name, vec!["elasticsearch.test_index.mail".to_string()], 5, TimeUnit::Minutes)
            .with_enabled(enabled)
    }

    #[tokio::test]
    async fn test_enabled_queries() {
        let store = InMemoryMonitorStore::with_monitors([
            monitor("health_alerts", true),
            monitor("disabled_alerts", false),
        ]);

        assert_eq!(store.enabled_names().await.unwrap(), vec!["health_alerts"]);
        assert_eq!(
            store
                .names_watching("elasticsearch.test_index.mail")
                .await
                .unwrap(),
            vec!["health_alerts"]
        );
        assert!(store.names_watching("other.index.mail").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_row_lock_is_exclusive_per_monitor() {
        let store = Arc::new(InMemoryMonitorStore::new());
        let held = store.lock("health_alerts").await.unwrap();

        // another monitor is not blocked
        let other = tokio::time::timeout(Duration::from_millis(50), store.lock("other")).await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(Duration::from_millis(50), store.lock("health_alerts")).await;
        assert!(same.is_err());

        drop(held);
        let same = tokio::time::timeout(Duration::from_millis(50), store.lock("health_alerts")).await;
        assert!(same.is_ok());
    }

    #[tokio::test]
    async fn test_failing_saves() {
        let store = InMemoryMonitorStore::new();
        store.set_failing_saves(true);
        assert!(store.save(&monitor("health_alerts", true)).await.is_err());
        assert_eq!(store.save_count(), 0);
        assert!(store.snapshot("health_alerts").is_none());
    }
}
