//! Monitor definition and runtime state
//!
//! The runtime state is private to this module tree. Only the heartbeat and
//! the status evaluation in [`super::engine`] write it; everything else reads
//! through [`Monitor::state`]. Stores rebuild a persisted monitor with
//! [`Monitor::with_state`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{AlertLevel, TimeUnit};

/// Cached health of a monitor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MonitorStatus {
    #[default]
    Green,
    Red,
}

impl MonitorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Red => "RED",
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MonitorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GREEN" => Ok(Self::Green),
            "RED" => Ok(Self::Red),
            _ => Err(format!("Invalid monitor status: {s}")),
        }
    }
}

/// Mutable part of a monitor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorState {
    pub status: MonitorStatus,
    pub last_healthy: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_active_distillery: Option<String>,
    pub last_saved_doc: Option<String>,
    pub last_alert_id: Option<Uuid>,
    pub last_alert_date: Option<DateTime<Utc>>,
}

fn enabled_by_default() -> bool {
    true
}

/// Health check on the distilleries one data source feeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Distilleries whose saved documents count as activity
    #[serde(default)]
    pub distilleries: Vec<String>,
    pub time_interval: u64,
    #[serde(default)]
    pub time_unit: TimeUnit,
    #[serde(default)]
    pub alert_level: AlertLevel,
    #[serde(default = "enabled_by_default")]
    pub alerts_enabled: bool,
    #[serde(default)]
    pub repeating_alerts: bool,
    #[serde(default = "Utc::now")]
    pub created_date: DateTime<Utc>,
    #[serde(default)]
    state: MonitorState,
}

impl Monitor {
    pub fn new(
        name: impl Into<String>,
        distilleries: Vec<String>,
        time_interval: u64,
        time_unit: TimeUnit,
    ) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            distilleries,
            time_interval,
            time_unit,
            alert_level: AlertLevel::default(),
            alerts_enabled: true,
            repeating_alerts: false,
            created_date: Utc::now(),
            state: MonitorState::default(),
        }
    }

    pub fn with_alert_level(mut self, level: AlertLevel) -> Self {
        self.alert_level = level;
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

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_created_date(mut self, created_date: DateTime<Utc>) -> Self {
        self.created_date = created_date;
        self
    }

    /// Rebuild a monitor with previously persisted state
    pub fn with_state(mut self, state: MonitorState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn status(&self) -> MonitorStatus {
        self.state.status
    }

    pub fn watches(&self, distillery: &str) -> bool {
        self.distilleries.iter().any(|d| d == distillery)
    }

    pub fn interval_seconds(&self) -> i64 {
        self.time_unit.to_seconds(self.time_interval)
    }

    /// Seconds since the last heartbeat, or since creation when there was none
    pub fn inactive_seconds(&self, now: DateTime<Utc>) -> i64 {
        let since = self.state.last_healthy.unwrap_or(self.created_date);
        (now - since).num_seconds()
    }

    /// Strictly longer inactive than the interval
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.inactive_seconds(now) > self.interval_seconds()
    }

    pub(crate) fn record_heartbeat(
        &mut self,
        distillery: Option<String>,
        doc_id: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.state.last_healthy = Some(now);
        self.state.last_active_distillery = distillery;
        self.state.last_saved_doc = doc_id;
        self.state.status = MonitorStatus::Green;
    }

    pub(crate) fn record_evaluation(&mut self, status: MonitorStatus, now: DateTime<Utc>) {
        self.state.last_updated = Some(now);
        self.state.status = status;
    }

    pub(crate) fn record_alert(&mut self, alert_id: Uuid, alert_date: DateTime<Utc>) {
        self.state.last_alert_id = Some(alert_id);
        self.state.last_alert_date = Some(alert_date);
    }
}

impl fmt::Display for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
