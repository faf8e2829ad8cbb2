//! # System Constants
//!
//! Routing-key names, lifecycle event names, the metadata keys stamped onto
//! saved documents, and the small enums shared by alarms and monitors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Queue routing keys understood by the dispatcher
pub mod routing {
    pub const LOGCHUTES: &str = "logchutes";
    pub const DATACHUTES: &str = "datachutes";
    pub const WATCHDOGS: &str = "watchdogs";
    pub const MONITORS: &str = "monitors";

    pub const ALL: [&str; 4] = [LOGCHUTES, DATACHUTES, WATCHDOGS, MONITORS];
}

/// Lifecycle events published through the event publisher
pub mod events {
    pub const MONITOR_HEARTBEAT: &str = "monitor.heartbeat";
    pub const MONITOR_STATUS_CHANGED: &str = "monitor.status_changed";
    pub const ALERT_CREATED: &str = "alert.created";
    pub const ALERT_MUZZLED: &str = "alert.muzzled";
    pub const MESSAGE_DROPPED: &str = "message.dropped";
    pub const DOCUMENT_SAVED: &str = "document.saved";
}

/// Field names read from inbound payloads and written onto saved documents
pub mod document_keys {
    /// Document id carried by inbound messages
    pub const DOC_ID: &str = "@uuid";
    /// Collection carried by inbound messages
    pub const COLLECTION: &str = "collection";

    pub const SAVED_DATE: &str = "_saved_date";
    pub const DISTILLERY: &str = "_distillery";
    pub const RAW_DATA: &str = "_raw_data";
    pub const PLATFORM: &str = "_platform";

    // keys inside the `_raw_data` location reference
    pub const BACKEND: &str = "backend";
    pub const WAREHOUSE: &str = "database";
    pub const RAW_COLLECTION: &str = "collection";
    pub const RAW_DOC_ID: &str = "doc_id";
}

/// Severity attached to alerts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "CRITICAL",
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Info => "INFO",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AlertLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CRITICAL" => Ok(Self::Critical),
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            "INFO" => Ok(Self::Info),
            _ => Err(format!("Invalid alert level: {s}")),
        }
    }
}

impl Default for AlertLevel {
    fn default() -> Self {
        Self::High
    }
}

/// Unit for configured time intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "m")]
    Minutes,
    #[serde(rename = "h")]
    Hours,
    #[serde(rename = "d")]
    Days,
}

impl TimeUnit {
    pub fn seconds(&self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3_600,
            Self::Days => 86_400,
        }
    }

    /// Short label used in alert titles
    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }

    /// Convert a count of this unit to seconds, saturating at `i64::MAX`
    pub fn to_seconds(&self, value: u64) -> i64 {
        i64::try_from(value)
            .unwrap_or(i64::MAX)
            .saturating_mul(self.seconds())
    }
}

/// Longest monitor or muzzle interval a catalog may configure (100 years)
pub const MAX_INTERVAL_SECONDS: i64 = 100 * 365 * 86_400;

impl Default for TimeUnit {
    fn default() -> Self {
        Self::Minutes
    }
}
