//! Watchdog definitions: rank-ordered triggers and an optional muzzle

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{AlertLevel, TimeUnit};
use crate::distilleries::Distillery;
use crate::documents::lookup_path;
use crate::sieves::Sieve;

fn enabled_by_default() -> bool {
    true
}

/// A sieve paired with the alert level it raises
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Lower ranks are inspected first
    #[serde(default)]
    pub rank: i32,
    pub alert_level: AlertLevel,
    pub sieve: Sieve,
}

impl Trigger {
    pub fn new(rank: i32, alert_level: AlertLevel, sieve: Sieve) -> Self {
        Self {
            rank,
            alert_level,
            sieve,
        }
    }

    pub fn is_match(&self, data: &Value) -> bool {
        self.sieve.is_match(data)
    }
}

/// Suppresses duplicate alerts from one watchdog within a time window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Muzzle {
    /// Data fields whose values identify a duplicate
    #[serde(default)]
    pub matching_fields: Vec<String>,
    pub time_interval: u64,
    #[serde(default)]
    pub time_unit: TimeUnit,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl Muzzle {
    pub fn new<I, S>(matching_fields: I, time_interval: u64, time_unit: TimeUnit) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            matching_fields: matching_fields.into_iter().map(Into::into).collect(),
            time_interval,
            time_unit,
            enabled: true,
        }
    }

    /// Earliest creation date still inside the window
    ///
    /// A window reaching past the representable range starts at the earliest
    /// representable instant.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        Duration::try_seconds(self.time_unit.to_seconds(self.time_interval))
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    fn fields(&self) -> impl Iterator<Item = &str> {
        self.matching_fields
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
    }

    /// Both payloads agree on every matching field
    ///
    /// A field missing from both counts as equal.
    pub fn is_duplicate(&self, new_data: &Value, old_data: &Value) -> bool {
        self.fields()
            .all(|field| lookup_path(new_data, field) == lookup_path(old_data, field))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watchdog {
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Restricts coverage to distilleries sharing a category; empty covers all
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub muzzle: Option<Muzzle>,
}

impl Watchdog {
    pub fn new(name: impl Into<String>, triggers: Vec<Trigger>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            categories: Vec::new(),
            triggers,
            muzzle: None,
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_muzzle(mut self, muzzle: Muzzle) -> Self {
        self.muzzle = Some(muzzle);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Alert level of the first matching trigger by rank
    pub fn inspect(&self, data: &Value) -> Option<AlertLevel> {
        let mut ranked: Vec<&Trigger> = self.triggers.iter().collect();
        ranked.sort_by_key(|t| t.rank);
        ranked
            .into_iter()
            .find(|t| t.is_match(data))
            .map(|t| t.alert_level)
    }

    /// Whether this watchdog covers documents from `distillery`
    ///
    /// Uncategorized watchdogs cover everything, including documents from no
    /// known distillery.
    pub fn is_relevant(&self, distillery: Option<&Distillery>) -> bool {
        if !self.enabled {
            return false;
        }
        if self.categories.is_empty() {
            return true;
        }
        distillery.is_some_and(|d| d.shares_category(&self.categories))
    }

    /// The enabled muzzle, if any
    pub fn active_muzzle(&self) -> Option<&Muzzle> {
        self.muzzle.as_ref().filter(|m| m.enabled)
    }
}

impl fmt::Display for Watchdog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
