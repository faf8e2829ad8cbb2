//! Administrative catalog
//!
//! Distilleries, chutes, watchdogs and monitors are provisioned outside the
//! core. The catalog is the data form of that provisioning: it is read once
//! at startup and cross-checked before anything is wired together.

use std::collections::HashSet;
use std::path::Path;

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::{ConfigResult, ConfigurationError};
use crate::constants::{TimeUnit, MAX_INTERVAL_SECONDS};
use crate::distilleries::Distillery;
use crate::monitors::Monitor;
use crate::sifter::Chute;
use crate::watchdogs::Watchdog;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Catalog {
    pub distilleries: Vec<Distillery>,
    pub log_chutes: Vec<Chute>,
    pub data_chutes: Vec<Chute>,
    pub watchdogs: Vec<Watchdog>,
    pub monitors: Vec<Monitor>,
}

impl Catalog {
    /// Read and validate a catalog file
    pub fn load(path: &Path) -> ConfigResult<Catalog> {
        if !path.is_file() {
            return Err(ConfigurationError::config_file_not_found(vec![
                path.to_path_buf()
            ]));
        }

        let catalog = Config::builder()
            .add_source(File::from(path.to_path_buf()).format(FileFormat::Yaml))
            .build()
            .map_err(|e| ConfigurationError::load_failed(path.display().to_string(), e))?
            .try_deserialize::<Catalog>()
            .map_err(|e| ConfigurationError::deserialization_failed("catalog", e))?;

        catalog.validate()?;

        info!(
            path = %path.display(),
            distilleries = catalog.distilleries.len(),
            log_chutes = catalog.log_chutes.len(),
            data_chutes = catalog.data_chutes.len(),
            watchdogs = catalog.watchdogs.len(),
            monitors = catalog.monitors.len(),
            "Catalog loaded"
        );

        Ok(catalog)
    }

    /// Check names are unique and references resolve
    pub fn validate(&self) -> ConfigResult<()> {
        let mut distilleries = HashSet::new();
        for distillery in &self.distilleries {
            if !distilleries.insert(distillery.name.as_str()) {
                return Err(ConfigurationError::invalid_catalog(
                    &distillery.name,
                    "duplicate distillery name",
                ));
            }
        }

        let mut monitors = HashSet::new();
        for monitor in &self.monitors {
            if !monitors.insert(monitor.name.as_str()) {
                return Err(ConfigurationError::invalid_catalog(
                    &monitor.name,
                    "duplicate monitor name",
                ));
            }
            if monitor.time_interval == 0 {
                return Err(ConfigurationError::invalid_catalog(
                    &monitor.name,
                    "monitor interval must be positive",
                ));
            }
            check_interval(
                &monitor.name,
                "monitor",
                monitor.time_interval,
                monitor.time_unit,
            )?;
            for watched in &monitor.distilleries {
                if !distilleries.contains(watched.as_str()) {
                    return Err(ConfigurationError::invalid_catalog(
                        &monitor.name,
                        format!("watches unknown distillery '{watched}'"),
                    ));
                }
            }
        }

        for chute in self.log_chutes.iter().chain(self.data_chutes.iter()) {
            if !distilleries.contains(chute.distillery.as_str()) {
                return Err(ConfigurationError::invalid_catalog(
                    chute.label(),
                    format!("targets unknown distillery '{}'", chute.distillery),
                ));
            }
            if let Some(sieve) = &chute.sieve {
                sieve
                    .validate()
                    .map_err(|reason| ConfigurationError::invalid_catalog(chute.label(), reason))?;
            }
        }

        let mut watchdogs = HashSet::new();
        for watchdog in &self.watchdogs {
            if !watchdogs.insert(watchdog.name.as_str()) {
                return Err(ConfigurationError::invalid_catalog(
                    &watchdog.name,
                    "duplicate watchdog name",
                ));
            }
            for trigger in &watchdog.triggers {
                trigger.sieve.validate().map_err(|reason| {
                    ConfigurationError::invalid_catalog(&watchdog.name, reason)
                })?;
            }
            if let Some(muzzle) = &watchdog.muzzle {
                check_interval(
                    &watchdog.name,
                    "muzzle",
                    muzzle.time_interval,
                    muzzle.time_unit,
                )?;
            }
        }

        Ok(())
    }
}

fn check_interval(
    name: &str,
    kind: &str,
    time_interval: u64,
    time_unit: TimeUnit,
) -> ConfigResult<()> {
    if time_unit.to_seconds(time_interval) > MAX_INTERVAL_SECONDS {
        return Err(ConfigurationError::invalid_catalog(
            name,
            format!(
                "{kind} interval {time_interval} {} exceeds {MAX_INTERVAL_SECONDS} seconds",
                time_unit.abbreviation()
            ),
        ));
    }
    Ok(())
}
