//! Periodic status evaluation of every enabled monitor

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use super::engine::MonitorEngine;
use super::errors::MonitorError;
use super::model::MonitorStatus;
use crate::lifecycle::ShutdownSignal;

/// Tally of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub evaluated: usize,
    pub red: usize,
    pub alerts_created: usize,
    pub failures: usize,
    /// Alerts created for monitors whose status could not be saved
    pub orphaned_alerts: usize,
    /// Stopped early on shutdown
    pub interrupted: bool,
}

#[derive(Debug, Clone)]
pub struct MonitorSweeper {
    engine: Arc<MonitorEngine>,
    interval: Duration,
}

impl MonitorSweeper {
    pub fn new(engine: Arc<MonitorEngine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Evaluate each enabled monitor once
    ///
    /// One monitor failing does not stop the sweep. Shutdown is honored
    /// between monitors.
    pub async fn sweep_once(
        &self,
        now: DateTime<Utc>,
        shutdown: &ShutdownSignal,
    ) -> Result<SweepReport, MonitorError> {
        let names = self
            .engine
            .store()
            .enabled_names()
            .await
            .map_err(|e| MonitorError::store("*", e))?;

        let mut report = SweepReport::default();
        for name in names {
            if shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }

            match self.engine.evaluate(&name, now).await {
                Ok(evaluation) => {
                    report.evaluated += 1;
                    if evaluation.status == MonitorStatus::Red {
                        report.red += 1;
                    }
                    if evaluation.alert.is_some() {
                        report.alerts_created += 1;
                    }
                }
                Err(e) => {
                    report.failures += 1;
                    if matches!(e, MonitorError::UnsavedAlert { .. }) {
                        report.orphaned_alerts += 1;
                    }
                    warn!(monitor = %name, error = %e, "Monitor evaluation failed");
                }
            }
        }

        debug!(?report, "Monitor sweep finished");
        Ok(report)
    }

    /// Sweep on every interval tick until shutdown
    pub async fn run(&self, shutdown: ShutdownSignal) {
        info!(interval_secs = self.interval.as_secs(), "Starting monitor sweep loop");

        while !shutdown.is_triggered() {
            if let Err(e) = self.sweep_once(Utc::now(), &shutdown).await {
                error!(error = %e, "Monitor sweep failed");
            }
            if !shutdown.sleep(self.interval).await {
                break;
            }
        }

        info!("Monitor sweep loop shutting down");
    }
}
