//! Cooperative shutdown for the long-running loops
//!
//! Consumer workers and the monitor sweep check [`ShutdownSignal::is_triggered`]
//! between units of work and race their idle sleeps against
//! [`ShutdownSignal::notified`]. A unit of work already in progress always
//! finishes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    triggered: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every holder of this signal to stop
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::AcqRel) {
            info!("Shutdown requested");
        }
        self.notify.notify_waiters();
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Resolves once `trigger` has been called
    pub async fn notified(&self) {
        while !self.is_triggered() {
            let notified = self.notify.notified();
            if self.is_triggered() {
                break;
            }
            notified.await;
        }
    }

    /// Sleep for `duration` unless shutdown comes first
    ///
    /// Returns `false` when woken by shutdown.
    pub async fn sleep(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_triggered(),
            _ = self.notified() => false,
        }
    }
}
