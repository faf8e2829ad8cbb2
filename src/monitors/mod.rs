//! # Monitors
//!
//! Health checks that go RED when their distilleries stop receiving
//! documents for longer than the configured interval.

pub mod duration;
pub mod engine;
pub mod errors;
pub mod model;
pub mod store;
pub mod sweep;

pub use duration::{format_duration, readable_duration};
pub use engine::{Evaluation, MonitorEngine};
pub use errors::MonitorError;
pub use model::{Monitor, MonitorState, MonitorStatus};
pub use store::{InMemoryMonitorStore, MonitorLock, MonitorStore};
pub use sweep::{MonitorSweeper, SweepReport};
