//! # Watchdogs
//!
//! Rule-based alarms over saved and routed documents.

pub mod model;
pub mod registry;

pub use model::{Muzzle, Trigger, Watchdog};
pub use registry::{Inspection, WatchdogError, WatchdogRegistry};
