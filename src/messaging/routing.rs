//! Routing keys
//!
//! The queue routing key selects a processor. The four known keys map to
//! variants; anything else is kept as `Unknown` so the dispatcher can drop it
//! explicitly.

use std::fmt;

use crate::constants::routing;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoutingKey {
    LogChutes,
    DataChutes,
    Watchdogs,
    Monitors,
    Unknown(String),
}

impl RoutingKey {
    pub fn parse(key: &str) -> Self {
        match key {
            routing::LOGCHUTES => Self::LogChutes,
            routing::DATACHUTES => Self::DataChutes,
            routing::WATCHDOGS => Self::Watchdogs,
            routing::MONITORS => Self::Monitors,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::LogChutes => routing::LOGCHUTES,
            Self::DataChutes => routing::DATACHUTES,
            Self::Watchdogs => routing::WATCHDOGS,
            Self::Monitors => routing::MONITORS,
            Self::Unknown(key) => key,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Every routable key
    pub fn known() -> [RoutingKey; 4] {
        [
            Self::LogChutes,
            Self::DataChutes,
            Self::Watchdogs,
            Self::Monitors,
        ]
    }
}

impl From<&str> for RoutingKey {
    fn from(key: &str) -> Self {
        Self::parse(key)
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
