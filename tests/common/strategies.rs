#![allow(dead_code)]

use proptest::prelude::*;

use distill_core::TimeUnit;

pub fn time_unit_strategy() -> impl Strategy<Value = TimeUnit> {
    prop_oneof![
        Just(TimeUnit::Seconds),
        Just(TimeUnit::Minutes),
        Just(TimeUnit::Hours),
        Just(TimeUnit::Days),
    ]
}

/// Interval value and unit, kept under a year
pub fn interval_strategy() -> impl Strategy<Value = (u64, TimeUnit)> {
    (1u64..=365, time_unit_strategy()).prop_map(|(value, unit)| match unit {
        TimeUnit::Seconds => (value * 60, unit),
        _ => (value, unit),
    })
}

/// Elapsed seconds, up to ten years
pub fn elapsed_seconds_strategy() -> impl Strategy<Value = i64> {
    0i64..=315_360_000
}

/// Titles mixing ASCII and multi-byte characters
pub fn title_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 éüß漢字🙂\"]{0,400}"
}
