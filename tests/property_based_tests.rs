mod common;

use chrono::Duration;
use proptest::prelude::*;

use common::builders::{last_healthy, MonitorBuilder};
use common::strategies::*;
use distill_core::alerts::{truncate_chars, AlarmRef, NewAlert};
use distill_core::monitors::{format_duration, readable_duration};
use distill_core::AlertLevel;

proptest! {
    /// Property: a monitor is overdue exactly when inactivity exceeds its interval
    #[test]
    fn overdue_iff_elapsed_exceeds_interval(
        (value, unit) in interval_strategy(),
        elapsed in elapsed_seconds_strategy(),
    ) {
        let monitor = MonitorBuilder::new().with_interval(value, unit).build();
        let interval = monitor.interval_seconds();
        let now = last_healthy() + Duration::seconds(elapsed);

        prop_assert_eq!(monitor.is_overdue(now), elapsed > interval);
        prop_assert!(!monitor.is_overdue(last_healthy() + Duration::seconds(interval)));
        prop_assert!(monitor.is_overdue(last_healthy() + Duration::seconds(interval + 1)));
    }

    /// Property: readable durations floor to the largest unit with a non-zero value
    #[test]
    fn readable_duration_floors_to_largest_unit(seconds in 0i64..=315_360_000) {
        let (value, unit) = readable_duration(seconds);

        prop_assert!(value * unit.seconds() <= seconds);
        prop_assert!((value + 1) * unit.seconds() > seconds);
        if seconds >= 60 {
            prop_assert!(value >= 1);
        }
        prop_assert_eq!(format_duration(seconds), format!("{} {}", value, unit.abbreviation()));
    }

    /// Property: alert titles never exceed the limit and keep their prefix
    #[test]
    fn alert_titles_are_cut_to_limit(title in title_strategy(), limit in 1usize..300) {
        let alert = NewAlert::new(AlarmRef::Monitor("m".to_string()), AlertLevel::High)
            .with_title(&title, limit);
        let cut = alert.title.unwrap();

        prop_assert!(cut.chars().count() <= limit);
        prop_assert!(title.starts_with(&cut));
        if title.chars().count() <= limit {
            prop_assert_eq!(&cut, &title);
        }
        prop_assert_eq!(cut, truncate_chars(&title, limit));
    }
}

#[cfg(test)]
mod duration_examples {
    use super::*;

    #[test]
    fn test_known_titles() {
        assert_eq!(format_duration(360), "6 m");
        assert_eq!(format_duration(3_599), "59 m");
        assert_eq!(format_duration(86_400 * 3), "3 d");
    }
}
