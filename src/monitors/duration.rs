//! Human-readable elapsed time for alert titles

use crate::constants::TimeUnit;

/// Floor `seconds` to the largest unit with a value of at least one
pub fn readable_duration(seconds: i64) -> (i64, TimeUnit) {
    let seconds = seconds.max(0);
    let unit = [TimeUnit::Days, TimeUnit::Hours, TimeUnit::Minutes]
        .into_iter()
        .find(|unit| seconds >= unit.seconds())
        .unwrap_or(TimeUnit::Seconds);
    (seconds / unit.seconds(), unit)
}

/// e.g. `360` -> `"6 m"`
pub fn format_duration(seconds: i64) -> String {
    let (value, unit) = readable_duration(seconds);
    format!("{value} {}", unit.abbreviation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(360), "6 m");
        assert_eq!(format_duration(361), "6 m");
        assert_eq!(format_duration(59), "59 s");
        assert_eq!(format_duration(7_300), "2 h");
        assert_eq!(format_duration(90_000), "1 d");
        assert_eq!(format_duration(-5), "0 s");
    }
}
