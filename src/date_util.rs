use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Get the last day of a given month.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next.map(|d| d - Duration::days(1))
}

/// Render a duration in seconds as a short human string, e.g. `2h 30m`.
pub fn format_time_spent(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    match (hours, minutes) {
        (0, 0) if seconds > 0 => format!("{seconds}s"),
        (0, 0) => "0m".to_string(),
        (0, m) => format!("{m}m"),
        (h, 0) => format!("{h}h"),
        (h, m) => format!("{h}h {m}m"),
    }
}

/// Parse a timestamp in RFC3339 or one of the common issue-tracker variants.
///
/// Accepted:
/// - `2025-01-15T10:30:00Z` / `2025-01-15T10:30:00+02:00` (RFC3339)
/// - `2025-01-15T10:30:00.000+0000` (offset without colon)
/// - `2025-01-15 10:30:00` (assumed UTC)
/// - `2025-01-15` (midnight UTC)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Fractional number of days between two instants (negative if `end < start`).
pub fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_seconds() as f64 / SECONDS_PER_DAY
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Label for an inclusive date range, e.g. `Jan 06, 2025 - Jan 31, 2025`.
pub fn format_date_range(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    format!(
        "{} - {}",
        start.format("%b %d, %Y"),
        end.format("%b %d, %Y")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(
            last_day_of_month(2025, 1),
            NaiveDate::from_ymd_opt(2025, 1, 31)
        );
        assert_eq!(
            last_day_of_month(2024, 2),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        ); // Leap year
        assert_eq!(
            last_day_of_month(2025, 12),
            NaiveDate::from_ymd_opt(2025, 12, 31)
        );
        assert_eq!(last_day_of_month(2025, 13), None);
    }

    #[test]
    fn test_format_time_spent() {
        assert_eq!(format_time_spent(0), "0m");
        assert_eq!(format_time_spent(45), "45s");
        assert_eq!(format_time_spent(1800), "30m");
        assert_eq!(format_time_spent(7200), "2h");
        assert_eq!(format_time_spent(9000), "2h 30m");
        assert_eq!(format_time_spent(90_000), "25h");
    }

    #[test]
    fn test_parse_rfc3339() {
        let dt = parse_timestamp("2025-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.day(), 15);
        assert_eq!(dt.hour(), 10);

        let dt = parse_timestamp("2025-01-15T10:30:00+02:00").unwrap();
        assert_eq!(dt.hour(), 8);
    }

    #[test]
    fn test_parse_offset_without_colon() {
        let dt = parse_timestamp("2025-01-15T10:30:00.000+0000").unwrap();
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn test_parse_naive_variants() {
        let dt = parse_timestamp("2025-01-15 10:30:00").unwrap();
        assert_eq!(dt.hour(), 10);

        let dt = parse_timestamp("2025-01-15").unwrap();
        assert_eq!(dt.hour(), 0);
        assert_eq!(dt.month(), 1);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2025-13-01").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_days_between() {
        let start = parse_timestamp("2025-01-01T00:00:00Z").unwrap();
        let end = parse_timestamp("2025-01-02T12:00:00Z").unwrap();
        assert_eq!(days_between(start, end), 1.5);
        assert_eq!(days_between(end, start), -1.5);
    }

    #[test]
    fn test_weekday_name() {
        assert_eq!(weekday_name(Weekday::Mon), "Monday");
        assert_eq!(weekday_name(Weekday::Sun), "Sunday");
    }

    #[test]
    fn test_format_date_range() {
        let start = parse_timestamp("2025-01-06").unwrap();
        let end = parse_timestamp("2025-01-31T18:00:00Z").unwrap();
        assert_eq!(format_date_range(start, end), "Jan 06, 2025 - Jan 31, 2025");
    }
}
