use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite_migration::{Migrations, M};

/// All schema migrations, oldest first.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(include_str!("migrations/001_initial.sql")),
        M::up(include_str!("migrations/002_narrative_input.sql")),
    ])
}

/// Timestamps are stored as fixed-width UTC RFC3339 with nanoseconds, so that
/// text comparison matches chronological order and no precision is lost.
pub fn to_sql_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn from_sql_timestamp(idx: usize, s: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }

    #[test]
    fn test_timestamp_format_sorts_chronologically() {
        let early = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2025, 1, 13, 10, 0, 0).unwrap();
        let (a, b) = (to_sql_timestamp(&early), to_sql_timestamp(&late));
        assert_eq!(a, "2025-01-06T09:00:00.000000000Z");
        assert!(a < b);
        assert_eq!(from_sql_timestamp(0, &a).unwrap(), early);
    }

    #[test]
    fn test_timestamp_keeps_sub_millisecond_precision() {
        let base = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        let precise = base + chrono::Duration::nanoseconds(123_456_789);
        let later = base + chrono::Duration::nanoseconds(123_456_790);

        let stored = to_sql_timestamp(&precise);
        assert_eq!(stored, "2025-01-06T09:00:00.123456789Z");
        assert_eq!(from_sql_timestamp(0, &stored).unwrap(), precise);
        assert!(stored < to_sql_timestamp(&later));
    }

    #[test]
    fn test_bad_timestamp_is_conversion_error() {
        assert!(matches!(
            from_sql_timestamp(3, "not a date"),
            Err(rusqlite::Error::FromSqlConversionFailure(3, Type::Text, _))
        ));
    }
}
