use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc, Weekday};
use regex::Regex;

use crate::date_util::last_day_of_month;
use crate::error::{Error, Result};

static RE_QUARTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-Q([1-4])$").unwrap());
static RE_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{1,2})$").unwrap());
static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());

/// The slice of history a report covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    /// Every stored activity.
    All,
    Year(i32),
    Quarter(i32, u8),
    Month(i32, u8),
    Week(i32, u8),
    /// Last N days ending on (and including) the given date.
    Rolling(u32, NaiveDate),
}

impl Period {
    /// Parse a period string.
    ///
    /// Supported formats:
    /// - `all`: no restriction
    /// - `2025`: year
    /// - `2025-Q1`: quarter
    /// - `2025-01`: month
    /// - `2025-W05`: ISO week
    /// - `30d`: rolling last N days
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Period::All);
        }

        let rolling = s
            .strip_suffix(['d', 'D'])
            .and_then(|n| n.parse::<u32>().ok());
        let year = if s.len() == 4 { s.parse::<i32>().ok() } else { None };

        let period = if let Some(n) = rolling {
            if n == 0 {
                return Err(Error::PeriodParse(format!("rolling period must be at least 1 day: {s}")));
            }
            Period::Rolling(n, Utc::now().date_naive())
        } else if let Some(year) = year {
            Period::Year(year)
        } else if let Some(caps) = RE_QUARTER.captures(s) {
            Period::Quarter(parse_num(&caps[1], s)?, parse_num(&caps[2], s)?)
        } else if let Some(caps) = RE_WEEK.captures(s) {
            Period::Week(parse_num(&caps[1], s)?, parse_num(&caps[2], s)?)
        } else if let Some(caps) = RE_MONTH.captures(s) {
            Period::Month(parse_num(&caps[1], s)?, parse_num(&caps[2], s)?)
        } else {
            return Err(Error::PeriodParse(format!("unrecognized period: {s}")));
        };

        // Reject periods that do not map onto real dates, e.g. 2025-13, 2025-W60
        // or a rolling window reaching before the earliest representable date.
        period.date_range()?;
        Ok(period)
    }

    /// Canonical key string, used for caching.
    pub fn to_key(&self) -> String {
        match self {
            Period::All => "all".to_string(),
            Period::Year(y) => format!("{y}"),
            Period::Quarter(y, q) => format!("{y}-Q{q}"),
            Period::Month(y, m) => format!("{y}-{m:02}"),
            Period::Week(y, w) => format!("{y}-W{w:02}"),
            Period::Rolling(n, as_of) => format!("{n}d-{}", as_of.format("%Y-%m-%d")),
        }
    }

    /// Human label used in summary text.
    pub fn label(&self) -> String {
        match self {
            Period::All => "all-time".to_string(),
            Period::Year(y) => format!("{y}"),
            Period::Quarter(y, q) => format!("Q{q} {y}"),
            Period::Month(y, m) => NaiveDate::from_ymd_opt(*y, *m as u32, 1)
                .map(|d| d.format("%B %Y").to_string())
                .unwrap_or_else(|| self.to_key()),
            Period::Week(y, w) => format!("week {w} of {y}"),
            Period::Rolling(n, _) => format!("last {n} days"),
        }
    }

    /// Inclusive date range, or `None` for [`Period::All`].
    pub fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let invalid = || Error::PeriodParse(format!("period out of range: {}", self.to_key()));
        let range = match self {
            Period::All => return Ok(None),
            Period::Year(y) => (
                NaiveDate::from_ymd_opt(*y, 1, 1).ok_or_else(invalid)?,
                NaiveDate::from_ymd_opt(*y, 12, 31).ok_or_else(invalid)?,
            ),
            Period::Quarter(y, q) => {
                let start_month = (*q as u32 - 1) * 3 + 1;
                (
                    NaiveDate::from_ymd_opt(*y, start_month, 1).ok_or_else(invalid)?,
                    last_day_of_month(*y, start_month + 2).ok_or_else(invalid)?,
                )
            }
            Period::Month(y, m) => (
                NaiveDate::from_ymd_opt(*y, *m as u32, 1).ok_or_else(invalid)?,
                last_day_of_month(*y, *m as u32).ok_or_else(invalid)?,
            ),
            Period::Week(y, w) => {
                let start = NaiveDate::from_isoywd_opt(*y, *w as u32, Weekday::Mon)
                    .ok_or_else(invalid)?;
                (start, start.checked_add_signed(Duration::days(6)).ok_or_else(invalid)?)
            }
            Period::Rolling(n, as_of) => (
                as_of
                    .checked_sub_signed(Duration::days(*n as i64 - 1))
                    .ok_or_else(invalid)?,
                *as_of,
            ),
        };
        Ok(Some(range))
    }

    /// Half-open UTC bounds `[start, end)` covering the whole date range.
    pub fn bounds(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
        let Some((start, end)) = self.date_range()? else {
            return Ok(None);
        };
        let end = end.succ_opt().ok_or_else(|| {
            Error::PeriodParse(format!("period out of range: {}", self.to_key()))
        })?;
        Ok(Some((
            Utc.from_utc_datetime(&start.and_time(chrono::NaiveTime::MIN)),
            Utc.from_utc_datetime(&end.and_time(chrono::NaiveTime::MIN)),
        )))
    }
}

fn parse_num<T: std::str::FromStr>(value: &str, input: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| Error::PeriodParse(format!("invalid number in period: {input}")))
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}
