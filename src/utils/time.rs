//! Organizational time zone handling
//!
//! All wall-clock formatting and day/month boundaries go through
//! [`OrgTimezone`], a fixed UTC offset taken from configuration.

use anyhow::{Context, Result};
use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    Utc,
};

use crate::models::TimeSpan;

/// Accepted layouts for offset-less timestamps
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Years whose instants render as fixed-width RFC 3339
pub const SUPPORTED_YEARS: std::ops::RangeInclusive<i32> = 1000..=9999;

/// Parse an offset such as "+07:00", "-03:30" or "+0700"
pub fn parse_utc_offset(value: &str) -> Result<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") || value.eq_ignore_ascii_case("utc") {
        return FixedOffset::east_opt(0).context("zero offset");
    }

    let (sign, rest) = match value.as_bytes().first() {
        Some(b'+') => (1, &value[1..]),
        Some(b'-') => (-1, &value[1..]),
        _ => anyhow::bail!("UTC offset must start with '+' or '-': {}", value),
    };

    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        anyhow::bail!("UTC offset must look like +HH:MM: {}", value);
    }

    let hours: i32 = digits[..2].parse()?;
    let minutes: i32 = digits[2..].parse()?;
    if hours > 14 || minutes > 59 {
        anyhow::bail!("UTC offset out of range: {}", value);
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
        .with_context(|| format!("UTC offset out of range: {}", value))
}

/// The fixed organizational time zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrgTimezone {
    offset: FixedOffset,
}

impl OrgTimezone {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Western Indonesia Time, UTC+07:00
    pub fn jakarta() -> Self {
        Self {
            offset: FixedOffset::east_opt(7 * 3600).unwrap_or_else(|| Utc.fix()),
        }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Offset as an SQLite date modifier, e.g. "+420 minutes"
    pub fn sqlite_modifier(&self) -> String {
        format!("{:+} minutes", self.offset.local_minus_utc() / 60)
    }

    pub fn to_local(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.offset)
    }

    /// Current local date
    pub fn today(&self) -> NaiveDate {
        self.to_local(Utc::now()).date_naive()
    }

    /// Interpret a local wall-clock time as an instant
    pub fn from_local(&self, naive: NaiveDateTime) -> DateTime<Utc> {
        // A fixed offset has no gaps or folds, so the mapping is unique.
        (naive - Duration::seconds(i64::from(self.offset.local_minus_utc()))).and_utc()
    }

    /// Parse an ISO-8601 timestamp; offset-less input is local time
    ///
    /// Instants outside four-digit years are refused so that every stored
    /// timestamp keeps the fixed-width text form.
    pub fn parse_timestamp(&self, value: &str) -> Result<DateTime<Utc>> {
        let value = value.trim();
        let instant = match DateTime::parse_from_rfc3339(value) {
            Ok(aware) => aware.with_timezone(&Utc),
            Err(_) => NAIVE_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
                .map(|naive| self.from_local(naive))
                .with_context(|| format!("Invalid timestamp: {}", value))?,
        };

        if !SUPPORTED_YEARS.contains(&instant.year()) {
            anyhow::bail!("Timestamp year out of range: {}", value);
        }
        Ok(instant)
    }

    /// Local midnight starting `date`
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.from_local(date.and_time(NaiveTime::MIN))
    }

    /// Half-open window covering one local calendar day
    pub fn day_window(&self, date: NaiveDate) -> TimeSpan {
        let start = self.start_of_day(date);
        TimeSpan::spanning(start, start + Duration::days(1))
    }

    /// Half-open window covering one local calendar month
    pub fn month_window(&self, year: i32, month: u32) -> Result<TimeSpan> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .with_context(|| format!("Invalid month: {}-{}", year, month))?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .with_context(|| format!("Invalid month: {}-{}", year, month))?;

        Ok(TimeSpan::spanning(
            self.start_of_day(first),
            self.start_of_day(next),
        ))
    }

    /// Local (year, month) of today
    pub fn current_month(&self) -> (i32, u32) {
        let today = self.today();
        (today.year(), today.month())
    }

    /// Wall-clock "HH:MM"
    pub fn format_hm(&self, instant: DateTime<Utc>) -> String {
        self.to_local(instant).format("%H:%M").to_string()
    }

    /// "10 Jun 2025"
    pub fn format_display_date(&self, instant: DateTime<Utc>) -> String {
        self.to_local(instant).format("%d %b %Y").to_string()
    }

    /// "2025-06-10"
    pub fn format_iso_date(&self, instant: DateTime<Utc>) -> String {
        self.to_local(instant).format("%Y-%m-%d").to_string()
    }

    /// RFC 3339 in local offset, e.g. "2025-06-10T08:00:00+07:00"
    pub fn format_rfc3339(&self, instant: DateTime<Utc>) -> String {
        self.to_local(instant).to_rfc3339()
    }
}

impl Default for OrgTimezone {
    fn default() -> Self {
        Self::jakarta()
    }
}
