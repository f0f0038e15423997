//! Local (Tashkent) wall-clock helpers.
//!
//! Every "today" or "before opening" decision in the pipeline is taken in
//! UTC+5, regardless of where the process runs. The current time is captured
//! once per run as a [`LocalTime`] and passed down, so tests can pin it.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc};

/// Uzbekistan has no daylight saving time.
pub const UZT_OFFSET_SECS: i32 = 5 * 3600;

fn uzt() -> FixedOffset {
    FixedOffset::east_opt(UZT_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalTime {
    now: DateTime<FixedOffset>,
}

impl LocalTime {
    pub fn now() -> Self {
        Self::from_utc(Utc::now())
    }

    pub fn from_utc(utc: DateTime<Utc>) -> Self {
        Self {
            now: utc.with_timezone(&uzt()),
        }
    }

    pub fn at(date: NaiveDate, hour: u32, minute: u32) -> Option<Self> {
        let naive = date.and_hms_opt(hour, minute, 0)?;
        let now = uzt().from_local_datetime(&naive).single()?;
        Some(Self { now })
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn hour(&self) -> u32 {
        self.now.hour()
    }

    pub fn datetime(&self) -> DateTime<FixedOffset> {
        self.now
    }

    /// Seconds since the Unix epoch, as persisted in `last_updated_ts`.
    pub fn epoch_secs(&self) -> f64 {
        self.now.timestamp() as f64 + f64::from(self.now.timestamp_subsec_millis()) / 1000.0
    }

    /// Human readable stamp, e.g. `2025-03-14 09:30`.
    pub fn stamp(&self) -> String {
        self.now.format("%Y-%m-%d %H:%M").to_string()
    }
}

/// Parses the timestamp shapes seen across feeds and APIs.
///
/// Naive values (no offset) are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}
