//! Business-hours policy.
//!
//! The policy is immutable configuration: the business time zone (an IANA
//! identifier), the daily opening and closing times, and the slot duration.
//! Working hours are parsed from the `"HH:MM-HH:MM"` format used by the
//! deployment environment.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Errors raised when constructing a [`BusinessHoursPolicy`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// The time zone identifier is not a known IANA zone.
    #[error("unknown time zone: {0}")]
    UnknownTimeZone(String),

    /// The working-hours spec could not be parsed.
    #[error("invalid working hours spec: {0} (expected \"HH:MM-HH:MM\")")]
    InvalidHoursSpec(String),

    /// Opening time is not strictly before closing time.
    #[error("opening time {open} must be before closing time {close}")]
    InvertedWindow { open: NaiveTime, close: NaiveTime },

    /// Slot duration must be positive.
    #[error("slot duration must be greater than zero")]
    ZeroSlotDuration,
}

/// Immutable working-hours configuration for the business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHoursPolicy {
    /// The business time zone. Business-hours boundaries are wall-clock
    /// times in this zone; everything downstream works in UTC.
    pub tz: Tz,
    /// Daily opening time (local wall clock).
    pub open: NaiveTime,
    /// Daily closing time (local wall clock).
    pub close: NaiveTime,
    /// Slot duration in minutes.
    pub slot_minutes: u32,
}

impl BusinessHoursPolicy {
    /// Creates a policy, validating its invariants.
    pub fn new(tz: Tz, open: NaiveTime, close: NaiveTime, slot_minutes: u32) -> Result<Self, PolicyError> {
        if open >= close {
            return Err(PolicyError::InvertedWindow { open, close });
        }
        if slot_minutes == 0 {
            return Err(PolicyError::ZeroSlotDuration);
        }
        Ok(Self {
            tz,
            open,
            close,
            slot_minutes,
        })
    }

    /// Parses a policy from a time-zone name and a `"HH:MM-HH:MM"` spec.
    pub fn parse(tz_name: &str, hours_spec: &str, slot_minutes: u32) -> Result<Self, PolicyError> {
        let tz: Tz = tz_name
            .parse()
            .map_err(|_| PolicyError::UnknownTimeZone(tz_name.to_string()))?;
        let (open, close) = parse_working_hours(hours_spec)
            .ok_or_else(|| PolicyError::InvalidHoursSpec(hours_spec.to_string()))?;
        Self::new(tz, open, close, slot_minutes)
    }

    /// Resolves `day @ open` in the business zone to a UTC instant.
    pub fn window_start(&self, day: NaiveDate) -> DateTime<Utc> {
        resolve_local(&self.tz, day, self.open)
    }

    /// Resolves `day @ close` in the business zone to a UTC instant.
    ///
    /// Each boundary is converted independently so that a daylight-saving
    /// transition inside the working window shifts only the boundaries it
    /// actually affects.
    pub fn window_end(&self, day: NaiveDate) -> DateTime<Utc> {
        resolve_local(&self.tz, day, self.close)
    }

    /// Returns the calendar date of `instant` in the business zone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }
}

/// Resolves a local wall-clock time to a UTC instant.
///
/// Ambiguous times (the repeated hour when clocks fall back) resolve to the
/// earlier instant; nonexistent times (the skipped hour when clocks spring
/// forward) roll forward minute by minute until a valid instant is found.
fn resolve_local(tz: &Tz, day: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    let mut naive = day.and_time(time);
    loop {
        match tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => return dt.with_timezone(&Utc),
            LocalResult::Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            LocalResult::None => {
                naive += chrono::Duration::minutes(1);
            }
        }
    }
}

/// Parses a working-hours specification (format: `"HH:MM-HH:MM"`).
pub fn parse_working_hours(spec: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (open, close) = spec.split_once('-')?;
    let open = NaiveTime::parse_from_str(open.trim(), "%H:%M").ok()?;
    let close = NaiveTime::parse_from_str(close.trim(), "%H:%M").ok()?;
    Some((open, close))
}
