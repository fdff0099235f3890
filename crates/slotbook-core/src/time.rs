//! Time types for availability and booking.
//!
//! This module provides [`BusyInterval`] for occupied ranges reported by the
//! external calendar, [`Slot`] for grid-aligned bookable candidates, and
//! [`TimeWindow`] for free/busy query ranges. All three are half-open
//! `[start, end)` intervals stored in UTC; wall-clock representations exist
//! only at the edges (parsing business hours, rendering for display).

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// An occupied interval on the external calendar.
///
/// Busy intervals come straight from the free/busy oracle: they are not
/// assumed sorted, non-overlapping, or even well-formed. An inverted or
/// zero-length interval is preserved as-is; the overlap predicate simply
/// never matches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    /// Start of the busy range (inclusive).
    pub start: DateTime<Utc>,
    /// End of the busy range (exclusive).
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    /// Creates a busy interval from two UTC instants.
    ///
    /// No ordering is enforced: the external source occasionally reports
    /// degenerate ranges and they must be tolerated, not rejected.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Returns `true` if this interval is well-formed (`start < end`).
    pub fn is_well_formed(&self) -> bool {
        self.start < self.end
    }

    /// Strict half-open overlap test against `[start, end)`.
    ///
    /// Two intervals conflict iff `max(starts) < min(ends)`. Intervals that
    /// merely touch at an endpoint do not conflict, and degenerate busy
    /// intervals can never satisfy the predicate.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start.max(start) < self.end.min(end)
    }
}

/// A grid-aligned candidate appointment window.
///
/// A slot's duration is always exactly the policy slot duration; the
/// availability engine never emits partial slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Start of the slot (inclusive), RFC 3339 over the wire.
    pub start: DateTime<Utc>,
    /// End of the slot (exclusive).
    pub end: DateTime<Utc>,
}

impl Slot {
    /// Creates a slot from a start instant and a duration in minutes.
    pub fn from_start(start: DateTime<Utc>, minutes: u32) -> Self {
        Self {
            start,
            end: start + Duration::minutes(i64::from(minutes)),
        }
    }

    /// Returns the slot duration.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns `true` if any of the given busy intervals overlaps this slot.
    pub fn conflicts_with(&self, busy: &[BusyInterval]) -> bool {
        busy.iter().any(|b| b.overlaps(self.start, self.end))
    }
}

/// Truncates an instant to the minute.
///
/// Reservation keys are minute-granular so that two clients who picked the
/// same displayed slot always collide on the same key, regardless of any
/// sub-minute noise introduced on the way in.
pub fn truncate_to_minute(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_second(0)
        .and_then(|d| d.with_nanosecond(0))
        .unwrap_or(dt)
}

/// A free/busy query range.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a time window from a start time and duration.
    pub fn from_duration(start: DateTime<Utc>, duration: Duration) -> Self {
        Self::new(start, start + duration)
    }

    /// Creates the query window covering a single slot.
    pub fn for_slot(slot: &Slot) -> Self {
        Self::new(slot.start, slot.end)
    }

    /// Returns the duration of this time window.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Checks if a datetime falls within this window.
    ///
    /// Uses half-open interval semantics: `[start, end)`.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }
}
