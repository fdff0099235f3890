//! Availability engine.
//!
//! Computes the bookable slot start times for one calendar day: a pure
//! function of the business-hours policy, the requested day, the busy
//! intervals reported by the calendar, and a caller-supplied `now`. No
//! system clock is read here; the caller provides the anchor instant,
//! which keeps the computation deterministic and testable.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;

use crate::policy::BusinessHoursPolicy;
use crate::time::{BusyInterval, Slot};

/// Computes the ordered free slots for `day`.
///
/// The working window is `[day @ open, day @ close)` in the business zone,
/// each boundary converted to UTC independently (so daylight-saving
/// transitions inside the window cannot skew it). If `day` is today in the
/// business zone, slots that would start before `now` are cut off and the
/// first candidate is re-aligned to the next grid point at or after `now`.
///
/// Busy intervals may arrive unsorted, overlapping, or degenerate; a
/// candidate is free iff none of them passes the strict half-open overlap
/// test. An empty result is a normal outcome, never an error.
pub fn compute_free_slots(
    policy: &BusinessHoursPolicy,
    day: NaiveDate,
    busy: &[BusyInterval],
    now: DateTime<Utc>,
) -> Vec<Slot> {
    let window_start = policy.window_start(day);
    let window_end = policy.window_end(day);
    let step = Duration::minutes(i64::from(policy.slot_minutes));

    let effective_start = if policy.local_date(now) == day && now > window_start {
        align_to_grid(window_start, now, step)
    } else {
        window_start
    };

    let mut slots = Vec::new();
    let mut cursor = effective_start;
    while cursor + step <= window_end {
        let candidate = Slot {
            start: cursor,
            end: cursor + step,
        };
        if !candidate.conflicts_with(busy) {
            slots.push(candidate);
        }
        cursor += step;
    }

    debug!(
        day = %day,
        busy_count = busy.len(),
        free_count = slots.len(),
        "computed availability"
    );
    slots
}

/// Rounds `at` up to the next multiple of `step` measured from `origin`.
///
/// Returns `at` itself when it already sits on the grid.
fn align_to_grid(origin: DateTime<Utc>, at: DateTime<Utc>, step: Duration) -> DateTime<Utc> {
    let elapsed = (at - origin).num_seconds();
    let step_secs = step.num_seconds();
    // `i64::div_ceil` is still unstable (int_roundings); this is its stable
    // equivalent for a positive divisor.
    let steps = elapsed.div_euclid(step_secs) + i64::from(elapsed.rem_euclid(step_secs) > 0);
    origin + Duration::seconds(steps * step_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn melbourne_policy() -> BusinessHoursPolicy {
        BusinessHoursPolicy::parse("Australia/Melbourne", "09:00-17:00", 30).unwrap()
    }

    /// Monday 2025-06-02 in Melbourne winter (AEST, UTC+10):
    /// 09:00 local == 2025-06-01T23:00:00Z.
    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    /// An instant before the Monday window opens.
    fn monday_dawn() -> DateTime<Utc> {
        utc(2025, 6, 1, 20, 0, 0)
    }

    #[test]
    fn full_day_no_busy() {
        let slots = compute_free_slots(&melbourne_policy(), monday(), &[], monday_dawn());
        assert_eq!(slots.len(), 16);
        // First slot at 09:00 local
        assert_eq!(slots[0].start, utc(2025, 6, 1, 23, 0, 0));
        // Last slot is 16:30-17:00 local
        assert_eq!(slots[15].start, utc(2025, 6, 2, 6, 30, 0));
        assert_eq!(slots[15].end, utc(2025, 6, 2, 7, 0, 0));
    }

    #[test]
    fn every_slot_has_policy_duration_and_fits_window() {
        let policy = melbourne_policy();
        let busy = vec![
            BusyInterval::new(utc(2025, 6, 2, 0, 0, 0), utc(2025, 6, 2, 1, 10, 0)),
            BusyInterval::new(utc(2025, 6, 2, 3, 0, 0), utc(2025, 6, 2, 3, 30, 0)),
        ];
        let slots = compute_free_slots(&policy, monday(), &busy, monday_dawn());
        let window_start = policy.window_start(monday());
        let window_end = policy.window_end(monday());
        for slot in &slots {
            assert_eq!(slot.duration(), Duration::minutes(30));
            assert!(slot.start >= window_start);
            assert!(slot.end <= window_end);
            assert!(!slot.conflicts_with(&busy));
        }
    }

    #[test]
    fn exact_busy_slot_removed() {
        // 10:00-10:30 local == 00:00-00:30 UTC
        let busy = vec![BusyInterval::new(
            utc(2025, 6, 2, 0, 0, 0),
            utc(2025, 6, 2, 0, 30, 0),
        )];
        let slots = compute_free_slots(&melbourne_policy(), monday(), &busy, monday_dawn());
        assert_eq!(slots.len(), 15);
        assert!(!slots.iter().any(|s| s.start == utc(2025, 6, 2, 0, 0, 0)));
        // Adjacent slots survive: busy touches them only at endpoints
        assert!(slots.iter().any(|s| s.start == utc(2025, 6, 1, 23, 30, 0)));
        assert!(slots.iter().any(|s| s.start == utc(2025, 6, 2, 0, 30, 0)));
    }

    #[test]
    fn unsorted_overlapping_busy_handled() {
        let busy = vec![
            BusyInterval::new(utc(2025, 6, 2, 2, 0, 0), utc(2025, 6, 2, 3, 0, 0)),
            BusyInterval::new(utc(2025, 6, 1, 23, 0, 0), utc(2025, 6, 2, 0, 0, 0)),
            BusyInterval::new(utc(2025, 6, 2, 2, 30, 0), utc(2025, 6, 2, 3, 30, 0)),
        ];
        let slots = compute_free_slots(&melbourne_policy(), monday(), &busy, monday_dawn());
        // 09:00-10:00 local (2 slots) and 12:00-13:30 local (3 slots) removed
        assert_eq!(slots.len(), 11);
    }

    #[test]
    fn degenerate_busy_tolerated() {
        let busy = vec![
            BusyInterval::new(utc(2025, 6, 2, 0, 0, 0), utc(2025, 6, 2, 0, 0, 0)),
            BusyInterval::new(utc(2025, 6, 2, 4, 0, 0), utc(2025, 6, 2, 3, 0, 0)),
        ];
        let slots = compute_free_slots(&melbourne_policy(), monday(), &busy, monday_dawn());
        // Neither interval can satisfy the overlap test; nothing is removed
        assert_eq!(slots.len(), 16);
    }

    #[test]
    fn today_cutoff_drops_past_slots() {
        // now == 11:10 local == 01:10 UTC; first candidate must be 11:30 local
        let now = utc(2025, 6, 2, 1, 10, 0);
        let slots = compute_free_slots(&melbourne_policy(), monday(), &[], now);
        assert_eq!(slots[0].start, utc(2025, 6, 2, 1, 30, 0));
        assert_eq!(slots.len(), 11);
        assert!(slots.iter().all(|s| s.start >= now));
    }

    #[test]
    fn today_cutoff_on_grid_point_keeps_it() {
        // now exactly at 11:30 local: that slot is still bookable
        let now = utc(2025, 6, 2, 1, 30, 0);
        let slots = compute_free_slots(&melbourne_policy(), monday(), &[], now);
        assert_eq!(slots[0].start, now);
    }

    #[test]
    fn now_after_close_yields_empty() {
        let now = utc(2025, 6, 2, 8, 0, 0); // 18:00 local
        let slots = compute_free_slots(&melbourne_policy(), monday(), &[], now);
        assert!(slots.is_empty());
    }

    #[test]
    fn now_on_other_day_does_not_cut() {
        // now is the day after; requested day is fully in the past from the
        // engine's point of view, but the cutoff only applies to "today".
        // (The coordinator rejects past-dated bookings; availability for a
        // past day is simply the full grid.)
        let now = utc(2025, 6, 3, 1, 0, 0);
        let slots = compute_free_slots(&melbourne_policy(), monday(), &[], now);
        assert_eq!(slots.len(), 16);
    }

    #[test]
    fn trailing_partial_slot_dropped() {
        let policy = BusinessHoursPolicy::parse("UTC", "09:00-17:15", 30).unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let slots = compute_free_slots(&policy, day, &[], utc(2025, 6, 1, 0, 0, 0));
        // 16 whole slots; the 17:00-17:30 candidate exceeds the window
        assert_eq!(slots.len(), 16);
        assert_eq!(slots.last().unwrap().end, utc(2025, 6, 2, 17, 0, 0));
    }

    #[test]
    fn idempotent_for_identical_inputs() {
        let policy = melbourne_policy();
        let busy = vec![BusyInterval::new(
            utc(2025, 6, 2, 0, 0, 0),
            utc(2025, 6, 2, 0, 30, 0),
        )];
        let a = compute_free_slots(&policy, monday(), &busy, monday_dawn());
        let b = compute_free_slots(&policy, monday(), &busy, monday_dawn());
        assert_eq!(a, b);
    }

    #[test]
    fn dst_transition_day_window_is_boundary_accurate() {
        // Melbourne springs forward on 2025-10-05: 09:00 and 17:00 local are
        // both AEDT (UTC+11), but the day is only 23 hours long. The window
        // must come from per-boundary conversion, not start + fixed offset.
        let policy = melbourne_policy();
        let day = NaiveDate::from_ymd_opt(2025, 10, 5).unwrap();
        let slots = compute_free_slots(&policy, day, &[], utc(2025, 10, 4, 12, 0, 0));
        assert_eq!(slots.len(), 16);
        assert_eq!(slots[0].start, utc(2025, 10, 4, 22, 0, 0)); // 09:00 AEDT
        assert_eq!(slots[15].end, utc(2025, 10, 5, 6, 0, 0)); // 17:00 AEDT
    }

    #[test]
    fn grid_alignment_rounds_up() {
        let origin = utc(2025, 6, 2, 9, 0, 0);
        let step = Duration::minutes(30);
        assert_eq!(
            align_to_grid(origin, utc(2025, 6, 2, 9, 0, 1), step),
            utc(2025, 6, 2, 9, 30, 0)
        );
        assert_eq!(
            align_to_grid(origin, utc(2025, 6, 2, 9, 29, 59), step),
            utc(2025, 6, 2, 9, 30, 0)
        );
        assert_eq!(
            align_to_grid(origin, utc(2025, 6, 2, 9, 30, 0), step),
            utc(2025, 6, 2, 9, 30, 0)
        );
    }
}
