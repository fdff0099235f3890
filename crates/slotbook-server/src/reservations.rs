//! In-flight reservation table.
//!
//! The process-local fast path against double booking: before touching the
//! upstream calendar, a booking attempt claims its slot key here. A second
//! attempt on the same key while the first is in flight is rejected
//! immediately, without issuing a redundant upstream call.
//!
//! Entries are keyed by the slot start truncated to the minute and carry a
//! monotonically increasing attempt token plus an expiry. The expiry is a
//! crash-safety bound only: a guard normally removes its entry on drop, on
//! every exit path including panics and caller cancellation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use slotbook_core::time::truncate_to_minute;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
struct Reservation {
    token: u64,
    expires_at: Instant,
}

type ReservationMap = Arc<Mutex<HashMap<DateTime<Utc>, Reservation>>>;

/// Process-local map of in-flight booking attempts.
///
/// Attempts for different keys never contend beyond the brief map lock;
/// the lock is never held across an await point.
#[derive(Debug)]
pub struct ReservationTable {
    entries: ReservationMap,
    ttl: Duration,
    next_token: AtomicU64,
}

impl ReservationTable {
    /// Creates a table whose entries expire after `ttl` if never released.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            next_token: AtomicU64::new(1),
        }
    }

    /// Attempts to claim the slot starting at `slot_start`.
    ///
    /// The key is the start instant truncated to the minute. Returns a
    /// guard on success; `None` if a live reservation already exists for
    /// the key (or the map lock is poisoned, which callers treat as a
    /// conflict rather than a crash). An expired leftover entry is
    /// replaced.
    pub fn claim(&self, slot_start: DateTime<Utc>) -> Option<ReservationGuard> {
        let key = truncate_to_minute(slot_start);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();

        let Ok(mut entries) = self.entries.lock() else {
            warn!("reservation map lock poisoned; treating claim as conflict");
            return None;
        };

        if let Some(existing) = entries.get(&key) {
            if now < existing.expires_at {
                debug!(key = %key, holder = existing.token, "slot already claimed in-process");
                return None;
            }
            warn!(key = %key, stale = existing.token, "replacing expired in-flight reservation");
        }

        entries.insert(
            key,
            Reservation {
                token,
                expires_at: now + self.ttl,
            },
        );
        debug!(key = %key, token, "claimed in-flight reservation");

        Some(ReservationGuard {
            entries: Arc::clone(&self.entries),
            key,
            token,
        })
    }

    /// Returns true if a reservation (live or expired) exists for the key.
    pub fn contains(&self, slot_start: DateTime<Utc>) -> bool {
        let key = truncate_to_minute(slot_start);
        self.entries
            .lock()
            .map(|entries| entries.contains_key(&key))
            .unwrap_or(false)
    }

    /// Number of entries currently in the table.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// Returns true if no reservations are in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// RAII handle for one in-flight reservation.
///
/// Dropping the guard removes the entry, but only if the stored token
/// still matches: once the expiry let another attempt replace the entry,
/// a late drop of the stale guard must not release the new holder.
#[derive(Debug)]
pub struct ReservationGuard {
    entries: ReservationMap,
    key: DateTime<Utc>,
    token: u64,
}

impl ReservationGuard {
    /// The normalized reservation key.
    pub fn key(&self) -> DateTime<Utc> {
        self.key
    }

    /// The attempt token held by this guard.
    pub fn token(&self) -> u64 {
        self.token
    }
}

impl Drop for ReservationGuard {
    fn drop(&mut self) {
        if let Ok(mut entries) = self.entries.lock() {
            if entries.get(&self.key).is_some_and(|r| r.token == self.token) {
                entries.remove(&self.key);
                debug!(key = %self.key, token = self.token, "released in-flight reservation");
            }
        }
    }
}
