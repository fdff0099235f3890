//! Booking coordinator.
//!
//! Runs one booking attempt end to end: validation, the process-local
//! reservation claim, a fresh free/busy re-check against the upstream
//! calendar, and the event creation. The external calendar offers no
//! compare-and-swap, so the re-query immediately before writing shrinks
//! the double-booking window to one upstream round trip; it cannot close
//! it entirely.
//!
//! Each attempt moves forward only:
//! validating, registering, re-querying upstream, committing, then one of
//! the four terminal outcomes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use slotbook_core::{Slot, TimeWindow};
use slotbook_gateway::{AttendeeInfo, CalendarGateway, EventReference};
use slotbook_protocol::BookingForm;

use crate::notify::Notifier;
use crate::reservations::ReservationTable;

/// A validated-or-not inbound booking request.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    /// Requester identity fields.
    pub form: BookingForm,
    /// Chosen slot start instant.
    pub slot_start: DateTime<Utc>,
    /// Event length override in minutes; policy slot duration when absent.
    pub duration_minutes: Option<u32>,
}

/// Terminal outcome of one booking attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    /// The event was created on the calendar.
    Confirmed(EventReference),
    /// The slot is taken, locally or upstream. Routine, not a failure:
    /// the caller re-fetches availability and picks again.
    Conflict,
    /// The request failed validation; reported verbatim, never retried.
    Invalid(String),
    /// The upstream calendar failed or timed out. Retryable by the
    /// caller; never retried internally (no idempotency key upstream, a
    /// blind retry risks a duplicate event).
    UpstreamFailure,
}

/// Coordinates booking attempts against the shared calendar.
pub struct BookingCoordinator {
    gateway: Arc<dyn CalendarGateway>,
    reservations: ReservationTable,
    slot_minutes: u32,
    max_duration_minutes: u32,
    notifier: Option<Arc<Notifier>>,
}

impl BookingCoordinator {
    /// Creates a coordinator around the injected gateway.
    pub fn new(
        gateway: Arc<dyn CalendarGateway>,
        reservations: ReservationTable,
        slot_minutes: u32,
        max_duration_minutes: u32,
        notifier: Option<Arc<Notifier>>,
    ) -> Self {
        Self {
            gateway,
            reservations,
            slot_minutes,
            max_duration_minutes,
            notifier,
        }
    }

    /// Runs one booking attempt.
    ///
    /// `now` is the coordinator's clock reading for this attempt,
    /// injected for testability. The in-flight reservation is released on
    /// every exit path: the claim guard drops when this function returns,
    /// panics, or is cancelled.
    #[tracing::instrument(skip(self, request), fields(slot_start = %request.slot_start))]
    pub async fn attempt_booking(
        &self,
        request: &BookingRequest,
        now: DateTime<Utc>,
    ) -> BookingOutcome {
        // Validating: no external system is contacted for caller errors.
        if let Err(reason) = self.validate(request, now) {
            debug!(reason = %reason, "booking request rejected");
            return BookingOutcome::Invalid(reason);
        }

        // Registering: the process-local fast path.
        let Some(_guard) = self.reservations.claim(request.slot_start) else {
            debug!("slot already has an in-flight attempt");
            return BookingOutcome::Conflict;
        };

        let minutes = request.duration_minutes.unwrap_or(self.slot_minutes);
        let slot = Slot::from_start(request.slot_start, minutes);

        // Re-querying upstream: freshness check for exactly this interval.
        let busy = match self.gateway.query_busy(TimeWindow::for_slot(&slot)).await {
            Ok(busy) => busy,
            Err(e) => {
                warn!(error = %e, "free/busy re-check failed");
                return BookingOutcome::UpstreamFailure;
            }
        };
        if slot.conflicts_with(&busy) {
            debug!("slot booked upstream since availability was fetched");
            return BookingOutcome::Conflict;
        }

        // Committing.
        let attendee = attendee_from_form(&request.form);
        let reference = match self.gateway.create_event(slot, attendee).await {
            Ok(reference) => reference,
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "event creation failed");
                return BookingOutcome::UpstreamFailure;
            }
        };

        info!(event_id = %reference.event_id, "booking confirmed");
        if let Some(ref notifier) = self.notifier {
            // Fire-and-forget: the outcome is already decided.
            notifier.booking_confirmed(&request.form, &slot, &reference);
        }

        BookingOutcome::Confirmed(reference)
    }

    fn validate(&self, request: &BookingRequest, now: DateTime<Utc>) -> Result<(), String> {
        if request.form.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        let email = request.form.email.trim();
        if email.is_empty() {
            return Err("email is required".to_string());
        }
        if !is_plausible_email(email) {
            return Err(format!("email address looks invalid: {}", email));
        }
        if let Some(minutes) = request.duration_minutes {
            if minutes == 0 {
                return Err("duration must be greater than zero".to_string());
            }
            if minutes > self.max_duration_minutes {
                return Err(format!(
                    "duration {} minutes exceeds the maximum of {}",
                    minutes, self.max_duration_minutes
                ));
            }
        }
        if request.slot_start <= now {
            return Err("the requested slot is in the past".to_string());
        }
        Ok(())
    }

    /// Number of attempts currently in flight (diagnostics).
    pub fn in_flight(&self) -> usize {
        self.reservations.len()
    }
}

/// Not RFC 5322; just enough to catch form mishaps before they reach the
/// calendar as an attendee address.
fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

fn attendee_from_form(form: &BookingForm) -> AttendeeInfo {
    AttendeeInfo {
        name: form.name.clone(),
        email: form.email.clone(),
        phone: form.phone.clone(),
        suburb: form.suburb.clone(),
        service: form.service.clone(),
        message: form.message.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    use chrono::TimeZone;
    use slotbook_core::BusyInterval;
    use slotbook_gateway::{BoxFuture, GatewayError, GatewayResult};

    /// Scriptable gateway: fixed busy set, optional failures, call counts,
    /// and an optional artificial delay on the free/busy query.
    #[derive(Default)]
    struct StubGateway {
        busy: Mutex<Vec<BusyInterval>>,
        query_calls: AtomicUsize,
        create_calls: AtomicUsize,
        fail_query: bool,
        fail_create: bool,
        query_delay: Option<StdDuration>,
    }

    impl CalendarGateway for StubGateway {
        fn query_busy(
            &self,
            _window: TimeWindow,
        ) -> BoxFuture<'_, GatewayResult<Vec<BusyInterval>>> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            let busy = self.busy.lock().unwrap().clone();
            let fail = self.fail_query;
            let delay = self.query_delay;
            Box::pin(async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                if fail {
                    Err(GatewayError::timeout("free/busy query timed out"))
                } else {
                    Ok(busy)
                }
            })
        }

        fn create_event(
            &self,
            slot: Slot,
            _attendee: AttendeeInfo,
        ) -> BoxFuture<'_, GatewayResult<EventReference>> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail_create;
            Box::pin(async move {
                if fail {
                    Err(GatewayError::server("insert failed"))
                } else {
                    Ok(EventReference {
                        event_id: format!("evt-{}", slot.start.timestamp()),
                        html_link: Some("https://calendar.google.com/event?eid=abc".to_string()),
                    })
                }
            })
        }
    }

    fn coordinator(gateway: Arc<StubGateway>) -> BookingCoordinator {
        BookingCoordinator::new(
            gateway,
            ReservationTable::new(StdDuration::from_secs(10)),
            30,
            120,
            None,
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()
    }

    fn request_at(slot_start: DateTime<Utc>) -> BookingRequest {
        BookingRequest {
            form: BookingForm::new("Jo Bloggs", "jo@example.com"),
            slot_start,
            duration_minutes: None,
        }
    }

    #[tokio::test]
    async fn free_slot_confirms() {
        let gateway = Arc::new(StubGateway::default());
        let coordinator = coordinator(gateway.clone());
        let request = request_at(now() + chrono::Duration::hours(1));

        let outcome = coordinator.attempt_booking(&request, now()).await;
        let BookingOutcome::Confirmed(reference) = outcome else {
            panic!("expected Confirmed, got {:?}", outcome);
        };
        assert!(reference.event_id.starts_with("evt-"));
        assert_eq!(gateway.query_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn busy_at_recheck_conflicts() {
        let slot_start = now() + chrono::Duration::hours(1);
        let gateway = Arc::new(StubGateway::default());
        gateway.busy.lock().unwrap().push(BusyInterval::new(
            slot_start,
            slot_start + chrono::Duration::minutes(30),
        ));
        let coordinator = coordinator(gateway.clone());

        let outcome = coordinator.attempt_booking(&request_at(slot_start), now()).await;
        assert_eq!(outcome, BookingOutcome::Conflict);
        // Never reached the write
        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn past_slot_is_invalid_without_upstream_contact() {
        let gateway = Arc::new(StubGateway::default());
        let coordinator = coordinator(gateway.clone());
        let request = request_at(now() - chrono::Duration::minutes(5));

        let outcome = coordinator.attempt_booking(&request, now()).await;
        assert!(matches!(outcome, BookingOutcome::Invalid(_)));
        assert_eq!(gateway.query_calls.load(Ordering::SeqCst), 0);
        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn identity_fields_are_required() {
        let gateway = Arc::new(StubGateway::default());
        let coordinator = coordinator(gateway);
        let slot_start = now() + chrono::Duration::hours(1);

        let mut request = request_at(slot_start);
        request.form.name = "  ".to_string();
        let outcome = coordinator.attempt_booking(&request, now()).await;
        assert!(matches!(outcome, BookingOutcome::Invalid(ref r) if r.contains("name")));

        let mut request = request_at(slot_start);
        request.form.email = "not-an-email".to_string();
        let outcome = coordinator.attempt_booking(&request, now()).await;
        assert!(matches!(outcome, BookingOutcome::Invalid(ref r) if r.contains("email")));
    }

    #[tokio::test]
    async fn duration_override_is_bounded() {
        let gateway = Arc::new(StubGateway::default());
        let coordinator = coordinator(gateway);
        let slot_start = now() + chrono::Duration::hours(1);

        let mut request = request_at(slot_start);
        request.duration_minutes = Some(121);
        let outcome = coordinator.attempt_booking(&request, now()).await;
        assert!(matches!(outcome, BookingOutcome::Invalid(_)));

        let mut request = request_at(slot_start);
        request.duration_minutes = Some(0);
        let outcome = coordinator.attempt_booking(&request, now()).await;
        assert!(matches!(outcome, BookingOutcome::Invalid(_)));
    }

    #[tokio::test]
    async fn query_failure_is_upstream_failure() {
        let gateway = Arc::new(StubGateway {
            fail_query: true,
            ..Default::default()
        });
        let coordinator = coordinator(gateway.clone());
        let request = request_at(now() + chrono::Duration::hours(1));

        let outcome = coordinator.attempt_booking(&request, now()).await;
        assert_eq!(outcome, BookingOutcome::UpstreamFailure);
        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[tokio::test]
    async fn create_failure_is_upstream_failure_and_releases() {
        let gateway = Arc::new(StubGateway {
            fail_create: true,
            ..Default::default()
        });
        let coordinator = coordinator(gateway.clone());
        let request = request_at(now() + chrono::Duration::hours(1));

        let outcome = coordinator.attempt_booking(&request, now()).await;
        assert_eq!(outcome, BookingOutcome::UpstreamFailure);
        assert_eq!(coordinator.in_flight(), 0);
        // The slot is claimable again immediately
        let outcome = coordinator.attempt_booking(&request, now()).await;
        assert_eq!(outcome, BookingOutcome::UpstreamFailure);
    }

    #[tokio::test]
    async fn concurrent_attempts_one_wins() {
        // Slow down the upstream re-check so the second attempt arrives
        // while the first still holds the in-flight reservation.
        let gateway = Arc::new(StubGateway {
            query_delay: Some(StdDuration::from_millis(50)),
            ..Default::default()
        });
        let coordinator = Arc::new(coordinator(gateway.clone()));
        let request = request_at(now() + chrono::Duration::hours(1));

        let (first, second) = tokio::join!(
            coordinator.attempt_booking(&request, now()),
            coordinator.attempt_booking(&request, now()),
        );

        let confirmed = [&first, &second]
            .iter()
            .filter(|o| matches!(o, BookingOutcome::Confirmed(_)))
            .count();
        let conflicts = [&first, &second]
            .iter()
            .filter(|o| matches!(o, BookingOutcome::Conflict))
            .count();
        assert_eq!(confirmed, 1, "exactly one attempt must win: {first:?} / {second:?}");
        assert_eq!(conflicts, 1);
        // Only the winner reached the calendar write
        assert_eq!(gateway.create_calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.in_flight(), 0);
    }

    #[test]
    fn email_plausibility() {
        assert!(is_plausible_email("jo@example.com"));
        assert!(is_plausible_email("jo.bloggs+tag@mail.example.org"));
        assert!(!is_plausible_email("jo"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("jo@"));
        assert!(!is_plausible_email("jo@nodot"));
        assert!(!is_plausible_email("jo@.com"));
    }
}
