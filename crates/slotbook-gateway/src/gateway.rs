//! CalendarGateway trait definition.
//!
//! The gateway is the consumed interface over the external calendar. The
//! core sees exactly two operations: a free/busy query over a time range
//! and an event-create write. Both are potentially slow, fallible, and
//! non-transactional; neither may be assumed atomic with the other.

use std::future::Future;
use std::pin::Pin;

use slotbook_core::{BusyInterval, Slot, TimeWindow};

use crate::error::{GatewayError, GatewayResult};

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so the server can hold a
/// `dyn CalendarGateway` injected at construction.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Requester identity attached to a created event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendeeInfo {
    /// Requester name.
    pub name: String,
    /// Requester email; becomes the event attendee.
    pub email: String,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Requester suburb.
    pub suburb: Option<String>,
    /// Requested service.
    pub service: Option<String>,
    /// Free-form notes.
    pub message: Option<String>,
}

impl AttendeeInfo {
    /// Creates attendee info with the two required fields.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }
}

/// Reference to an event created on the external calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventReference {
    /// Upstream event identifier.
    pub event_id: String,
    /// Link to the event, when the upstream provides one.
    pub html_link: Option<String>,
}

/// The consumed interface over the external calendar.
///
/// Implementations must be `Send + Sync`; one long-lived instance is
/// shared by the availability path and the booking path.
pub trait CalendarGateway: Send + Sync {
    /// Queries the busy intervals within `window`.
    ///
    /// The returned intervals are not guaranteed sorted, non-overlapping,
    /// or clipped to the window.
    fn query_busy(&self, window: TimeWindow) -> BoxFuture<'_, GatewayResult<Vec<BusyInterval>>>;

    /// Creates an event for `slot` with the requester attached.
    ///
    /// # Errors
    ///
    /// Fails with a [`GatewayError`](crate::GatewayError) on transport,
    /// authorization, or upstream failure. There is no idempotency key:
    /// a failed call may or may not have created the event upstream.
    fn create_event(
        &self,
        slot: Slot,
        attendee: AttendeeInfo,
    ) -> BoxFuture<'_, GatewayResult<EventReference>>;
}

/// A gateway that always fails with a fixed error code.
///
/// Useful in tests and as a placeholder when the real gateway fails to
/// initialize.
#[derive(Debug)]
pub struct FailingGateway {
    code: crate::GatewayErrorCode,
    message: String,
}

impl FailingGateway {
    /// Creates a failing gateway with the given code and message.
    pub fn new(code: crate::GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl CalendarGateway for FailingGateway {
    fn query_busy(&self, _window: TimeWindow) -> BoxFuture<'_, GatewayResult<Vec<BusyInterval>>> {
        let error = GatewayError::new(self.code, self.message.clone());
        Box::pin(async move { Err(error) })
    }

    fn create_event(
        &self,
        _slot: Slot,
        _attendee: AttendeeInfo,
    ) -> BoxFuture<'_, GatewayResult<EventReference>> {
        let error = GatewayError::new(self.code, self.message.clone());
        Box::pin(async move { Err(error) })
    }
}
