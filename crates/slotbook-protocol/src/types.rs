//! Request and response types for the slotbook protocol.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use slotbook_core::Slot;

use crate::PROTOCOL_VERSION;

/// Message envelope wrapping all protocol messages.
///
/// Every message exchanged between the front-end bridge and the server is
/// wrapped in this envelope, which provides versioning and request
/// correlation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Protocol version (always "1" for v1).
    pub protocol_version: String,
    /// Unique request ID for correlation.
    pub request_id: String,
    /// The actual payload.
    pub payload: T,
}

impl<T> Envelope<T> {
    /// Creates a new envelope with the current protocol version.
    pub fn new(request_id: impl Into<String>, payload: T) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            request_id: request_id.into(),
            payload,
        }
    }

    /// Creates a request envelope.
    pub fn request(request_id: impl Into<String>, request: T) -> Self {
        Self::new(request_id, request)
    }

    /// Creates a response envelope.
    pub fn response(request_id: impl Into<String>, response: T) -> Self {
        Self::new(request_id, response)
    }

    /// Checks if this envelope uses a compatible protocol version.
    pub fn is_compatible(&self) -> bool {
        self.protocol_version == PROTOCOL_VERSION
    }
}

/// Requester identity and context fields from the booking form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingForm {
    /// Requester name (required).
    pub name: String,
    /// Requester email (required; becomes the event attendee).
    pub email: String,
    /// Contact phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Requester suburb.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suburb: Option<String>,
    /// Requested service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BookingForm {
    /// Creates a form with the two required fields.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Default::default()
        }
    }

    /// Builder: set phone.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Builder: set suburb.
    pub fn with_suburb(mut self, suburb: impl Into<String>) -> Self {
        self.suburb = Some(suburb.into());
        self
    }

    /// Builder: set service.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Builder: set message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Request types sent to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Get the free slots for one calendar day.
    GetAvailability {
        /// Target date, interpreted in the business time zone.
        date: NaiveDate,
        /// Caller time zone for display purposes (IANA name).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timezone: Option<String>,
    },

    /// Attempt to book a slot.
    Book {
        /// Requester identity fields.
        #[serde(flatten)]
        form: BookingForm,
        /// Chosen slot start instant.
        slot_start: DateTime<Utc>,
        /// Event length override in minutes; the policy slot duration
        /// applies when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_minutes: Option<u32>,
    },

    /// Request server shutdown.
    Shutdown,

    /// Ping to check server liveness.
    Ping,
}

impl Request {
    /// Creates a GetAvailability request.
    pub fn availability(date: NaiveDate) -> Self {
        Self::GetAvailability {
            date,
            timezone: None,
        }
    }

    /// Creates a Book request with the policy slot duration.
    pub fn book(form: BookingForm, slot_start: DateTime<Utc>) -> Self {
        Self::Book {
            form,
            slot_start,
            duration_minutes: None,
        }
    }

    /// Stable name of the request variant, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GetAvailability { .. } => "get_availability",
            Self::Book { .. } => "book",
            Self::Shutdown => "shutdown",
            Self::Ping => "ping",
        }
    }
}

/// Machine-readable error category for [`Response::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// The request was malformed at the protocol level.
    BadRequest,
    /// The upstream calendar failed.
    UpstreamError,
    /// Unexpected server-side failure.
    InternalError,
}

/// Response types sent from the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Ordered free slots for the requested day.
    Availability {
        /// Free slot intervals, chronological.
        slots: Vec<Slot>,
    },

    /// The booking was committed to the calendar.
    Booked {
        /// Upstream event identifier.
        event_id: String,
        /// Link to the created event, when the upstream provides one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_link: Option<String>,
    },

    /// The slot is no longer free; the caller should re-fetch
    /// availability and choose another time.
    SlotTaken,

    /// The booking request failed validation.
    Invalid {
        /// Human-readable reason, reported verbatim to the caller.
        reason: String,
    },

    /// The upstream calendar could not be reached; the caller may retry.
    Unavailable {
        /// Always true: this outcome is transient by definition.
        retryable: bool,
    },

    /// Error response for protocol-level failures.
    Error {
        /// Error category.
        code: ErrorCode,
        /// Human-readable message.
        message: String,
    },

    /// Generic success response.
    Ok,

    /// Pong response to Ping.
    Pong,
}

impl Response {
    /// Creates an Availability response.
    pub fn availability(slots: Vec<Slot>) -> Self {
        Self::Availability { slots }
    }

    /// Creates a Booked response.
    pub fn booked(event_id: impl Into<String>, event_link: Option<String>) -> Self {
        Self::Booked {
            event_id: event_id.into(),
            event_link,
        }
    }

    /// Creates an Invalid response.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Creates an Unavailable response.
    pub fn unavailable() -> Self {
        Self::Unavailable { retryable: true }
    }

    /// Creates an Error response.
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }
}
