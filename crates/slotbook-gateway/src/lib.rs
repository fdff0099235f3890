//! CalendarGateway trait and implementations.
//!
//! This crate provides the abstraction over the external calendar:
//!
//! - [`CalendarGateway`] - exactly two operations: a free/busy query and
//!   an event-create write
//! - [`GatewayError`] - error taxonomy with retryability classification
//! - [`google`] - the Google Calendar adapter
//!
//! The gateway is the only source of truth for what is booked. It offers
//! no compare-and-swap primitive, so callers must treat `query_busy`
//! followed by `create_event` as two independent, fallible, non-atomic
//! operations.

pub mod error;
pub mod gateway;
pub mod google;

pub use error::{GatewayError, GatewayErrorCode, GatewayResult};
pub use gateway::{AttendeeInfo, BoxFuture, CalendarGateway, EventReference, FailingGateway};
pub use google::{GoogleCalendarGateway, GoogleConfig, OAuthCredentials};
