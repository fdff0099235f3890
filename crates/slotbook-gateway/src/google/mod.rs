//! Google Calendar adapter.
//!
//! Implements [`CalendarGateway`](crate::CalendarGateway) against the
//! Google Calendar API v3: the free/busy query and the event insert. Auth
//! is a stored OAuth refresh token exchanged for short-lived access
//! tokens; acquiring the refresh token in the first place is an external
//! concern.

mod auth;
mod client;
mod config;
mod gateway;

pub use auth::AccessTokenBroker;
pub use client::GoogleCalendarClient;
pub use config::{GoogleConfig, OAuthCredentials};
pub use gateway::GoogleCalendarGateway;
