//! Google Calendar gateway implementation.
//!
//! Ties the token broker and the API client together behind the
//! [`CalendarGateway`] trait. One instance is created at startup and
//! injected wherever the calendar is consulted; there is no hidden
//! module-level client cache.

use slotbook_core::{BusyInterval, Slot, TimeWindow};
use tracing::info;

use crate::error::GatewayResult;
use crate::gateway::{AttendeeInfo, BoxFuture, CalendarGateway, EventReference};

use super::auth::AccessTokenBroker;
use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;

/// Gateway to a single Google calendar.
pub struct GoogleCalendarGateway {
    client: GoogleCalendarClient,
    broker: AccessTokenBroker,
    send_updates: bool,
}

impl GoogleCalendarGateway {
    /// Creates the gateway, validating the configuration.
    pub fn new(config: GoogleConfig) -> GatewayResult<Self> {
        config.validate()?;

        let client = GoogleCalendarClient::new(&config.calendar_id, config.timeout)?;
        let broker = AccessTokenBroker::new(config.credentials.clone(), client.http_client());

        info!(calendar_id = %config.calendar_id, "Google calendar gateway initialized");
        Ok(Self {
            client,
            broker,
            send_updates: config.send_updates,
        })
    }
}

impl CalendarGateway for GoogleCalendarGateway {
    fn query_busy(&self, window: TimeWindow) -> BoxFuture<'_, GatewayResult<Vec<BusyInterval>>> {
        Box::pin(async move {
            let token = self.broker.access_token().await?;
            self.client.query_free_busy(&token, window).await
        })
    }

    fn create_event(
        &self,
        slot: Slot,
        attendee: AttendeeInfo,
    ) -> BoxFuture<'_, GatewayResult<EventReference>> {
        Box::pin(async move {
            let token = self.broker.access_token().await?;
            self.client
                .insert_event(&token, slot, &attendee, self.send_updates)
                .await
        })
    }
}
