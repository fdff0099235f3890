//! Post-booking notification.
//!
//! After an event is created the server can POST a JSON summary to a
//! configured webhook. Delivery is fire-and-forget: the booking outcome
//! is already committed on the calendar, so a notification failure is
//! logged and dropped, never surfaced to the client.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use slotbook_core::Slot;
use slotbook_gateway::EventReference;
use slotbook_protocol::BookingForm;

use crate::error::{ServerError, ServerResult};

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Payload delivered to the webhook.
#[derive(Debug, Clone, Serialize)]
pub struct BookingNotification {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suburb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub slot_start: chrono::DateTime<chrono::Utc>,
    pub slot_end: chrono::DateTime<chrono::Utc>,
    pub event_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_link: Option<String>,
}

impl BookingNotification {
    fn from_booking(form: &BookingForm, slot: &Slot, reference: &EventReference) -> Self {
        Self {
            name: form.name.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            suburb: form.suburb.clone(),
            service: form.service.clone(),
            message: form.message.clone(),
            slot_start: slot.start,
            slot_end: slot.end,
            event_id: reference.event_id.clone(),
            event_link: reference.html_link.clone(),
        }
    }
}

/// Delivers booking notifications to a webhook URL.
pub struct Notifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl Notifier {
    /// Creates a notifier for the given webhook URL.
    ///
    /// The URL is validated up front so a misconfigured deployment fails at
    /// startup rather than on the first confirmed booking.
    pub fn new(webhook_url: impl Into<String>) -> ServerResult<Self> {
        let webhook_url = webhook_url.into();
        let parsed = url::Url::parse(&webhook_url)
            .map_err(|e| ServerError::config(format!("invalid webhook URL: {}", e)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(ServerError::config(format!(
                "webhook URL must be http(s), got {}",
                parsed.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .map_err(|e| ServerError::config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            webhook_url,
            client,
        })
    }

    /// Spawns the delivery and returns immediately.
    pub fn booking_confirmed(&self, form: &BookingForm, slot: &Slot, reference: &EventReference) {
        let notification = BookingNotification::from_booking(form, slot, reference);
        let client = self.client.clone();
        let url = self.webhook_url.clone();
        tokio::spawn(async move {
            match client.post(&url).json(&notification).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(event_id = %notification.event_id, "booking notification delivered");
                }
                Ok(response) => {
                    warn!(
                        status = %response.status(),
                        event_id = %notification.event_id,
                        "booking notification rejected by webhook"
                    );
                }
                Err(e) => {
                    warn!(error = %e, event_id = %notification.event_id, "booking notification failed");
                }
            }
        });
    }
}
