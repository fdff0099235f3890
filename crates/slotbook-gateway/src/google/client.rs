//! Google Calendar API client.
//!
//! Low-level HTTP client for the two API calls the gateway needs: the
//! free/busy query and the event insert. Request building, status-code
//! mapping, and response parsing live here; auth tokens come from the
//! caller.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use slotbook_core::{BusyInterval, Slot, TimeWindow};

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{AttendeeInfo, EventReference};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    calendar_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FreeBusyRequest<'a> {
    time_min: String,
    time_max: String,
    items: Vec<FreeBusyItem<'a>>,
}

#[derive(Debug, Serialize)]
struct FreeBusyItem<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct FreeBusyResponse {
    #[serde(default)]
    calendars: HashMap<String, FreeBusyCalendar>,
}

#[derive(Debug, Deserialize)]
struct FreeBusyCalendar {
    #[serde(default)]
    busy: Vec<ApiInterval>,
}

#[derive(Debug, Deserialize)]
struct ApiInterval {
    start: String,
    end: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertEventRequest {
    summary: String,
    description: String,
    start: ApiEventTime,
    end: ApiEventTime,
    attendees: Vec<ApiAttendee>,
    reminders: ApiReminders,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date_time: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiAttendee {
    email: String,
    display_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApiReminders {
    use_default: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsertEventResponse {
    id: String,
    html_link: Option<String>,
}

impl GoogleCalendarClient {
    /// Creates a client bound to one calendar, with every request capped
    /// by `timeout`.
    pub fn new(calendar_id: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            calendar_id: calendar_id.into(),
        })
    }

    /// Returns the shared HTTP client (reused by the token broker).
    pub fn http_client(&self) -> reqwest::Client {
        self.http_client.clone()
    }

    /// Queries the busy intervals for this calendar within `window`.
    pub async fn query_free_busy(
        &self,
        access_token: &str,
        window: TimeWindow,
    ) -> GatewayResult<Vec<BusyInterval>> {
        let url = format!("{}/freeBusy", CALENDAR_API_BASE);
        let body = FreeBusyRequest {
            time_min: window.start.to_rfc3339(),
            time_max: window.end.to_rfc3339(),
            items: vec![FreeBusyItem {
                id: &self.calendar_id,
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;

        let body = read_success_body(response).await?;
        let parsed: FreeBusyResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::invalid_response(format!("failed to parse free/busy response: {}", e))
        })?;

        let busy = parsed
            .calendars
            .get(&self.calendar_id)
            .map(|c| c.busy.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|interval| match parse_interval(interval) {
                Ok(busy) => Some(busy),
                Err(e) => {
                    warn!(error = %e, "skipping unparseable busy interval");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!(
            calendar_id = %self.calendar_id,
            busy_count = busy.len(),
            "free/busy query complete"
        );
        Ok(busy)
    }

    /// Inserts an event for `slot`, attaching the requester as attendee.
    pub async fn insert_event(
        &self,
        access_token: &str,
        slot: Slot,
        attendee: &AttendeeInfo,
        send_updates: bool,
    ) -> GatewayResult<EventReference> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(&self.calendar_id)
        );

        let minutes = slot.duration().num_minutes();
        let body = InsertEventRequest {
            summary: event_summary(minutes, attendee),
            description: event_description(attendee),
            start: ApiEventTime {
                date_time: slot.start.to_rfc3339(),
            },
            end: ApiEventTime {
                date_time: slot.end.to_rfc3339(),
            },
            attendees: vec![ApiAttendee {
                email: attendee.email.clone(),
                display_name: attendee.name.clone(),
            }],
            reminders: ApiReminders { use_default: true },
        };

        let mut request = self
            .http_client
            .post(&url)
            .bearer_auth(access_token)
            .json(&body);
        if send_updates {
            request = request.query(&[("sendUpdates", "all")]);
        }

        let response = request.send().await.map_err(map_transport_error)?;
        let body = read_success_body(response).await?;
        let created: InsertEventResponse = serde_json::from_str(&body).map_err(|e| {
            GatewayError::invalid_response(format!("failed to parse insert response: {}", e))
        })?;

        debug!(event_id = %created.id, "event created");
        Ok(EventReference {
            event_id: created.id,
            html_link: created.html_link,
        })
    }
}

/// Maps reqwest transport failures onto the gateway taxonomy.
fn map_transport_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::timeout("request timeout")
    } else if e.is_connect() {
        GatewayError::network(format!("connection failed: {}", e))
    } else {
        GatewayError::network(format!("request failed: {}", e))
    }
}

/// Maps non-success statuses onto the gateway taxonomy and returns the
/// body text of successful responses.
async fn read_success_body(response: reqwest::Response) -> GatewayResult<String> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        return Err(GatewayError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )));
    }

    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GatewayError::authentication(
            "access token expired or invalid",
        ));
    }

    if status == reqwest::StatusCode::FORBIDDEN {
        return Err(GatewayError::authorization("access denied to calendar"));
    }

    if status == reqwest::StatusCode::BAD_REQUEST {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::bad_request(format!(
            "API rejected request: {}",
            body
        )));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::server(format!(
            "API error ({}): {}",
            status, body
        )));
    }

    response
        .text()
        .await
        .map_err(|e| GatewayError::network(format!("failed to read response: {}", e)))
}

fn parse_interval(interval: &ApiInterval) -> GatewayResult<BusyInterval> {
    let start = parse_rfc3339(&interval.start)?;
    let end = parse_rfc3339(&interval.end)?;
    Ok(BusyInterval::new(start, end))
}

fn parse_rfc3339(s: &str) -> GatewayResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| GatewayError::invalid_response(format!("invalid timestamp {:?}: {}", s, e)))
}

/// Builds the event summary line.
fn event_summary(minutes: i64, attendee: &AttendeeInfo) -> String {
    let service = attendee.service.as_deref().unwrap_or("Home Organising");
    format!("{}-min Consultation — {} ({})", minutes, service, attendee.name)
}

/// Builds the event description from the requester fields, skipping the
/// ones that were not provided.
fn event_description(attendee: &AttendeeInfo) -> String {
    let mut lines = vec![
        format!("Name: {}", attendee.name),
        format!("Email: {}", attendee.email),
    ];
    if let Some(ref phone) = attendee.phone {
        lines.push(format!("Phone: {}", phone));
    }
    if let Some(ref suburb) = attendee.suburb {
        lines.push(format!("Suburb: {}", suburb));
    }
    if let Some(ref service) = attendee.service {
        lines.push(format!("Service: {}", service));
    }
    if let Some(ref message) = attendee.message {
        lines.push(format!("Notes: {}", message));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn free_busy_request_shape() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 23, 0, 0).unwrap();
        let window = TimeWindow::from_duration(start, chrono::Duration::hours(8));
        let body = FreeBusyRequest {
            time_min: window.start.to_rfc3339(),
            time_max: window.end.to_rfc3339(),
            items: vec![FreeBusyItem { id: "primary" }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["timeMin"], "2025-06-01T23:00:00+00:00");
        assert_eq!(json["items"][0]["id"], "primary");
    }

    #[test]
    fn free_busy_response_parsing() {
        let json = r#"{
            "kind": "calendar#freeBusy",
            "calendars": {
                "bookings@example.com": {
                    "busy": [
                        {"start": "2025-06-02T00:00:00Z", "end": "2025-06-02T00:30:00Z"}
                    ]
                }
            }
        }"#;
        let parsed: FreeBusyResponse = serde_json::from_str(json).unwrap();
        let busy = &parsed.calendars["bookings@example.com"].busy;
        assert_eq!(busy.len(), 1);
        let interval = parse_interval(&busy[0]).unwrap();
        assert_eq!(
            interval.start,
            Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn free_busy_response_tolerates_missing_calendar() {
        let parsed: FreeBusyResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.calendars.is_empty());
    }

    #[test]
    fn insert_response_parsing() {
        let json = r#"{"id": "evt123", "htmlLink": "https://calendar.google.com/event?eid=abc"}"#;
        let parsed: InsertEventResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.id, "evt123");
        assert!(parsed.html_link.is_some());
    }

    #[test]
    fn summary_uses_service_when_present() {
        let mut attendee = AttendeeInfo::new("Jo Bloggs", "jo@example.com");
        assert_eq!(
            event_summary(30, &attendee),
            "30-min Consultation — Home Organising (Jo Bloggs)"
        );
        attendee.service = Some("Decluttering".to_string());
        assert_eq!(
            event_summary(45, &attendee),
            "45-min Consultation — Decluttering (Jo Bloggs)"
        );
    }

    #[test]
    fn description_skips_absent_fields() {
        let attendee = AttendeeInfo {
            name: "Jo".to_string(),
            email: "jo@example.com".to_string(),
            phone: Some("0400 000 000".to_string()),
            suburb: None,
            service: None,
            message: Some("Side gate is open".to_string()),
        };
        let description = event_description(&attendee);
        assert_eq!(
            description,
            "Name: Jo\nEmail: jo@example.com\nPhone: 0400 000 000\nNotes: Side gate is open"
        );
    }
}
